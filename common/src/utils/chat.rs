use std::{pin::Pin, sync::Arc};

use async_openai::{
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    },
    Client,
};
use futures::{stream, Stream, StreamExt};

use crate::error::AppError;

/// Fragments produced by a streaming completion, in model order.
pub type ChatTokenStream = Pin<Box<dyn Stream<Item = Result<String, AppError>> + Send>>;

/// Stateless language-model capability: one-shot completion and streaming
/// completion over the same prompt shape.
///
/// The scripted backend answers every call with a fixed reply and streams
/// it word by word; orchestration tests run against it without a network.
/// The scripted-failure backend streams its reply and then fails, for
/// exercising mid-stream error paths.
#[derive(Clone)]
pub struct ChatProvider {
    inner: ChatInner,
}

#[derive(Clone)]
enum ChatInner {
    OpenAI {
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        model: String,
    },
    Scripted {
        reply: String,
    },
    ScriptedFailure {
        reply: String,
        message: String,
    },
}

impl ChatProvider {
    pub fn new_openai(
        client: Arc<Client<async_openai::config::OpenAIConfig>>,
        model: String,
    ) -> Self {
        ChatProvider {
            inner: ChatInner::OpenAI { client, model },
        }
    }

    pub fn new_scripted(reply: impl Into<String>) -> Self {
        ChatProvider {
            inner: ChatInner::Scripted {
                reply: reply.into(),
            },
        }
    }

    pub fn new_scripted_failure(reply: impl Into<String>, message: impl Into<String>) -> Self {
        ChatProvider {
            inner: ChatInner::ScriptedFailure {
                reply: reply.into(),
                message: message.into(),
            },
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            ChatInner::OpenAI { .. } => "openai",
            ChatInner::Scripted { .. } => "scripted",
            ChatInner::ScriptedFailure { .. } => "scripted-failure",
        }
    }

    /// One-shot completion: the full response text or an error.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_message: String,
    ) -> Result<String, AppError> {
        match &self.inner {
            ChatInner::Scripted { reply } => Ok(reply.clone()),
            ChatInner::ScriptedFailure { message, .. } => {
                Err(AppError::LLMParsing(message.clone()))
            }
            ChatInner::OpenAI { client, model } => {
                let request = build_request(model, system_prompt, user_message)?;
                let response = client.chat().create(request).await?;

                response
                    .choices
                    .first()
                    .and_then(|choice| choice.message.content.clone())
                    .ok_or_else(|| {
                        AppError::LLMParsing("No content found in LLM response".into())
                    })
            }
        }
    }

    /// Streaming completion. Fragments are forwarded as the backend
    /// produces them; dropping the stream drops the in-flight request.
    pub async fn complete_stream(
        &self,
        system_prompt: &str,
        user_message: String,
    ) -> Result<ChatTokenStream, AppError> {
        match &self.inner {
            ChatInner::Scripted { reply } => {
                let words: Vec<Result<String, AppError>> = reply
                    .split_whitespace()
                    .map(|word| Ok(word.to_owned()))
                    .collect();
                Ok(stream::iter(words).boxed())
            }
            ChatInner::ScriptedFailure { reply, message } => {
                let mut items: Vec<Result<String, AppError>> = reply
                    .split_whitespace()
                    .map(|word| Ok(word.to_owned()))
                    .collect();
                items.push(Err(AppError::LLMParsing(message.clone())));
                Ok(stream::iter(items).boxed())
            }
            ChatInner::OpenAI { client, model } => {
                let request = build_request(model, system_prompt, user_message)?;
                let openai_stream = client.chat().create_stream(request).await?;

                let fragments = openai_stream
                    .filter_map(|result| async move {
                        match result {
                            Ok(response) => {
                                let content = response
                                    .choices
                                    .first()
                                    .and_then(|choice| choice.delta.content.clone())
                                    .unwrap_or_default();
                                if content.is_empty() {
                                    None
                                } else {
                                    Some(Ok(content))
                                }
                            }
                            Err(e) => Some(Err(AppError::OpenAI(e))),
                        }
                    })
                    .boxed();

                Ok(fragments)
            }
        }
    }
}

fn build_request(
    model: &str,
    system_prompt: &str,
    user_message: String,
) -> Result<CreateChatCompletionRequest, AppError> {
    CreateChatCompletionRequestArgs::default()
        .model(model)
        .temperature(0.6)
        .max_tokens(3048u32)
        .messages([
            ChatCompletionRequestSystemMessage::from(system_prompt).into(),
            ChatCompletionRequestUserMessage::from(user_message).into(),
        ])
        .build()
        .map_err(AppError::OpenAI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn scripted_backend_completes_with_its_reply() {
        let chat = ChatProvider::new_scripted("the heist goes wrong");
        let answer = chat
            .complete("system", "what happens?".into())
            .await
            .expect("complete failed");
        assert_eq!(answer, "the heist goes wrong");
    }

    #[tokio::test]
    async fn scripted_stream_yields_word_fragments_in_order() {
        let chat = ChatProvider::new_scripted("one two three");
        let stream = chat
            .complete_stream("system", "question".into())
            .await
            .expect("stream failed");
        let tokens: Vec<String> = stream.try_collect().await.expect("collect failed");
        assert_eq!(tokens, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn failing_backend_streams_its_reply_before_the_error() {
        let chat = ChatProvider::new_scripted_failure("partial answer", "connection reset");
        let stream = chat
            .complete_stream("system", "question".into())
            .await
            .expect("stream failed");
        let items: Vec<Result<String, AppError>> = stream.collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert_eq!(items[1].as_ref().unwrap(), "answer");
        assert!(matches!(&items[2], Err(AppError::LLMParsing(m)) if m == "connection reset"));
    }
}
