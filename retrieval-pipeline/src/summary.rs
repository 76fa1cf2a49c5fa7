use futures::StreamExt;
use tracing::{debug, info};

use common::{
    error::AppError,
    utils::{
        chat::{ChatProvider, ChatTokenStream},
        chunking::narration_chunks,
    },
};

use crate::prompts::NARRATOR_SYSTEM_PROMPT;

/// Narrates a full transcript segment by segment and joins the pieces
/// with single spaces. Segments are narrated strictly in order so the
/// story keeps its chronology.
pub async fn generate_summary(chat: &ChatProvider, text: &str) -> Result<String, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "cannot summarize empty dialogue".into(),
        ));
    }

    let segments = narration_chunks(text)?;
    info!(
        segments = segments.len(),
        backend = chat.backend_label(),
        "Generating summary"
    );

    let mut parts = Vec::with_capacity(segments.len());
    for (index, segment) in segments.into_iter().enumerate() {
        debug!(index, "Narrating segment");
        let narration = chat.complete(NARRATOR_SYSTEM_PROMPT, segment).await?;
        parts.push(narration);
    }

    Ok(parts.join(" "))
}

/// Streaming narration: each segment's fragments are forwarded as they
/// arrive, with a single space emitted between consecutive segments. A
/// failure mid-story surfaces as an error item and ends the stream.
pub async fn generate_summary_stream(
    chat: &ChatProvider,
    text: &str,
) -> Result<ChatTokenStream, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "cannot summarize empty dialogue".into(),
        ));
    }

    let segments = narration_chunks(text)?;
    info!(
        segments = segments.len(),
        backend = chat.backend_label(),
        "Streaming summary"
    );

    let chat = chat.clone();
    let stream = async_stream::stream! {
        for (index, segment) in segments.into_iter().enumerate() {
            if index > 0 {
                yield Ok(" ".to_owned());
            }

            let mut fragments = match chat
                .complete_stream(NARRATOR_SYSTEM_PROMPT, segment)
                .await
            {
                Ok(fragments) => fragments,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            while let Some(fragment) = fragments.next().await {
                match fragment {
                    Ok(fragment) => yield Ok(fragment),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
    };

    Ok(stream.boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn summary_joins_one_narration_per_segment() {
        let chat = ChatProvider::new_scripted("The scene unfolds.");
        // 10 chars -> five segments of two characters each.
        let summary = generate_summary(&chat, "abcdefghij")
            .await
            .expect("summary failed");

        assert_eq!(
            summary,
            "The scene unfolds. The scene unfolds. The scene unfolds. \
             The scene unfolds. The scene unfolds."
        );
    }

    #[tokio::test]
    async fn empty_dialogue_is_rejected() {
        let chat = ChatProvider::new_scripted("never reached");
        let result = generate_summary(&chat, "  \n ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn summary_stream_separates_segments_with_spaces() {
        let chat = ChatProvider::new_scripted("tense scene");
        let stream = generate_summary_stream(&chat, "abcdefghij")
            .await
            .expect("stream failed");

        let fragments: Vec<String> = stream.try_collect().await.expect("collect failed");
        assert_eq!(fragments.iter().filter(|f| *f == " ").count(), 4);
        assert_eq!(fragments.concat(), {
            let one = "tensescene";
            format!("{one} {one} {one} {one} {one}")
        });
    }

    #[tokio::test]
    async fn short_text_narrates_as_a_single_segment() {
        let chat = ChatProvider::new_scripted("brief");
        let summary = generate_summary(&chat, "x").await.expect("summary failed");
        assert_eq!(summary, "brief");
    }
}
