use tracing::{debug, info};

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::vector_record::VectorRecord},
    utils::{
        chat::{ChatProvider, ChatTokenStream},
        embedding::EmbeddingProvider,
    },
};

use crate::{
    prompts::{create_user_message, MOVIE_ANALYST_SYSTEM_PROMPT},
    retrieve_context, RetrievalConfig,
};

/// Validates the question and confirms an index exists before any model
/// call is issued. `NotFound` here means "index not ready, retry later",
/// never a process-level failure.
async fn prepare_context(
    db: &SurrealDbClient,
    embedder: &EmbeddingProvider,
    content_id: &str,
    question: &str,
    config: RetrievalConfig,
) -> Result<String, AppError> {
    if question.trim().is_empty() {
        return Err(AppError::Validation("question must not be empty".into()));
    }

    if !VectorRecord::exists(db, content_id).await? {
        return Err(AppError::NotFound(format!(
            "no index exists for content id '{content_id}'; request a build and retry"
        )));
    }

    let chunks = retrieve_context(db, embedder, content_id, question, config).await?;
    debug!(content_id, retrieved = chunks.len(), "Assembled answer context");

    Ok(chunks.join("\n\n"))
}

/// Batch answer: retrieve, assemble context, one completion call.
pub async fn get_answer(
    db: &SurrealDbClient,
    embedder: &EmbeddingProvider,
    chat: &ChatProvider,
    content_id: &str,
    question: &str,
    config: RetrievalConfig,
) -> Result<String, AppError> {
    let context = prepare_context(db, embedder, content_id, question, config).await?;
    let user_message = create_user_message(&context, question);

    info!(content_id, backend = chat.backend_label(), "Answering question");
    chat.complete(MOVIE_ANALYST_SYSTEM_PROMPT, user_message).await
}

/// Streaming answer: same preconditions and retrieval as the batch path,
/// raised before any fragment is produced, then the model's fragments are
/// forwarded unbuffered. Dropping the returned stream cancels the
/// in-flight model call.
pub async fn answer_stream(
    db: &SurrealDbClient,
    embedder: &EmbeddingProvider,
    chat: &ChatProvider,
    content_id: &str,
    question: &str,
    config: RetrievalConfig,
) -> Result<ChatTokenStream, AppError> {
    let context = prepare_context(db, embedder, content_id, question, config).await?;
    let user_message = create_user_message(&context, question);

    info!(content_id, backend = chat.backend_label(), "Streaming answer");
    chat.complete_stream(MOVIE_ANALYST_SYSTEM_PROMPT, user_message)
        .await
}
