use std::{sync::Arc, time::Duration};

use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing::{error, info, warn};

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{content_index::ContentIndex, vector_record::VectorRecord},
    },
    utils::{chunking::chunk_text, embedding::EmbeddingProvider},
};

use crate::source::TranscriptSource;

/// Knobs for a single index build.
#[derive(Debug, Clone, Copy)]
pub struct BuildSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub timeout: Duration,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Runs a build for an index already claimed as `Processing` and records
/// the terminal state. Never returns an error to the spawning task; every
/// failure ends up in the index record where callers can read it.
pub async fn run_build(
    db: Arc<SurrealDbClient>,
    embedder: EmbeddingProvider,
    transcripts: Arc<dyn TranscriptSource>,
    settings: BuildSettings,
    content_id: String,
    title: String,
) {
    match build_index(&db, &embedder, transcripts.as_ref(), settings, &content_id, &title).await {
        Ok(chunk_count) => {
            info!(content_id, chunk_count, "Index build completed");
            if let Err(e) = ContentIndex::mark_completed(&content_id, &db).await {
                error!(content_id, error = %e, "Failed to record build completion");
            }
        }
        Err(e) => {
            warn!(content_id, error = %e, "Index build failed");
            if let Err(e) = ContentIndex::mark_failed(&content_id, &e.to_string(), &db).await {
                error!(content_id, error = %e, "Failed to record build failure");
            }
        }
    }
}

/// Fetch, chunk, embed and upsert one content item. Returns the number of
/// chunks written.
pub async fn build_index(
    db: &SurrealDbClient,
    embedder: &EmbeddingProvider,
    transcripts: &dyn TranscriptSource,
    settings: BuildSettings,
    content_id: &str,
    title: &str,
) -> Result<usize, AppError> {
    let dialogue = tokio::time::timeout(
        settings.timeout,
        transcripts.fetch_dialogue(content_id, title),
    )
    .await
    .map_err(|_| {
        AppError::Processing(format!(
            "transcript fetch timed out after {}s",
            settings.timeout.as_secs()
        ))
    })??;

    if dialogue.trim().is_empty() {
        return Err(AppError::Processing("no content".into()));
    }

    let chunks = chunk_text(&dialogue, settings.chunk_size, settings.chunk_overlap)?;
    if chunks.is_empty() {
        return Err(AppError::Processing("no content".into()));
    }
    info!(
        content_id,
        chunk_count = chunks.len(),
        backend = embedder.backend_label(),
        "Embedding transcript chunks"
    );

    let retry_strategy = ExponentialBackoff::from_millis(100).map(jitter).take(3);
    let vectors = Retry::spawn(retry_strategy, || embedder.embed_batch(chunks.clone())).await?;

    let expected = embedder.dimension();
    if let Some(vector) = vectors.iter().find(|v| v.len() != expected) {
        return Err(AppError::InternalError(format!(
            "embedding backend returned dimension {} where {expected} was configured",
            vector.len()
        )));
    }

    VectorRecord::upsert_for_content(db, content_id, &chunks, vectors).await?;
    Ok(chunks.len())
}
