use std::sync::Arc;

use tracing::{debug, info};

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::content_index::{ContentIndex, IndexStatus},
    },
    utils::embedding::EmbeddingProvider,
};

use crate::{
    pipeline::{run_build, BuildSettings},
    source::TranscriptSource,
};

/// Schedules index builds and owns the index state machine.
///
/// Builds run as detached tasks holding their own storage handle, so a
/// disconnecting requester never cancels an in-flight build.
#[derive(Clone)]
pub struct IndexJobManager {
    db: Arc<SurrealDbClient>,
    embedder: EmbeddingProvider,
    transcripts: Arc<dyn TranscriptSource>,
    settings: BuildSettings,
}

impl IndexJobManager {
    pub fn new(
        db: Arc<SurrealDbClient>,
        embedder: EmbeddingProvider,
        transcripts: Arc<dyn TranscriptSource>,
        settings: BuildSettings,
    ) -> Self {
        Self {
            db,
            embedder,
            transcripts,
            settings,
        }
    }

    /// Requests a build and reports the resulting status.
    ///
    /// A `Completed` or already-`Processing` index is returned as-is with
    /// no side effects. Otherwise the caller races for the claim; exactly
    /// one winner spawns the build and reports `Processing`, losers read
    /// back whatever state the winner left behind.
    pub async fn request_build(
        &self,
        content_id: &str,
        title: &str,
    ) -> Result<IndexStatus, AppError> {
        if let Some(index) = self.db.get_item::<ContentIndex>(content_id).await? {
            match index.status {
                IndexStatus::Completed => {
                    debug!(content_id, "Index already built");
                    return Ok(IndexStatus::Completed);
                }
                IndexStatus::Processing => {
                    debug!(content_id, "Index build already in flight");
                    return Ok(IndexStatus::Processing);
                }
                IndexStatus::Pending | IndexStatus::Failed => {}
            }
        } else {
            ContentIndex::ensure_exists(content_id, title, &self.db).await?;
        }

        if ContentIndex::try_claim_for_processing(content_id, &self.db).await? {
            info!(content_id, title, "Claimed index build, scheduling");
            let db = Arc::clone(&self.db);
            let embedder = self.embedder.clone();
            let transcripts = Arc::clone(&self.transcripts);
            let settings = self.settings;
            let content_id = content_id.to_owned();
            let title = title.to_owned();
            tokio::spawn(async move {
                run_build(db, embedder, transcripts, settings, content_id, title).await;
            });
            Ok(IndexStatus::Processing)
        } else {
            debug!(content_id, "Lost the build claim, another task runs it");
            self.status_after_lost_claim(content_id).await
        }
    }

    // The winning claimant may already have finished by the time the
    // loser reports back, so re-read the record rather than assuming
    // the build is still in flight.
    async fn status_after_lost_claim(&self, content_id: &str) -> Result<IndexStatus, AppError> {
        match self.db.get_item::<ContentIndex>(content_id).await? {
            Some(index) if index.status.is_terminal() => Ok(index.status),
            _ => Ok(IndexStatus::Processing),
        }
    }

    /// Current index record, if one was ever requested.
    pub async fn query_status(&self, content_id: &str) -> Result<Option<ContentIndex>, AppError> {
        Ok(self.db.get_item::<ContentIndex>(content_id).await?)
    }
}
