use std::{sync::Arc, time::Duration};

use common::{
    storage::db::SurrealDbClient,
    utils::{chat::ChatProvider, config::AppConfig, embedding::EmbeddingProvider},
};
use ingestion_pipeline::{
    jobs::IndexJobManager, pipeline::BuildSettings, source::TranscriptSource,
};

/// Shared handler state: storage, capability providers and the job
/// manager, all cheap to clone per request.
#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub config: AppConfig,
    pub embedder: EmbeddingProvider,
    pub chat: ChatProvider,
    pub transcripts: Arc<dyn TranscriptSource>,
    pub jobs: IndexJobManager,
}

impl ApiState {
    pub fn new(
        config: AppConfig,
        db: Arc<SurrealDbClient>,
        embedder: EmbeddingProvider,
        chat: ChatProvider,
        transcripts: Arc<dyn TranscriptSource>,
    ) -> Self {
        let settings = BuildSettings {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            timeout: Duration::from_secs(config.build_timeout_secs),
        };
        let jobs = IndexJobManager::new(
            Arc::clone(&db),
            embedder.clone(),
            Arc::clone(&transcripts),
            settings,
        );

        Self {
            db,
            config,
            embedder,
            chat,
            transcripts,
            jobs,
        }
    }
}
