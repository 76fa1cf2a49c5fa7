pub mod answer;
pub mod lexical;
pub mod prompts;
pub mod scoring;
pub mod summary;

use std::collections::HashMap;

use tracing::{debug, instrument};

use common::{
    error::AppError,
    storage::{db::SurrealDbClient, types::vector_record::VectorRecord},
    utils::embedding::EmbeddingProvider,
};

use lexical::LexicalIndex;
use scoring::reciprocal_rank_fusion;

/// Tuning for one hybrid retrieval pass.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    /// Number of chunks returned to the caller. Each ranker is consulted
    /// for twice this number before fusion.
    pub take: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { take: 10 }
    }
}

impl RetrievalConfig {
    pub fn with_take(take: usize) -> Self {
        Self { take: take.max(1) }
    }

    fn candidates(&self) -> usize {
        self.take * 2
    }
}

/// Hybrid retrieval for one content id: embeds the question, consults the
/// vector index and an on-demand lexical index, and fuses both rankings.
///
/// Returns chunk texts most relevant first, deduplicated by chunk id. An
/// empty lexical corpus falls back to the vector ranking alone.
#[instrument(skip_all, fields(content_id))]
pub async fn retrieve_context(
    db: &SurrealDbClient,
    embedder: &EmbeddingProvider,
    content_id: &str,
    question: &str,
    config: RetrievalConfig,
) -> Result<Vec<String>, AppError> {
    let query_vector = embedder.embed(question).await?;

    let vector_results =
        VectorRecord::search(db, content_id, query_vector, config.candidates()).await?;
    let documents = VectorRecord::all_documents(db, content_id).await?;

    let mut texts: HashMap<&str, &str> = documents
        .iter()
        .map(|doc| (doc.id.as_str(), doc.text.as_str()))
        .collect();
    for result in &vector_results {
        texts.entry(result.id.as_str()).or_insert(result.text.as_str());
    }

    let vector_ids: Vec<String> = vector_results.iter().map(|r| r.id.clone()).collect();

    let lexical_index = LexicalIndex::build(&documents);
    if lexical_index.is_empty() {
        debug!(content_id, "Lexical corpus empty, using vector ranking only");
        return Ok(vector_results
            .into_iter()
            .take(config.take)
            .map(|r| r.text)
            .collect());
    }

    let lexical_ids = lexical_index.search(question, config.candidates());
    let fused = reciprocal_rank_fusion(&vector_ids, &lexical_ids, config.take);

    debug!(
        content_id,
        vector = vector_ids.len(),
        lexical = lexical_ids.len(),
        fused = fused.len(),
        "Fused retrieval rankings"
    );

    Ok(fused
        .into_iter()
        .filter_map(|id| texts.get(id.as_str()).map(|text| (*text).to_owned()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn seeded_db(embedder: &EmbeddingProvider) -> SurrealDbClient {
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory("retrieval_tests", database)
            .await
            .expect("Failed to start in-memory surrealdb");
        db.ensure_initialized()
            .await
            .expect("Failed to build indexes");

        let chunks: Vec<String> = vec![
            "Alice walks in from the rain.".into(),
            "Bob said hi and sat by the window.".into(),
            "The detective lights a cigarette.".into(),
        ];
        let vectors = embedder
            .embed_batch(chunks.clone())
            .await
            .expect("embedding failed");
        VectorRecord::upsert_for_content(&db, "tt001", &chunks, vectors)
            .await
            .expect("upsert failed");
        db
    }

    #[tokio::test]
    async fn hybrid_retrieval_surfaces_the_matching_chunk_first() {
        let embedder = EmbeddingProvider::new_hashed(256);
        let db = seeded_db(&embedder).await;

        let results = retrieve_context(
            &db,
            &embedder,
            "tt001",
            "who is Bob",
            RetrievalConfig::with_take(1),
        )
        .await
        .expect("retrieval failed");

        assert_eq!(results.len(), 1);
        assert!(
            results[0].contains("Bob said hi"),
            "expected the Bob chunk, got: {}",
            results[0]
        );
    }

    #[tokio::test]
    async fn results_are_deduplicated_and_bounded() {
        let embedder = EmbeddingProvider::new_hashed(256);
        let db = seeded_db(&embedder).await;

        let results = retrieve_context(
            &db,
            &embedder,
            "tt001",
            "rain window cigarette",
            RetrievalConfig::with_take(2),
        )
        .await
        .expect("retrieval failed");

        assert!(results.len() <= 2);
        let mut deduped = results.clone();
        deduped.dedup();
        assert_eq!(results, deduped);
    }

    #[tokio::test]
    async fn unknown_content_id_returns_no_context() {
        let embedder = EmbeddingProvider::new_hashed(256);
        let db = seeded_db(&embedder).await;

        let results = retrieve_context(
            &db,
            &embedder,
            "unknown",
            "anything",
            RetrievalConfig::default(),
        )
        .await
        .expect("retrieval failed");
        assert!(results.is_empty());
    }
}
