use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};
use tracing::debug;

stored_object!(VectorRecord, "vector_record", {
    content_id: String,
    sequence_index: i64,
    text: String,
    embedding: Vec<f32>
});

/// A chunk returned by similarity search, ranked most relevant first.
#[derive(Debug, Clone, Deserialize)]
pub struct RankedChunk {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub sequence_index: i64,
    pub text: String,
    pub score: f32,
}

/// A chunk as stored, used to build the in-memory lexical corpus.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkDocument {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub sequence_index: i64,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    #[allow(dead_code)]
    id: String,
}

impl VectorRecord {
    /// Record ids are derived from content id and chunk position, so
    /// re-indexing the same text overwrites in place instead of duplicating.
    pub fn record_id(content_id: &str, sequence_index: usize) -> String {
        format!("{content_id}_{sequence_index}")
    }

    pub fn new(content_id: String, sequence_index: usize, text: String, embedding: Vec<f32>) -> Self {
        let now = Utc::now();
        Self {
            id: Self::record_id(&content_id, sequence_index),
            created_at: now,
            updated_at: now,
            content_id,
            sequence_index: sequence_index as i64,
            text,
            embedding,
        }
    }

    /// Replaces or creates the vector records for a content id.
    ///
    /// `chunks` and `vectors` must be parallel; a length mismatch is a
    /// caller bug and is rejected before any write. Vector dimensions must
    /// agree with each other, the one invariant the index can check without
    /// knowing the embedder.
    pub async fn upsert_for_content(
        db: &SurrealDbClient,
        content_id: &str,
        chunks: &[String],
        vectors: Vec<Vec<f32>>,
    ) -> Result<usize, AppError> {
        if chunks.len() != vectors.len() {
            return Err(AppError::Validation(format!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let expected_dimension = vectors.first().map(Vec::len);
        if let Some(dimension) = expected_dimension {
            if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
                return Err(AppError::InternalError(format!(
                    "inconsistent embedding dimensions: expected {dimension}, got {}",
                    bad.len()
                )));
            }
        }

        let count = chunks.len();
        for (sequence_index, (chunk, embedding)) in
            chunks.iter().zip(vectors.into_iter()).enumerate()
        {
            let record = VectorRecord::new(
                content_id.to_owned(),
                sequence_index,
                chunk.clone(),
                embedding,
            );
            db.upsert_item(record).await?;
        }

        debug!(content_id, count, "Upserted vector records");
        Ok(count)
    }

    /// Lightweight existence probe: one indexed row, not a scan.
    pub async fn exists(db: &SurrealDbClient, content_id: &str) -> Result<bool, AppError> {
        let mut response = db
            .query("SELECT id FROM vector_record WHERE content_id = $content_id LIMIT 1")
            .bind(("content_id", content_id.to_owned()))
            .await?;
        let rows: Vec<IdRow> = response.take(0)?;
        Ok(!rows.is_empty())
    }

    /// Searches within one content id by exact cosine similarity.
    ///
    /// Ties are broken by ascending `sequence_index` so rankings are
    /// reproducible across runs.
    pub async fn search(
        db: &SurrealDbClient,
        content_id: &str,
        query_vector: Vec<f32>,
        take: usize,
    ) -> Result<Vec<RankedChunk>, AppError> {
        let mut response = db
            .query(
                "SELECT id, sequence_index, text,
                        vector::similarity::cosine(embedding, $query) AS score
                 FROM vector_record
                 WHERE content_id = $content_id
                 ORDER BY score DESC, sequence_index ASC
                 LIMIT $take",
            )
            .bind(("query", query_vector))
            .bind(("content_id", content_id.to_owned()))
            .bind(("take", take as i64))
            .await?;

        let chunks: Vec<RankedChunk> = response.take(0)?;
        Ok(chunks)
    }

    /// Full chunk set for a content id; empty when the id is unknown.
    pub async fn all_documents(
        db: &SurrealDbClient,
        content_id: &str,
    ) -> Result<Vec<ChunkDocument>, AppError> {
        let mut response = db
            .query(
                "SELECT id, sequence_index, text FROM vector_record
                 WHERE content_id = $content_id
                 ORDER BY sequence_index ASC",
            )
            .bind(("content_id", content_id.to_owned()))
            .await?;

        let documents: Vec<ChunkDocument> = response.take(0)?;
        Ok(documents)
    }

    /// Removes every record for the content id; no-op when absent.
    pub async fn delete_for_content(
        db: &SurrealDbClient,
        content_id: &str,
    ) -> Result<(), AppError> {
        db.query("DELETE vector_record WHERE content_id = $content_id")
            .bind(("content_id", content_id.to_owned()))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn memory_db() -> SurrealDbClient {
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory("vector_record_tests", database)
            .await
            .expect("Failed to start in-memory surrealdb");
        db.ensure_initialized()
            .await
            .expect("Failed to build indexes");
        db
    }

    fn chunks(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| (*t).to_owned()).collect()
    }

    #[tokio::test]
    async fn upsert_rejects_mismatched_lengths() {
        let db = memory_db().await;
        let result = VectorRecord::upsert_for_content(
            &db,
            "tt1",
            &chunks(&["one", "two"]),
            vec![vec![1.0, 0.0]],
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(!VectorRecord::exists(&db, "tt1").await.expect("probe failed"));
    }

    #[tokio::test]
    async fn upsert_rejects_inconsistent_dimensions() {
        let db = memory_db().await;
        let result = VectorRecord::upsert_for_content(
            &db,
            "tt1",
            &chunks(&["one", "two"]),
            vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]],
        )
        .await;

        assert!(matches!(result, Err(AppError::InternalError(_))));
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_and_breaks_ties_by_sequence() {
        let db = memory_db().await;
        VectorRecord::upsert_for_content(
            &db,
            "tt1",
            &chunks(&["closest", "tie first", "tie second", "far"]),
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![-1.0, 0.0, 0.0],
            ],
        )
        .await
        .expect("upsert failed");

        // Sequences 1 and 2 share a similarity score, so document order
        // decides between them.
        let results = VectorRecord::search(&db, "tt1", vec![1.0, 0.0, 0.0], 4)
            .await
            .expect("search failed");

        let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["closest", "tie first", "tie second", "far"]);
    }

    #[tokio::test]
    async fn search_is_scoped_to_the_content_id() {
        let db = memory_db().await;
        VectorRecord::upsert_for_content(&db, "tt1", &chunks(&["mine"]), vec![vec![1.0, 0.0]])
            .await
            .expect("upsert failed");
        VectorRecord::upsert_for_content(&db, "tt2", &chunks(&["other"]), vec![vec![1.0, 0.0]])
            .await
            .expect("upsert failed");

        let results = VectorRecord::search(&db, "tt1", vec![1.0, 0.0], 10)
            .await
            .expect("search failed");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "mine");
    }

    #[tokio::test]
    async fn repeated_upsert_is_observably_a_no_op() {
        let db = memory_db().await;
        let texts = chunks(&["alpha", "beta"]);
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];

        VectorRecord::upsert_for_content(&db, "tt1", &texts, vectors.clone())
            .await
            .expect("first upsert failed");
        let before = VectorRecord::search(&db, "tt1", vec![1.0, 0.0], 10)
            .await
            .expect("search failed");

        VectorRecord::upsert_for_content(&db, "tt1", &texts, vectors)
            .await
            .expect("second upsert failed");
        let after = VectorRecord::search(&db, "tt1", vec![1.0, 0.0], 10)
            .await
            .expect("search failed");

        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.text, b.text);
        }
        let documents = VectorRecord::all_documents(&db, "tt1")
            .await
            .expect("listing failed");
        assert_eq!(documents.len(), 2);
    }

    #[tokio::test]
    async fn unknown_content_id_yields_empty_listings() {
        let db = memory_db().await;
        assert!(!VectorRecord::exists(&db, "missing")
            .await
            .expect("probe failed"));
        let documents = VectorRecord::all_documents(&db, "missing")
            .await
            .expect("listing failed");
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_all_records_for_the_id() {
        let db = memory_db().await;
        VectorRecord::upsert_for_content(
            &db,
            "tt1",
            &chunks(&["a", "b"]),
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .await
        .expect("upsert failed");

        VectorRecord::delete_for_content(&db, "tt1")
            .await
            .expect("delete failed");
        assert!(!VectorRecord::exists(&db, "tt1").await.expect("probe failed"));

        // Deleting an absent id is a no-op, not an error.
        VectorRecord::delete_for_content(&db, "tt1")
            .await
            .expect("second delete failed");
    }
}
