use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

/// Lifecycle of a per-content build job.
///
/// Transitions are monotone with one exception: a `Pending` or `Failed`
/// index may be claimed back to `Processing` by a retry request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl IndexStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexStatus::Pending => "pending",
            IndexStatus::Processing => "processing",
            IndexStatus::Completed => "completed",
            IndexStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, IndexStatus::Completed | IndexStatus::Failed)
    }
}

stored_object!(ContentIndex, "content_index", {
    title: String,
    status: IndexStatus,
    #[serde(default)]
    error_message: Option<String>
});

impl ContentIndex {
    /// The record id doubles as the content id, which enforces at most one
    /// index per content item.
    pub fn new(content_id: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: content_id,
            created_at: now,
            updated_at: now,
            title,
            status: IndexStatus::Pending,
            error_message: None,
        }
    }

    /// Creates the record as `Pending` if it does not exist yet. A
    /// concurrent creation of the same id is tolerated and treated as
    /// success; the subsequent claim decides who schedules the build.
    pub async fn ensure_exists(
        content_id: &str,
        title: &str,
        db: &SurrealDbClient,
    ) -> Result<(), AppError> {
        let index = Self::new(content_id.to_owned(), title.to_owned());
        match db.store_item(index).await {
            Ok(_) => Ok(()),
            Err(e) => {
                if db.get_item::<Self>(content_id).await?.is_some() {
                    Ok(())
                } else {
                    Err(AppError::Database(e))
                }
            }
        }
    }

    /// Atomically claims the index for processing.
    ///
    /// The read-and-transition is a single conditional update, so of two
    /// callers racing on a `Pending` or `Failed` index exactly one observes
    /// the prior state and wins the claim. Returns `true` for the winner.
    pub async fn try_claim_for_processing(
        content_id: &str,
        db: &SurrealDbClient,
    ) -> Result<bool, AppError> {
        let mut response = db
            .query(
                "UPDATE type::thing($table, $id)
                 SET status = $processing, error_message = NONE, updated_at = time::now()
                 WHERE status IN $claimable
                 RETURN AFTER",
            )
            .bind(("table", Self::table_name()))
            .bind(("id", content_id.to_owned()))
            .bind(("processing", IndexStatus::Processing.as_str()))
            .bind((
                "claimable",
                vec![
                    IndexStatus::Pending.as_str(),
                    IndexStatus::Failed.as_str(),
                ],
            ))
            .await?;

        let claimed: Vec<ContentIndex> = response.take(0)?;
        Ok(!claimed.is_empty())
    }

    /// Marks a processing build as completed. Guarded on the current status
    /// so a stale build task cannot overwrite a later state.
    pub async fn mark_completed(content_id: &str, db: &SurrealDbClient) -> Result<(), AppError> {
        db.query(
            "UPDATE type::thing($table, $id)
             SET status = $completed, error_message = NONE, updated_at = time::now()
             WHERE status = $processing",
        )
        .bind(("table", Self::table_name()))
        .bind(("id", content_id.to_owned()))
        .bind(("completed", IndexStatus::Completed.as_str()))
        .bind(("processing", IndexStatus::Processing.as_str()))
        .await?;
        Ok(())
    }

    /// Records a build failure with its causing error message. The message
    /// is the retry surface for callers; it must never be empty.
    pub async fn mark_failed(
        content_id: &str,
        reason: &str,
        db: &SurrealDbClient,
    ) -> Result<(), AppError> {
        let reason = if reason.trim().is_empty() {
            "unknown build failure".to_owned()
        } else {
            reason.to_owned()
        };
        db.query(
            "UPDATE type::thing($table, $id)
             SET status = $failed, error_message = $reason, updated_at = time::now()
             WHERE status = $processing",
        )
        .bind(("table", Self::table_name()))
        .bind(("id", content_id.to_owned()))
        .bind(("failed", IndexStatus::Failed.as_str()))
        .bind(("reason", reason))
        .bind(("processing", IndexStatus::Processing.as_str()))
        .await?;
        Ok(())
    }
}
