use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use common::storage::types::content_index::{ContentIndex, IndexStatus};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    pub content_id: String,
    pub title: String,
}

/// Requests an index build. Replies `ready` for an already-built index,
/// `processing` in every other case; the build itself runs detached.
pub async fn request_index(
    State(state): State<ApiState>,
    Json(input): Json<IndexRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if input.content_id.trim().is_empty() {
        return Err(ApiError::ValidationError(
            "content_id must not be empty".to_string(),
        ));
    }
    if input.title.trim().is_empty() {
        return Err(ApiError::ValidationError(
            "title must not be empty".to_string(),
        ));
    }

    info!(
        content_id = %input.content_id,
        title = %input.title,
        "Received index request"
    );

    let status = state
        .jobs
        .request_build(&input.content_id, &input.title)
        .await?;

    let label = match status {
        IndexStatus::Completed => "ready",
        _ => "processing",
    };

    Ok((StatusCode::OK, Json(json!({ "status": label }))))
}

/// Current index state for one content id.
pub async fn get_index_status(
    State(state): State<ApiState>,
    Path(content_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let index: Option<ContentIndex> = state.jobs.query_status(&content_id).await?;

    let body = match index {
        Some(index) => json!({
            "exists": true,
            "status": index.status.as_str(),
            "title": index.title,
        }),
        None => json!({
            "exists": false,
            "status": serde_json::Value::Null,
            "title": serde_json::Value::Null,
        }),
    };

    Ok((StatusCode::OK, Json(body)))
}
