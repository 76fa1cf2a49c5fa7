use axum::{
    extract::State,
    response::{sse::KeepAlive, Sse},
    Json,
};
use serde::Deserialize;
use tracing::info;

use retrieval_pipeline::summary::generate_summary_stream;

use crate::{api_state::ApiState, error::ApiError};

use super::answer::{create_error_stream, token_events, EventStream};

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub content_id: String,
    pub title: String,
}

/// Streams a narrated summary of a whole transcript. The dialogue is
/// fetched directly from the transcript source; no index is required.
pub async fn stream_summary(
    State(state): State<ApiState>,
    Json(input): Json<SummaryRequest>,
) -> Sse<EventStream> {
    info!(content_id = %input.content_id, "Received summary request");

    let dialogue = match state
        .transcripts
        .fetch_dialogue(&input.content_id, &input.title)
        .await
    {
        Ok(dialogue) if !dialogue.trim().is_empty() => dialogue,
        Ok(_) => {
            return Sse::new(create_error_stream(format!(
                "no dialogue found for content id '{}'",
                input.content_id
            )))
            .keep_alive(KeepAlive::default());
        }
        Err(e) => {
            return Sse::new(create_error_stream(ApiError::from(e).to_string()))
                .keep_alive(KeepAlive::default());
        }
    };

    let events = match generate_summary_stream(&state.chat, &dialogue).await {
        Ok(tokens) => token_events(tokens),
        Err(e) => create_error_stream(ApiError::from(e).to_string()),
    };

    Sse::new(events).keep_alive(KeepAlive::default())
}
