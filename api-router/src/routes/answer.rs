use std::pin::Pin;

use async_stream::stream;
use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
    Json,
};
use futures::{stream::once, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use common::utils::chat::ChatTokenStream;
use retrieval_pipeline::{
    answer::{answer_stream, get_answer},
    RetrievalConfig,
};

use crate::{api_state::ApiState, error::ApiError};

pub(crate) type EventStream = Pin<Box<dyn Stream<Item = Result<Event, axum::Error>> + Send>>;

/// Single error event followed by end-of-stream, for preconditions that
/// fail before any token is produced.
pub(crate) fn create_error_stream(message: impl Into<String>) -> EventStream {
    let message = message.into();
    once(async move { Event::default().json_data(json!({ "type": "error", "message": message })) })
        .boxed()
}

/// Wraps model fragments as `token` events and closes with a `done`
/// event. A mid-stream failure becomes a terminal `error` event.
pub(crate) fn token_events(tokens: ChatTokenStream) -> EventStream {
    stream! {
        let mut tokens = tokens;
        while let Some(fragment) = tokens.next().await {
            match fragment {
                Ok(token) => {
                    yield Event::default().json_data(json!({ "type": "token", "token": token }));
                }
                Err(e) => {
                    let message = ApiError::from(e).to_string();
                    yield Event::default().json_data(json!({ "type": "error", "message": message }));
                    return;
                }
            }
        }
        yield Event::default().json_data(json!({ "type": "done" }));
    }
    .boxed()
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub content_id: String,
    pub question: String,
}

/// Batch question answering over an existing index.
pub async fn answer_question(
    State(state): State<ApiState>,
    Json(input): Json<AnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(content_id = %input.content_id, "Received answer request");

    let answer = get_answer(
        &state.db,
        &state.embedder,
        &state.chat,
        &input.content_id,
        &input.question,
        RetrievalConfig::with_take(state.config.retrieval_take),
    )
    .await?;

    Ok(Json(json!({ "answer": answer })))
}

#[derive(Debug, Deserialize)]
pub struct AnswerStreamParams {
    pub content_id: String,
    pub question: String,
}

/// Streaming variant: token events over SSE. Precondition failures are
/// reported as a single `error` event so the client always gets a
/// well-formed stream.
pub async fn stream_answer(
    State(state): State<ApiState>,
    Query(params): Query<AnswerStreamParams>,
) -> Sse<EventStream> {
    info!(content_id = %params.content_id, "Received streaming answer request");

    let events = match answer_stream(
        &state.db,
        &state.embedder,
        &state.chat,
        &params.content_id,
        &params.question,
        RetrievalConfig::with_take(state.config.retrieval_take),
    )
    .await
    {
        Ok(tokens) => token_events(tokens),
        Err(e) => create_error_stream(ApiError::from(e).to_string()),
    };

    Sse::new(events).keep_alive(KeepAlive::default())
}
