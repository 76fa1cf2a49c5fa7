use api_state::ApiState;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use routes::{
    answer::{answer_question, stream_answer},
    indexing::{get_index_status, request_index},
    liveness::live,
    readiness::ready,
    summary::stream_summary,
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Probe endpoints (for k8s/systemd probes)
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let api = Router::new()
        .route("/index", post(request_index))
        .route("/index/{content_id}", get(get_index_status))
        .route("/answer", post(answer_question))
        .route("/answer/stream", get(stream_answer))
        .route("/summary/stream", post(stream_summary));

    probes.merge(api)
}
