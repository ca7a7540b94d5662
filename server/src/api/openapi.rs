//! OpenAPI document assembly

use axum::Json;
use utoipa::OpenApi;

use super::routes::{health, sessions, traces};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "tracedeck",
        description = "Real-time trace ingestion, correlation, and session broadcast engine"
    ),
    paths(
        health::health,
        traces::submit_trace,
        traces::submit_batch,
        traces::submit_session,
        traces::correlate,
        traces::detect_trace,
        sessions::get_session,
        sessions::get_session_traces,
        sessions::set_session_status,
    ),
    tags(
        (name = "health", description = "Service status and capability negotiation"),
        (name = "traces", description = "Trace submission and correlation"),
        (name = "sessions", description = "Session state and lifecycle"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
