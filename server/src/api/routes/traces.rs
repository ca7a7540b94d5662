//! Trace submission and correlation endpoints
//!
//! Submission handlers always answer 200 with a structured result object;
//! an invalid trace is an expected outcome, not an HTTP error.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use super::super::ApiState;
use super::super::extractors::ValidatedJson;
use super::super::types::ApiError;
use crate::data::types::{SessionPayload, TraceBatch, UniversalTrace};
use crate::domain::traces::correlate::CorrelationGraph;
use crate::domain::traces::detect::{Detection, detect};
use crate::domain::traces::pipeline::{BatchResult, SessionSubmitResult, SubmitResult};

/// Submit one trace
#[utoipa::path(
    post,
    path = "/api/v1/traces",
    tag = "traces",
    responses(
        (status = 200, description = "Structured submission result; success=false carries validation errors or a persistence failure")
    )
)]
pub async fn submit_trace(
    State(state): State<ApiState>,
    Json(trace): Json<UniversalTrace>,
) -> Json<SubmitResult> {
    Json(state.pipeline.submit_trace(trace).await)
}

/// Submit a batch of traces with partial-failure semantics
#[utoipa::path(
    post,
    path = "/api/v1/traces/batch",
    tag = "traces",
    responses(
        (status = 200, description = "Per-trace results; one failing trace does not abort the batch")
    )
)]
pub async fn submit_batch(
    State(state): State<ApiState>,
    Json(batch): Json<TraceBatch>,
) -> Json<BatchResult> {
    Json(state.pipeline.submit_batch(batch).await)
}

/// Submit a whole-session payload
#[utoipa::path(
    post,
    path = "/api/v1/traces/session",
    tag = "traces",
    responses(
        (status = 200, description = "Per-trace results for the session payload")
    )
)]
pub async fn submit_session(
    State(state): State<ApiState>,
    Json(payload): Json<SessionPayload>,
) -> Json<SessionSubmitResult> {
    Json(state.pipeline.submit_session(payload).await)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CorrelateRequest {
    #[serde(alias = "trace_ids")]
    #[validate(length(min = 1, max = 500))]
    pub trace_ids: Vec<String>,
}

/// Reconstruct the correlation graph for a set of trace ids
#[utoipa::path(
    post,
    path = "/api/v1/traces/correlate",
    tag = "traces",
    responses(
        (status = 200, description = "Correlation graph; unknown trace ids are silently omitted"),
        (status = 400, description = "Empty or oversized id list")
    )
)]
pub async fn correlate(
    State(state): State<ApiState>,
    ValidatedJson(request): ValidatedJson<CorrelateRequest>,
) -> Result<Json<CorrelationGraph>, ApiError> {
    let graph = state
        .correlator
        .correlate(&request.trace_ids)
        .await
        .map_err(ApiError::from_store)?;
    Ok(Json(graph))
}

/// Run language/framework detection over a raw trace without ingesting it
#[utoipa::path(
    post,
    path = "/api/v1/traces/detect",
    tag = "traces",
    responses(
        (status = 200, description = "Detected language/framework with confidence and evidence")
    )
)]
pub async fn detect_trace(Json(trace): Json<UniversalTrace>) -> Json<Detection> {
    Json(detect(&trace))
}
