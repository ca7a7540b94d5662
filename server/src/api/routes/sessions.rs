//! Session read and lifecycle endpoints

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::super::ApiState;
use super::super::extractors::ValidatedJson;
use super::super::types::ApiError;
use crate::core::constants::SESSION_STATE_MAX_TRACES;
use crate::data::types::{Session, SessionStatus, UniversalTrace};

/// Get session metadata
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}",
    tag = "sessions",
    params(("session_id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session metadata with aggregate counters"),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .registry
        .get_session(&session_id)
        .await
        .map_err(ApiError::from_store)?;

    session.map(Json).ok_or_else(|| {
        ApiError::not_found(
            "SESSION_NOT_FOUND",
            format!("Session not found: {}", session_id),
        )
    })
}

/// Per-language and per-framework trace counts within one session
#[derive(Debug, Default, Serialize)]
pub struct SessionStats {
    pub languages: BTreeMap<String, u64>,
    pub frameworks: BTreeMap<String, u64>,
}

impl SessionStats {
    fn from_traces(traces: &[UniversalTrace]) -> Self {
        let mut stats = Self::default();
        for trace in traces {
            if let Some(language) = trace.language() {
                *stats.languages.entry(language.to_string()).or_default() += 1;
            }
            if let Some(framework) = trace.framework() {
                *stats.frameworks.entry(framework.to_string()).or_default() += 1;
            }
        }
        stats
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTracesResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    pub traces: Vec<UniversalTrace>,
    pub stats: SessionStats,
    pub timestamp: DateTime<Utc>,
}

/// Catch-up over HTTP: the session's current trace list with stats.
///
/// Unknown sessions yield an empty result, not an error.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}/traces",
    tag = "sessions",
    params(("session_id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Current trace list with language/framework stats; empty for unknown sessions")
    )
)]
pub async fn get_session_traces(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionTracesResponse>, ApiError> {
    let session = state
        .registry
        .get_session(&session_id)
        .await
        .map_err(ApiError::from_store)?;
    let traces = state
        .store
        .load_session_traces(&session_id, SESSION_STATE_MAX_TRACES)
        .await
        .map_err(ApiError::from_store)?;

    let stats = SessionStats::from_traces(&traces);
    Ok(Json(SessionTracesResponse {
        session,
        traces,
        stats,
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SessionStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
}

/// Explicit session lifecycle transition (active/completed/archived)
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_id}/status",
    tag = "sessions",
    params(("session_id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Updated session; the room is notified via session_update"),
        (status = 400, description = "Unknown status value"),
        (status = 404, description = "Session not found")
    )
)]
pub async fn set_session_status(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    ValidatedJson(request): ValidatedJson<SessionStatusRequest>,
) -> Result<Json<Session>, ApiError> {
    let status = SessionStatus::parse(&request.status).ok_or_else(|| {
        ApiError::bad_request(
            "INVALID_STATUS",
            format!("Unknown session status: {}", request.status),
        )
    })?;

    let session = state
        .registry
        .set_status(&session_id, status)
        .await
        .map_err(ApiError::from_store)?
        .ok_or_else(|| {
            ApiError::not_found(
                "SESSION_NOT_FOUND",
                format!("Session not found: {}", session_id),
            )
        })?;

    state.gateway.publish_session_update(
        &session_id,
        serde_json::json!({
            "status": session.status,
            "endTime": session.end_time,
        }),
    );

    Ok(Json(session))
}
