//! Health and capability negotiation endpoint

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use utoipa::ToSchema;

use crate::core::constants::PROTOCOL_VERSION;
use crate::domain::traces::{SUPPORTED_FRAMEWORKS, SUPPORTED_LANGUAGES};

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub protocol_version: &'static str,
    #[schema(value_type = Vec<String>)]
    pub supported_languages: &'static [&'static str],
    #[schema(value_type = Vec<String>)]
    pub supported_frameworks: &'static [&'static str],
}

/// Health check with client capability negotiation
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service status with supported language/framework identifiers", body = HealthResponse)
    )
)]
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            protocol_version: PROTOCOL_VERSION,
            supported_languages: SUPPORTED_LANGUAGES,
            supported_frameworks: SUPPORTED_FRAMEWORKS,
        }),
    )
}
