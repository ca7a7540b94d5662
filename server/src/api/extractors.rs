//! Validation extractors for API routes

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use super::types::ApiError;

/// JSON body extractor that also runs `validator` derive rules.
///
/// Returns a structured 400 for both malformed JSON and rule violations.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request("INVALID_JSON", e.body_text()))?;

        value
            .validate()
            .map_err(|e| ApiError::bad_request("INVALID_REQUEST", e.to_string()))?;

        Ok(Self(value))
    }
}
