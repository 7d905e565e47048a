//! Endpoint validation filter.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use validator::Validate;

use crate::error::ApiError;
use crate::validation::ValidationErrors;

/// JSON body that has passed its validation rules.
///
/// Extraction short-circuits with a 400 problem document when the body cannot
/// be decoded or any `validator` rule fails, so the handler never sees invalid input.
#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Validated<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        if let Err(report) = value.validate() {
            let errors = ValidationErrors::from(report);
            debug!(violations = errors.len(), "Request failed validation");
            return Err(ApiError::Validation(errors));
        }
        Ok(Self(value))
    }
}
