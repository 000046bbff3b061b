//! Axum extractor for validated payloads
//!
//! `Validated<T>` parses the JSON body, runs the payload filters, deserializes
//! into `T` and runs its `validator` rules. Failures come back as
//! [`DispatchError`] responses, so clients see the same error shape everywhere.

use axum::{
    Json,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use super::filters::normalize_payload;
use crate::core::error::{DispatchError, ValidationError};

/// Axum extractor that filters and validates a JSON payload
///
/// ```rust,ignore
/// pub async fn create_work_order(
///     State(state): State<AppState>,
///     Validated(payload): Validated<NewWorkOrder>,
/// ) -> DispatchResult<Json<WorkOrder>> { .. }
/// ```
pub struct Validated<T>(pub T);

impl<T> Validated<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Validated<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Filter, deserialize and validate a raw payload
pub fn validate_payload<T>(payload: Value) -> Result<T, DispatchError>
where
    T: DeserializeOwned + Validate,
{
    let payload = normalize_payload(payload).map_err(|e| {
        DispatchError::Validation(ValidationError::InvalidJson {
            message: e.to_string(),
        })
    })?;
    let value: T = serde_json::from_value(payload)?;
    value.validate()?;
    Ok(value)
}

impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload): Json<Value> = Json::from_request(req, state).await.map_err(|e| {
            DispatchError::Validation(ValidationError::InvalidJson {
                message: e.body_text(),
            })
            .into_response()
        })?;

        validate_payload(payload)
            .map(Validated)
            .map_err(IntoResponse::into_response)
    }
}
