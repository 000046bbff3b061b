//! Typed error handling for the dispatch engine
//!
//! Every core operation returns a [`DispatchResult`], so callers can tell a
//! business-rule failure from an infrastructure failure without string
//! matching.
//!
//! # Error Categories
//!
//! - [`ValidationError`]: missing or malformed input the caller must fix
//! - [`EntityError`]: unknown identifiers
//! - [`LifecycleError`]: operation not legal in the current status, or blocked
//!   by a business rule (e.g. open children)
//! - [`DependencyError`]: notifier or blob store unreachable
//! - [`StorageError`]: backend failures
//!
//! # Example
//!
//! ```rust,ignore
//! match engine.close("01012024P000001", images).await {
//!     Ok(work_order) => println!("closed {}", work_order.id),
//!     Err(DispatchError::Lifecycle(LifecycleError::PreconditionFailed { blocking, .. })) => {
//!         println!("still open: {:?}", blocking);
//!     }
//!     Err(e) if e.is_retryable() => eprintln!("try again later: {}", e),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::entities::WorkOrderStatus;

/// The main error type of the dispatch engine
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Input validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unknown identifiers
    #[error(transparent)]
    Entity(#[from] EntityError),

    /// State machine and business-rule violations
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// External collaborator failures
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// Storage backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Broad classification used by callers to decide whether to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The request itself cannot succeed as sent
    Business,
    /// Something outside the request failed; retrying may help
    Infrastructure,
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl DispatchError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
            DispatchError::Entity(e) => e.status_code(),
            DispatchError::Lifecycle(e) => e.status_code(),
            DispatchError::Dependency(_) => StatusCode::BAD_GATEWAY,
            DispatchError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DispatchError::Validation(_) => "VALIDATION_ERROR",
            DispatchError::Entity(e) => e.error_code(),
            DispatchError::Lifecycle(e) => e.error_code(),
            DispatchError::Dependency(_) => "DEPENDENCY_FAILURE",
            DispatchError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            DispatchError::Validation(_)
            | DispatchError::Entity(_)
            | DispatchError::Lifecycle(_) => ErrorClass::Business,
            DispatchError::Dependency(_) | DispatchError::Storage(_) => {
                ErrorClass::Infrastructure
            }
        }
    }

    /// Only infrastructure failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Infrastructure
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    /// Get additional details for the error
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            DispatchError::Entity(EntityError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id,
                }))
            }
            DispatchError::Lifecycle(LifecycleError::InvalidState {
                id,
                status,
                operation,
            }) => Some(serde_json::json!({
                "id": id,
                "status": status,
                "operation": operation,
            })),
            DispatchError::Lifecycle(LifecycleError::PreconditionFailed {
                id, blocking, ..
            }) => Some(serde_json::json!({
                "id": id,
                "blocking": blocking,
            })),
            DispatchError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            DispatchError::Validation(ValidationError::FieldError { field, message }) => {
                Some(serde_json::json!({
                    "fields": [{ "field": field, "message": message }]
                }))
            }
            _ => None,
        }
    }

    /// Shorthand for a single-field validation error
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        DispatchError::Validation(ValidationError::FieldError {
            field: field.into(),
            message: message.into(),
        })
    }

    /// Shorthand for a missing work order
    pub fn work_order_not_found(id: impl Into<String>) -> Self {
        DispatchError::Entity(EntityError::NotFound {
            entity_type: "work_order".to_string(),
            id: id.into(),
        })
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Single field validation error
    #[error("Validation error for field '{field}': {message}")]
    FieldError { field: String, message: String },

    /// Multiple field validation errors
    #[error("Validation errors: {}", join_field_errors(.0))]
    FieldErrors(Vec<FieldValidationError>),

    /// Invalid JSON format
    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument { argument: String },
}

/// A single field validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

fn join_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| FieldValidationError {
                    field: field.to_string(),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field).then(a.message.cmp(&b.message)));
        ValidationError::FieldErrors(fields)
    }
}

impl From<validator::ValidationErrors> for DispatchError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DispatchError::Validation(errors.into())
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity lookup
#[derive(Debug, Error)]
pub enum EntityError {
    /// Entity was not found
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: String },
}

impl EntityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "NOT_FOUND",
        }
    }
}

// =============================================================================
// Lifecycle Errors
// =============================================================================

/// Errors raised by the work order state machine
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The operation is not legal in the current status
    #[error("cannot {operation} work order '{id}' in status {status}")]
    InvalidState {
        id: String,
        status: WorkOrderStatus,
        operation: String,
    },

    /// A business rule blocks the operation
    #[error("{reason} (work order '{id}'{})", blocking_suffix(.blocking))]
    PreconditionFailed {
        id: String,
        reason: String,
        blocking: Vec<String>,
    },
}

fn blocking_suffix(blocking: &[String]) -> String {
    if blocking.is_empty() {
        String::new()
    } else {
        format!("; blocked by: {}", blocking.join(", "))
    }
}

impl LifecycleError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LifecycleError::InvalidState { .. } => StatusCode::CONFLICT,
            LifecycleError::PreconditionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            LifecycleError::InvalidState { .. } => "INVALID_STATE",
            LifecycleError::PreconditionFailed { .. } => "PRECONDITION_FAILED",
        }
    }
}

// =============================================================================
// Dependency Errors
// =============================================================================

/// A collaborator (notifier, blob store) could not be reached
#[derive(Debug, Clone, Error, Serialize)]
#[error("{dependency} unavailable: {message}")]
pub struct DependencyError {
    pub dependency: String,
    pub message: String,
}

impl DependencyError {
    pub fn new(dependency: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            dependency: dependency.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    /// A lock guarding shared state was poisoned by a panicking writer
    #[error("Failed to acquire {what} lock")]
    LockPoisoned { what: String },

    /// Data integrity error
    #[error("Data integrity error: {message}")]
    IntegrityError { message: String },
}

impl StorageError {
    pub fn poisoned(what: &str) -> Self {
        StorageError::LockPoisoned {
            what: what.to_string(),
        }
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;
