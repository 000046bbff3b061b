//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error responses carry the unmet precondition
//! - Business and infrastructure failures are told apart

use axum::http::StatusCode;
use axum::response::IntoResponse;
use dispatch::core::error::{
    DependencyError, DispatchError, EntityError, ErrorClass, LifecycleError, StorageError,
    ValidationError,
};
use dispatch::entities::WorkOrderStatus;

fn invalid_state() -> DispatchError {
    LifecycleError::InvalidState {
        id: "01012024P000001".to_string(),
        status: WorkOrderStatus::Closed,
        operation: "assign".to_string(),
    }
    .into()
}

fn open_children() -> DispatchError {
    LifecycleError::PreconditionFailed {
        id: "01012024P000001".to_string(),
        reason: "open children exist".to_string(),
        blocking: vec!["01012024W000002 (OPEN)".to_string()],
    }
    .into()
}

mod status_code_tests {
    use super::*;

    #[test]
    fn test_not_found_returns_404() {
        let err = DispatchError::Entity(EntityError::NotFound {
            entity_type: "contractor".to_string(),
            id: "c-9".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_validation_returns_400() {
        let err = DispatchError::field("closing_images", "closing evidence required");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let err: DispatchError = ValidationError::MissingArgument {
            argument: "type".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_invalid_state_returns_409() {
        assert_eq!(invalid_state().status_code(), StatusCode::CONFLICT);
        assert_eq!(invalid_state().error_code(), "INVALID_STATE");
    }

    #[test]
    fn test_precondition_failed_returns_422() {
        assert_eq!(open_children().status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(open_children().error_code(), "PRECONDITION_FAILED");
    }

    #[test]
    fn test_dependency_returns_502() {
        let err: DispatchError = DependencyError::new("blob store", "unreachable").into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_code(), "DEPENDENCY_FAILURE");
    }

    #[test]
    fn test_storage_returns_500() {
        let err: DispatchError = StorageError::poisoned("work order").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

mod classification_tests {
    use super::*;

    #[test]
    fn test_business_errors_are_not_retryable() {
        for err in [
            invalid_state(),
            open_children(),
            DispatchError::work_order_not_found("x"),
            DispatchError::field("area", "must not be blank"),
        ] {
            assert_eq!(err.class(), ErrorClass::Business);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_infrastructure_errors_are_retryable() {
        let dependency: DispatchError = DependencyError::new("smtp", "timeout").into();
        let storage: DispatchError = StorageError::IntegrityError {
            message: "corrupt".to_string(),
        }
        .into();
        assert!(dependency.is_retryable());
        assert!(storage.is_retryable());
    }
}

mod response_tests {
    use super::*;

    #[test]
    fn test_precondition_names_blocking_children() {
        let err = open_children();
        assert!(err.to_string().contains("01012024W000002 (OPEN)"));

        let body = err.to_response();
        assert_eq!(body.code, "PRECONDITION_FAILED");
        let details = body.details.unwrap();
        assert_eq!(details["blocking"][0], "01012024W000002 (OPEN)");
    }

    #[test]
    fn test_invalid_state_names_status_and_operation() {
        let err = invalid_state();
        assert_eq!(
            err.to_string(),
            "cannot assign work order '01012024P000001' in status CLOSED"
        );
        let details = err.to_response().details.unwrap();
        assert_eq!(details["status"], "CLOSED");
        assert_eq!(details["operation"], "assign");
    }

    #[test]
    fn test_into_response_sets_status() {
        let response = open_children().into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_json_errors_become_validation_errors() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: DispatchError = parse.unwrap_err().into();
        assert!(matches!(
            err,
            DispatchError::Validation(ValidationError::InvalidJson { .. })
        ));
    }
}
