//! Error-to-HTTP mapping (§6/§7): every handler returns `ApiResult<T>`;
//! [`ApiError`] is the single place a [`WorkflowError`] becomes a
//! status code and the `{success, message, code, details}` body.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::Value;

use workflow_engine_core::error::WorkflowError;

#[derive(Debug)]
pub struct ApiError(pub WorkflowError);

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    code: &'static str,
    details: Option<Value>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            WorkflowError::ValidationError { .. }
            | WorkflowError::CycleDetected { .. }
            | WorkflowError::SerializationError { .. }
            | WorkflowError::DeserializationError { .. }
            | WorkflowError::InvalidStateTransition { .. } => StatusCode::BAD_REQUEST,
            WorkflowError::AuthorizationError { .. } => StatusCode::FORBIDDEN,
            WorkflowError::NotFoundError { .. } => StatusCode::NOT_FOUND,
            WorkflowError::ConflictError { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let code = match &self.0 {
            WorkflowError::ValidationError { .. } | WorkflowError::InvalidStateTransition { .. } => "validation_error",
            WorkflowError::AuthorizationError { .. } => "not_authorised",
            WorkflowError::NotFoundError { .. } => "not_found",
            WorkflowError::ConflictError { .. } => "conflict",
            WorkflowError::CycleDetected { .. } => "cycle_detected",
            WorkflowError::TransientExternalError { .. } => "transient_external",
            WorkflowError::InternalConsistencyError { .. } => "internal_consistency",
            WorkflowError::DataParseError { .. } => "data_parse",
            _ => "internal_error",
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            success: false,
            message: self.0.to_string(),
            code,
            details: None,
        })
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        Self(err)
    }
}

impl From<workflow_engine_store::StoreError> for ApiError {
    fn from(err: workflow_engine_store::StoreError) -> Self {
        Self(err.into())
    }
}

impl From<workflow_engine_tasks::TaskServiceError> for ApiError {
    fn from(err: workflow_engine_tasks::TaskServiceError) -> Self {
        Self(err.into())
    }
}

impl From<workflow_engine_subdivision::SubdivisionServiceError> for ApiError {
    fn from(err: workflow_engine_subdivision::SubdivisionServiceError) -> Self {
        Self(err.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError(WorkflowError::not_found("x"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn authorisation_maps_to_403() {
        let err = ApiError(WorkflowError::not_authorised("x"));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn conflict_maps_to_409() {
        let err = ApiError(WorkflowError::conflict("x"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn transient_maps_to_500() {
        let err = ApiError(WorkflowError::transient("x"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_state_transition_maps_to_400() {
        let err = ApiError(WorkflowError::InvalidStateTransition {
            entity: "task".into(),
            from: "completed".into(),
            to: "completed".into(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
