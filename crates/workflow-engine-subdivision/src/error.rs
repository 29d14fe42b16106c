//! Subdivision-service-local error type, mirroring the task services'
//! `TaskServiceError`.

use thiserror::Error;
use workflow_engine_core::error::WorkflowError;

#[derive(Debug, Error)]
pub enum SubdivisionServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{user_id} is not authorised to subdivide task {task_id}")]
    NotAuthorised { user_id: String, task_id: String },

    #[error("invalid sub-workflow definition: {0}")]
    InvalidDefinition(String),

    #[error(transparent)]
    Store(#[from] workflow_engine_store::StoreError),

    #[error(transparent)]
    Core(#[from] WorkflowError),
}

impl From<SubdivisionServiceError> for WorkflowError {
    fn from(err: SubdivisionServiceError) -> Self {
        match err {
            SubdivisionServiceError::NotFound(message) => WorkflowError::not_found(message),
            SubdivisionServiceError::NotAuthorised { user_id, task_id } => {
                WorkflowError::not_authorised(format!("{user_id} is not authorised to subdivide task {task_id}"))
            }
            SubdivisionServiceError::InvalidDefinition(message) => WorkflowError::validation(message),
            SubdivisionServiceError::Store(err) => err.into(),
            SubdivisionServiceError::Core(err) => err,
        }
    }
}

pub type SubdivisionServiceResult<T> = Result<T, SubdivisionServiceError>;
