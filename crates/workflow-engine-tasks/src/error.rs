//! Task-service-local error type. Every service method returns
//! [`TaskServiceError`]; the `From` impl maps it onto [`WorkflowError`]
//! at the crate boundary per the seven kinds in the core taxonomy.

use thiserror::Error;
use workflow_engine_core::error::WorkflowError;

#[derive(Debug, Error)]
pub enum TaskServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{user_id} is not authorised to act on task {task_id}")]
    NotAuthorised { user_id: String, task_id: String },

    #[error("illegal task transition: {0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Store(#[from] workflow_engine_store::StoreError),

    #[error(transparent)]
    Core(#[from] WorkflowError),
}

impl From<TaskServiceError> for WorkflowError {
    fn from(err: TaskServiceError) -> Self {
        match err {
            TaskServiceError::NotFound(message) => WorkflowError::not_found(message),
            TaskServiceError::NotAuthorised { user_id, task_id } => {
                WorkflowError::not_authorised(format!("{user_id} is not authorised to act on task {task_id}"))
            }
            TaskServiceError::InvalidTransition(message) => WorkflowError::validation(message),
            TaskServiceError::Store(err) => err.into(),
            TaskServiceError::Core(err) => err,
        }
    }
}

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;
