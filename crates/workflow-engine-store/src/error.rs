//! Store-local error type. Every repository method returns
//! [`StoreError`]; the `From` impl maps it onto [`WorkflowError`] at
//! the crate boundary per the seven kinds in the core error taxonomy.

use thiserror::Error;
use workflow_engine_core::error::WorkflowError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("duplicate current version for {entity} base {base_id}")]
    DuplicateCurrentVersion { entity: &'static str, base_id: String },

    #[error("database error: {0}")]
    Database(String),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => WorkflowError::not_found(format!("{entity} {id}")),
            StoreError::DuplicateCurrentVersion { entity, base_id } => {
                WorkflowError::conflict(format!("more than one current version for {entity} base {base_id}"))
            }
            StoreError::Database(message) | StoreError::Pool(message) => WorkflowError::transient(message),
            StoreError::Serde(err) => WorkflowError::data_parse(err.to_string()),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<diesel::r2d2::PoolError> for StoreError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        StoreError::Pool(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
