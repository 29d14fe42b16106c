//! # `WorkflowError` — the tagged-result type every crate boundary returns.
//!
//! Every failure mode in the engine is one of seven kinds: validation,
//! authorisation, not-found, conflict, transient-external,
//! internal-consistency, and data-parse. Each variant below carries
//! enough context to log usefully and to map to an HTTP status at the
//! API edge without re-deriving the kind from a string.

use thiserror::Error;

/// Primary error type for the workflow execution core.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Malformed input, an impossible state transition, or a missing
    /// required field. Not retried; surfaced to the caller as `400`.
    #[error("validation error: {message}")]
    ValidationError { message: String },

    /// Caller lacks rights over the target object. Not retried; `403`.
    #[error("not authorised: {message}")]
    AuthorizationError { message: String },

    /// An id does not resolve, or the current-version row is missing.
    /// Not retried; `404`.
    #[error("not found: {message}")]
    NotFoundError { message: String },

    /// Duplicate unique key (e.g. two "current" versions of one base
    /// id). Logged as corruption; surfaced as `409`.
    #[error("conflict: {message}")]
    ConflictError { message: String },

    /// DB timeout or model-API 5xx/timeout. Retried with bounded
    /// back-off at the call site; becomes a task failure once the
    /// retry budget is exhausted.
    #[error("transient external error: {message}")]
    TransientExternalError { message: String },

    /// Upstream payload expected but missing, or a dangling reference.
    /// Logged, degraded (e.g. empty upstream context), never fatal.
    #[error("internal consistency error: {message}")]
    InternalConsistencyError { message: String },

    /// Serialised JSON/metadata unreadable. Replaced by defaults;
    /// logged; not retried.
    #[error("data parse error: {message}")]
    DataParseError { message: String },

    /// The workflow definition graph contains a cycle.
    #[error("workflow contains a cycle among nodes: {nodes:?}")]
    CycleDetected { nodes: Vec<String> },

    /// A node instance was asked to run before all of its registered
    /// upstream nodes completed (invariant 2 in the testable-properties
    /// list) -- this should never be observable outside a test.
    #[error("node {node_instance} is not ready: missing upstream {missing:?}")]
    DependencyNotSatisfied {
        node_instance: String,
        missing: Vec<String>,
    },

    /// Requested state transition is not legal from the current state.
    #[error("invalid state transition for {entity}: {from} -> {to}")]
    InvalidStateTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// Failed to serialize a value to JSON for storage or transmission.
    #[error("serialization error: {message}")]
    SerializationError { message: String },

    /// Failed to deserialize a stored JSON value back into a type.
    #[error("deserialization error: {message}")]
    DeserializationError { message: String },

    /// A database operation failed outright (connection, constraint,
    /// pool exhaustion).
    #[error("database error: {message}")]
    DatabaseError { message: String },

    /// An external language-model or IM API call failed.
    #[error("external api error: {message}")]
    ApiError { message: String },

    /// Catch-all for failures that don't fit another category.
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError { message: message.into() }
    }

    pub fn not_authorised(message: impl Into<String>) -> Self {
        Self::AuthorizationError { message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFoundError { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::ConflictError { message: message.into() }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientExternalError { message: message.into() }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::InternalConsistencyError { message: message.into() }
    }

    pub fn data_parse(message: impl Into<String>) -> Self {
        Self::DataParseError { message: message.into() }
    }

    /// Whether a call site should retry this error with back-off
    /// (the "transient external" kind is the only retried category).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientExternalError { .. })
    }

    /// The error kind, used by the API crate to pick an HTTP status and
    /// by the runtime to decide whether a failure is recoverable.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError { .. } => ErrorKind::Validation,
            Self::AuthorizationError { .. } => ErrorKind::Authorization,
            Self::NotFoundError { .. } => ErrorKind::NotFound,
            Self::ConflictError { .. } => ErrorKind::Conflict,
            Self::TransientExternalError { .. } => ErrorKind::TransientExternal,
            Self::InternalConsistencyError { .. } => ErrorKind::InternalConsistency,
            Self::DataParseError { .. } => ErrorKind::DataParse,
            Self::CycleDetected { .. } => ErrorKind::Validation,
            Self::DependencyNotSatisfied { .. } => ErrorKind::InternalConsistency,
            Self::InvalidStateTransition { .. } => ErrorKind::Validation,
            Self::SerializationError { .. } => ErrorKind::DataParse,
            Self::DeserializationError { .. } => ErrorKind::DataParse,
            Self::DatabaseError { .. } => ErrorKind::TransientExternal,
            Self::ApiError { .. } => ErrorKind::TransientExternal,
            Self::InternalError { .. } => ErrorKind::InternalConsistency,
        }
    }
}

/// The error kinds from the error-handling design, used for
/// categorisation independent of the specific variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    TransientExternal,
    InternalConsistency,
    DataParse,
}

#[cfg(feature = "database")]
impl From<diesel::result::Error> for WorkflowError {
    fn from(error: diesel::result::Error) -> Self {
        use diesel::result::Error as DieselError;
        match error {
            DieselError::NotFound => WorkflowError::not_found("row not found"),
            DieselError::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => WorkflowError::conflict(info.message().to_string()),
            other => WorkflowError::DatabaseError { message: other.to_string() },
        }
    }
}

#[cfg(feature = "database")]
impl From<diesel::r2d2::PoolError> for WorkflowError {
    fn from(error: diesel::r2d2::PoolError) -> Self {
        WorkflowError::transient(format!("connection pool error: {error}"))
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(error: serde_json::Error) -> Self {
        WorkflowError::SerializationError { message: error.to_string() }
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(error: reqwest::Error) -> Self {
        WorkflowError::ApiError { message: error.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_is_limited_to_transient_external() {
        assert!(WorkflowError::transient("timeout").is_retryable());
        assert!(!WorkflowError::validation("bad input").is_retryable());
        assert!(!WorkflowError::not_found("missing").is_retryable());
    }

    #[test]
    fn kind_maps_cycle_and_dependency_errors_sensibly() {
        assert_eq!(
            WorkflowError::CycleDetected { nodes: vec!["a".into()] }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            WorkflowError::DependencyNotSatisfied {
                node_instance: "n1".into(),
                missing: vec!["n0".into()]
            }
            .kind(),
            ErrorKind::InternalConsistency
        );
    }
}
