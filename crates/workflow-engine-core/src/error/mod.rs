//! # Comprehensive Error Handling Framework
//!
//! - Structured error types with categorization (`types`)
//! - Retry logic with exponential backoff (`retry`)
//! - Circuit breaker pattern for external services (`circuit_breaker`)
//! - Error context and correlation tracking (`context`)
//! - Recovery strategies and fallback mechanisms (`recovery`)

pub mod circuit_breaker;
pub mod context;
pub mod recovery;
pub mod retry;
pub mod types;

// Re-export core types
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use context::{ErrorContext, ErrorContextExt};
pub use recovery::{with_fallback, with_fallback_fn, CacheRecovery, FallbackValue, RecoveryStrategy};
pub use retry::{retry_with_policy, RetryBuilder, RetryPolicy, RetryableError};
pub use types::{ErrorKind, WorkflowError};

use serde::{Deserialize, Serialize};

/// Error severity levels for monitoring and alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Error categories for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Transient errors that may succeed on retry.
    Transient,
    /// Permanent errors that won't succeed on retry.
    Permanent,
    /// User errors (bad input, validation failures).
    User,
    /// System errors (infrastructure, dependencies).
    System,
}

/// Maps a [`WorkflowError`] onto the coarser transient/permanent/user/system
/// split used by retry and recovery policy, independent of the specific
/// variant.
pub fn categorize_error(error: &WorkflowError) -> (ErrorCategory, ErrorSeverity, String) {
    use types::ErrorKind as K;
    let code = format!("{:?}", error.kind());
    match error.kind() {
        K::Validation => (ErrorCategory::User, ErrorSeverity::Warning, code),
        K::Authorization => (ErrorCategory::User, ErrorSeverity::Warning, code),
        K::NotFound => (ErrorCategory::User, ErrorSeverity::Info, code),
        K::Conflict => (ErrorCategory::System, ErrorSeverity::Error, code),
        K::TransientExternal => (ErrorCategory::Transient, ErrorSeverity::Warning, code),
        K::InternalConsistency => (ErrorCategory::System, ErrorSeverity::Error, code),
        K::DataParse => (ErrorCategory::Permanent, ErrorSeverity::Warning, code),
    }
}

/// Error metadata for enhanced tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMetadata {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub error_code: String,
    pub correlation_id: Option<String>,
    pub context: std::collections::HashMap<String, serde_json::Value>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub retry_count: u32,
}

impl ErrorMetadata {
    pub fn new(category: ErrorCategory, severity: ErrorSeverity, error_code: String) -> Self {
        Self {
            category,
            severity,
            error_code,
            correlation_id: None,
            context: std::collections::HashMap::new(),
            timestamp: chrono::Utc::now(),
            retry_count: 0,
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.context.insert(key.into(), json_value);
        }
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Result type with workflow error.
pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_metadata_builder() {
        let metadata = ErrorMetadata::new(ErrorCategory::Transient, ErrorSeverity::Warning, "TEST_001".to_string())
            .with_context("user_id", "12345")
            .with_correlation_id("req-123");

        assert_eq!(metadata.category, ErrorCategory::Transient);
        assert_eq!(metadata.correlation_id.as_deref(), Some("req-123"));
        assert!(metadata.context.contains_key("user_id"));
    }

    #[test]
    fn categorize_maps_transient_external_to_transient_category() {
        let (category, _, _) = categorize_error(&WorkflowError::transient("db timeout"));
        assert_eq!(category, ErrorCategory::Transient);
    }
}
