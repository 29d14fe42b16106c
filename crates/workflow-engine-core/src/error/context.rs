//! # Error Context Utilities
//!
//! Utilities for adding rich context to errors: correlation ids,
//! structured metadata, and error chaining. The category/severity split
//! itself lives in [`super::categorize_error`]; this module is about
//! attaching request-scoped context on top of that.

use super::{categorize_error, ErrorMetadata, WorkflowError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Error with additional context.
#[derive(Debug)]
pub struct ErrorContext {
    pub error: WorkflowError,
    pub metadata: ErrorMetadata,
    pub chain: Vec<String>,
}

impl ErrorContext {
    pub fn new(error: WorkflowError) -> Self {
        let (category, severity, code) = categorize_error(&error);
        Self {
            error,
            metadata: ErrorMetadata::new(category, severity, code),
            chain: Vec::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.metadata.context.insert(key.into(), json_value);
        }
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(id.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.chain.push(cause.into());
        self
    }

    pub fn to_json(&self) -> Value {
        json!({
            "error": self.error.to_string(),
            "category": self.metadata.category,
            "severity": self.metadata.severity,
            "code": self.metadata.error_code,
            "correlation_id": self.metadata.correlation_id,
            "context": self.metadata.context,
            "chain": self.chain,
            "timestamp": self.metadata.timestamp,
            "retry_count": self.metadata.retry_count,
        })
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContextExt: Sized {
    fn context(self, key: impl Into<String>, value: impl Serialize) -> ErrorContext;
    fn with_correlation_id(self, id: impl Into<String>) -> ErrorContext;
    fn with_contexts(self, contexts: HashMap<String, Value>) -> ErrorContext;
}

impl ErrorContextExt for WorkflowError {
    fn context(self, key: impl Into<String>, value: impl Serialize) -> ErrorContext {
        ErrorContext::new(self).with_context(key, value)
    }

    fn with_correlation_id(self, id: impl Into<String>) -> ErrorContext {
        ErrorContext::new(self).with_correlation_id(id)
    }

    fn with_contexts(self, contexts: HashMap<String, Value>) -> ErrorContext {
        let mut error_context = ErrorContext::new(self);
        for (key, value) in contexts {
            error_context.metadata.context.insert(key, value);
        }
        error_context
    }
}

/// Correlation id generator -- one per inbound HTTP request or per
/// workflow instance start, threaded through logs for the lifetime of
/// that unit of work.
pub struct CorrelationIdGenerator;

impl CorrelationIdGenerator {
    pub fn generate() -> String {
        use uuid::Uuid;
        format!("req-{}", Uuid::new_v4())
    }

    pub fn generate_with_prefix(prefix: &str) -> String {
        use uuid::Uuid;
        format!("{}-{}", prefix, Uuid::new_v4())
    }
}

/// Context provider trait for extracting context from various sources.
pub trait ContextProvider {
    fn extract_context(&self) -> HashMap<String, Value>;
}

/// Request context for HTTP requests, attached to every log line emitted
/// while handling that request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub path: String,
    pub method: String,
}

impl ContextProvider for RequestContext {
    fn extract_context(&self) -> HashMap<String, Value> {
        let mut context = HashMap::new();
        context.insert("request_id".to_string(), json!(self.request_id));
        context.insert("path".to_string(), json!(self.path));
        context.insert("method".to_string(), json!(self.method));

        if let Some(ref user_id) = self.user_id {
            context.insert("user_id".to_string(), json!(user_id));
        }
        if let Some(ref session_id) = self.session_id {
            context.insert("session_id".to_string(), json!(session_id));
        }
        if let Some(ref ip) = self.ip_address {
            context.insert("ip_address".to_string(), json!(ip));
        }
        if let Some(ref ua) = self.user_agent {
            context.insert("user_agent".to_string(), json!(ua));
        }

        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCategory, ErrorSeverity};

    #[test]
    fn error_context_carries_correlation_and_cause() {
        let context = ErrorContext::new(WorkflowError::validation("bad input"))
            .with_context("user_id", "12345")
            .with_correlation_id("req-123")
            .with_cause("network timeout upstream");

        assert_eq!(context.metadata.correlation_id.as_deref(), Some("req-123"));
        assert_eq!(context.chain.len(), 1);
        assert_eq!(context.metadata.context.get("user_id"), Some(&json!("12345")));
    }

    #[test]
    fn transient_errors_categorize_as_transient() {
        let (category, severity, _) = categorize_error(&WorkflowError::ApiError {
            message: "service unavailable".to_string(),
        });
        assert_eq!(category, ErrorCategory::Transient);
        assert_eq!(severity, ErrorSeverity::Warning);
    }

    #[test]
    fn request_context_extracts_expected_fields() {
        let request_ctx = RequestContext {
            request_id: "req-123".to_string(),
            user_id: Some("user-456".to_string()),
            session_id: None,
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: None,
            path: "/api/v1/workflows/execute".to_string(),
            method: "POST".to_string(),
        };

        let context = request_ctx.extract_context();
        assert_eq!(context.get("request_id"), Some(&json!("req-123")));
        assert_eq!(context.get("user_id"), Some(&json!("user-456")));
        assert!(context.get("session_id").is_none());
    }
}
