//! # Error Recovery and Fallback Mechanisms
//!
//! Strategies for graceful degradation: fallback values, alternative
//! operations, and cache-backed recovery.

use super::WorkflowError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;

/// Recovery strategy for handling errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RecoveryStrategy {
    /// Return a fallback value.
    Fallback(Value),
    /// Retry with modified parameters.
    RetryWithModification,
    /// Use cached result.
    UseCache,
    /// Degrade to simpler operation.
    Degrade,
    /// Fail fast.
    FailFast,
    /// Custom recovery logic.
    Custom(String),
}

/// Trait for types that can provide fallback values.
pub trait FallbackValue {
    fn fallback() -> Self;
}

impl FallbackValue for String {
    fn fallback() -> Self {
        String::new()
    }
}

impl FallbackValue for Value {
    fn fallback() -> Self {
        Value::Null
    }
}

impl<T: Default> FallbackValue for Vec<T> {
    fn fallback() -> Self {
        Vec::new()
    }
}

impl<T: FallbackValue> FallbackValue for Option<T> {
    fn fallback() -> Self {
        None
    }
}

/// Recovery context for error handling.
#[derive(Debug)]
pub struct RecoveryContext {
    pub error: WorkflowError,
    pub attempt: u32,
    pub strategy: RecoveryStrategy,
    pub context: std::collections::HashMap<String, Value>,
}

impl RecoveryContext {
    pub fn new(error: WorkflowError) -> Self {
        Self {
            error,
            attempt: 0,
            strategy: RecoveryStrategy::FailFast,
            context: std::collections::HashMap::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: RecoveryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.context.insert(key.into(), json_value);
        }
        self
    }
}

/// Execute an operation, substituting a fixed fallback value on failure.
pub async fn with_fallback<F, Fut, T>(operation: F, fallback: T) -> T
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, WorkflowError>>,
{
    match operation().await {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(error = %error, "operation failed, using fallback value");
            fallback
        }
    }
}

/// Execute an operation, calling a fallback function with the error on failure.
pub async fn with_fallback_fn<F, Fut, G, T>(operation: F, fallback_fn: G) -> Result<T, WorkflowError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, WorkflowError>>,
    G: FnOnce(WorkflowError) -> Result<T, WorkflowError>,
{
    match operation().await {
        Ok(value) => Ok(value),
        Err(error) => {
            tracing::warn!(error = %error, "operation failed, attempting fallback");
            fallback_fn(error)
        }
    }
}

/// Recovery handler trait.
pub trait RecoveryHandler: Send + Sync {
    fn handle_recovery(&self, context: &RecoveryContext) -> RecoveryStrategy;
    fn should_recover(&self, error: &WorkflowError) -> bool;
}

/// Default recovery handler: retries transient-external failures a few
/// times then falls back to cache, fails fast on validation errors, and
/// degrades everything else.
pub struct DefaultRecoveryHandler;

impl RecoveryHandler for DefaultRecoveryHandler {
    fn handle_recovery(&self, context: &RecoveryContext) -> RecoveryStrategy {
        match &context.error {
            WorkflowError::ApiError { .. } | WorkflowError::TransientExternalError { .. } => {
                if context.attempt < 3 {
                    RecoveryStrategy::RetryWithModification
                } else {
                    RecoveryStrategy::UseCache
                }
            }
            WorkflowError::ValidationError { .. } => RecoveryStrategy::FailFast,
            _ => RecoveryStrategy::Degrade,
        }
    }

    fn should_recover(&self, error: &WorkflowError) -> bool {
        !matches!(
            error,
            WorkflowError::CycleDetected { .. }
                | WorkflowError::DependencyNotSatisfied { .. }
                | WorkflowError::InvalidStateTransition { .. }
        )
    }
}

/// Graceful-degradation builder: tries a primary operation, then each
/// fallback in order, returning the first success.
pub struct DegradationBuilder<T> {
    operations: Vec<std::pin::Pin<Box<dyn Future<Output = Result<T, WorkflowError>> + Send>>>,
}

impl<T> Default for DegradationBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DegradationBuilder<T> {
    pub fn new() -> Self {
        Self { operations: Vec::new() }
    }

    pub fn primary<F, Fut>(mut self, operation: F) -> Self
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = Result<T, WorkflowError>> + Send + 'static,
    {
        self.operations.insert(0, Box::pin(operation()));
        self
    }

    pub fn fallback<F, Fut>(mut self, operation: F) -> Self
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = Result<T, WorkflowError>> + Send + 'static,
    {
        self.operations.push(Box::pin(operation()));
        self
    }

    pub async fn execute(self) -> Result<T, WorkflowError> {
        let mut last_error = None;

        for (i, operation) in self.operations.into_iter().enumerate() {
            match operation.await {
                Ok(result) => {
                    if i > 0 {
                        tracing::info!(fallback_level = i, "operation succeeded with degradation");
                    }
                    return Ok(result);
                }
                Err(error) => {
                    tracing::warn!(error = %error, level = i, "operation failed, trying next level");
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| WorkflowError::InternalError {
            message: "all operations failed".to_string(),
        }))
    }
}

/// Cache-based recovery: falls back to the last successful value within
/// a TTL when the live operation fails.
pub struct CacheRecovery<T> {
    cache: std::sync::Arc<tokio::sync::RwLock<std::collections::HashMap<String, (T, std::time::Instant)>>>,
    ttl: std::time::Duration,
}

impl<T: Clone> CacheRecovery<T> {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            cache: std::sync::Arc::new(tokio::sync::RwLock::new(std::collections::HashMap::new())),
            ttl,
        }
    }

    pub async fn execute<F, Fut>(&self, key: &str, operation: F) -> Result<T, WorkflowError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, WorkflowError>>,
    {
        match operation().await {
            Ok(value) => {
                let mut cache = self.cache.write().await;
                cache.insert(key.to_string(), (value.clone(), std::time::Instant::now()));
                Ok(value)
            }
            Err(error) => {
                let cache = self.cache.read().await;
                if let Some((cached_value, timestamp)) = cache.get(key) {
                    if timestamp.elapsed() < self.ttl {
                        tracing::info!(
                            key = key,
                            age_seconds = timestamp.elapsed().as_secs(),
                            "using cached value after error"
                        );
                        return Ok(cached_value.clone());
                    }
                }
                Err(error)
            }
        }
    }

    pub async fn invalidate(&self, key: &str) {
        let mut cache = self.cache.write().await;
        cache.remove(key);
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
    }
}

/// Aggregate counters for recovery outcomes, exposed through the
/// monitoring surface.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecoveryMetrics {
    pub total_recoveries: u64,
    pub successful_recoveries: u64,
    pub failed_recoveries: u64,
    pub fallback_used: u64,
    pub cache_hits: u64,
    pub degradation_used: u64,
}

impl RecoveryMetrics {
    pub fn record_success(&mut self, strategy: &RecoveryStrategy) {
        self.total_recoveries += 1;
        self.successful_recoveries += 1;

        match strategy {
            RecoveryStrategy::Fallback(_) => self.fallback_used += 1,
            RecoveryStrategy::UseCache => self.cache_hits += 1,
            RecoveryStrategy::Degrade => self.degradation_used += 1,
            _ => {}
        }
    }

    pub fn record_failure(&mut self) {
        self.total_recoveries += 1;
        self.failed_recoveries += 1;
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_recoveries == 0 {
            0.0
        } else {
            self.successful_recoveries as f64 / self.total_recoveries as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_fallback_substitutes_value_on_error() {
        let result = with_fallback(
            || async { Err::<String, _>(WorkflowError::ApiError { message: "service unavailable".to_string() }) },
            "fallback_value".to_string(),
        )
        .await;

        assert_eq!(result, "fallback_value");
    }

    #[tokio::test]
    async fn with_fallback_fn_receives_the_error() {
        let result = with_fallback_fn(
            || async { Err::<String, _>(WorkflowError::ApiError { message: "service unavailable".to_string() }) },
            |_error| Ok("recovered_value".to_string()),
        )
        .await;

        assert_eq!(result.unwrap(), "recovered_value");
    }

    #[tokio::test]
    async fn cache_recovery_serves_stale_value_on_failure() {
        let cache = CacheRecovery::new(std::time::Duration::from_secs(60));

        let result = cache.execute("test_key", || async { Ok::<_, WorkflowError>("cached_value".to_string()) }).await;
        assert_eq!(result.unwrap(), "cached_value");

        let result = cache
            .execute("test_key", || async { Err::<String, _>(WorkflowError::ApiError { message: "service error".to_string() }) })
            .await;
        assert_eq!(result.unwrap(), "cached_value");
    }

    #[test]
    fn recovery_metrics_tracks_rate() {
        let mut metrics = RecoveryMetrics::default();

        metrics.record_success(&RecoveryStrategy::Fallback(Value::Null));
        metrics.record_success(&RecoveryStrategy::UseCache);
        metrics.record_failure();

        assert_eq!(metrics.total_recoveries, 3);
        assert_eq!(metrics.successful_recoveries, 2);
        assert_eq!(metrics.failed_recoveries, 1);
        assert_eq!(metrics.fallback_used, 1);
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.success_rate(), 2.0 / 3.0);
    }

    #[test]
    fn default_handler_fails_fast_on_validation_errors() {
        let handler = DefaultRecoveryHandler;
        let context = RecoveryContext::new(WorkflowError::validation("bad input"));
        assert!(matches!(handler.handle_recovery(&context), RecoveryStrategy::FailFast));
        assert!(handler.should_recover(&WorkflowError::validation("bad input")));
        assert!(!handler.should_recover(&WorkflowError::CycleDetected { nodes: vec!["a".into()] }));
    }
}
