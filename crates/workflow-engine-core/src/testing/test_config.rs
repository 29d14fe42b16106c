//! Test configuration for running tests without external dependencies.

use once_cell::sync::Lazy;
use std::env;

/// Test environment configuration.
pub struct TestConfig {
    /// Whether to use the in-memory store implementation instead of Postgres.
    pub use_in_memory_store: bool,
    /// Whether to disable external (model API) calls.
    pub disable_external_services: bool,
    /// Test database URL, if not using the in-memory store.
    pub test_database_url: Option<String>,
}

impl TestConfig {
    pub fn from_env() -> Self {
        Self {
            use_in_memory_store: env::var("TEST_USE_IN_MEMORY_STORE")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            disable_external_services: env::var("TEST_DISABLE_EXTERNAL_SERVICES")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            test_database_url: env::var("TEST_DATABASE_URL").ok(),
        }
    }

    pub fn is_ci() -> bool {
        env::var("CI").is_ok() || env::var("GITHUB_ACTIONS").is_ok()
    }

    pub fn skip_integration_tests() -> bool {
        env::var("SKIP_INTEGRATION_TESTS").unwrap_or_else(|_| "false".to_string()).parse().unwrap_or(false)
    }
}

/// Global test configuration.
pub static TEST_CONFIG: Lazy<TestConfig> = Lazy::new(TestConfig::from_env);

/// Skip a test that requires external services when they are disabled.
#[macro_export]
macro_rules! skip_without_external_services {
    () => {
        if $crate::testing::test_config::TEST_CONFIG.disable_external_services {
            eprintln!("skipping test that requires external services");
            return;
        }
    };
}

/// Skip a test when running in CI.
#[macro_export]
macro_rules! skip_in_ci {
    () => {
        if $crate::testing::test_config::TestConfig::is_ci() {
            eprintln!("skipping test in CI environment");
            return;
        }
    };
}
