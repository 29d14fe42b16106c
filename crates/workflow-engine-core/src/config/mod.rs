//! Configuration management for the workflow engine.
//!
//! Everything is read from the environment once at startup and
//! validated eagerly so a misconfigured deployment fails at boot rather
//! than on the first request.

pub mod error;
pub mod validation;

pub use error::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

/// Top-level configuration for the workflow engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub agents: AgentModelConfig,
    pub bot: BotConfig,
    pub retry: RetryConfig,
    pub simulator: SimulatorConfig,
    pub monitoring: MonitoringConfig,
}

/// Postgres connection settings and pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub connect_timeout_secs: u64,
}

/// HTTP bind address for the API crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

/// Per-agent model API credentials, keyed by the agent's id so each
/// agent processor can carry its own provider and key rather than one
/// global credential (per the environment layout in the external
/// interface section).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentModelConfig {
    pub credentials: HashMap<String, AgentCredential>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCredential {
    pub provider: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

/// Webhook used to notify an IM integration when a human task is
/// created. Defaults to a no-op sink -- the bot/IM integration itself
/// is out of scope, but the core still needs somewhere to point the
/// notification at without special-casing "no bot configured" at every
/// call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub webhook_url: Option<String>,
}

/// The single retry policy shared by every transient-external call
/// site (database, model API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// Default bound on how many weak/strong consult rounds a simulator
/// task runs before it is forced to a terminal decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub max_rounds: u32,
}

/// Logging and metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub prometheus_enabled: bool,
    pub prometheus_port: u16,
}

impl WorkflowConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            api: ApiConfig::from_env()?,
            agents: AgentModelConfig::from_env()?,
            bot: BotConfig::from_env()?,
            retry: RetryConfig::from_env()?,
            simulator: SimulatorConfig::from_env()?,
            monitoring: MonitoringConfig::from_env()?,
        })
    }

    /// Validate the complete configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.api.validate()?;
        self.retry.validate()?;
        self.simulator.validate()?;
        self.monitoring.validate()?;
        Ok(())
    }
}

impl DatabaseConfig {
    fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").map_err(|_| ConfigError::EnvVarNotFound("DATABASE_URL".to_string()))?,
            pool_size: env::var("DATABASE_POOL_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("DATABASE_POOL_SIZE: {e}")))?,
            connect_timeout_secs: env::var("DATABASE_CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("DATABASE_CONNECT_TIMEOUT_SECS: {e}")))?,
        })
    }

    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty_string(&self.url, "database.url")?;
        validation::validate_range(self.pool_size, 1, 256, "database.pool_size")?;
        Ok(())
    }
}

impl ApiConfig {
    fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("PORT: {e}")))?,
        })
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::ValidationFailed("api.port must be greater than 0".to_string()));
        }
        Ok(())
    }
}

impl AgentModelConfig {
    /// Reads `AGENT_MODEL_<ID>_PROVIDER` / `_API_KEY` / `_BASE_URL`
    /// triples for every `AGENT_MODEL_IDS` entry.
    pub fn from_env() -> ConfigResult<Self> {
        let mut credentials = HashMap::new();
        let ids = env::var("AGENT_MODEL_IDS").unwrap_or_default();

        for agent_id in ids.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let key_prefix = agent_id.to_uppercase().replace('-', "_");
            let provider = env::var(format!("AGENT_MODEL_{key_prefix}_PROVIDER"))
                .map_err(|_| ConfigError::EnvVarNotFound(format!("AGENT_MODEL_{key_prefix}_PROVIDER")))?;
            let api_key = env::var(format!("AGENT_MODEL_{key_prefix}_API_KEY"))
                .map_err(|_| ConfigError::EnvVarNotFound(format!("AGENT_MODEL_{key_prefix}_API_KEY")))?;
            let base_url = env::var(format!("AGENT_MODEL_{key_prefix}_BASE_URL")).ok();

            credentials.insert(agent_id.to_string(), AgentCredential { provider, api_key, base_url });
        }

        Ok(Self { credentials })
    }
}

impl BotConfig {
    fn from_env() -> ConfigResult<Self> {
        Ok(Self { webhook_url: env::var("BOT_WEBHOOK_URL").ok() })
    }
}

impl RetryConfig {
    fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            max_attempts: env::var("RETRY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("RETRY_MAX_ATTEMPTS: {e}")))?,
            initial_delay_ms: env::var("RETRY_INITIAL_DELAY_MS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("RETRY_INITIAL_DELAY_MS: {e}")))?,
            max_delay_ms: env::var("RETRY_MAX_DELAY_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("RETRY_MAX_DELAY_MS: {e}")))?,
        })
    }

    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(self.max_attempts, 1, 20, "retry.max_attempts")?;
        Ok(())
    }
}

impl SimulatorConfig {
    fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            max_rounds: env::var("SIMULATOR_MAX_ROUNDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("SIMULATOR_MAX_ROUNDS: {e}")))?,
        })
    }

    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(self.max_rounds, 1, 100, "simulator.max_rounds")?;
        Ok(())
    }
}

impl MonitoringConfig {
    fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            prometheus_enabled: env::var("PROMETHEUS_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            prometheus_port: env::var("PROMETHEUS_PORT")
                .unwrap_or_else(|_| "9090".to_string())
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("PROMETHEUS_PORT: {e}")))?,
        })
    }

    fn validate(&self) -> ConfigResult<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "invalid log level: {}. must be one of: {}",
                self.log_level,
                valid_log_levels.join(", ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_config_requires_non_empty_url() {
        let config = DatabaseConfig { url: String::new(), pool_size: 10, connect_timeout_secs: 5 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_config_rejects_port_zero() {
        let config = ApiConfig { host: "localhost".to_string(), port: 0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_config_rejects_zero_attempts() {
        let config = RetryConfig { max_attempts: 0, initial_delay_ms: 100, max_delay_ms: 1000 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn monitoring_config_rejects_unknown_log_level() {
        let config = MonitoringConfig { log_level: "verbose".to_string(), prometheus_enabled: true, prometheus_port: 9090 };
        assert!(config.validate().is_err());

        let config = MonitoringConfig { log_level: "info".to_string(), prometheus_enabled: true, prometheus_port: 9090 };
        assert!(config.validate().is_ok());
    }
}
