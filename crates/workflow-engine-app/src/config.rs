//! Environment-driven application configuration, replacing unchecked
//! `.expect()` calls with a validated [`AppConfig::from_env`].

use std::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var_name}: {value}")]
    InvalidEnvVar { var_name: String, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_db_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = Self::parse_env_var("PORT", 8080)?;
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;
        let max_db_connections = Self::parse_env_var("MAX_DB_CONNECTIONS", 10)?;

        Ok(Self { host, port, database_url, max_db_connections })
    }

    fn parse_env_var<T>(var_name: &str, default_value: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
    {
        match env::var(var_name) {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidEnvVar { var_name: var_name.to_string(), value }),
            Err(_) => Ok(default_value),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn missing_database_url_is_reported() {
        env::remove_var("DATABASE_URL");
        let result = AppConfig::from_env();
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(var)) if var == "DATABASE_URL"));
    }

    #[test]
    #[serial]
    fn invalid_port_is_reported() {
        env::set_var("DATABASE_URL", "postgres://localhost/test");
        env::set_var("PORT", "not-a-port");
        let result = AppConfig::from_env();
        env::remove_var("PORT");
        env::remove_var("DATABASE_URL");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar { var_name, .. }) if var_name == "PORT"));
    }

    #[test]
    #[serial]
    fn defaults_apply_when_optional_vars_are_unset() {
        env::set_var("DATABASE_URL", "postgres://localhost/test");
        env::remove_var("HOST");
        env::remove_var("PORT");
        let config = AppConfig::from_env().unwrap();
        env::remove_var("DATABASE_URL");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
    }
}
