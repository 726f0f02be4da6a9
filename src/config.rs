//! Application configuration.
//!
//! Layers configuration sources in this order:
//! 1. Built-in defaults
//! 2. Default config file (config/default.toml), if present
//! 3. Environment-specific config file (config/{env}.toml), if present
//! 4. Environment variables (APP__*)

use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

const CONFIG_DIR: &str = "config";
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration load error: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database connection URL (no credentials are hardcoded; supply via
    /// APP__DATABASE_URL or a config file).
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    /// Comma-separated list of allowed CORS origins. Absent means permissive
    /// CORS, which suits the internal dashboard deployment.
    pub cors_allowed_origins: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_connect_timeout_secs: u64,
    pub db_acquire_timeout_secs: u64,
    pub db_idle_timeout_secs: u64,
}

impl AppConfig {
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }

    fn validate(&self) -> Result<(), AppConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(AppConfigError::Validation(
                "database_url must not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(AppConfigError::Validation(
                "port must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads application configuration for the environment selected by RUN_ENV
/// (or APP_ENV), defaulting to development.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    let config = Config::builder()
        .set_default(
            "database_url",
            "postgres://localhost:5432/glexport_development",
        )?
        .set_default("host", "127.0.0.1")?
        .set_default("port", 3000)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("db_max_connections", 10)?
        .set_default("db_min_connections", 1)?
        .set_default("db_connect_timeout_secs", 30)?
        .set_default("db_acquire_timeout_secs", 8)?
        .set_default("db_idle_timeout_secs", 600)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

/// Initializes the global tracing subscriber. RUST_LOG overrides the
/// configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("glexport_api={},tower_http=info", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}
