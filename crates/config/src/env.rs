use praxis_common::error::{PraxisError, PraxisResult};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    /// Seconds between orchestrator ticks.
    pub sync_interval_secs: u64,
    /// Run a single tick and exit (cron-style deployment).
    pub run_once: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> PraxisResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_var("DATABASE_URL")?,
            log_level: get_var_or("LOG_LEVEL", "info"),
            sync_interval_secs: get_var_or("SYNC_INTERVAL_SECS", "300")
                .parse()
                .map_err(|e| PraxisError::Config(format!("invalid SYNC_INTERVAL_SECS: {e}")))?,
            run_once: get_var_or("SYNC_RUN_ONCE", "false")
                .parse()
                .map_err(|e| PraxisError::Config(format!("invalid SYNC_RUN_ONCE: {e}")))?,
        })
    }
}

fn get_var(key: &str) -> PraxisResult<String> {
    env::var(key).map_err(|_| PraxisError::Config(format!("{key} is required but not set")))
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}
