use std::time::Duration;

use thiserror::Error;

const DEFAULT_COMPLETION_URL: &str = "https://text.pollinations.ai/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

/// Runtime configuration, read once at startup and injected into each
/// component. Timeouts bound the three upstream calls independently.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub supabase_url: String,
    pub supabase_key: String,
    pub completion_url: String,
    pub auth_timeout: Duration,
    pub store_timeout: Duration,
    pub completion_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            bind_addr: std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            supabase_url: std::env::var("SUPABASE_URL")
                .map_err(|_| ConfigError::MissingVar("SUPABASE_URL"))?,
            supabase_key: std::env::var("SUPABASE_KEY")
                .map_err(|_| ConfigError::MissingVar("SUPABASE_KEY"))?,
            completion_url: std::env::var("POLLINATIONS_API_URL")
                .unwrap_or_else(|_| DEFAULT_COMPLETION_URL.to_string()),
            auth_timeout: duration_var("AUTH_TIMEOUT_SECS", 5),
            store_timeout: duration_var("STORE_TIMEOUT_SECS", 10),
            completion_timeout: duration_var("AI_TIMEOUT_SECS", 30),
        })
    }
}

fn duration_var(name: &str, default_secs: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}
