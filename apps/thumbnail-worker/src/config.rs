use anyhow::{Context, Result};
use std::time::Duration;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    /// Bearer token for backend reads. Unset means "no session".
    pub backend_access_token: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub resume_sync_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            backend_url: require_env("BACKEND_URL")?,
            backend_access_token: std::env::var("BACKEND_ACCESS_TOKEN").ok(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            resume_sync_interval: Duration::from_secs(
                std::env::var("RESUME_SYNC_INTERVAL_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse::<u64>()
                    .context("RESUME_SYNC_INTERVAL_SECS must be a whole number of seconds")?
                    .max(1),
            ),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
