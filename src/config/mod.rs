//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! Sensitive values wrapped in secrecy::SecretString to prevent log leaks.

pub mod secrets;

use crate::error::{Error, Result};
use crate::worker::{ProbePolicy, WorkerConfig};
use secrecy::SecretString;
use std::time::Duration;

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    /// Seconds passed to `queue_wait`. `None` leaves the engine default.
    pub wait_timeout: Option<Duration>,
    pub probe: ProbePolicy,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let wait_timeout = match std::env::var("Q4M_WAIT_TIMEOUT") {
            Ok(raw) => Some(parse_seconds("Q4M_WAIT_TIMEOUT", &raw)?),
            Err(_) => None,
        };
        let probe = match std::env::var("Q4M_PROBE") {
            Ok(raw) => raw.parse()?,
            Err(_) => ProbePolicy::default(),
        };

        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            wait_timeout,
            probe,
        })
    }

    /// Worker settings derived from this configuration.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            wait_timeout: self.wait_timeout,
            probe: self.probe,
        }
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn parse_seconds(name: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| Error::Config(format!("{name} must be a whole number of seconds: {e}")))
}
