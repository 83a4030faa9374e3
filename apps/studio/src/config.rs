use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::models::preview::PreviewFormat;

/// Client configuration loaded from environment variables.
/// Every value has a default; invalid values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub request_timeout: Duration,
    pub preview_format: PreviewFormat,
    pub output_dir: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let timeout_secs = env_or("STUDIO_TIMEOUT_SECS", "120")
            .parse::<u64>()
            .context("STUDIO_TIMEOUT_SECS must be a whole number of seconds")?;

        let preview_format = env_or("STUDIO_PREVIEW_FORMAT", "svg")
            .parse::<PreviewFormat>()
            .context("STUDIO_PREVIEW_FORMAT must be 'svg' or 'pdf'")?;

        Ok(Config {
            backend_url: env_or("STUDIO_BACKEND_URL", "http://localhost:8000"),
            request_timeout: Duration::from_secs(timeout_secs),
            preview_format,
            output_dir: PathBuf::from(env_or("STUDIO_OUTPUT_DIR", ".")),
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
