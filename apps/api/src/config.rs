use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the template names resolve against.
    pub template_dir: PathBuf,
    /// Frontend build directory; static serving is enabled only when set.
    pub static_dir: Option<PathBuf>,
    /// Shared login password; generation is gated only when set.
    pub auth_password: Option<String>,
    pub session_ttl_hours: i64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            template_dir: PathBuf::from(
                std::env::var("TEMPLATE_DIR").unwrap_or_else(|_| "templates".to_string()),
            ),
            static_dir: std::env::var("STATIC_DIR").ok().map(PathBuf::from),
            auth_password: std::env::var("AUTH_PASSWORD")
                .ok()
                .filter(|password| !password.is_empty()),
            session_ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "8".to_string())
                .parse::<i64>()
                .context("SESSION_TTL_HOURS must be a whole number of hours")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}
