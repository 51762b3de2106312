use anyhow::{Context, Result};

use crate::enhance::DEFAULT_MODEL;
use crate::lockout::{LockoutConfig, PinCode};
use crate::session::controller::{AdminSettings, DEFAULT_RETENTION_LIMIT};

/// Application configuration loaded from environment variables.
/// Everything has a default; a value that is set but malformed fails startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// No database URL means records live in process memory.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub admin_pin: PinCode,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub admin_settings: AdminSettings,
    pub lockout: LockoutConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            admin_pin: optional_env("ADMIN_PIN")
                .as_deref()
                .unwrap_or("1984")
                .parse()
                .context("ADMIN_PIN must be exactly 4 digits")?,
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_model: optional_env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            admin_settings: AdminSettings::new(
                optional_env("AUTO_CLEANUP_ENABLED")
                    .map(|v| parse_bool(&v))
                    .transpose()
                    .context("AUTO_CLEANUP_ENABLED must be true or false")?
                    .unwrap_or(false),
                optional_env("AUTO_CLEANUP_LIMIT")
                    .map(|v| v.parse::<usize>())
                    .transpose()
                    .context("AUTO_CLEANUP_LIMIT must be a whole number")?
                    .unwrap_or(DEFAULT_RETENTION_LIMIT),
            ),
            lockout: match optional_env("LOCKOUT_STAGES") {
                Some(raw) => raw.parse().context("LOCKOUT_STAGES is invalid")?,
                None => LockoutConfig::default(),
            },
        })
    }
}

/// Unset and blank are treated the same.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("not a boolean: '{other}'"),
    }
}
