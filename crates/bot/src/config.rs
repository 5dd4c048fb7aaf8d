//! Bot configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TG_TOKEN` - Telegram bot token from `BotFather`
//! - `STRAPI_BASE_URL` - Base URL of the Strapi backend (e.g., <http://localhost:1337>)
//! - `STRAPI_TOKEN` - Strapi API bearer token
//!
//! ## Optional
//! - `REDIS_URL` - Session store connection URL (default: redis://127.0.0.1:6379)

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Bot application configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct BotConfig {
    /// Telegram bot token.
    pub tg_token: SecretString,
    /// Base URL of the Strapi backend, also used to resolve relative
    /// asset paths. Must be an origin-style URL without a path.
    pub strapi_base_url: Url,
    /// Strapi API bearer token.
    pub strapi_token: SecretString,
    /// Redis connection URL for the session store.
    pub redis_url: String,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("tg_token", &"[REDACTED]")
            .field("strapi_base_url", &self.strapi_base_url.as_str())
            .field("strapi_token", &"[REDACTED]")
            .field("redis_url", &self.redis_url)
            .finish()
    }
}

impl BotConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let tg_token = get_required_secret("TG_TOKEN")?;
        let strapi_base_url = parse_base_url(&get_required_env("STRAPI_BASE_URL")?)?;
        let strapi_token = get_required_secret("STRAPI_TOKEN")?;
        let redis_url = get_env_or_default("REDIS_URL", DEFAULT_REDIS_URL);

        Ok(Self {
            tg_token,
            strapi_base_url,
            strapi_token,
            redis_url,
        })
    }

    /// The Telegram token as a plain string for the transport client.
    #[must_use]
    pub fn tg_token(&self) -> &str {
        self.tg_token.expose_secret()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse and validate the backend base URL.
///
/// A trailing slash is stripped so joining API paths and relative asset
/// paths behaves predictably.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| ConfigError::InvalidEnvVar("STRAPI_BASE_URL".to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "STRAPI_BASE_URL".to_string(),
            format!("unsupported scheme: {}", url.scheme()),
        ));
    }

    Ok(url)
}
