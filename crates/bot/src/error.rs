//! Unified error handling for the bot.
//!
//! Each boundary (config, backend, session store, chat transport) has its
//! own `thiserror` enum; `AppError` unifies them for the event handlers.
//! Backend failures during a user action are not propagated as `AppError`
//! - the conversation machine converts them into transient notifications
//! and stays in its current state.

use thiserror::Error;

use crate::config::ConfigError;
use crate::session::SessionError;
use crate::strapi::StrapiError;
use crate::transport::ChatError;

/// Application-level error type for the bot.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Backend operation failed.
    #[error("Backend error: {0}")]
    Strapi(#[from] StrapiError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Chat transport operation failed.
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
