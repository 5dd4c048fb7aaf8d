//! Per-user conversation session persistence.
//!
//! A session records which screen the user is looking at and which product
//! they last selected. Sessions are keyed by Telegram identity and must
//! survive process restarts, so the production store is Redis; an absent
//! key loads as the default session (menu, nothing selected).

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use greengrocer_core::{ProductId, TelegramId};

/// The conversation screen currently shown to a user.
///
/// `Menu` is both the initial screen and the catalog screen; `/start` and
/// every "back" action land here. There is no terminal screen - a
/// completed order returns to the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Catalog list with one button per product.
    #[default]
    Menu,
    /// Single product detail.
    Description,
    /// Cart contents (or the empty-cart view).
    Cart,
    /// Checkout prompt sent; the next free-text message is the email.
    AwaitingEmail,
}

/// A user's transient conversation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Session {
    /// Screen currently rendered.
    pub screen: Screen,
    /// Product shown on the description screen, used by add-to-cart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_product: Option<ProductId>,
}

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The storage backend failed.
    #[error("session store error: {0}")]
    Backend(#[from] redis::RedisError),

    /// A stored session could not be encoded or decoded.
    #[error("session encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Durable key-value persistence of sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the user's session, defaulting when none is stored.
    async fn load(&self, user: TelegramId) -> Result<Session, SessionError>;

    /// Persist the user's session.
    ///
    /// Callers must only write after every remote mutation for the
    /// transition has succeeded, so a failure mid-transition never leaves
    /// the session pointing at a screen whose precondition was not met.
    async fn store(&self, user: TelegramId, session: &Session) -> Result<(), SessionError>;
}

/// Redis-backed session store.
///
/// Sessions are stored as JSON strings under `session:{telegram_id}`.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    /// Connect to Redis and verify the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    fn key(user: TelegramId) -> String {
        format!("session:{user}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, user: TelegramId) -> Result<Session, SessionError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(Self::key(user)).await?;

        match raw {
            None => Ok(Session::default()),
            Some(raw) => Ok(serde_json::from_str(&raw)?),
        }
    }

    async fn store(&self, user: TelegramId, session: &Session) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(session)?;
        let () = conn.set(Self::key(user), payload).await?;
        Ok(())
    }
}
