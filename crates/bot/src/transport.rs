//! Chat transport abstraction.
//!
//! The conversation machine talks to the messenger through [`ChatPort`],
//! which is narrow on purpose: acknowledge an interaction, delete the
//! previous screen message, send a new one. The Telegram adapter
//! implements it; tests substitute a recording fake.

use async_trait::async_trait;
use thiserror::Error;

use greengrocer_core::TelegramId;

use crate::events::Event;
use crate::views::ScreenView;

/// A chat a screen can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatRef(i64);

impl ChatRef {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

/// Opaque handle for acknowledging a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionId(String);

impl InteractionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A sent message that can later be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef(i32);

impl MessageRef {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

/// One normalized inbound update, whatever shape it arrived in.
#[derive(Debug, Clone)]
pub struct Incoming {
    /// Who acted.
    pub user: TelegramId,
    /// Where to render the response.
    pub chat: ChatRef,
    /// The user's handle, forwarded to the backend at checkout.
    pub username: Option<String>,
    /// Present for button presses; must be answered exactly once.
    pub interaction: Option<InteractionId>,
    /// The message carrying the pressed button, deleted on re-render.
    pub screen_message: Option<MessageRef>,
    /// What the user did.
    pub event: Event,
}

/// Errors from the chat transport.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The messenger API rejected or failed a call.
    #[error("chat transport error: {0}")]
    Api(String),
}

/// Outbound messenger operations needed by the conversation machine.
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Acknowledge a button press, optionally with a toast (`alert` makes
    /// it a modal the user must dismiss).
    async fn answer(
        &self,
        interaction: &InteractionId,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), ChatError>;

    /// Delete a previously sent screen message. Failures are tolerable
    /// (the message may already be gone) and handled by the caller.
    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<(), ChatError>;

    /// Send a rendered screen, as a photo with caption when `photo` bytes
    /// are present. Returns a handle for deleting it later.
    async fn send_screen(
        &self,
        chat: ChatRef,
        view: &ScreenView,
        photo: Option<Vec<u8>>,
    ) -> Result<MessageRef, ChatError>;

    /// Send a plain text message with no keyboard.
    async fn send_text(&self, chat: ChatRef, text: &str) -> Result<(), ChatError>;
}
