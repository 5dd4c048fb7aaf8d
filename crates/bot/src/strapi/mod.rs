//! Strapi backend client.
//!
//! # Architecture
//!
//! - Plain REST with `{"data": ...}` envelopes and `documentId` string
//!   identifiers (Strapi v5 collection API)
//! - `reqwest` with a fixed request timeout; bearer-token auth on every call
//! - The backend is the source of truth for products, carts, and customers;
//!   the bot keeps no local commerce state
//! - Downloaded product images are cached in memory via `moka`
//!
//! # Example
//!
//! ```rust,ignore
//! use greengrocer_bot::strapi::{CommerceStore, StrapiClient};
//!
//! let client = StrapiClient::new(&config)?;
//!
//! let catalog = client.fetch_catalog().await?;
//!
//! let cart = client.get_or_create_active_cart(user).await?;
//! client.add_item(&cart.id, &catalog[0].id, Decimal::ONE).await?;
//! ```

mod client;
mod conversions;
pub mod types;
mod wire;

pub use client::StrapiClient;
pub use types::*;

use async_trait::async_trait;
use greengrocer_core::{CartId, CartItemId, CustomerId, Email, ProductId, TelegramId};
use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

/// Errors that can occur when talking to the backend.
///
/// Every transport error, non-2xx response, or malformed payload surfaces
/// here; nothing raises past the client boundary uncaught.
#[derive(Debug, Error)]
pub enum StrapiError {
    /// HTTP request failed (transport error or timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-success status code.
    #[error("backend returned {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: reqwest::StatusCode,
        /// Truncated response body for diagnostics.
        body: String,
    },

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A record was expected but the envelope was empty.
    #[error("missing data: {0}")]
    MissingData(String),

    /// An endpoint URL could not be built from the base URL.
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Typed operations against the remote commerce store.
///
/// The conversation machine depends on this trait rather than on
/// [`StrapiClient`] directly so it can be exercised against in-memory
/// fakes. Every operation fails as a unit and is never partially applied.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Return the user's active cart, creating one if none exists.
    async fn get_or_create_active_cart(&self, user: TelegramId) -> Result<Cart, StrapiError>;

    /// Add a product to a cart. Returns the created item's identifier.
    async fn add_item(
        &self,
        cart: &CartId,
        product: &ProductId,
        quantity: Decimal,
    ) -> Result<CartItemId, StrapiError>;

    /// Fetch the user's active cart with its items and their products.
    ///
    /// Returns `Ok(None)` when the user has no active cart - callers must
    /// distinguish "no cart" from "request failed".
    async fn active_cart_with_items(
        &self,
        user: TelegramId,
    ) -> Result<Option<CartContents>, StrapiError>;

    /// Delete a cart item.
    async fn remove_item(&self, item: &CartItemId) -> Result<(), StrapiError>;

    /// Create a customer record for checkout.
    async fn create_customer(
        &self,
        user: TelegramId,
        email: &Email,
        username: Option<&str>,
    ) -> Result<Customer, StrapiError>;

    /// Link a cart to a customer and mark it completed.
    async fn complete_cart(&self, cart: &CartId, customer: &CustomerId)
    -> Result<Cart, StrapiError>;

    /// Download an image, best effort.
    ///
    /// Failures degrade to text-only rendering and are never surfaced to
    /// the user, so this returns `Option` instead of `Result`.
    async fn fetch_image(&self, url: &Url) -> Option<Vec<u8>>;
}
