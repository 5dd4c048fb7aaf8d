//! Strapi REST client implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use greengrocer_core::{CartId, CartItemId, CustomerId, Email, OrderStatus, ProductId, TelegramId};
use rust_decimal::Decimal;

use crate::config::BotConfig;

use super::conversions::{convert_cart, convert_cart_contents, convert_customer, convert_product};
use super::types::{Cart, CartContents, Customer, Product};
use super::wire::{
    CartCompletion, CartItemPayload, CartPayload, CustomerPayload, Envelope, NewCart, NewCartItem,
    NewCustomer, ProductPayload,
};
use super::{CommerceStore, StrapiError};

/// Fixed timeout for every backend request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Image cache bounds. Product images are immutable in practice, the TTL
/// just keeps the cache honest if one is re-uploaded.
const IMAGE_CACHE_CAPACITY: u64 = 64;
const IMAGE_CACHE_TTL: Duration = Duration::from_secs(600);

/// How much of an error body to keep for logs and error values.
const BODY_SNIPPET_LEN: usize = 200;

/// Client for the Strapi commerce backend.
///
/// Cheap to clone; all state lives behind an `Arc`.
#[derive(Clone)]
pub struct StrapiClient {
    inner: Arc<StrapiClientInner>,
}

struct StrapiClientInner {
    http: reqwest::Client,
    base: Url,
    token: SecretString,
    images: Cache<String, Vec<u8>>,
}

impl StrapiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &BotConfig) -> Result<Self, StrapiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let images = Cache::builder()
            .max_capacity(IMAGE_CACHE_CAPACITY)
            .time_to_live(IMAGE_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(StrapiClientInner {
                http,
                base: config.strapi_base_url.clone(),
                token: config.strapi_token.clone(),
                images,
            }),
        })
    }

    /// Fetch the full product catalog.
    ///
    /// Called once at startup; an error or an empty catalog is fatal and
    /// handled by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload is malformed.
    #[instrument(skip(self))]
    pub async fn fetch_catalog(&self) -> Result<Vec<Product>, StrapiError> {
        let url = self.endpoint("api/products")?;
        let envelope: Envelope<Vec<ProductPayload>> = self
            .send_json(self.inner.http.get(url).query(&[("populate", "*")]))
            .await?;

        Ok(envelope.data.into_iter().map(convert_product).collect())
    }

    fn endpoint(&self, path: &str) -> Result<Url, StrapiError> {
        Ok(self.inner.base.join(path)?)
    }

    /// Send a request and parse the JSON response.
    ///
    /// Non-success statuses and parse failures are logged with a truncated
    /// body and surfaced as [`StrapiError`].
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, StrapiError> {
        let body = self.send_checked(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %snippet(&body),
                "failed to parse backend response"
            );
            StrapiError::Parse(e)
        })
    }

    /// Send a request, check the status, and return the raw body.
    async fn send_checked(&self, request: RequestBuilder) -> Result<String, StrapiError> {
        let response = request
            .bearer_auth(self.inner.token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %snippet(&body),
                "backend returned non-success status"
            );
            return Err(StrapiError::Status {
                status,
                body: snippet(&body),
            });
        }

        Ok(body)
    }

    /// Query for the user's active cart; `populate` is the populate
    /// key/value pair (shallow `populate=*` for lookup, the nested
    /// item/product population for cart rendering).
    async fn query_active_cart(
        &self,
        user: TelegramId,
        populate: (&str, &str),
    ) -> Result<Option<CartPayload>, StrapiError> {
        let url = self.endpoint("api/carts")?;
        let query = [
            ("filters[telegram_id][$eq]", user.to_string()),
            ("filters[order_status][$eq]", OrderStatus::Active.to_string()),
            (populate.0, populate.1.to_string()),
        ];

        let envelope: Envelope<Vec<CartPayload>> = self
            .send_json(self.inner.http.get(url).query(&query))
            .await?;

        Ok(envelope.data.into_iter().next())
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>, StrapiError> {
        let response = self.inner.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StrapiError::Status {
                status,
                body: String::new(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_LEN).collect()
}

#[async_trait]
impl CommerceStore for StrapiClient {
    /// Return the user's active cart, creating one if none exists.
    ///
    /// The backend offers no atomic upsert, so this is a read-then-create
    /// check with an inherent race window: two concurrent calls for the
    /// same user can both observe "no cart" and create two active carts.
    /// Accepted and documented rather than masked with a process-local
    /// mutex, preserving the observable behavior of the original service.
    #[instrument(skip(self))]
    async fn get_or_create_active_cart(&self, user: TelegramId) -> Result<Cart, StrapiError> {
        if let Some(existing) = self.query_active_cart(user, ("populate", "*")).await? {
            return Ok(convert_cart(existing));
        }

        debug!("no active cart, creating one");
        let url = self.endpoint("api/carts")?;
        let body = Envelope {
            data: NewCart {
                telegram_id: user.to_string(),
                order_status: OrderStatus::Active,
            },
        };
        let created: Envelope<CartPayload> = self
            .send_json(self.inner.http.post(url).json(&body))
            .await?;

        Ok(convert_cart(created.data))
    }

    #[instrument(skip(self))]
    async fn add_item(
        &self,
        cart: &CartId,
        product: &ProductId,
        quantity: Decimal,
    ) -> Result<CartItemId, StrapiError> {
        let url = self.endpoint("api/cart-items")?;
        let body = Envelope {
            data: NewCartItem {
                quantity,
                cart: cart.as_str(),
                product: product.as_str(),
            },
        };
        let created: Envelope<CartItemPayload> = self
            .send_json(self.inner.http.post(url).json(&body))
            .await?;

        Ok(CartItemId::new(created.data.document_id))
    }

    #[instrument(skip(self))]
    async fn active_cart_with_items(
        &self,
        user: TelegramId,
    ) -> Result<Option<CartContents>, StrapiError> {
        let payload = self
            .query_active_cart(user, ("populate[items][populate][0]", "product"))
            .await?;
        Ok(payload.map(convert_cart_contents))
    }

    #[instrument(skip(self))]
    async fn remove_item(&self, item: &CartItemId) -> Result<(), StrapiError> {
        let url = self.endpoint(&format!("api/cart-items/{item}"))?;
        self.send_checked(self.inner.http.delete(url)).await?;
        Ok(())
    }

    #[instrument(skip(self, email))]
    async fn create_customer(
        &self,
        user: TelegramId,
        email: &Email,
        username: Option<&str>,
    ) -> Result<Customer, StrapiError> {
        let url = self.endpoint("api/customers")?;
        let body = Envelope {
            data: NewCustomer {
                telegram_id: user.to_string(),
                email: email.as_str(),
                username,
            },
        };
        let created: Envelope<CustomerPayload> = self
            .send_json(self.inner.http.post(url).json(&body))
            .await?;

        convert_customer(created.data)
            .ok_or_else(|| StrapiError::MissingData("customer email".to_string()))
    }

    #[instrument(skip(self))]
    async fn complete_cart(
        &self,
        cart: &CartId,
        customer: &CustomerId,
    ) -> Result<Cart, StrapiError> {
        let url = self.endpoint(&format!("api/carts/{cart}"))?;
        let body = Envelope {
            data: CartCompletion {
                customer: customer.as_str(),
                order_status: OrderStatus::Completed,
            },
        };
        let updated: Envelope<CartPayload> = self
            .send_json(self.inner.http.put(url).json(&body))
            .await?;

        Ok(convert_cart(updated.data))
    }

    /// Download an image, caching the bytes.
    ///
    /// Best effort: any failure logs a warning and falls back to
    /// text-only rendering.
    async fn fetch_image(&self, url: &Url) -> Option<Vec<u8>> {
        let key = url.as_str().to_string();

        if let Some(bytes) = self.inner.images.get(&key).await {
            debug!(url = %url, "image cache hit");
            return Some(bytes);
        }

        match self.download(url).await {
            Ok(bytes) => {
                self.inner.images.insert(key, bytes.clone()).await;
                Some(bytes)
            }
            Err(e) => {
                warn!(error = %e, url = %url, "image download failed, rendering text only");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_truncates() {
        let long = "x".repeat(500);
        assert_eq!(snippet(&long).len(), BODY_SNIPPET_LEN);
        assert_eq!(snippet("short"), "short");
    }
}
