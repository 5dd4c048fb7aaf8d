//! Serde payloads for the Strapi REST API.
//!
//! Strapi wraps every request and response body in a `{"data": ...}`
//! envelope and addresses records by a string `documentId`. Prices and
//! quantities arrive as plain JSON numbers, so those fields use the
//! per-field float codec to land in `Decimal` without drift.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use greengrocer_core::OrderStatus;

/// The `{"data": ...}` envelope wrapping every body.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

// =============================================================================
// Response payloads
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductPayload {
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    /// Image field shape varies between direct objects and nested media
    /// relations; parsed into a sum type by `conversions::parse_image`.
    #[serde(default)]
    pub image: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct CartPayload {
    #[serde(rename = "documentId")]
    pub document_id: String,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default)]
    pub items: Option<Vec<CartItemPayload>>,
}

#[derive(Debug, Deserialize)]
pub struct CartItemPayload {
    #[serde(rename = "documentId")]
    pub document_id: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    /// Absent unless the query populated the product relation.
    #[serde(default)]
    pub product: Option<ProductPayload>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerPayload {
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub email: String,
}

// =============================================================================
// Request payloads
// =============================================================================

#[derive(Debug, Serialize)]
pub struct NewCart {
    pub telegram_id: String,
    pub order_status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct NewCartItem<'a> {
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    pub cart: &'a str,
    pub product: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NewCustomer<'a> {
    pub telegram_id: String,
    pub email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct CartCompletion<'a> {
    pub customer: &'a str,
    pub order_status: OrderStatus,
}
