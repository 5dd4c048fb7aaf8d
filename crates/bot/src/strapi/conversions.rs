//! Conversions from wire payloads to domain types.

use greengrocer_core::{CartId, CartItemId, CustomerId, Email, Price, ProductId};
use url::Url;

use super::types::{Cart, CartContents, CartLine, Customer, ImageRef, Product};
use super::wire::{CartItemPayload, CartPayload, CustomerPayload, ProductPayload};

/// Convert a product payload, parsing the image field once.
pub fn convert_product(payload: ProductPayload) -> Product {
    let image = parse_image(payload.image.as_ref());
    Product {
        id: ProductId::new(payload.document_id),
        title: payload.title,
        price: Price::new(payload.price),
        description: payload.description.unwrap_or_default(),
        image,
    }
}

/// Convert a cart lookup/creation payload (items not populated).
pub fn convert_cart(payload: CartPayload) -> Cart {
    Cart {
        id: CartId::new(payload.document_id),
        status: payload.order_status,
    }
}

/// Convert a populated cart payload into its contents.
///
/// Items whose product relation was not populated are dropped, matching
/// how the cart view skips orphaned items.
pub fn convert_cart_contents(payload: CartPayload) -> CartContents {
    let lines = payload
        .items
        .unwrap_or_default()
        .into_iter()
        .filter_map(convert_cart_line)
        .collect();

    CartContents {
        id: CartId::new(payload.document_id),
        lines,
    }
}

fn convert_cart_line(payload: CartItemPayload) -> Option<CartLine> {
    let product = payload.product.map(convert_product)?;
    Some(CartLine {
        id: CartItemId::new(payload.document_id),
        quantity: payload.quantity,
        product,
    })
}

/// Convert a customer payload.
///
/// The backend echoes back the email we sent; if it mangled it into
/// something unparseable we keep going with the raw string semantics by
/// failing conversion, which the caller surfaces as a malformed payload.
pub fn convert_customer(payload: CustomerPayload) -> Option<Customer> {
    let email = Email::parse(&payload.email).ok()?;
    Some(Customer {
        id: CustomerId::new(payload.document_id),
        email,
    })
}

/// Parse the backend's image field into an [`ImageRef`].
///
/// Observed shapes:
/// - absent / null
/// - `{"url": "..."}` (flat media object)
/// - `{"data": {"attributes": {"url": "..."}}}` (nested media relation)
///
/// A leading `/` marks a path relative to the asset base URL. Anything
/// unrecognized or unparseable yields [`ImageRef::None`], never an error.
pub fn parse_image(value: Option<&serde_json::Value>) -> ImageRef {
    let Some(value) = value else {
        return ImageRef::None;
    };

    let url = if let Some(nested) = value.get("data") {
        nested
            .get("attributes")
            .and_then(|attrs| attrs.get("url"))
            .and_then(serde_json::Value::as_str)
    } else {
        value.get("url").and_then(serde_json::Value::as_str)
    };

    match url {
        None => ImageRef::None,
        Some(path) if path.starts_with('/') => ImageRef::Relative(path.to_string()),
        Some(raw) => Url::parse(raw).map_or(ImageRef::None, ImageRef::Direct),
    }
}
