//! Domain types for the commerce store.
//!
//! Wire payloads from the backend are converted into these types at the
//! client boundary; the rest of the bot never sees raw JSON.

use greengrocer_core::{CartId, CartItemId, CustomerId, Email, Price, ProductId};
use rust_decimal::Decimal;
use url::Url;

/// A catalog product.
///
/// Snapshot data owned by the backend; the bot fetches the catalog once at
/// startup and treats it as immutable for the life of the process.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// Price per kilogram.
    pub price: Price,
    pub description: String,
    pub image: ImageRef,
}

/// A product's image reference, parsed once from the backend's varying
/// shapes instead of shape-sniffing at each call site.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageRef {
    /// No image, or an unrecognized shape.
    #[default]
    None,
    /// A full URL, usable as-is.
    Direct(Url),
    /// A path relative to the backend's asset base URL.
    Relative(String),
}

impl ImageRef {
    /// Resolve to an absolute URL against the asset base.
    ///
    /// Returns `None` for missing images and for relative paths that do
    /// not join cleanly; resolution never fails rendering.
    #[must_use]
    pub fn resolve(&self, base: &Url) -> Option<Url> {
        match self {
            Self::None => None,
            Self::Direct(url) => Some(url.clone()),
            Self::Relative(path) => base.join(path).ok(),
        }
    }
}

/// An active cart, as returned by cart lookup/creation.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub status: greengrocer_core::OrderStatus,
}

/// A cart together with its items and their products.
#[derive(Debug, Clone)]
pub struct CartContents {
    pub id: CartId,
    pub lines: Vec<CartLine>,
}

impl CartContents {
    /// Sum of `quantity × price` over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// One cart item with its product snapshot.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: CartItemId,
    /// Quantity in kilograms.
    pub quantity: Decimal,
    pub product: Product,
}

impl CartLine {
    /// `quantity × price` for this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price * self.quantity
    }
}

/// A customer record created at checkout.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
}
