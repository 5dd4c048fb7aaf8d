//! Immutable catalog snapshot.
//!
//! The catalog is fetched once at startup and shared read-only across all
//! conversations. Menu buttons reference products by index into this
//! snapshot, so the snapshot must outlive every message that carries those
//! buttons - which holds because it lives for the whole process.

use url::Url;

use crate::strapi::Product;

/// The product catalog plus the base URL for resolving relative images.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
    assets_base: Url,
}

impl Catalog {
    /// Create a catalog snapshot.
    #[must_use]
    pub const fn new(products: Vec<Product>, assets_base: Url) -> Self {
        Self {
            products,
            assets_base,
        }
    }

    /// Product at a menu index, if in bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Product> {
        self.products.get(index)
    }

    /// All products in menu order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog is empty (fatal at startup).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Resolve a product's image against the asset base URL.
    #[must_use]
    pub fn image_url(&self, product: &Product) -> Option<Url> {
        product.image.resolve(&self.assets_base)
    }
}
