//! Status enums for backend entities.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a cart.
///
/// Maps to the backend's `order_status` field. A user has at most one
/// `Active` cart; checkout moves it to `Completed` and it is never
/// reopened or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The cart is open and accepting items.
    #[default]
    Active,
    /// Checkout finished; the cart is linked to a customer.
    Completed,
}

impl OrderStatus {
    /// The wire value the backend stores.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
