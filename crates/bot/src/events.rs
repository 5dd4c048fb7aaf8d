//! Inbound events and the callback-token codec.
//!
//! Inline buttons carry opaque callback tokens encoding `{action, target}`.
//! The grammar is flat strings: `product_{index}`, `remove_item_{id}`, and
//! fixed words for the rest. Tokens are produced by the renderer through
//! the constructors here and parsed back on the way in, so the two sides
//! cannot drift apart.

use greengrocer_core::CartItemId;

/// A user action delivered by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The `/start` command.
    Start,
    /// A product button on the menu, by catalog index.
    SelectProduct(usize),
    /// The add-to-cart button on a product detail.
    AddToCart,
    /// The "view cart" button (present on every screen's keyboard).
    ShowCart,
    /// A back/"to menu" button.
    BackToMenu,
    /// A remove button next to a cart item.
    RemoveItem(CartItemId),
    /// The pay button on the cart.
    Pay,
    /// Free text (an email when checkout is waiting for one).
    Text(String),
}

impl Event {
    /// Parse a callback token. Returns `None` for malformed tokens, which
    /// the transport answers with a transient alert.
    #[must_use]
    pub fn parse_callback(data: &str) -> Option<Self> {
        match data {
            tokens::ADD_TO_CART => Some(Self::AddToCart),
            tokens::SHOW_CART => Some(Self::ShowCart),
            tokens::BACK_TO_MENU => Some(Self::BackToMenu),
            tokens::PAY => Some(Self::Pay),
            _ => {
                if let Some(index) = data.strip_prefix(tokens::PRODUCT_PREFIX) {
                    return index.parse().ok().map(Self::SelectProduct);
                }
                if let Some(id) = data.strip_prefix(tokens::REMOVE_ITEM_PREFIX) {
                    if id.is_empty() {
                        return None;
                    }
                    return Some(Self::RemoveItem(CartItemId::new(id)));
                }
                None
            }
        }
    }

    /// Classify a plain text message.
    #[must_use]
    pub fn from_message_text(text: &str) -> Self {
        if text.trim() == "/start" {
            Self::Start
        } else {
            Self::Text(text.to_string())
        }
    }
}

/// Callback-token constructors and constants used by the renderer.
pub mod tokens {
    use greengrocer_core::CartItemId;

    pub const ADD_TO_CART: &str = "add_to_cart";
    pub const SHOW_CART: &str = "show_cart";
    pub const BACK_TO_MENU: &str = "back_to_menu";
    pub const PAY: &str = "pay";

    pub(super) const PRODUCT_PREFIX: &str = "product_";
    pub(super) const REMOVE_ITEM_PREFIX: &str = "remove_item_";

    /// Token for a menu product button.
    #[must_use]
    pub fn product(index: usize) -> String {
        format!("{PRODUCT_PREFIX}{index}")
    }

    /// Token for a cart-item remove button.
    #[must_use]
    pub fn remove_item(id: &CartItemId) -> String {
        format!("{REMOVE_ITEM_PREFIX}{id}")
    }
}
