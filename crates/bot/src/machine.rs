//! The conversation state machine.
//!
//! Split in two layers. [`plan`] is a pure transition table: given the
//! screen a user is on and the event they produced, it names the command
//! to run. [`Machine`] executes commands against the commerce backend,
//! the session store, and the chat transport. The session is written only
//! after every remote effect for the transition has succeeded, so a
//! backend failure leaves the user exactly where they were.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use greengrocer_core::{CartItemId, Email, TelegramId};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::events::Event;
use crate::session::{Screen, Session, SessionStore};
use crate::strapi::CommerceStore;
use crate::transport::{ChatPort, Incoming};
use crate::views;
use crate::views::ScreenView;

/// Weight added per add-to-cart press, in kilograms.
const ADD_QUANTITY: Decimal = Decimal::ONE;

/// The effect a transition requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the catalog menu, greeting on `/start`.
    RenderMenu { greet: bool },
    /// Show the product at this catalog index.
    RenderProduct(usize),
    /// Add the session's selected product to the user's active cart.
    AddSelectedItem,
    /// Show the cart (or the empty-cart view).
    RenderCart,
    /// Remove a cart item and re-render the cart.
    RemoveItem(CartItemId),
    /// Ask for the checkout email.
    PromptEmail,
    /// Treat this text as the checkout email and complete the order.
    CompleteOrder(String),
    /// Valid event on the wrong screen; acknowledge and do nothing.
    Reject,
}

/// Pure transition table.
///
/// `/start` resets from any screen. Everything else is only meaningful on
/// the screen whose keyboard offered it; stale presses (an old message's
/// buttons after the conversation moved on) fall through to
/// [`Command::Reject`].
#[must_use]
pub fn plan(screen: Screen, event: &Event) -> Command {
    match (screen, event) {
        (_, Event::Start) => Command::RenderMenu { greet: true },
        (Screen::Menu, Event::SelectProduct(index)) => Command::RenderProduct(*index),
        (Screen::Menu | Screen::Description | Screen::Cart, Event::ShowCart) => Command::RenderCart,
        (Screen::Description | Screen::Cart, Event::BackToMenu) => {
            Command::RenderMenu { greet: false }
        }
        (Screen::Description, Event::AddToCart) => Command::AddSelectedItem,
        (Screen::Cart, Event::RemoveItem(id)) => Command::RemoveItem(id.clone()),
        (Screen::Cart, Event::Pay) => Command::PromptEmail,
        (Screen::AwaitingEmail, Event::Text(text)) => Command::CompleteOrder(text.clone()),
        _ => Command::Reject,
    }
}

/// Executes conversation transitions.
///
/// Cheap to clone; shared across all concurrent conversations.
#[derive(Clone)]
pub struct Machine {
    store: Arc<dyn CommerceStore>,
    sessions: Arc<dyn SessionStore>,
    chat: Arc<dyn ChatPort>,
    catalog: Arc<Catalog>,
}

impl Machine {
    #[must_use]
    pub fn new(
        store: Arc<dyn CommerceStore>,
        sessions: Arc<dyn SessionStore>,
        chat: Arc<dyn ChatPort>,
        catalog: Arc<Catalog>,
    ) -> Self {
        Self {
            store,
            sessions,
            chat,
            catalog,
        }
    }

    /// Handle one inbound update end to end.
    ///
    /// # Errors
    ///
    /// Returns an error when the session store or the chat transport
    /// fails. Backend failures are reported to the user in-band and do
    /// not surface here.
    #[instrument(skip(self, incoming), fields(user = %incoming.user))]
    pub async fn handle(&self, incoming: Incoming) -> Result<()> {
        let session = self.sessions.load(incoming.user).await?;
        let command = plan(session.screen, &incoming.event);
        debug!(screen = ?session.screen, command = ?command, "dispatching");

        match command {
            Command::RenderMenu { greet } => self.render_menu(&incoming, greet).await,
            Command::RenderProduct(index) => self.render_product(&incoming, index).await,
            Command::AddSelectedItem => self.add_selected_item(&incoming, &session).await,
            Command::RenderCart => self.render_cart(&incoming).await,
            Command::RemoveItem(id) => self.remove_item(&incoming, &id).await,
            Command::PromptEmail => self.prompt_email(&incoming).await,
            Command::CompleteOrder(text) => self.complete_order(&incoming, &text).await,
            Command::Reject => self.ack(&incoming).await,
        }
    }

    // ====== Screen rendering ======

    async fn render_menu(&self, incoming: &Incoming, greet: bool) -> Result<()> {
        self.ack(incoming).await?;
        let view = views::menu(&self.catalog, greet);
        self.replace_screen(incoming, &view, None).await?;
        self.commit(incoming.user, Screen::Menu, None).await
    }

    async fn render_product(&self, incoming: &Incoming, index: usize) -> Result<()> {
        let Some(product) = self.catalog.get(index) else {
            // Stale keyboard from before a catalog change.
            return self.toast(incoming, "Ошибка: товар не найден").await;
        };

        self.ack(incoming).await?;

        let image_url = self.catalog.image_url(product);
        let photo = match &image_url {
            Some(url) => self.store.fetch_image(url).await,
            None => None,
        };

        let view = views::product_detail(product, image_url);
        self.replace_screen(incoming, &view, photo).await?;
        self.commit(incoming.user, Screen::Description, Some(product.id.clone()))
            .await
    }

    async fn render_cart(&self, incoming: &Incoming) -> Result<()> {
        let contents = match self.store.active_cart_with_items(incoming.user).await {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "cart fetch failed");
                return self.alert(incoming, "Ошибка при получении корзины").await;
            }
        };

        self.ack(incoming).await?;
        let view = match &contents {
            Some(contents) if !contents.is_empty() => views::cart(contents),
            _ => views::empty_cart(),
        };
        self.replace_screen(incoming, &view, None).await?;
        self.commit(incoming.user, Screen::Cart, None).await
    }

    // ====== Cart mutations ======

    async fn add_selected_item(&self, incoming: &Incoming, session: &Session) -> Result<()> {
        let Some(product) = &session.selected_product else {
            return self.alert(incoming, "Ошибка: товар не выбран").await;
        };

        let added = async {
            let cart = self.store.get_or_create_active_cart(incoming.user).await?;
            self.store.add_item(&cart.id, product, ADD_QUANTITY).await
        }
        .await;

        match added {
            Ok(_) => self.toast(incoming, "Товар добавлен в корзину!").await,
            Err(e) => {
                warn!(error = %e, "add to cart failed");
                self.alert(incoming, "Ошибка при добавлении товара").await
            }
        }
    }

    async fn remove_item(&self, incoming: &Incoming, item: &CartItemId) -> Result<()> {
        if let Err(e) = self.store.remove_item(item).await {
            warn!(error = %e, "item removal failed");
            return self.alert(incoming, "Ошибка при удалении товара").await;
        }

        self.toast(incoming, "Товар удален из корзины").await?;

        // Refresh the cart screen so the removed line disappears. If the
        // refresh itself fails the user already got the toast, so just
        // leave the stale screen in place.
        match self.store.active_cart_with_items(incoming.user).await {
            Ok(contents) => {
                let view = match &contents {
                    Some(contents) if !contents.is_empty() => views::cart(contents),
                    _ => views::empty_cart(),
                };
                self.replace_screen(incoming, &view, None).await?;
                self.commit(incoming.user, Screen::Cart, None).await
            }
            Err(e) => {
                warn!(error = %e, "cart refresh after removal failed");
                Ok(())
            }
        }
    }

    // ====== Checkout ======

    async fn prompt_email(&self, incoming: &Incoming) -> Result<()> {
        self.ack(incoming).await?;
        self.chat
            .send_text(incoming.chat, "Пожалуйста, пришлите ваш email:")
            .await?;
        self.commit(incoming.user, Screen::AwaitingEmail, None).await
    }

    async fn complete_order(&self, incoming: &Incoming, text: &str) -> Result<()> {
        let email = match Email::parse(text) {
            Ok(email) => email,
            Err(e) => {
                debug!(error = %e, "rejected checkout email");
                self.chat
                    .send_text(
                        incoming.chat,
                        "Некорректный email. Пожалуйста, попробуйте еще раз:",
                    )
                    .await?;
                return Ok(());
            }
        };

        let completed = self
            .checkout(incoming.user, &email, incoming.username.as_deref())
            .await;

        match completed {
            Ok(()) => {
                self.chat
                    .send_text(
                        incoming.chat,
                        &format!(
                            "Спасибо! Ваш заказ оформлен.\nМы свяжемся с вами по адресу: {email}"
                        ),
                    )
                    .await?;
                let view = views::menu(&self.catalog, false);
                self.chat.send_screen(incoming.chat, &view, None).await?;
                self.commit(incoming.user, Screen::Menu, None).await
            }
            Err(e) => {
                warn!(error = %e, "checkout failed");
                self.chat
                    .send_text(
                        incoming.chat,
                        "Ошибка при оформлении заказа. Пожалуйста, попробуйте позже.",
                    )
                    .await?;
                Ok(())
            }
        }
    }

    /// Record the customer and mark the active cart completed.
    ///
    /// A user with no active cart (emptied it, then paid from a stale
    /// screen) still gets a customer record and a confirmation.
    async fn checkout(
        &self,
        user: TelegramId,
        email: &Email,
        username: Option<&str>,
    ) -> std::result::Result<(), crate::strapi::StrapiError> {
        let customer = self.store.create_customer(user, email, username).await?;

        if let Some(contents) = self.store.active_cart_with_items(user).await? {
            self.store.complete_cart(&contents.id, &customer.id).await?;
        }

        Ok(())
    }

    // ====== Transport helpers ======

    /// Silently acknowledge a button press, if there is one to answer.
    async fn ack(&self, incoming: &Incoming) -> Result<()> {
        if let Some(interaction) = &incoming.interaction {
            self.chat.answer(interaction, None, false).await?;
        }
        Ok(())
    }

    /// Acknowledge with a transient toast.
    async fn toast(&self, incoming: &Incoming, text: &str) -> Result<()> {
        if let Some(interaction) = &incoming.interaction {
            self.chat.answer(interaction, Some(text), false).await?;
        }
        Ok(())
    }

    /// Acknowledge with a modal alert. Falls back to a plain message for
    /// events that did not arrive as a button press.
    async fn alert(&self, incoming: &Incoming, text: &str) -> Result<()> {
        match &incoming.interaction {
            Some(interaction) => self.chat.answer(interaction, Some(text), true).await?,
            None => self.chat.send_text(incoming.chat, text).await?,
        }
        Ok(())
    }

    /// Delete the previous screen message (best effort) and send the new
    /// one. Deletion fails when the message is already gone; that only
    /// leaves a dead keyboard behind, which [`plan`] rejects anyway.
    async fn replace_screen(
        &self,
        incoming: &Incoming,
        view: &ScreenView,
        photo: Option<Vec<u8>>,
    ) -> Result<()> {
        if let Some(message) = incoming.screen_message {
            if let Err(e) = self.chat.delete_message(incoming.chat, message).await {
                debug!(error = %e, "screen message deletion failed");
            }
        }
        self.chat.send_screen(incoming.chat, view, photo).await?;
        Ok(())
    }

    async fn commit(
        &self,
        user: TelegramId,
        screen: Screen,
        selected_product: Option<greengrocer_core::ProductId>,
    ) -> Result<()> {
        let session = Session {
            screen,
            selected_product,
        };
        self.sessions.store(user, &session).await?;
        Ok(())
    }
}
