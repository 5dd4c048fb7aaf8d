//! End-to-end conversation tests against in-memory fakes.
//!
//! The machine is exercised through the same traits the real bot wires
//! up: a fake commerce store with real cart bookkeeping, a map-backed
//! session store, and a chat port that records every outbound call.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use url::Url;

use greengrocer_bot::catalog::Catalog;
use greengrocer_bot::events::Event;
use greengrocer_bot::machine::Machine;
use greengrocer_bot::session::{Screen, Session, SessionError, SessionStore};
use greengrocer_bot::strapi::{
    Cart, CartContents, CartLine, CommerceStore, Customer, ImageRef, Product, StrapiError,
};
use greengrocer_bot::transport::{
    ChatError, ChatPort, ChatRef, Incoming, InteractionId, MessageRef,
};
use greengrocer_core::{
    CartId, CartItemId, CustomerId, Email, OrderStatus, Price, ProductId, TelegramId,
};

// ====== Fake commerce store ======

struct FakeCart {
    id: CartId,
    user: TelegramId,
    status: OrderStatus,
    items: Vec<(CartItemId, ProductId, Decimal)>,
}

#[derive(Default)]
struct CommerceState {
    carts: Vec<FakeCart>,
    customers: Vec<(TelegramId, String)>,
    next_id: u64,
    add_calls: usize,
    fail_cart_fetch: bool,
    fail_remove: bool,
}

struct FakeCommerce {
    state: Mutex<CommerceState>,
    products: Vec<Product>,
}

impl FakeCommerce {
    fn new(products: Vec<Product>) -> Self {
        Self {
            state: Mutex::new(CommerceState::default()),
            products,
        }
    }

    fn product(&self, id: &ProductId) -> Product {
        self.products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .unwrap()
    }

    fn backend_error() -> StrapiError {
        StrapiError::MissingData("simulated backend failure".to_string())
    }
}

#[async_trait]
impl CommerceStore for FakeCommerce {
    async fn get_or_create_active_cart(&self, user: TelegramId) -> Result<Cart, StrapiError> {
        let mut state = self.state.lock().unwrap();
        if let Some(cart) = state
            .carts
            .iter()
            .find(|c| c.user == user && c.status == OrderStatus::Active)
        {
            return Ok(Cart {
                id: cart.id.clone(),
                status: cart.status,
            });
        }

        state.next_id += 1;
        let id = CartId::new(format!("cart{}", state.next_id));
        state.carts.push(FakeCart {
            id: id.clone(),
            user,
            status: OrderStatus::Active,
            items: Vec::new(),
        });
        Ok(Cart {
            id,
            status: OrderStatus::Active,
        })
    }

    async fn add_item(
        &self,
        cart: &CartId,
        product: &ProductId,
        quantity: Decimal,
    ) -> Result<CartItemId, StrapiError> {
        let mut state = self.state.lock().unwrap();
        state.add_calls += 1;
        state.next_id += 1;
        let item = CartItemId::new(format!("item{}", state.next_id));
        let entry = state
            .carts
            .iter_mut()
            .find(|c| &c.id == cart)
            .ok_or_else(Self::backend_error)?;
        entry.items.push((item.clone(), product.clone(), quantity));
        Ok(item)
    }

    async fn active_cart_with_items(
        &self,
        user: TelegramId,
    ) -> Result<Option<CartContents>, StrapiError> {
        let state = self.state.lock().unwrap();
        if state.fail_cart_fetch {
            return Err(Self::backend_error());
        }

        let Some(cart) = state
            .carts
            .iter()
            .find(|c| c.user == user && c.status == OrderStatus::Active)
        else {
            return Ok(None);
        };

        let lines = cart
            .items
            .iter()
            .map(|(id, product, quantity)| CartLine {
                id: id.clone(),
                quantity: *quantity,
                product: self.product(product),
            })
            .collect();

        Ok(Some(CartContents {
            id: cart.id.clone(),
            lines,
        }))
    }

    async fn remove_item(&self, item: &CartItemId) -> Result<(), StrapiError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_remove {
            return Err(Self::backend_error());
        }
        for cart in &mut state.carts {
            cart.items.retain(|(id, _, _)| id != item);
        }
        Ok(())
    }

    async fn create_customer(
        &self,
        user: TelegramId,
        email: &Email,
        _username: Option<&str>,
    ) -> Result<Customer, StrapiError> {
        let mut state = self.state.lock().unwrap();
        state.customers.push((user, email.as_str().to_string()));
        Ok(Customer {
            id: CustomerId::new(format!("customer{}", state.customers.len())),
            email: email.clone(),
        })
    }

    async fn complete_cart(
        &self,
        cart: &CartId,
        _customer: &CustomerId,
    ) -> Result<Cart, StrapiError> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .carts
            .iter_mut()
            .find(|c| &c.id == cart)
            .ok_or_else(Self::backend_error)?;
        entry.status = OrderStatus::Completed;
        Ok(Cart {
            id: entry.id.clone(),
            status: entry.status,
        })
    }

    async fn fetch_image(&self, _url: &Url) -> Option<Vec<u8>> {
        None
    }
}

// ====== Fake session store ======

#[derive(Default)]
struct MemorySessionStore {
    sessions: Mutex<HashMap<i64, Session>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, user: TelegramId) -> Result<Session, SessionError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(&user.as_i64())
            .cloned()
            .unwrap_or_default())
    }

    async fn store(&self, user: TelegramId, session: &Session) -> Result<(), SessionError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(user.as_i64(), session.clone());
        Ok(())
    }
}

// ====== Recording chat port ======

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatCall {
    Answer { text: Option<String>, alert: bool },
    Delete,
    Screen { text: String, rows: usize },
    Text(String),
}

#[derive(Default)]
struct RecordingChat {
    calls: Mutex<Vec<ChatCall>>,
    next_message: AtomicI32,
}

impl RecordingChat {
    fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    fn last_screen_text(&self) -> Option<String> {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|call| match call {
                ChatCall::Screen { text, .. } => Some(text),
                _ => None,
            })
    }
}

#[async_trait]
impl ChatPort for RecordingChat {
    async fn answer(
        &self,
        _interaction: &InteractionId,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), ChatError> {
        self.calls.lock().unwrap().push(ChatCall::Answer {
            text: text.map(ToString::to_string),
            alert,
        });
        Ok(())
    }

    async fn delete_message(&self, _chat: ChatRef, _message: MessageRef) -> Result<(), ChatError> {
        self.calls.lock().unwrap().push(ChatCall::Delete);
        Ok(())
    }

    async fn send_screen(
        &self,
        _chat: ChatRef,
        view: &greengrocer_bot::views::ScreenView,
        _photo: Option<Vec<u8>>,
    ) -> Result<MessageRef, ChatError> {
        self.calls.lock().unwrap().push(ChatCall::Screen {
            text: view.text.clone(),
            rows: view.keyboard.len(),
        });
        Ok(MessageRef::new(
            self.next_message.fetch_add(1, Ordering::SeqCst),
        ))
    }

    async fn send_text(&self, _chat: ChatRef, text: &str) -> Result<(), ChatError> {
        self.calls
            .lock()
            .unwrap()
            .push(ChatCall::Text(text.to_string()));
        Ok(())
    }
}

// ====== Harness ======

const USER: TelegramId = TelegramId::new(7);

fn product(id: &str, title: &str, price: &str) -> Product {
    Product {
        id: ProductId::new(id),
        title: title.to_string(),
        price: Price::new(price.parse().unwrap()),
        description: "Свежие, местные".to_string(),
        image: ImageRef::None,
    }
}

struct Harness {
    machine: Machine,
    commerce: Arc<FakeCommerce>,
    sessions: Arc<MemorySessionStore>,
    chat: Arc<RecordingChat>,
}

impl Harness {
    fn new() -> Self {
        let products = vec![product("p1", "Томаты", "150"), product("p2", "Базилик", "400")];
        let commerce = Arc::new(FakeCommerce::new(products.clone()));
        let sessions = Arc::new(MemorySessionStore::default());
        let chat = Arc::new(RecordingChat::default());
        let catalog = Catalog::new(products, Url::parse("http://localhost:1337").unwrap());

        let machine = Machine::new(
            commerce.clone(),
            sessions.clone(),
            chat.clone(),
            Arc::new(catalog),
        );

        Self {
            machine,
            commerce,
            sessions,
            chat,
        }
    }

    async fn send_text(&self, text: &str) {
        let incoming = Incoming {
            user: USER,
            chat: ChatRef::new(USER.as_i64()),
            username: Some("greenfan".to_string()),
            interaction: None,
            screen_message: None,
            event: Event::from_message_text(text),
        };
        self.machine.handle(incoming).await.unwrap();
    }

    async fn press(&self, event: Event) {
        let incoming = Incoming {
            user: USER,
            chat: ChatRef::new(USER.as_i64()),
            username: Some("greenfan".to_string()),
            interaction: Some(InteractionId::new("q1")),
            screen_message: Some(MessageRef::new(1)),
            event,
        };
        self.machine.handle(incoming).await.unwrap();
    }

    async fn screen(&self) -> Screen {
        self.sessions.load(USER).await.unwrap().screen
    }
}

// ====== Tests ======

#[tokio::test]
async fn test_full_checkout_flow() {
    let h = Harness::new();

    h.send_text("/start").await;
    assert_eq!(h.screen().await, Screen::Menu);
    assert_eq!(
        h.chat.last_screen_text().unwrap(),
        "Привет! Выберите товар:"
    );

    h.press(Event::SelectProduct(0)).await;
    assert_eq!(h.screen().await, Screen::Description);

    h.press(Event::AddToCart).await;
    assert_eq!(
        h.chat.calls().last().unwrap(),
        &ChatCall::Answer {
            text: Some("Товар добавлен в корзину!".to_string()),
            alert: false,
        }
    );
    // Add keeps the user on the product screen.
    assert_eq!(h.screen().await, Screen::Description);

    h.press(Event::ShowCart).await;
    assert_eq!(h.screen().await, Screen::Cart);
    let cart_text = h.chat.last_screen_text().unwrap();
    assert!(cart_text.contains("Томаты"));
    assert!(cart_text.contains("Итого: 150 руб."));

    h.press(Event::Pay).await;
    assert_eq!(h.screen().await, Screen::AwaitingEmail);
    assert!(h
        .chat
        .calls()
        .contains(&ChatCall::Text("Пожалуйста, пришлите ваш email:".to_string())));

    h.send_text("buyer@example.com").await;
    assert_eq!(h.screen().await, Screen::Menu);
    let calls = h.chat.calls();
    assert!(calls.iter().any(|call| matches!(
        call,
        ChatCall::Text(text) if text.contains("buyer@example.com")
    )));

    // The paid cart is completed; the next cycle gets a fresh one.
    {
        let state = h.commerce.state.lock().unwrap();
        assert_eq!(state.carts.len(), 1);
        assert_eq!(state.carts[0].status, OrderStatus::Completed);
        assert_eq!(state.customers.len(), 1);
    }

    h.press(Event::SelectProduct(1)).await;
    h.press(Event::AddToCart).await;
    let state = h.commerce.state.lock().unwrap();
    assert_eq!(state.carts.len(), 2);
    assert_eq!(state.carts[1].status, OrderStatus::Active);
    assert_eq!(state.carts[1].items.len(), 1);
}

#[tokio::test]
async fn test_add_without_selection_never_touches_store() {
    let h = Harness::new();
    // A description-screen session with no selection only arises from
    // corrupted state, but the invariant still holds.
    h.sessions
        .store(
            USER,
            &Session {
                screen: Screen::Description,
                selected_product: None,
            },
        )
        .await
        .unwrap();

    h.press(Event::AddToCart).await;

    assert_eq!(
        h.chat.calls().last().unwrap(),
        &ChatCall::Answer {
            text: Some("Ошибка: товар не выбран".to_string()),
            alert: true,
        }
    );
    let state = h.commerce.state.lock().unwrap();
    assert_eq!(state.add_calls, 0);
    assert!(state.carts.is_empty());
}

#[tokio::test]
async fn test_out_of_range_product_index() {
    let h = Harness::new();
    h.send_text("/start").await;

    h.press(Event::SelectProduct(99)).await;

    assert_eq!(
        h.chat.calls().last().unwrap(),
        &ChatCall::Answer {
            text: Some("Ошибка: товар не найден".to_string()),
            alert: false,
        }
    );
    assert_eq!(h.screen().await, Screen::Menu);
}

#[tokio::test]
async fn test_removing_only_item_shows_empty_cart() {
    let h = Harness::new();
    h.send_text("/start").await;
    h.press(Event::SelectProduct(0)).await;
    h.press(Event::AddToCart).await;
    h.press(Event::ShowCart).await;

    let item = {
        let state = h.commerce.state.lock().unwrap();
        state.carts[0].items[0].0.clone()
    };
    h.press(Event::RemoveItem(item)).await;

    assert_eq!(h.chat.last_screen_text().unwrap(), "Ваша корзина пуста");
    assert_eq!(h.screen().await, Screen::Cart);
}

#[tokio::test]
async fn test_backend_failure_leaves_session_unchanged() {
    let h = Harness::new();
    h.send_text("/start").await;
    h.commerce.state.lock().unwrap().fail_cart_fetch = true;

    h.press(Event::ShowCart).await;

    assert_eq!(
        h.chat.calls().last().unwrap(),
        &ChatCall::Answer {
            text: Some("Ошибка при получении корзины".to_string()),
            alert: true,
        }
    );
    assert_eq!(h.screen().await, Screen::Menu);
}

#[tokio::test]
async fn test_failed_removal_keeps_cart_screen() {
    let h = Harness::new();
    h.send_text("/start").await;
    h.press(Event::SelectProduct(0)).await;
    h.press(Event::AddToCart).await;
    h.press(Event::ShowCart).await;

    let item = {
        let state = h.commerce.state.lock().unwrap();
        state.carts[0].items[0].0.clone()
    };
    h.commerce.state.lock().unwrap().fail_remove = true;
    let screens_before = h.chat.calls().len();

    h.press(Event::RemoveItem(item)).await;

    assert_eq!(
        h.chat.calls().last().unwrap(),
        &ChatCall::Answer {
            text: Some("Ошибка при удалении товара".to_string()),
            alert: true,
        }
    );
    // Only the alert; no re-render happened.
    assert_eq!(h.chat.calls().len(), screens_before + 1);
    assert_eq!(h.screen().await, Screen::Cart);
}

#[tokio::test]
async fn test_invalid_email_keeps_waiting() {
    let h = Harness::new();
    h.send_text("/start").await;
    h.press(Event::SelectProduct(0)).await;
    h.press(Event::AddToCart).await;
    h.press(Event::ShowCart).await;
    h.press(Event::Pay).await;

    h.send_text("not-an-email").await;

    assert_eq!(h.screen().await, Screen::AwaitingEmail);
    assert_eq!(
        h.chat.calls().last().unwrap(),
        &ChatCall::Text("Некорректный email. Пожалуйста, попробуйте еще раз:".to_string())
    );
    let state = h.commerce.state.lock().unwrap();
    assert!(state.customers.is_empty());
    assert_eq!(state.carts[0].status, OrderStatus::Active);
}

#[tokio::test]
async fn test_stale_button_is_silently_acknowledged() {
    let h = Harness::new();
    h.send_text("/start").await;

    // Pay button only exists on the cart screen.
    h.press(Event::Pay).await;

    assert_eq!(
        h.chat.calls().last().unwrap(),
        &ChatCall::Answer {
            text: None,
            alert: false,
        }
    );
    assert_eq!(h.screen().await, Screen::Menu);
}
