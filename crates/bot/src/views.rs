//! Pure rendering of conversation screens.
//!
//! Functions here map domain data to display payloads - text plus an
//! inline button grid - with no I/O and no state. The transport decides
//! how to put a [`ScreenView`] on the wire; image bytes are fetched by the
//! machine only when a view carries an image URL.

use url::Url;

use crate::catalog::Catalog;
use crate::events::tokens;
use crate::strapi::{CartContents, Product};

/// One inline button: a label and the callback token it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub callback: String,
}

impl Button {
    fn new(label: impl Into<String>, callback: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback: callback.into(),
        }
    }
}

/// A rendered screen: message text, optional image, and the button grid
/// (one inner `Vec` per keyboard row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenView {
    pub text: String,
    pub image: Option<Url>,
    pub keyboard: Vec<Vec<Button>>,
}

/// The catalog menu: one button per product plus the persistent cart
/// button. The greeting variant is used for `/start`, the plain one when
/// returning from another screen.
#[must_use]
pub fn menu(catalog: &Catalog, greet: bool) -> ScreenView {
    let text = if greet {
        "Привет! Выберите товар:"
    } else {
        "Выберите товар:"
    };

    let mut keyboard: Vec<Vec<Button>> = catalog
        .products()
        .iter()
        .enumerate()
        .map(|(index, product)| vec![Button::new(&product.title, tokens::product(index))])
        .collect();
    keyboard.push(vec![Button::new("Моя корзина", tokens::SHOW_CART)]);

    ScreenView {
        text: text.to_string(),
        image: None,
        keyboard,
    }
}

/// A single product detail with its image (when resolvable).
#[must_use]
pub fn product_detail(product: &Product, image: Option<Url>) -> ScreenView {
    let text = format!(
        "{} ({} за кг)\n\n{}",
        product.title, product.price, product.description
    );

    ScreenView {
        text,
        image,
        keyboard: vec![
            vec![Button::new("Добавить в корзину", tokens::ADD_TO_CART)],
            vec![Button::new("Моя корзина", tokens::SHOW_CART)],
            vec![Button::new("Назад", tokens::BACK_TO_MENU)],
        ],
    }
}

/// The cart: one line per item with a per-item remove button, a decimal
/// total, and the pay/back row.
#[must_use]
pub fn cart(contents: &CartContents) -> ScreenView {
    let mut text = String::from("Ваша корзина:\n\n");
    let mut keyboard: Vec<Vec<Button>> = Vec::with_capacity(contents.lines.len() + 2);

    for line in &contents.lines {
        let quantity = line.quantity.normalize();
        text.push_str(&format!(
            "{}\n{} кг × {} = {}\n\n",
            line.product.title,
            quantity,
            line.product.price,
            line.line_total()
        ));
        keyboard.push(vec![Button::new(
            format!("Удалить {}", line.product.title),
            tokens::remove_item(&line.id),
        )]);
    }

    text.push_str(&format!("Итого: {}", contents.total()));

    keyboard.push(vec![Button::new("Оплатить", tokens::PAY)]);
    keyboard.push(vec![Button::new("В меню", tokens::BACK_TO_MENU)]);

    ScreenView {
        text,
        image: None,
        keyboard,
    }
}

/// The empty-cart view: fixed text and a single back button.
#[must_use]
pub fn empty_cart() -> ScreenView {
    ScreenView {
        text: "Ваша корзина пуста".to_string(),
        image: None,
        keyboard: vec![vec![Button::new("Назад", tokens::BACK_TO_MENU)]],
    }
}
