//! Telegram transport.
//!
//! Maps Telegram updates to [`Incoming`] events, runs the long-polling
//! dispatcher, and implements [`ChatPort`] on top of the Bot API. All
//! conversation logic stays in [`crate::machine`]; the one decision made
//! here is answering malformed callback tokens, which never become events.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId, User,
};
use teloxide::update_listeners::Polling;
use tracing::{error, info, warn};

use greengrocer_core::TelegramId;

use crate::events::Event;
use crate::machine::Machine;
use crate::transport::{ChatError, ChatPort, ChatRef, Incoming, InteractionId, MessageRef};
use crate::views::ScreenView;

const POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// [`ChatPort`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramChat {
    bot: Bot,
}

impl TelegramChat {
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn api_error(e: teloxide::RequestError) -> ChatError {
    ChatError::Api(e.to_string())
}

fn keyboard(view: &ScreenView) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(view.keyboard.iter().map(|row| {
        row.iter()
            .map(|button| {
                InlineKeyboardButton::callback(button.label.clone(), button.callback.clone())
            })
            .collect::<Vec<_>>()
    }))
}

#[async_trait]
impl ChatPort for TelegramChat {
    async fn answer(
        &self,
        interaction: &InteractionId,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), ChatError> {
        let id = CallbackQueryId(interaction.clone().into_inner());
        let mut request = self.bot.answer_callback_query(id);
        if let Some(text) = text {
            request = request.text(text);
        }
        if alert {
            request = request.show_alert(true);
        }
        request.await.map_err(api_error)?;
        Ok(())
    }

    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<(), ChatError> {
        self.bot
            .delete_message(ChatId(chat.as_i64()), MessageId(message.as_i32()))
            .await
            .map_err(api_error)?;
        Ok(())
    }

    async fn send_screen(
        &self,
        chat: ChatRef,
        view: &ScreenView,
        photo: Option<Vec<u8>>,
    ) -> Result<MessageRef, ChatError> {
        let chat = ChatId(chat.as_i64());
        let markup = keyboard(view);

        let sent = match photo {
            Some(bytes) => {
                self.bot
                    .send_photo(chat, InputFile::memory(bytes))
                    .caption(view.text.clone())
                    .reply_markup(markup)
                    .await
            }
            None => {
                self.bot
                    .send_message(chat, view.text.clone())
                    .reply_markup(markup)
                    .await
            }
        }
        .map_err(api_error)?;

        Ok(MessageRef::new(sent.id.0))
    }

    async fn send_text(&self, chat: ChatRef, text: &str) -> Result<(), ChatError> {
        self.bot
            .send_message(ChatId(chat.as_i64()), text)
            .await
            .map_err(api_error)?;
        Ok(())
    }
}

// ====== Update mapping ======

fn sender_id(user: &User) -> Option<TelegramId> {
    i64::try_from(user.id.0).ok().map(TelegramId::new)
}

async fn on_message(machine: Machine, msg: Message) -> ResponseResult<()> {
    let Some(user) = &msg.from else {
        return respond(());
    };
    let Some(id) = sender_id(user) else {
        return respond(());
    };
    let Some(text) = msg.text() else {
        return respond(());
    };

    let incoming = Incoming {
        user: id,
        chat: ChatRef::new(msg.chat.id.0),
        username: user.username.clone(),
        interaction: None,
        screen_message: None,
        event: Event::from_message_text(text),
    };

    if let Err(e) = machine.handle(incoming).await {
        error!(error = %e, "message handling failed");
    }
    respond(())
}

async fn on_callback(machine: Machine, bot: Bot, query: CallbackQuery) -> ResponseResult<()> {
    let Some(id) = sender_id(&query.from) else {
        return respond(());
    };
    let Some(message) = &query.message else {
        // The origin message is too old for the API to reference.
        bot.answer_callback_query(query.id).await?;
        return respond(());
    };

    let event = query.data.as_deref().and_then(Event::parse_callback);
    let Some(event) = event else {
        warn!(data = ?query.data, "unrecognized callback token");
        bot.answer_callback_query(query.id)
            .text("Неизвестное действие")
            .show_alert(true)
            .await?;
        return respond(());
    };

    let incoming = Incoming {
        user: id,
        chat: ChatRef::new(message.chat().id.0),
        username: query.from.username.clone(),
        interaction: Some(InteractionId::new(query.id.0.clone())),
        screen_message: Some(MessageRef::new(message.id().0)),
        event,
    };

    if let Err(e) = machine.handle(incoming).await {
        error!(error = %e, "callback handling failed");
    }
    respond(())
}

/// Run the long-polling dispatcher until shutdown (Ctrl-C).
pub async fn run(bot: Bot, machine: Machine) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let machine = machine.clone();
            move |msg: Message| {
                let machine = machine.clone();
                async move { on_message(machine, msg).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let machine = machine.clone();
            let bot = bot.clone();
            move |query: CallbackQuery| {
                let machine = machine.clone();
                let bot = bot.clone();
                async move { on_callback(machine, bot, query).await }
            }
        }));

    let listener = Polling::builder(bot.clone()).timeout(POLL_TIMEOUT).build();

    info!("dispatcher started");
    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("update listener error"),
        )
        .await;
    info!("dispatcher stopped");
}
