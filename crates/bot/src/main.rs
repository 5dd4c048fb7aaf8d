//! Process entry point: load config, snapshot the catalog, wire the
//! stores and the transport together, then run the dispatcher.

use std::sync::Arc;

use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use greengrocer_bot::catalog::Catalog;
use greengrocer_bot::config::BotConfig;
use greengrocer_bot::error::Result;
use greengrocer_bot::machine::Machine;
use greengrocer_bot::session::RedisSessionStore;
use greengrocer_bot::strapi::{StrapiClient, StrapiError};
use greengrocer_bot::telegram::{self, TelegramChat};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("greengrocer_bot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        error!(error = %e, "startup failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = BotConfig::from_env()?;
    info!(backend = %config.strapi_base_url, "configuration loaded");

    let client = StrapiClient::new(&config)?;

    // The menu references products by index into this snapshot, so an
    // unreachable or empty backend is fatal rather than degraded.
    let products = client.fetch_catalog().await?;
    if products.is_empty() {
        return Err(StrapiError::MissingData("catalog is empty".to_string()).into());
    }
    info!(products = products.len(), "catalog loaded");

    let catalog = Catalog::new(products, config.strapi_base_url.clone());
    let sessions = RedisSessionStore::connect(&config.redis_url).await?;
    info!("session store connected");

    let bot = Bot::new(config.tg_token());
    let chat = TelegramChat::new(bot.clone());

    let machine = Machine::new(
        Arc::new(client),
        Arc::new(sessions),
        Arc::new(chat),
        Arc::new(catalog),
    );

    telegram::run(bot, machine).await;
    Ok(())
}
