use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use gatebot_db::{LedgerStore, MemoryLedger, PgLedger};
use reqwest::Url;
use teloxide::prelude::*;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod bot;
mod config;
mod services;
mod state;
mod web;

use crate::bot::utils::channel_check::TelegramMembership;
use crate::config::{BotConfig, UpdateMode};
pub use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatebot=info,gatebot_db=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting gatebot v{}", env!("CARGO_PKG_VERSION"));
    let config = BotConfig::load()?;
    tracing::info!("Mode: {:?}", config.mode);
    tracing::info!(
        "Channels: {} (verifying {})",
        config.channels.len(),
        config.gate_channel().map(|c| c.chat.as_str()).unwrap_or("-")
    );

    let ledger: Arc<dyn LedgerStore> = match &config.database_url {
        Some(url) => {
            let pool = gatebot_db::connect(url, config.max_connections).await?;
            Arc::new(PgLedger::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory ledger; data is lost on restart");
            Arc::new(MemoryLedger::new())
        }
    };

    let bot = Bot::new(&config.bot_token);
    let me = bot
        .get_me()
        .await
        .context("Bot failed to connect to Telegram, check BOT_TOKEN")?;
    let bot_username = me.username.clone().unwrap_or_else(|| "unknown".into());
    tracing::info!("Bot connected as: @{}", bot_username);

    let (shutdown_tx, _) = broadcast::channel(1);
    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl-C received, shutting down");
                let _ = shutdown_tx.send(());
            }
        });
    }

    let mode = config.mode;
    let port = config.listen_port;
    let secret = config.webhook_secret.clone();
    let webhook_url = config.webhook_url();

    let probe = Arc::new(TelegramMembership::new(bot.clone()));
    let state = AppState::new(config, &bot_username, ledger, probe);

    match mode {
        UpdateMode::Polling => {
            let web_state = web::WebState {
                secret: None,
                updates: None,
            };
            let server = tokio::spawn(web::serve(port, web_state, shutdown_tx.subscribe()));
            bot::run_polling(bot, shutdown_tx.subscribe(), state).await;
            let _ = shutdown_tx.send(());
            server.await??;
        }
        UpdateMode::Webhook => {
            let url = webhook_url.context("webhook mode requires PUBLIC_URL")?;
            let url = Url::parse(&url).with_context(|| format!("Invalid webhook url {}", url))?;

            let mut request = bot.set_webhook(url.clone());
            if let Some(secret) = &secret {
                request = request.secret_token(secret.clone());
            }
            request.await.context("Failed to register webhook")?;
            tracing::info!("Webhook registered at {}", url);

            let (tx, rx) = mpsc::channel(256);
            let consumer = tokio::spawn(bot::run_webhook_consumer(
                bot,
                rx,
                shutdown_tx.subscribe(),
                state,
            ));
            let web_state = web::WebState {
                secret,
                updates: Some(tx),
            };
            web::serve(port, web_state, shutdown_tx.subscribe()).await?;
            let _ = shutdown_tx.send(());
            consumer.await?;
        }
    }

    tracing::info!("Stopped");
    Ok(())
}

