use teloxide::{dptree, prelude::*, types::{Update, UpdateKind}};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};

pub mod commands;
pub mod handlers;
pub mod keyboards;
pub mod texts;
pub mod utils;

/// Long-polling mode: teloxide owns the update loop.
pub async fn run_polling(bot: Bot, mut shutdown_signal: broadcast::Receiver<()>, state: crate::AppState) {
    info!("Starting polling dispatcher...");

    if let Err(e) = bot.delete_webhook().await {
        error!("Failed to clear webhook before polling: {}", e);
    }

    let handler = Update::filter_message().endpoint(handlers::command::message_handler);
    let callback_handler =
        Update::filter_callback_query().endpoint(handlers::callback::callback_handler);

    let mut dispatcher = Dispatcher::builder(
        bot,
        dptree::entry().branch(handler).branch(callback_handler),
    )
    .dependencies(dptree::deps![state])
    .default_handler(|upd: std::sync::Arc<Update>| async move {
        debug!("Unhandled update: {:?}", upd.id);
    })
    .build();

    tokio::select! {
        _ = dispatcher.dispatch() => {
            info!("Bot dispatcher exited naturally");
        }
        _ = shutdown_signal.recv() => {
            info!("Bot received shutdown signal, stopping...");
        }
    }
}

/// Webhook mode: updates arrive from the HTTP layer. Each one is handled in
/// its own task so slow handlers never hold up the queue.
pub async fn run_webhook_consumer(
    bot: Bot,
    mut updates: mpsc::Receiver<Update>,
    mut shutdown_signal: broadcast::Receiver<()>,
    state: crate::AppState,
) {
    info!("Waiting for webhook updates...");
    loop {
        tokio::select! {
            next = updates.recv() => match next {
                Some(update) => {
                    let bot = bot.clone();
                    let state = state.clone();
                    tokio::spawn(dispatch_update(bot, update, state));
                }
                None => {
                    info!("Webhook update channel closed");
                    break;
                }
            },
            _ = shutdown_signal.recv() => {
                info!("Webhook consumer received shutdown signal, stopping...");
                break;
            }
        }
    }
}

pub async fn dispatch_update(bot: Bot, update: Update, state: crate::AppState) {
    let result = match update.kind {
        UpdateKind::Message(msg) => handlers::command::message_handler(bot, msg, state).await,
        UpdateKind::CallbackQuery(q) => handlers::callback::callback_handler(bot, q, state).await,
        _ => {
            debug!("Ignoring update {:?}", update.id);
            Ok(())
        }
    };
    if let Err(e) = result {
        error!("Update handler failed: {}", e);
    }
}
