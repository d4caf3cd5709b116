use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{debug, error, info};

use crate::bot::commands::Command;
use crate::bot::keyboards::{channel_keyboard, vpn_keyboard};
use crate::bot::texts;
use crate::bot::utils::delivery::MessageForwarder;
use crate::services::broadcast_service::broadcast;
use crate::services::wizard_service::{Advance, WizardStep};
use crate::AppState;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    let Some(user_id) = msg.from.as_ref().map(|u| u.id.0 as i64) else {
        return Ok(());
    };
    debug!("Received message from {}: {:?}", user_id, msg.text());

    let command = msg.text().map(Command::parse);

    // An armed broadcast claims the admin's next message unless it is a command.
    let is_command = command.is_some_and(|c| c.is_command());
    if !is_command && state.admin.is_admin(user_id) && state.admin.take_broadcast(user_id).await {
        run_broadcast(&bot, &msg, &state).await;
        return Ok(());
    }

    let Some(command) = command else {
        return Ok(());
    };

    match command {
        Command::Start(arg) => handle_start(&bot, &msg, &state, user_id, arg).await,
        Command::Stats if state.admin.is_admin(user_id) => {
            match state.admin.stats_text().await {
                Ok(text) => reply_html(&bot, msg.chat.id, text).await,
                Err(e) => error!("Failed to count users: {:#}", e),
            }
        }
        Command::Users if state.admin.is_admin(user_id) => {
            match state.admin.user_list_text().await {
                Ok(text) => reply_html(&bot, msg.chat.id, text).await,
                Err(e) => error!("Failed to list users: {:#}", e),
            }
        }
        Command::Broadcast if state.admin.is_admin(user_id) => {
            state.admin.arm_broadcast(user_id).await;
            let _ = bot.send_message(msg.chat.id, texts::BROADCAST_PROMPT).await;
        }
        Command::AddPoints(args) if state.admin.is_admin(user_id) => {
            match state.admin.add_points(args).await {
                Ok(outcome) => {
                    let _ = bot.send_message(msg.chat.id, outcome.reply()).await;
                }
                Err(e) => error!("Failed to add points: {:#}", e),
            }
        }
        Command::Reply(text) => handle_wizard_reply(&bot, msg.chat.id, &state, user_id, text).await,
        // Admin commands from everyone else fall through here and get no answer.
        _ => {}
    }

    Ok(())
}

async fn handle_start(bot: &Bot, msg: &Message, state: &AppState, user_id: i64, arg: &str) {
    if let Err(e) = state.referrals.register(user_id, arg).await {
        error!("Failed to record referral for {}: {:#}", user_id, e);
    }
    if let Err(e) = state.ledger.ensure_user(user_id).await {
        error!("Failed to create user {} on /start: {:#}", user_id, e);
    }
    info!("User {} executed /start", user_id);

    let _ = bot
        .send_message(msg.chat.id, texts::JOIN_PROMPT)
        .parse_mode(ParseMode::Html)
        .reply_markup(channel_keyboard(&state.config.channels))
        .await
        .map_err(|e| error!("Failed to send channel prompt: {}", e));
}

async fn handle_wizard_reply(bot: &Bot, chat_id: ChatId, state: &AppState, user_id: i64, text: &str) {
    let (step, reply) = match state.wizard.submit_text(user_id, text).await {
        Advance::Ignored => return,
        Advance::Reprompt(WizardStep::Username) => (WizardStep::Username, texts::USERNAME_REQUIRED),
        Advance::Prompt(step) | Advance::Reprompt(step) => (step, texts::prompt_for(step)),
    };

    let request = bot.send_message(chat_id, reply).parse_mode(ParseMode::Html);
    let sent = if step == WizardStep::Vpn {
        request.reply_markup(vpn_keyboard()).await
    } else {
        request.await
    };
    if let Err(e) = sent {
        error!("Failed to send wizard prompt to {}: {}", user_id, e);
    }
}

async fn run_broadcast(bot: &Bot, msg: &Message, state: &AppState) {
    let recipients = match state.admin.recipients().await {
        Ok(ids) => ids,
        Err(e) => {
            error!("Failed to load broadcast audience: {:#}", e);
            return;
        }
    };

    let forwarder = MessageForwarder::new(bot.clone(), msg.chat.id, msg.id);
    let report = broadcast(&recipients, &forwarder).await;

    let _ = bot
        .send_message(
            msg.chat.id,
            format!("Broadcast sent to {} users.", report.delivered),
        )
        .await;
}

async fn reply_html(bot: &Bot, chat_id: ChatId, text: String) {
    let _ = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await
        .map_err(|e| error!("Failed to send reply: {}", e));
}
