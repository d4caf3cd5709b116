use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, ParseMode};
use tracing::{debug, error, info, warn};

use crate::bot::commands::CallbackAction;
use crate::bot::keyboards::main_menu;
use crate::bot::texts;
use crate::bot::utils::delivery::ChatSurface;
use crate::services::animation_service::{play, Script, TokioClock};
use crate::services::gate_service::GateOutcome;
use crate::services::referral_service::ReferralAward;
use crate::services::wizard_service::{EntryOutcome, WizardStep};
use crate::AppState;

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    info!("Received callback: {:?}", q.data);
    let callback_id = q.id.clone();
    let user_id = q.from.id.0 as i64;
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(user_id));

    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        let _ = bot.answer_callback_query(callback_id).await;
        return Ok(());
    };

    match action {
        CallbackAction::CheckChannels => match state.gate.check(user_id).await {
            Ok(GateOutcome::NotJoined) => {
                let _ = bot
                    .answer_callback_query(callback_id)
                    .text(texts::NOT_JOINED)
                    .show_alert(true)
                    .await;
            }
            Ok(GateOutcome::Verified { award, .. }) => {
                let _ = bot.answer_callback_query(callback_id).await;
                if let Some(msg) = &q.message {
                    let _ = bot.delete_message(msg.chat().id, msg.id()).await;
                }
                let _ = bot
                    .send_message(ChatId(user_id), texts::WELCOME)
                    .parse_mode(ParseMode::Html)
                    .reply_markup(main_menu())
                    .await
                    .map_err(|e| error!("Failed to send main menu: {}", e));
                if let Some(award) = award {
                    notify_referrer(&bot, award).await;
                }
            }
            Err(e) => {
                error!("Gate check failed for {}: {:#}", user_id, e);
                let _ = bot
                    .answer_callback_query(callback_id)
                    .text(texts::TRY_AGAIN)
                    .await;
            }
        },

        CallbackAction::ReferLink => {
            let _ = bot.answer_callback_query(callback_id).await;
            let _ = bot
                .send_message(chat_id, texts::referral_link(&state.bot_username, user_id))
                .parse_mode(ParseMode::Html)
                .await;
        }

        CallbackAction::MyPoints => {
            let _ = bot.answer_callback_query(callback_id).await;
            let (points, invites) = match state.ledger.find_user(user_id).await {
                Ok(Some(u)) => (u.points, u.invites),
                Ok(None) => (0, 0),
                Err(e) => {
                    error!("Failed to load points for {}: {:#}", user_id, e);
                    return Ok(());
                }
            };
            let _ = bot
                .send_message(chat_id, texts::points_summary(points, invites))
                .parse_mode(ParseMode::Html)
                .await;
        }

        CallbackAction::StartWizard => {
            let _ = bot.answer_callback_query(callback_id).await;
            let reply = match state.wizard.begin(user_id).await {
                Ok(EntryOutcome::Started { .. }) => texts::prompt_for(WizardStep::Username).to_string(),
                Ok(EntryOutcome::Insufficient { balance }) => texts::not_enough_points(balance),
                Err(e) => {
                    error!("Failed to start wizard for {}: {:#}", user_id, e);
                    texts::TRY_AGAIN.to_string()
                }
            };
            let _ = bot
                .send_message(chat_id, reply)
                .parse_mode(ParseMode::Html)
                .await;
        }

        CallbackAction::Vpn(use_vpn) => {
            let _ = bot.answer_callback_query(callback_id).await;
            let Some(answers) = state.wizard.choose_vpn(user_id, use_vpn).await else {
                return Ok(());
            };
            info!("Wizard finished for {}", user_id);
            debug!("Wizard answers for {}: {}", user_id, answers.summary());

            let script = Script::build(&answers, &mut rand::rng());
            // Runs detached so other updates keep flowing during the pauses.
            tokio::spawn(async move {
                let mut surface = ChatSurface::new(bot, chat_id);
                let report = play(&script, &mut surface, &TokioClock).await;
                info!(
                    "Animation for {} finished: {} frames, {} failed",
                    user_id, report.frames, report.failures
                );
            });
        }
    }

    Ok(())
}

/// Best-effort: the credit is already committed whatever happens here.
async fn notify_referrer(bot: &Bot, award: ReferralAward) {
    if let Err(e) = bot
        .send_message(ChatId(award.referrer_id), award.notification())
        .await
    {
        warn!("Could not notify referrer {}: {}", award.referrer_id, e);
    }
}
