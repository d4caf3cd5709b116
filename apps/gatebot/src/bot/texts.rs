use crate::services::wizard_service::{WizardStep, ENTRY_FEE};

pub const JOIN_PROMPT: &str = "<b>🔒 To use the bot, please join all channels below:</b>";
pub const NOT_JOINED: &str = "❌ Please join all channels first!";
pub const TRY_AGAIN: &str = "⚠️ Something went wrong, please try again.";
pub const WELCOME: &str = "<b>🎉 Welcome!</b>\n\n\
    Choose an option below to get started. Earn points by inviting friends, \
    check your points, or start a lookup!";
pub const USERNAME_REQUIRED: &str =
    "❗️ <b>Username is required!</b>\nPlease enter the username to continue.";
pub const BROADCAST_PROMPT: &str = "Please send the message you want to broadcast to all users. \
    It will be forwarded as-is. (Text, photo, video, etc. supported)";

pub fn prompt_for(step: WizardStep) -> &'static str {
    match step {
        WizardStep::Username => {
            "👤 <b>Enter the target username:</b>\n\n\
             Please provide the username (e.g. <code>target_user123</code>). \
             This is required to continue."
        }
        WizardStep::Name => "📝 <b>Enter the target's name:</b>\n(Or type /skip to skip)",
        WizardStep::Age => "🎂 <b>Enter the target's age:</b>\n(Or type /skip to skip)",
        WizardStep::Email => "📧 <b>Enter the target's email (if known):</b>\n(Or type /skip to skip)",
        WizardStep::Phone => {
            "📱 <b>Enter the target's phone number (if known):</b>\n(Or type /skip to skip)"
        }
        WizardStep::Count => {
            "🔢 <b>How many attempts? (max 100,000)</b>\n(Or type /skip to skip)"
        }
        WizardStep::Vpn => "🌐 <b>Should we use VPN?</b>",
    }
}

pub fn not_enough_points(balance: i64) -> String {
    format!(
        "❌ <b>Not enough points!</b>\nYou need at least {} points to use this feature \
         (you have {}).\n\nInvite friends using your referral link to earn more points!",
        ENTRY_FEE, balance
    )
}

pub fn referral_link(bot_username: &str, user_id: i64) -> String {
    let link = format!("https://t.me/{}?start={}", bot_username, user_id);
    format!(
        "🔗 <b>Your personal referral link:</b>\n<code>{}</code>\n\n\
         👥 Share this link with your friends! When they join and verify, \
         you'll earn points automatically.",
        link
    )
}

pub fn points_summary(points: i64, invites: i64) -> String {
    format!(
        "💰 <b>Your Points:</b> <b>{}</b>\n👥 <b>Total Invites:</b> <b>{}</b>\n\n\
         Keep inviting friends to earn more points and unlock more features!",
        points, invites
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_is_named_in_rejection() {
        assert!(not_enough_points(0).contains("at least 2 points"));
    }

    #[test]
    fn referral_link_points_at_bot() {
        assert!(referral_link("gate_bot", 42).contains("https://t.me/gate_bot?start=42"));
    }

    #[test]
    fn optional_prompts_mention_skip() {
        for step in [WizardStep::Name, WizardStep::Age, WizardStep::Email, WizardStep::Phone, WizardStep::Count] {
            assert!(prompt_for(step).contains("/skip"), "{:?}", step);
        }
        assert!(!prompt_for(WizardStep::Username).contains("/skip"));
    }
}
