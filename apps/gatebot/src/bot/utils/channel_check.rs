use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Recipient, UserId};

use crate::services::gate_service::{MemberStatus, MembershipProbe};

/// `getChatMember` against the live Bot API.
pub struct TelegramMembership {
    bot: Bot,
}

impl TelegramMembership {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MembershipProbe for TelegramMembership {
    async fn status(&self, channel: &str, user_id: i64) -> Result<MemberStatus> {
        let member = self
            .bot
            .get_chat_member(channel_recipient(channel)?, UserId(user_id as u64))
            .await
            .with_context(|| format!("getChatMember failed for {} in {}", user_id, channel))?;

        let kind = &member.kind;
        let status = if kind.is_owner() {
            MemberStatus::Creator
        } else if kind.is_administrator() {
            MemberStatus::Administrator
        } else if kind.is_member() {
            MemberStatus::Member
        } else {
            tracing::debug!("User {} in {} has status {:?}", user_id, channel, kind);
            MemberStatus::Other
        };
        Ok(status)
    }
}

/// `@username` or a numeric chat id such as `-1001234567890`.
pub fn channel_recipient(channel: &str) -> Result<Recipient> {
    let channel = channel.trim();
    if channel.starts_with('@') {
        return Ok(Recipient::ChannelUsername(channel.to_string()));
    }
    let id: i64 = channel
        .parse()
        .with_context(|| format!("Invalid channel reference: {:?}", channel))?;
    Ok(Recipient::Id(ChatId(id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_and_ids_are_both_accepted() {
        assert_eq!(
            channel_recipient("@news").unwrap(),
            Recipient::ChannelUsername("@news".to_string())
        );
        assert_eq!(
            channel_recipient("-1001234567890").unwrap(),
            Recipient::Id(ChatId(-1001234567890))
        );
        assert!(channel_recipient("news").is_err());
    }
}
