use anyhow::{anyhow, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode};

use crate::services::animation_service::StatusSurface;
use crate::services::broadcast_service::Forwarder;

/// Renders the animation into one chat, editing a single tracked message.
pub struct ChatSurface {
    bot: Bot,
    chat_id: ChatId,
    current: Option<MessageId>,
}

impl ChatSurface {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self {
            bot,
            chat_id,
            current: None,
        }
    }
}

#[async_trait]
impl StatusSurface for ChatSurface {
    async fn post(&mut self, text: &str) -> Result<()> {
        let msg = self
            .bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::Html)
            .await?;
        self.current = Some(msg.id);
        Ok(())
    }

    async fn edit(&mut self, text: &str) -> Result<()> {
        let id = self.current.ok_or_else(|| anyhow!("no status message to edit"))?;
        self.bot
            .edit_message_text(self.chat_id, id, text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    async fn remove(&mut self) -> Result<()> {
        if let Some(id) = self.current.take() {
            self.bot.delete_message(self.chat_id, id).await?;
        }
        Ok(())
    }

    async fn deliver(&mut self, text: &str) -> Result<()> {
        self.bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}

/// Forwards one admin message to each recipient.
pub struct MessageForwarder {
    bot: Bot,
    from_chat: ChatId,
    message_id: MessageId,
}

impl MessageForwarder {
    pub fn new(bot: Bot, from_chat: ChatId, message_id: MessageId) -> Self {
        Self {
            bot,
            from_chat,
            message_id,
        }
    }
}

#[async_trait]
impl Forwarder for MessageForwarder {
    async fn forward_to(&self, recipient: i64) -> Result<()> {
        self.bot
            .forward_message(ChatId(recipient), self.from_chat, self.message_id)
            .await?;
        Ok(())
    }
}
