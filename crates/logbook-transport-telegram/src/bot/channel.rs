//! Telegram implementation of the engine's channel.

use async_trait::async_trait;
use logbook_core::channel::{Channel, ChannelError};
use logbook_core::render::{ButtonGrid, Screen};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};

/// Renders engine screens into one Telegram chat. One instance lives
/// for one dispatch.
pub struct TelegramChannel {
    bot: Bot,
    chat_id: ChatId,
    /// Message the triggering callback came from; the edit target.
    edit_target: Option<MessageId>,
}

impl TelegramChannel {
    #[must_use]
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self {
            bot,
            chat_id,
            edit_target: None,
        }
    }

    #[must_use]
    pub fn with_edit_target(bot: Bot, chat_id: ChatId, message_id: MessageId) -> Self {
        Self {
            bot,
            chat_id,
            edit_target: Some(message_id),
        }
    }

    fn markup(grid: &ButtonGrid) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(grid.iter().map(|row| {
            row.iter()
                .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.tag.clone()))
                .collect::<Vec<_>>()
        }))
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    async fn reply(&self, screen: &Screen) -> Result<(), ChannelError> {
        let mut request = self
            .bot
            .send_message(self.chat_id, screen.text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(grid) = &screen.keyboard {
            request = request.reply_markup(Self::markup(grid));
        }
        request
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))?;
        Ok(())
    }

    async fn edit_in_place(&self, screen: &Screen) -> Result<(), ChannelError> {
        // Callbacks from messages the bot can no longer reach degrade
        // to a fresh message.
        let Some(message_id) = self.edit_target else {
            return self.reply(screen).await;
        };
        let mut request = self
            .bot
            .edit_message_text(self.chat_id, message_id, screen.text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(grid) = &screen.keyboard {
            request = request.reply_markup(Self::markup(grid));
        }
        match request.await {
            Ok(_) => Ok(()),
            // Re-rendering an identical screen is not an error.
            Err(e) if e.to_string().contains("message is not modified") => Ok(()),
            Err(e) => Err(ChannelError::Edit(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TelegramChannel;
    use logbook_core::render::Button;

    #[test]
    fn test_markup_preserves_grid_shape() {
        let grid = vec![
            vec![
                Button::new("Video", "video"),
                Button::new("Photo", "photo"),
            ],
            vec![Button::new("Back", "back")],
        ];
        let markup = TelegramChannel::markup(&grid);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[0][0].text, "Video");
        assert_eq!(markup.inline_keyboard[1][0].text, "Back");
    }
}
