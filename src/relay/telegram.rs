//! Chat transport: the outbound half of the bot.

use std::future::Future;

use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};
use tracing::{info, warn};

use crate::relay::format::Button;

/// What the relay needs from a chat platform. Returns the sent message id.
pub trait ChatTransport: Send + Sync {
    fn send_text(&self, chat_id: i64, text: &str) -> impl Future<Output = Result<i64, String>> + Send;

    /// Send a photo with an HTML caption and one row of link buttons.
    fn send_photo(
        &self,
        chat_id: i64,
        image_ref: &str,
        caption: &str,
        buttons: &[Button],
    ) -> impl Future<Output = Result<i64, String>> + Send;

    fn send_button_message(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Button],
    ) -> impl Future<Output = Result<i64, String>> + Send;
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Single keyboard row. Buttons whose link Telegram would reject are dropped.
fn keyboard(buttons: &[Button]) -> InlineKeyboardMarkup {
    let row: Vec<InlineKeyboardButton> = buttons
        .iter()
        .filter_map(|b| match Url::parse(&b.url) {
            Ok(url) => Some(InlineKeyboardButton::url(b.label.clone(), url)),
            Err(e) => {
                warn!("Dropping button '{}' with bad url {:?}: {e}", b.label, b.url);
                None
            }
        })
        .collect();
    InlineKeyboardMarkup::new(vec![row])
}

impl ChatTransport for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64, String> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                msg
            })
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        image_ref: &str,
        caption: &str,
        buttons: &[Button],
    ) -> Result<i64, String> {
        info!("📷 Sending photo to chat {} ({} buttons)", chat_id, buttons.len());

        let url = Url::parse(image_ref).map_err(|e| {
            let msg = format!("Invalid image url {:?}: {e}", image_ref);
            warn!("{}", msg);
            msg
        })?;

        self.bot
            .send_photo(ChatId(chat_id), InputFile::url(url))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard(buttons))
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| {
                let msg = format!("Failed to send photo: {e}");
                warn!("{}", msg);
                msg
            })
    }

    async fn send_button_message(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Button],
    ) -> Result<i64, String> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .reply_markup(keyboard(buttons))
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| {
                let msg = format!("Failed to send buttons: {e}");
                warn!("{}", msg);
                msg
            })
    }
}
