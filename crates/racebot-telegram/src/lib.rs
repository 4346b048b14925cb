//! Telegram binding (teloxide).
//!
//! Implements the `racebot-core` MessagingPort over the Telegram Bot API and
//! feeds updates into the core dispatchers.

use async_trait::async_trait;

use reqwest::Url;
use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
    ApiError, RequestError,
};

use tokio::time::sleep;
use tracing::warn;

pub mod handlers;
pub mod router;

use racebot_core::{
    command::{ButtonAction, Keyboard, MessageFormat},
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::{callback_payload, MessagingPort},
        types::MessagingCapabilities,
    },
    Result,
};

/// Telegram rejects longer texts.
pub const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    /// Run a request, waiting out one `RetryAfter` before giving up.
    async fn with_retry<T, Fut>(
        &self,
        mut op: impl FnMut() -> Fut,
    ) -> std::result::Result<T, RequestError>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    warn!(retry_after = ?d, "telegram rate limit hit; retrying");
                    sleep(d).await;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

/// Parse mode for a format. Plain text carries none.
pub fn parse_mode(format: MessageFormat) -> Option<ParseMode> {
    match format {
        MessageFormat::Html => Some(ParseMode::Html),
        MessageFormat::Markdown => Some(ParseMode::MarkdownV2),
        MessageFormat::Plain => None,
    }
}

/// Translate the generic keyboard into Telegram inline buttons.
pub fn inline_markup(keyboard: &Keyboard) -> Result<InlineKeyboardMarkup> {
    let mut rows = Vec::with_capacity(keyboard.rows.len());
    for row in &keyboard.rows {
        let mut buttons = Vec::with_capacity(row.len());
        for button in row {
            let tg = match &button.action {
                ButtonAction::Callback(data) => {
                    InlineKeyboardButton::callback(button.text.clone(), callback_payload(data)?)
                }
                ButtonAction::Url(url) => {
                    let url = Url::parse(url)
                        .map_err(|e| Error::External(format!("invalid button url {url:?}: {e}")))?;
                    InlineKeyboardButton::url(button.text.clone(), url)
                }
            };
            buttons.push(tg);
        }
        if !buttons.is_empty() {
            rows.push(buttons);
        }
    }
    Ok(InlineKeyboardMarkup::new(rows))
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            supports_markdown: true,
            supports_edit: true,
            supports_inline_keyboards: true,
            max_message_len: MAX_MESSAGE_LEN,
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        format: MessageFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef> {
        let markup = keyboard.map(inline_markup).transpose()?;
        let mode = parse_mode(format);

        let msg = self
            .with_retry(|| {
                let mut req = self.bot.send_message(Self::tg_chat(chat_id), text.to_string());
                if let Some(mode) = mode {
                    req = req.parse_mode(mode);
                }
                if let Some(markup) = markup.clone() {
                    req = req.reply_markup(markup);
                }
                req
            })
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        format: MessageFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let markup = keyboard.map(inline_markup).transpose()?;
        let mode = parse_mode(format);

        let result = self
            .with_retry(|| {
                let mut req = self.bot.edit_message_text(
                    Self::tg_chat(msg.chat_id),
                    Self::tg_msg_id(msg.message_id),
                    text.to_string(),
                );
                if let Some(mode) = mode {
                    req = req.parse_mode(mode);
                }
                if let Some(markup) = markup.clone() {
                    req = req.reply_markup(markup);
                }
                req
            })
            .await;

        match result {
            // Pressing the same button twice re-renders identical content.
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(Self::map_err(e)),
        }
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.with_retry(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(t) = text {
                req = req.text(t.to_string());
            }
            req
        })
        .await
        .map_err(Self::map_err)?;
        Ok(())
    }
}
