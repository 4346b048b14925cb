use async_trait::async_trait;

use crate::{
    callback::{self, CallbackData, MAX_CALLBACK_DATA_BYTES},
    command::{Keyboard, MessageFormat},
    domain::{ChatId, MessageRef},
    errors::Error,
    messaging::types::MessagingCapabilities,
    Result,
};

/// Cross-messenger port.
///
/// Implementations translate the generic keyboard model into native buttons,
/// encoding callback payloads with [`callback_payload`].
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        format: MessageFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef>;

    async fn edit_text(
        &self,
        msg: MessageRef,
        text: &str,
        format: MessageFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<()>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

/// Encode a button payload, rejecting anything over the wire limit.
pub fn callback_payload(data: &CallbackData) -> Result<String> {
    let payload = callback::serialize(data);
    if payload.len() > MAX_CALLBACK_DATA_BYTES {
        return Err(Error::CallbackTooLarge {
            size: payload.len(),
            payload,
            limit: MAX_CALLBACK_DATA_BYTES,
        });
    }
    Ok(payload)
}
