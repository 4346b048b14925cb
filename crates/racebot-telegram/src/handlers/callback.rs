use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, warn};

use racebot_core::{
    command::ACTION_NOT_FOUND_TEXT,
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        adapter::PlatformAdapter, port::MessagingPort, types::CallbackQuery as InboundCallback,
    },
};

use crate::router::AppState;

use super::user_ref;

fn inbound(q: &CallbackQuery) -> Option<InboundCallback> {
    let data = q.data.clone().filter(|d| !d.is_empty())?;
    let message = q.message.as_ref().map(|m| MessageRef {
        chat_id: ChatId(m.chat.id.0),
        message_id: MessageId(m.id.0),
    });
    // Without the original message, answer in the user's private chat.
    let chat_id = message
        .map(|m| m.chat_id)
        .unwrap_or(ChatId(q.from.id.0 as i64));

    Some(InboundCallback {
        chat_id,
        user: Some(user_ref(&q.from)),
        callback_id: q.id.clone(),
        data,
        message,
        raw: serde_json::to_value(q).unwrap_or_default(),
    })
}

/// Answer a query. Failures are logged, never propagated.
async fn answer(messenger: &dyn MessagingPort, callback_id: &str, toast: Option<&str>) -> bool {
    match messenger.answer_callback_query(callback_id, toast).await {
        Ok(()) => true,
        Err(e) => {
            warn!(callback_id, error = %e, "answer_callback_query failed");
            false
        }
    }
}

pub async fn handle_callback(
    _bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let messenger = state.adapter.messenger();

    let Some(query) = inbound(&q) else {
        answer(messenger.as_ref(), &q.id, None).await;
        return Ok(());
    };
    let data = query.data.clone();
    let user_id = q.from.id.0;

    // Always answer the query so the client stops its spinner.
    let toast = match state.adapter.handle_callback(query).await {
        Ok(_) => None,
        Err(Error::Codec(e)) => {
            warn!(callback = %data, user_id, error = %e, "undecodable callback payload");
            Some(ACTION_NOT_FOUND_TEXT)
        }
        Err(e) => {
            error!(callback = %data, user_id, error = %e, "failed to render callback result");
            None
        }
    };
    answer(messenger.as_ref(), &q.id, toast).await;
    Ok(())
}
