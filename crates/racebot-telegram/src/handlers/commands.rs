use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::{debug, error};

use racebot_core::{
    domain::{ChatId, MessageId},
    messaging::types::Command,
};

use crate::router::AppState;

use super::user_ref;

pub async fn handle_command(
    _bot: Bot,
    msg: Message,
    name: String,
    args: Vec<String>,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    debug!(chat_id, command = %name, "command received");

    let command = Command {
        chat_id: ChatId(chat_id),
        user: msg.from().map(user_ref),
        message_id: Some(MessageId(msg.id.0)),
        name,
        args,
        raw: serde_json::to_value(&msg).unwrap_or_default(),
    };
    let name = command.name.clone();

    if let Err(e) = state.adapter.handle_command(command).await {
        error!(chat_id, command = %name, error = %e, "failed to deliver command reply");
    }
    Ok(())
}
