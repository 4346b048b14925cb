//! Telegram update handlers.
//!
//! Each handler normalizes a teloxide update into the core's inbound model
//! and hands it to the platform adapter. Handlers never fail the dispatcher:
//! errors are logged and the update is dropped.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message, User},
};

use racebot_core::{domain::UserRef, messaging::types::parse_command_line};

use crate::router::AppState;

mod callback;
mod commands;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let me = state.bot_username.as_deref();
    let Some((name, args)) = msg.text().and_then(|t| parse_command_line(t, me)) else {
        // Only slash commands for this bot are routed; free text is ignored.
        return Ok(());
    };
    commands::handle_command(bot, msg, name, args, state).await
}

pub(crate) fn user_ref(user: &User) -> UserRef {
    UserRef::new(user.id.0 as i64, Some(user.full_name()))
}
