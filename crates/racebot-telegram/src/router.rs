use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};
use tracing::{info, warn};

use racebot_core::{
    command::Platform,
    config::Config,
    dispatch::{CallbackRouter, CommandRouter},
    handlers::BOT_COMMANDS,
    messaging::{
        adapter::BotAdapter,
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<BotAdapter>,
    /// Used to skip `/cmd@OtherBot` in groups. Unknown if `get_me` failed.
    pub bot_username: Option<String>,
}

pub fn bot_commands() -> Vec<BotCommand> {
    BOT_COMMANDS
        .iter()
        .map(|(name, description)| BotCommand::new(*name, *description))
        .collect()
}

pub async fn run_polling(
    cfg: Arc<Config>,
    commands: Arc<CommandRouter>,
    callbacks: Arc<CallbackRouter>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            info!(username = %me.username(), "racebot started");
            me.user.username.clone()
        }
        Err(e) => {
            warn!(error = %e, "get_me failed; continuing");
            None
        }
    };

    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        warn!(error = %e, "failed to publish the command menu");
    }

    // Throttle outbound calls to stay under Telegram's flood limits. The
    // Telegram adapter still retries once on RetryAfter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::from(cfg.as_ref()),
    ));

    let registered = commands.commands().await;
    info!(commands = registered.len(), "command registry ready");

    let state = Arc::new(AppState {
        adapter: Arc::new(BotAdapter::new(
            messenger,
            commands,
            callbacks,
            Platform::Telegram,
        )),
        bot_username,
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            tracing::debug!(update_id = upd.id, "ignoring unsupported update");
        })
        .build()
        .dispatch()
        .await;

    Ok(())
}
