use std::sync::Arc;

use tracing::info;

use racebot_backend::BackendClient;
use racebot_core::{
    config::Config,
    dispatch::{CallbackRouter, CommandRouter},
    handlers::{self, Services},
    intercept::HistoryInterceptor,
    registry::{CallbackRegistry, CommandRegistry},
};

#[tokio::main]
async fn main() -> Result<(), racebot_core::Error> {
    let cfg = Arc::new(Config::load()?);
    racebot_core::logging::init("racebot", cfg.log_format)?;

    let backend = Arc::new(BackendClient::from_config(&cfg)?);
    info!(backend = %cfg.backend_url, page_size = cfg.races_page_size, "backend configured");

    let services = Services {
        races: backend.clone(),
        users: backend.clone(),
        favorites: backend.clone(),
        page_size: cfg.races_page_size,
    };

    let commands = Arc::new(CommandRouter::new(
        CommandRegistry::new(handlers::command_modules(&services)),
        handlers::distance_filter(&services),
        Arc::new(HistoryInterceptor::new(backend)),
    ));
    let callbacks = Arc::new(CallbackRouter::new(CallbackRegistry::new(
        handlers::callback_modules(&services),
    )));

    racebot_telegram::router::run_polling(cfg, commands, callbacks)
        .await
        .map_err(|e| racebot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
