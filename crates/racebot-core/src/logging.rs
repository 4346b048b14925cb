use tracing_subscriber::{fmt, EnvFilter};

use crate::{config::LogFormat, errors::Error, Result};

/// Initialize tracing for the bot.
///
/// Default: info for our crates, warn for everything else. Can be overridden
/// with `RUST_LOG`.
pub fn init(service_name: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,racebot=info,racebot_core=info,racebot_telegram=info,racebot_backend=info,{service_name}=info"
        ))
    });

    let res = match format {
        LogFormat::Pretty => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(true)
            .try_init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init(),
    };

    res.map_err(|e| Error::Config(format!("failed to install tracing subscriber: {e}")))
}
