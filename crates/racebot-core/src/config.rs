use std::{env, time::Duration};

use crate::{errors::Error, Result};

/// Log output format for `logging::init`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Typed configuration for the bot, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,

    // Backend API
    pub backend_url: String,
    pub backend_api_key: Option<String>,
    pub backend_timeout: Duration,

    // Presentation
    pub races_page_size: usize,

    // Logging
    pub log_format: LogFormat,

    // Outbound throttling
    pub throttle_global: Duration,
    pub throttle_per_chat: Duration,
}

impl Config {
    /// Load from the process environment, after applying `.env` if present.
    ///
    /// Existing environment variables win over `.env` entries.
    pub fn load() -> Result<Self> {
        // A missing .env is normal in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment, map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;

        let backend_url = get("BACKEND_URL")
            .unwrap_or_else(|| "http://localhost:3001".to_string())
            .trim_end_matches('/')
            .to_string();
        let backend_api_key = get("BACKEND_API_KEY");
        let backend_timeout =
            Duration::from_millis(parse_num(&get, "BACKEND_TIMEOUT_MS")?.unwrap_or(10_000));

        let races_page_size = parse_num::<usize>(&get, "RACES_PAGE_SIZE")?
            .unwrap_or(5)
            .clamp(1, 20);

        let log_format = match get("LOG_FORMAT").map(|s| s.to_lowercase()).as_deref() {
            None | Some("pretty") | Some("text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(Error::Config(format!(
                    "LOG_FORMAT must be `pretty` or `json`, got `{other}`"
                )))
            }
        };

        // Defaults stay under Telegram's ~30 msg/s global and 1 msg/s per chat limits.
        let throttle_global =
            Duration::from_millis(parse_num(&get, "THROTTLE_GLOBAL_MS")?.unwrap_or(40));
        let throttle_per_chat =
            Duration::from_millis(parse_num(&get, "THROTTLE_PER_CHAT_MS")?.unwrap_or(1050));

        Ok(Self {
            telegram_bot_token,
            backend_url,
            backend_api_key,
            backend_timeout,
            races_page_size,
            log_format,
            throttle_global,
            throttle_per_chat,
        })
    }
}

fn parse_num<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got `{raw}`")))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
