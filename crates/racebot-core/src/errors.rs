use crate::callback::CodecError;

/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the dispatch
/// core can handle failures consistently (user-facing message vs log-only).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("callback codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("callback payload `{payload}` is {size} bytes (limit {limit})")]
    CallbackTooLarge {
        payload: String,
        size: usize,
        limit: usize,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
