//! Cross-messenger abstractions (Telegram today; WhatsApp later).

pub mod adapter;
pub mod port;
pub mod throttled;
pub mod types;
