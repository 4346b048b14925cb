//! Core domain + dispatch logic for the race bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the backend API
//! live behind ports (traits) implemented in adapter crates.

pub mod callback;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod handlers;
pub mod intercept;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
