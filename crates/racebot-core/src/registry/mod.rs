//! Handler registries.
//!
//! Handlers are grouped into named modules (one per feature area) that are
//! merged into a registry on demand. Both registries are idempotent: a module
//! or handler name is only ever registered once per registry instance.

pub mod callbacks;
pub mod commands;

pub use callbacks::{CallbackHandler, CallbackModule, CallbackRegistry};
pub use commands::{handler_fn, CommandHandler, CommandModule, CommandRegistry, CommandSet};
