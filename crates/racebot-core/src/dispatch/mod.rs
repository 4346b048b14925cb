//! Routers that resolve inbound events to registered handlers.
//!
//! Both routers are infallible towards their caller: missing handlers and
//! handler errors are turned into fixed user-facing outputs.

pub mod callbacks;
pub mod commands;

pub use callbacks::CallbackRouter;
pub use commands::{parse_distance_command, CommandRouter, DistanceFilterHandler};
