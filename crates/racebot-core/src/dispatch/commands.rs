use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, error, warn};

use crate::{
    command::{CommandInput, CommandOutput},
    intercept::MessageInterceptor,
    registry::CommandRegistry,
    Result,
};

/// Prefix of the dynamic distance-filter command family (`/corridas_5km,10km`).
pub const DISTANCE_COMMAND_PREFIX: &str = "corridas_";

/// Handles `corridas_<distances>` commands, which never live in the registry.
#[async_trait]
pub trait DistanceFilterHandler: Send + Sync {
    async fn handle(&self, distances: Vec<u32>, input: CommandInput) -> Result<CommandOutput>;
}

fn distance_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(\d+)\s*(?:km)?$").expect("valid regex"))
}

/// Parse a `corridas_<d1>,<d2>,...` command name.
///
/// Each token may carry a `km` suffix. Non-numeric tokens are dropped and
/// duplicates collapse. Returns `None` unless at least one distance remains.
pub fn parse_distance_command(name: &str) -> Option<Vec<u32>> {
    let csv = name.strip_prefix(DISTANCE_COMMAND_PREFIX)?;

    let mut distances: Vec<u32> = Vec::new();
    for token in csv.split(',') {
        let Some(caps) = distance_token_re().captures(token.trim()) else {
            continue;
        };
        let Ok(d) = caps[1].parse::<u32>() else {
            continue;
        };
        if !distances.contains(&d) {
            distances.push(d);
        }
    }

    (!distances.is_empty()).then_some(distances)
}

/// Routes slash commands to their handlers.
pub struct CommandRouter {
    registry: RwLock<CommandRegistry>,
    initialized: OnceCell<()>,
    distance_filter: Arc<dyn DistanceFilterHandler>,
    interceptor: Arc<dyn MessageInterceptor>,
}

impl CommandRouter {
    pub fn new(
        registry: CommandRegistry,
        distance_filter: Arc<dyn DistanceFilterHandler>,
        interceptor: Arc<dyn MessageInterceptor>,
    ) -> Self {
        Self {
            registry: RwLock::new(registry),
            initialized: OnceCell::new(),
            distance_filter,
            interceptor,
        }
    }

    /// Dispatch one command. Never fails: not-found and handler errors map to
    /// fixed outputs.
    pub async fn route_command(&self, name: &str, input: CommandInput) -> CommandOutput {
        if let Err(e) = self.interceptor.intercept_incoming(name, &input).await {
            warn!(command = name, error = %e, "incoming message interception failed");
        }

        let user_id = input.user_id_for_log().to_string();
        match self.dispatch(name, input).await {
            Ok(output) => output,
            Err(e) => {
                error!(command = name, user_id = %user_id, error = %e, "command handler failed");
                CommandOutput::internal_error()
            }
        }
    }

    /// Registered command names, sorted. Populates the registry if needed.
    pub async fn commands(&self) -> Vec<String> {
        self.ensure_initialized().await;
        self.registry.read().await.get_all_commands()
    }

    async fn dispatch(&self, name: &str, input: CommandInput) -> Result<CommandOutput> {
        if let Some(distances) = parse_distance_command(name) {
            debug!(command = name, ?distances, "routing distance filter command");
            let output = self
                .distance_filter
                .handle(distances, input.clone())
                .await?;
            self.after_handler(name, &input, &output).await;
            return Ok(output);
        }

        self.ensure_initialized().await;
        let handler = self.registry.read().await.get_handler(name);
        let Some(handler) = handler else {
            warn!(command = name, user_id = %input.user_id_for_log(), "command not found");
            return Ok(CommandOutput::not_recognized());
        };

        let output = handler.handle(input.clone()).await?;
        self.after_handler(name, &input, &output).await;
        Ok(output)
    }

    async fn after_handler(&self, name: &str, input: &CommandInput, output: &CommandOutput) {
        if let Err(e) = self
            .interceptor
            .intercept_outgoing(name, input, output)
            .await
        {
            warn!(command = name, error = %e, "outgoing message interception failed");
        }
    }

    /// Populate the registry exactly once, even under concurrent first use.
    async fn ensure_initialized(&self) {
        self.initialized
            .get_or_init(|| async {
                self.registry.write().await.auto_register_commands();
            })
            .await;
    }
}
