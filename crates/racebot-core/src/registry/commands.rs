use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::Arc,
};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::{
    command::{CommandInput, CommandOutput},
    Result,
};

/// An async slash-command handler.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, input: CommandInput) -> Result<CommandOutput>;
}

/// Command name → handler pairs exported by a module.
pub type CommandSet = Vec<(String, Arc<dyn CommandHandler>)>;

/// A feature area exporting a set of commands.
pub trait CommandModule: Send + Sync {
    fn name(&self) -> &str;

    /// Build this module's commands. Failing here only skips this module.
    fn commands(&self) -> Result<CommandSet>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(CommandInput) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CommandOutput>> + Send,
{
    async fn handle(&self, input: CommandInput) -> Result<CommandOutput> {
        (self.0)(input).await
    }
}

/// Wrap an async closure as a command handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(CommandInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CommandOutput>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Command name → handler map, populated module by module.
#[derive(Default)]
pub struct CommandRegistry {
    modules: Vec<Arc<dyn CommandModule>>,
    commands: HashMap<String, Arc<dyn CommandHandler>>,
    registered_modules: HashSet<String>,
}

impl CommandRegistry {
    /// Create an empty registry that knows about `modules`.
    ///
    /// Nothing is registered until `auto_register_commands` runs.
    pub fn new(modules: Vec<Arc<dyn CommandModule>>) -> Self {
        Self {
            modules,
            ..Self::default()
        }
    }

    /// Register every known module that is not registered yet.
    ///
    /// A module that fails to build its commands is logged and skipped; the
    /// remaining modules still register. Returns the number of commands added.
    pub fn auto_register_commands(&mut self) -> usize {
        let modules = self.modules.clone();
        let mut added = 0;
        for module in modules {
            match self.register_module(module.as_ref()) {
                Ok(n) => added += n,
                Err(e) => {
                    error!(module = module.name(), error = %e, "failed to register command module");
                }
            }
        }
        info!(added, total = self.commands.len(), "command registry populated");
        added
    }

    /// Merge one module's commands. No-op if the module is already registered.
    ///
    /// Names that already exist are kept and the new handler is skipped.
    pub fn register_module(&mut self, module: &dyn CommandModule) -> Result<usize> {
        let module_name = module.name();
        if self.registered_modules.contains(module_name) {
            debug!(module = module_name, "command module already registered");
            return Ok(0);
        }

        let mut added = 0;
        for (name, handler) in module.commands()? {
            if self.commands.contains_key(&name) {
                warn!(
                    module = module_name,
                    command = %name,
                    "command already registered; skipping duplicate"
                );
                continue;
            }
            self.commands.insert(name, handler);
            added += 1;
        }

        self.registered_modules.insert(module_name.to_string());
        debug!(module = module_name, added, "command module registered");
        Ok(added)
    }

    /// Exact, case-sensitive lookup.
    pub fn get_handler(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands.get(name).cloned()
    }

    /// All registered command names, sorted.
    pub fn get_all_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn is_module_registered(&self, module: &str) -> bool {
        self.registered_modules.contains(module)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Forget all commands and registered modules. Test isolation only.
    pub fn clear_registry(&mut self) {
        self.commands.clear();
        self.registered_modules.clear();
    }
}
