use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::{
    callback::CallbackData,
    command::{CommandInput, CommandOutput},
    Result,
};

/// An inline-button handler.
///
/// Handlers are not keyed by prefix: the router asks each one in turn whether
/// it claims a payload, so one handler can own several related shapes or add
/// runtime conditions beyond the variant.
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    /// Unique name, used for idempotent registration and logs.
    fn name(&self) -> &str;

    fn can_handle(&self, data: &CallbackData) -> bool;

    /// `Ok(None)` means "nothing to render".
    async fn handle(&self, input: CommandInput) -> Result<Option<CommandOutput>>;
}

/// A feature area exporting callback handlers.
pub trait CallbackModule: Send + Sync {
    fn name(&self) -> &str;

    /// Build this module's handlers, in priority order.
    fn handlers(&self) -> Result<Vec<Arc<dyn CallbackHandler>>>;
}

/// Ordered list of callback handlers, populated module by module.
#[derive(Default)]
pub struct CallbackRegistry {
    modules: Vec<Arc<dyn CallbackModule>>,
    handlers: Vec<Arc<dyn CallbackHandler>>,
    handler_names: HashSet<String>,
    registered_modules: HashSet<String>,
}

impl CallbackRegistry {
    pub fn new(modules: Vec<Arc<dyn CallbackModule>>) -> Self {
        Self {
            modules,
            ..Self::default()
        }
    }

    /// Register every known module that is not registered yet.
    ///
    /// Returns the number of handlers added.
    pub fn auto_register_handlers(&mut self) -> usize {
        let modules = self.modules.clone();
        let mut added = 0;
        for module in modules {
            match self.register_module(module.as_ref()) {
                Ok(n) => added += n,
                Err(e) => {
                    error!(module = module.name(), error = %e, "failed to register callback module");
                }
            }
        }
        info!(
            added,
            total = self.handlers.len(),
            "callback registry populated"
        );
        added
    }

    /// Append one module's handlers. No-op if the module is already registered.
    pub fn register_module(&mut self, module: &dyn CallbackModule) -> Result<usize> {
        let module_name = module.name();
        if self.registered_modules.contains(module_name) {
            debug!(module = module_name, "callback module already registered");
            return Ok(0);
        }

        let mut added = 0;
        for handler in module.handlers()? {
            if self.register_handler(handler) {
                added += 1;
            }
        }

        self.registered_modules.insert(module_name.to_string());
        debug!(module = module_name, added, "callback module registered");
        Ok(added)
    }

    /// Append a single handler. Returns false if its name is taken.
    pub fn register_handler(&mut self, handler: Arc<dyn CallbackHandler>) -> bool {
        if !self.handler_names.insert(handler.name().to_string()) {
            warn!(
                handler = handler.name(),
                "callback handler already registered; skipping duplicate"
            );
            return false;
        }
        self.handlers.push(handler);
        true
    }

    /// First handler, in registration order, that claims `data`.
    pub fn find_handler(&self, data: &CallbackData) -> Option<Arc<dyn CallbackHandler>> {
        self.handlers.iter().find(|h| h.can_handle(data)).cloned()
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    pub fn is_module_registered(&self, module: &str) -> bool {
        self.registered_modules.contains(module)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Forget all handlers and registered modules. Test isolation only.
    pub fn clear_registry(&mut self) {
        self.handlers.clear();
        self.handler_names.clear();
        self.registered_modules.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PrefixHandler {
        name: &'static str,
        prefix: &'static str,
    }

    #[async_trait]
    impl CallbackHandler for PrefixHandler {
        fn name(&self) -> &str {
            self.name
        }

        fn can_handle(&self, data: &CallbackData) -> bool {
            data.prefix() == self.prefix
        }

        async fn handle(&self, _input: CommandInput) -> Result<Option<CommandOutput>> {
            Ok(Some(CommandOutput::html(self.name)))
        }
    }

    struct Module(&'static str, Vec<(&'static str, &'static str)>);

    impl CallbackModule for Module {
        fn name(&self) -> &str {
            self.0
        }

        fn handlers(&self) -> Result<Vec<Arc<dyn CallbackHandler>>> {
            Ok(self
                .1
                .iter()
                .map(|&(name, prefix)| {
                    Arc::new(PrefixHandler { name, prefix }) as Arc<dyn CallbackHandler>
                })
                .collect())
        }
    }

    #[test]
    fn registration_is_idempotent_per_module_and_name() {
        let races: Arc<dyn CallbackModule> =
            Arc::new(Module("races", vec![("details", "rd"), ("filter", "rf")]));
        let dupes: Arc<dyn CallbackModule> =
            Arc::new(Module("dupes", vec![("details", "rl"), ("location", "rl")]));
        let mut reg = CallbackRegistry::new(vec![races.clone(), dupes]);

        assert_eq!(reg.auto_register_handlers(), 3);
        assert_eq!(reg.register_module(races.as_ref()).unwrap(), 0);
        assert_eq!(reg.auto_register_handlers(), 0);
        assert_eq!(reg.handler_names(), vec!["details", "filter", "location"]);
    }

    #[test]
    fn find_handler_scans_in_registration_order() {
        let mut reg = CallbackRegistry::default();
        reg.register_handler(Arc::new(PrefixHandler {
            name: "first",
            prefix: "rd",
        }));
        reg.register_handler(Arc::new(PrefixHandler {
            name: "second",
            prefix: "rd",
        }));

        let data = CallbackData::RaceDetails {
            race_id: "1".to_string(),
        };
        assert_eq!(reg.find_handler(&data).unwrap().name(), "first");
        assert!(reg
            .find_handler(&CallbackData::RacesList { distance: None })
            .is_none());
    }

    #[test]
    fn clear_registry_resets_everything() {
        let mut reg = CallbackRegistry::new(vec![Arc::new(Module("m", vec![("h", "rd")]))]);
        reg.auto_register_handlers();
        reg.clear_registry();
        assert!(reg.is_empty());
        assert!(!reg.is_module_registered("m"));
        assert_eq!(reg.auto_register_handlers(), 1);
    }
}
