use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, error, warn};

use crate::{
    callback::CallbackData,
    command::{CommandInput, CommandOutput},
    registry::CallbackRegistry,
};

/// Routes decoded button presses to the first handler that claims them.
pub struct CallbackRouter {
    registry: RwLock<CallbackRegistry>,
    initialized: OnceCell<()>,
}

impl CallbackRouter {
    pub fn new(registry: CallbackRegistry) -> Self {
        Self {
            registry: RwLock::new(registry),
            initialized: OnceCell::new(),
        }
    }

    /// Dispatch one callback.
    ///
    /// `None` is a legitimate outcome meaning "render nothing". Unknown
    /// payloads and handler errors map to fixed outputs.
    pub async fn handle_callback(
        &self,
        data: CallbackData,
        input: CommandInput,
    ) -> Option<CommandOutput> {
        self.ensure_initialized().await;

        let handler = self.registry.read().await.find_handler(&data);
        let Some(handler) = handler else {
            warn!(
                callback = %data,
                user_id = %input.user_id_for_log(),
                "no callback handler found"
            );
            return Some(CommandOutput::action_not_found());
        };

        let prefix = data.prefix();
        let user_id = input.user_id_for_log().to_string();
        debug!(handler = handler.name(), callback = %data, "routing callback");

        match handler.handle(input.with_callback_data(data)).await {
            Ok(output) => output,
            Err(e) => {
                error!(
                    handler = handler.name(),
                    callback = prefix,
                    user_id = %user_id,
                    error = %e,
                    "callback handler failed"
                );
                Some(CommandOutput::internal_error())
            }
        }
    }

    /// Registered handler names in dispatch order. Populates the registry if needed.
    pub async fn handler_names(&self) -> Vec<String> {
        self.ensure_initialized().await;
        self.registry.read().await.handler_names()
    }

    async fn ensure_initialized(&self) {
        self.initialized
            .get_or_init(|| async {
                self.registry.write().await.auto_register_handlers();
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        command::{Platform, ACTION_NOT_FOUND_TEXT, INTERNAL_ERROR_TEXT},
        errors::Error,
        registry::{CallbackHandler, CallbackModule},
        Result,
    };

    /// Claims every race-details payload and counts its invocations.
    struct Counting {
        name: &'static str,
        calls: AtomicUsize,
        reply: Option<&'static str>,
    }

    impl Counting {
        fn new(name: &'static str, reply: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
                reply,
            })
        }
    }

    #[async_trait]
    impl CallbackHandler for Counting {
        fn name(&self) -> &str {
            self.name
        }

        fn can_handle(&self, data: &CallbackData) -> bool {
            matches!(data, CallbackData::RaceDetails { .. })
        }

        async fn handle(&self, input: CommandInput) -> Result<Option<CommandOutput>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(input.callback_data.is_some());
            Ok(self.reply.map(CommandOutput::html))
        }
    }

    struct Failing;

    #[async_trait]
    impl CallbackHandler for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn can_handle(&self, data: &CallbackData) -> bool {
            matches!(data, CallbackData::RacesFilter { .. })
        }

        async fn handle(&self, _input: CommandInput) -> Result<Option<CommandOutput>> {
            Err(Error::Backend("timeout".to_string()))
        }
    }

    struct Handlers(Vec<Arc<dyn CallbackHandler>>);

    impl CallbackModule for Handlers {
        fn name(&self) -> &str {
            "test"
        }

        fn handlers(&self) -> Result<Vec<Arc<dyn CallbackHandler>>> {
            Ok(self.0.clone())
        }
    }

    fn router(handlers: Vec<Arc<dyn CallbackHandler>>) -> CallbackRouter {
        CallbackRouter::new(CallbackRegistry::new(vec![Arc::new(Handlers(handlers))]))
    }

    fn details() -> CallbackData {
        CallbackData::RaceDetails {
            race_id: "123".to_string(),
        }
    }

    #[tokio::test]
    async fn first_registered_match_wins() {
        let first = Counting::new("first", Some("first"));
        let second = Counting::new("second", Some("second"));
        let r = router(vec![first.clone(), second.clone()]);

        let out = r
            .handle_callback(details(), CommandInput::new(Platform::Telegram))
            .await
            .unwrap();

        assert_eq!(out.text, "first");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_match_yields_action_not_found() {
        let r = router(vec![Counting::new("details", Some("x"))]);
        let out = r
            .handle_callback(
                CallbackData::RacesList { distance: None },
                CommandInput::new(Platform::Telegram),
            )
            .await
            .unwrap();
        assert_eq!(out.text, ACTION_NOT_FOUND_TEXT);
    }

    #[tokio::test]
    async fn none_is_passed_through() {
        let r = router(vec![Counting::new("silent", None)]);
        let out = r
            .handle_callback(details(), CommandInput::new(Platform::Telegram))
            .await;
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn handler_errors_become_internal_error_output() {
        let r = router(vec![Arc::new(Failing)]);
        let out = r
            .handle_callback(
                CallbackData::RacesFilter { distance: 5 },
                CommandInput::new(Platform::Telegram),
            )
            .await
            .unwrap();
        assert_eq!(out.text, INTERNAL_ERROR_TEXT);
        assert_eq!(r.handler_names().await, vec!["failing"]);
    }
}
