//! Pre/post dispatch hooks.
//!
//! Interceptors run around every routed command. Their failures are logged by
//! the router and never block the response.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    command::{CommandInput, CommandOutput},
    ports::{MessageDirection, MessageHistory, MessageRecord},
    Result,
};

#[async_trait]
pub trait MessageInterceptor: Send + Sync {
    async fn intercept_incoming(&self, command: &str, input: &CommandInput) -> Result<()>;

    async fn intercept_outgoing(
        &self,
        command: &str,
        input: &CommandInput,
        output: &CommandOutput,
    ) -> Result<()>;
}

/// Does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopInterceptor;

#[async_trait]
impl MessageInterceptor for NoopInterceptor {
    async fn intercept_incoming(&self, _command: &str, _input: &CommandInput) -> Result<()> {
        Ok(())
    }

    async fn intercept_outgoing(
        &self,
        _command: &str,
        _input: &CommandInput,
        _output: &CommandOutput,
    ) -> Result<()> {
        Ok(())
    }
}

/// Persists both sides of every command to the chat history store.
pub struct HistoryInterceptor {
    history: Arc<dyn MessageHistory>,
}

impl HistoryInterceptor {
    pub fn new(history: Arc<dyn MessageHistory>) -> Self {
        Self { history }
    }
}

#[async_trait]
impl MessageInterceptor for HistoryInterceptor {
    async fn intercept_incoming(&self, command: &str, input: &CommandInput) -> Result<()> {
        let mut text = format!("/{command}");
        for arg in &input.args {
            text.push(' ');
            text.push_str(arg);
        }
        self.history
            .record(MessageRecord::new(
                MessageDirection::Incoming,
                input.user.as_ref(),
                command,
                text,
                input.platform,
            ))
            .await
    }

    async fn intercept_outgoing(
        &self,
        command: &str,
        input: &CommandInput,
        output: &CommandOutput,
    ) -> Result<()> {
        let text = output.rendered_texts().collect::<Vec<_>>().join("\n\n");
        self.history
            .record(MessageRecord::new(
                MessageDirection::Outgoing,
                input.user.as_ref(),
                command,
                text,
                input.platform,
            ))
            .await
    }
}
