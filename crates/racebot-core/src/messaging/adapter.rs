//! Platform adapter: renders `CommandOutput` through a `MessagingPort` and
//! feeds normalized inbound events to the routers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    callback,
    command::{CommandInput, CommandOutput, Keyboard, MessageFormat, Platform},
    dispatch::{CallbackRouter, CommandRouter},
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    formatting::strip_markup,
    messaging::{
        port::MessagingPort,
        types::{CallbackQuery, Command},
    },
    Result,
};

/// What every platform binding must offer the dispatch core.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Send `output.messages` in order when present, otherwise `output.text`.
    /// The keyboard goes on the last message. Returns the last message sent.
    async fn send_message(&self, chat_id: ChatId, output: &CommandOutput) -> Result<MessageRef>;

    /// Edit `message_id` in place, or send a new message when editing is not possible.
    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        output: &CommandOutput,
    ) -> Result<MessageRef>;

    /// Decode and dispatch a button press, then render the result.
    ///
    /// Returns `Ok(None)` when the handler chose to render nothing.
    async fn handle_callback(&self, query: CallbackQuery) -> Result<Option<MessageRef>>;
}

/// Default adapter over any [`MessagingPort`].
pub struct BotAdapter {
    messenger: Arc<dyn MessagingPort>,
    commands: Arc<CommandRouter>,
    callbacks: Arc<CallbackRouter>,
    platform: Platform,
}

impl BotAdapter {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        commands: Arc<CommandRouter>,
        callbacks: Arc<CallbackRouter>,
        platform: Platform,
    ) -> Self {
        Self {
            messenger,
            commands,
            callbacks,
            platform,
        }
    }

    pub fn messenger(&self) -> Arc<dyn MessagingPort> {
        self.messenger.clone()
    }

    pub fn commands(&self) -> &CommandRouter {
        &self.commands
    }

    /// Dispatch a slash command and send the result. Every command gets a reply.
    pub async fn handle_command(&self, command: Command) -> Result<MessageRef> {
        let input = CommandInput {
            user: command.user,
            args: command.args,
            platform: self.platform,
            raw: command.raw,
            callback_data: None,
            message_id: command.message_id,
        };
        let output = self.commands.route_command(&command.name, input).await;
        self.send_message(command.chat_id, &output).await
    }

    /// Send one message, retrying once as bare plain text if the platform rejects it.
    async fn send_part(
        &self,
        chat_id: ChatId,
        text: &str,
        format: MessageFormat,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef> {
        match self
            .messenger
            .send_text(chat_id, text, format, keyboard)
            .await
        {
            Ok(msg) => Ok(msg),
            Err(e) => {
                warn!(chat_id = chat_id.0, error = %e, "formatted send failed; retrying as plain text");
                let plain = strip_markup(text, format);
                self.messenger
                    .send_text(
                        chat_id,
                        &plain,
                        MessageFormat::Plain,
                        None,
                    )
                    .await
            }
        }
    }
}

#[async_trait]
impl PlatformAdapter for BotAdapter {
    async fn send_message(&self, chat_id: ChatId, output: &CommandOutput) -> Result<MessageRef> {
        let keyboard = if self.messenger.capabilities().supports_inline_keyboards {
            output.keyboard.as_ref()
        } else {
            None
        };

        let parts: Vec<&str> = output
            .rendered_texts()
            .filter(|t| !t.trim().is_empty())
            .collect();
        let Some((last, head)) = parts.split_last() else {
            return Err(Error::External("refusing to send an empty message".to_string()));
        };

        for part in head {
            self.send_part(chat_id, part, output.format, None).await?;
        }
        self.send_part(chat_id, last, output.format, keyboard).await
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        output: &CommandOutput,
    ) -> Result<MessageRef> {
        if !self.messenger.capabilities().supports_edit || !output.messages.is_empty() {
            debug!(chat_id = chat_id.0, "edit not possible; sending a new message");
            return self.send_message(chat_id, output).await;
        }

        let msg = MessageRef {
            chat_id,
            message_id,
        };
        let keyboard = output.keyboard.as_ref();
        if let Err(e) = self
            .messenger
            .edit_text(msg, &output.text, output.format, keyboard)
            .await
        {
            warn!(chat_id = chat_id.0, error = %e, "formatted edit failed; retrying as plain text");
            let plain = strip_markup(&output.text, output.format);
            self.messenger
                .edit_text(msg, &plain, MessageFormat::Plain, None)
                .await?;
        }
        Ok(msg)
    }

    async fn handle_callback(&self, query: CallbackQuery) -> Result<Option<MessageRef>> {
        let data = callback::deserialize(&query.data)?;
        let input = CommandInput {
            user: query.user,
            args: Vec::new(),
            platform: self.platform,
            raw: query.raw,
            callback_data: None,
            message_id: query.message.map(|m| m.message_id),
        };

        let Some(output) = self.callbacks.handle_callback(data, input).await else {
            return Ok(None);
        };

        let sent = match (output.edit_message, query.message) {
            (true, Some(msg)) => {
                self.edit_message(msg.chat_id, msg.message_id, &output)
                    .await?
            }
            _ => self.send_message(query.chat_id, &output).await?,
        };
        Ok(Some(sent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        callback::{CallbackData, CodecError},
        command::{Button, ACTION_NOT_FOUND_TEXT},
        domain::UserRef,
        intercept::NoopInterceptor,
        registry::{CallbackRegistry, CommandRegistry},
        testing::{FakeMessenger, FakeOp, StaticCallbacks, StaticDistanceFilter},
    };

    fn adapter(messenger: Arc<FakeMessenger>) -> BotAdapter {
        let commands = CommandRouter::new(
            CommandRegistry::default(),
            Arc::new(StaticDistanceFilter),
            Arc::new(NoopInterceptor),
        );
        let callbacks = CallbackRouter::new(CallbackRegistry::new(vec![Arc::new(StaticCallbacks)]));
        BotAdapter::new(
            messenger,
            Arc::new(commands),
            Arc::new(callbacks),
            Platform::Telegram,
        )
    }

    fn keyboard() -> Keyboard {
        Keyboard::one_per_row([Button::callback(
            "Detalhes",
            CallbackData::RaceDetails {
                race_id: "1".to_string(),
            },
        )])
    }

    fn query(data: &str, message: Option<MessageRef>) -> CallbackQuery {
        CallbackQuery {
            chat_id: ChatId(10),
            user: Some(UserRef::new(5_i64, None)),
            callback_id: "cb".to_string(),
            data: data.to_string(),
            message,
            raw: serde_json::Value::Null,
        }
    }

    fn msg(id: i32) -> MessageRef {
        MessageRef {
            chat_id: ChatId(10),
            message_id: MessageId(id),
        }
    }

    #[tokio::test]
    async fn messages_replace_text_with_keyboard_last() {
        let fake = Arc::new(FakeMessenger::default());
        let out = CommandOutput::html("summary")
            .with_messages(vec!["one".to_string(), "two".to_string(), "three".to_string()])
            .with_keyboard(keyboard());

        adapter(fake.clone()).send_message(ChatId(1), &out).await.unwrap();

        let ops = fake.ops();
        assert_eq!(ops.len(), 3);
        assert_eq!(fake.sent_texts(), vec!["one", "two", "three"]);
        assert!(matches!(&ops[0], FakeOp::Send { keyboard: None, .. }));
        assert!(matches!(&ops[2], FakeOp::Send { keyboard: Some(_), .. }));
    }

    #[tokio::test]
    async fn failed_formatted_send_falls_back_to_plain_text() {
        let fake = Arc::new(FakeMessenger::default());
        fake.fail_formatted(true);

        let out = CommandOutput::html("<b>Maratona</b> &amp; Meia").with_keyboard(keyboard());
        adapter(fake.clone()).send_message(ChatId(1), &out).await.unwrap();

        let ops = fake.ops();
        assert_eq!(ops.len(), 2);
        match &ops[1] {
            FakeOp::Send {
                text,
                format,
                keyboard,
                ..
            } => {
                assert_eq!(text, "Maratona & Meia");
                assert_eq!(*format, MessageFormat::Plain);
                assert!(keyboard.is_none());
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_keyboard_still_delivers_the_text() {
        let fake = Arc::new(FakeMessenger::default());
        fake.reject_keyboards(true);

        let out = CommandOutput::html("<b>Corrida</b>").with_keyboard(Keyboard::one_per_row([
            Button::url("Inscrições", "www.corrida.com.br"),
        ]));
        let sent = adapter(fake.clone()).send_message(ChatId(1), &out).await;

        assert!(sent.is_ok());
        let ops = fake.ops();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            FakeOp::Send { text, format: MessageFormat::Plain, keyboard: None, .. } if text == "Corrida"
        ));
    }

    #[tokio::test]
    async fn rejected_keyboard_on_edit_retries_without_it() {
        let fake = Arc::new(FakeMessenger::default());
        fake.reject_keyboards(true);

        let out = CommandOutput::html("<i>filtro</i>").with_keyboard(keyboard()).editing();
        let sent = adapter(fake.clone())
            .edit_message(ChatId(10), MessageId(3), &out)
            .await
            .unwrap();

        assert_eq!(sent, msg(3));
        assert!(matches!(
            &fake.ops()[..],
            [FakeOp::Edit { text, keyboard: None, .. }] if text == "filtro"
        ));
    }

    #[tokio::test]
    async fn oversized_keyboard_is_dropped_on_fallback() {
        let fake = Arc::new(FakeMessenger::default());
        let out = CommandOutput::html("x").with_keyboard(Keyboard::one_per_row([Button::callback(
            "big",
            CallbackData::RaceDetails {
                race_id: "z".repeat(100),
            },
        )]));

        adapter(fake.clone()).send_message(ChatId(1), &out).await.unwrap();

        let ops = fake.ops();
        assert_eq!(ops.len(), 1, "first attempt rejected before reaching the wire");
        assert!(matches!(&ops[0], FakeOp::Send { keyboard: None, .. }));
    }

    #[tokio::test]
    async fn edit_falls_back_to_send_when_unsupported() {
        let fake = Arc::new(FakeMessenger::default());
        fake.set_supports_edit(false);

        let sent = adapter(fake.clone())
            .edit_message(ChatId(10), MessageId(3), &CommandOutput::html("x").editing())
            .await
            .unwrap();

        assert_ne!(sent.message_id, MessageId(3));
        assert!(matches!(&fake.ops()[0], FakeOp::Send { .. }));
    }

    #[tokio::test]
    async fn callback_with_edit_flag_edits_in_place() {
        let fake = Arc::new(FakeMessenger::default());
        let sent = adapter(fake.clone())
            .handle_callback(query("rf:10", Some(msg(3))))
            .await
            .unwrap();

        assert_eq!(sent, Some(msg(3)));
        match &fake.ops()[0] {
            FakeOp::Edit { msg: m, text, .. } => {
                assert_eq!(*m, msg(3));
                assert_eq!(text, "filter 10");
            }
            other => panic!("unexpected op: {other:?}"),
        }
    }

    #[tokio::test]
    async fn callback_without_message_sends_new_message() {
        let fake = Arc::new(FakeMessenger::default());
        adapter(fake.clone())
            .handle_callback(query("rf:10", None))
            .await
            .unwrap();
        assert_eq!(fake.sent_texts(), vec!["filter 10"]);
    }

    #[tokio::test]
    async fn none_result_renders_nothing() {
        let fake = Arc::new(FakeMessenger::default());
        let sent = adapter(fake.clone())
            .handle_callback(query("ls", Some(msg(3))))
            .await
            .unwrap();
        assert_eq!(sent, None);
        assert!(fake.ops().is_empty());
    }

    #[tokio::test]
    async fn unknown_payload_is_a_codec_error() {
        let fake = Arc::new(FakeMessenger::default());
        let err = adapter(fake.clone())
            .handle_callback(query("zz:1", None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Codec(CodecError::UnrecognizedPrefix(_))
        ));
        assert!(fake.ops().is_empty());
    }

    #[tokio::test]
    async fn unclaimed_payload_renders_action_not_found() {
        let fake = Arc::new(FakeMessenger::default());
        adapter(fake.clone())
            .handle_callback(query("rd:1", None))
            .await
            .unwrap();
        assert_eq!(fake.sent_texts(), vec![ACTION_NOT_FOUND_TEXT]);
    }

    #[tokio::test]
    async fn commands_always_get_a_reply() {
        let fake = Arc::new(FakeMessenger::default());
        adapter(fake.clone())
            .handle_command(Command {
                chat_id: ChatId(1),
                user: None,
                message_id: None,
                name: "nope".to_string(),
                args: vec![],
                raw: serde_json::Value::Null,
            })
            .await
            .unwrap();
        assert_eq!(fake.sent_texts().len(), 1);
    }
}
