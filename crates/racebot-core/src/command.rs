//! Platform-neutral command input/output model.

use crate::{
    callback::CallbackData,
    domain::{MessageId, UserRef},
};

/// Shown when no command handler matches.
pub const NOT_RECOGNIZED_TEXT: &str =
    "❌ Comando não reconhecido. Use /ajuda para ver os comandos disponíveis.";

/// Shown when a handler failed unexpectedly.
pub const INTERNAL_ERROR_TEXT: &str =
    "❌ Ocorreu um erro interno. Tente novamente em alguns instantes.";

/// Shown when a button press no longer maps to any handler.
pub const ACTION_NOT_FOUND_TEXT: &str = "⚠️ Ação não encontrada ou expirada.";

/// Messaging platform an event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    Telegram,
    Whatsapp,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Whatsapp => "whatsapp",
        }
    }
}

/// Normalized inbound event, built per event by the platform adapter.
#[derive(Clone, Debug)]
pub struct CommandInput {
    pub user: Option<UserRef>,
    pub args: Vec<String>,
    pub platform: Platform,
    /// Raw platform payload. Opaque to the core.
    pub raw: serde_json::Value,
    pub callback_data: Option<CallbackData>,
    /// Needed for edit-in-place responses.
    pub message_id: Option<MessageId>,
}

impl CommandInput {
    pub fn new(platform: Platform) -> Self {
        Self {
            user: None,
            args: Vec::new(),
            platform,
            raw: serde_json::Value::Null,
            callback_data: None,
            message_id: None,
        }
    }

    pub fn with_user(mut self, user: UserRef) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }

    pub fn with_message_id(mut self, message_id: Option<MessageId>) -> Self {
        self.message_id = message_id;
        self
    }

    pub fn with_callback_data(mut self, data: CallbackData) -> Self {
        self.callback_data = Some(data);
        self
    }

    /// User id as text, for logs. `-` when anonymous.
    pub fn user_id_for_log(&self) -> &str {
        self.user.as_ref().map(|u| u.id.0.as_str()).unwrap_or("-")
    }
}

/// How the platform should render `CommandOutput::text`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MessageFormat {
    #[default]
    Html,
    Markdown,
    Plain,
}

/// What a button does when pressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(CallbackData),
    Url(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(text: impl Into<String>, data: CallbackData) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Callback(data),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Ordered rows of buttons.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    /// Convenience for "one button per row" layouts.
    pub fn one_per_row(buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    /// Appends a row, skipping empty ones.
    pub fn push_row(&mut self, row: Vec<Button>) {
        if !row.is_empty() {
            self.rows.push(row);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.is_empty())
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

/// Normalized handler result, rendered by the platform adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub format: MessageFormat,
    /// When non-empty, sent in order instead of `text`.
    pub messages: Vec<String>,
    pub keyboard: Option<Keyboard>,
    /// Edit the originating message instead of sending a new one.
    pub edit_message: bool,
}

impl CommandOutput {
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: MessageFormat::Html,
            messages: Vec::new(),
            keyboard: None,
            edit_message: false,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            format: MessageFormat::Plain,
            ..Self::html(text)
        }
    }

    pub fn not_recognized() -> Self {
        Self::html(NOT_RECOGNIZED_TEXT)
    }

    pub fn internal_error() -> Self {
        Self::html(INTERNAL_ERROR_TEXT)
    }

    pub fn action_not_found() -> Self {
        Self::html(ACTION_NOT_FOUND_TEXT)
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = (!keyboard.is_empty()).then_some(keyboard);
        self
    }

    pub fn with_messages(mut self, messages: Vec<String>) -> Self {
        self.messages = messages;
        self
    }

    pub fn editing(mut self) -> Self {
        self.edit_message = true;
        self
    }

    /// The texts that actually reach the chat: `messages` if any, else `text`.
    pub fn rendered_texts(&self) -> impl Iterator<Item = &str> {
        let texts: &[String] = if self.messages.is_empty() {
            std::slice::from_ref(&self.text)
        } else {
            &self.messages
        };
        texts.iter().map(String::as_str)
    }
}
