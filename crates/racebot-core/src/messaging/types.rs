use crate::domain::{ChatId, MessageId, MessageRef, UserRef};

/// Inbound slash command, as normalized by a platform adapter.
#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub user: Option<UserRef>,
    pub message_id: Option<MessageId>,
    /// Command name without the leading `/` or `@botname` suffix.
    pub name: String,
    pub args: Vec<String>,
    pub raw: serde_json::Value,
}

/// Inbound inline-button press.
#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub chat_id: ChatId,
    pub user: Option<UserRef>,
    pub callback_id: String,
    pub data: String,
    /// The message carrying the keyboard, if the platform still has it.
    pub message: Option<MessageRef>,
    pub raw: serde_json::Value,
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_html: bool,
    pub supports_markdown: bool,
    pub supports_edit: bool,
    pub supports_inline_keyboards: bool,
    pub max_message_len: usize,
}

/// Split a command line (`/cmd@bot a b`) into name and positional args.
///
/// The name keeps its case. Returns `None` when the text is not a slash
/// command, or when it is addressed to a bot other than `bot_username`.
pub fn parse_command_line(
    text: &str,
    bot_username: Option<&str>,
) -> Option<(String, Vec<String>)> {
    let rest = text.trim().strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let first = parts.next()?;
    let (name, addressee) = match first.split_once('@') {
        Some((name, addressee)) => (name, Some(addressee)),
        None => (first, None),
    };
    if name.is_empty() {
        return None;
    }
    // Telegram usernames compare case-insensitively.
    if let (Some(addressee), Some(me)) = (addressee, bot_username) {
        if !addressee.eq_ignore_ascii_case(me) {
            return None;
        }
    }

    Some((name.to_string(), parts.map(str::to_string).collect()))
}
