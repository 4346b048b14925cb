//! Text helpers shared by handlers and platform adapters.

use std::sync::OnceLock;

use regex::Regex;

use crate::command::MessageFormat;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Reverse of [`escape_html`], plus the numeric apostrophe entity.
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("valid regex"))
}

fn markdown_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid regex"))
}

/// Remove all markup so the text can be sent with no parse mode.
///
/// Used as the fallback when the platform rejects formatted text.
pub fn strip_markup(text: &str, format: MessageFormat) -> String {
    match format {
        MessageFormat::Plain => text.to_string(),
        MessageFormat::Html => unescape_html(&html_tag_re().replace_all(text, "")),
        MessageFormat::Markdown => {
            let text = markdown_link_re().replace_all(text, "$1 ($2)");
            text.chars()
                .filter(|c| !matches!(c, '*' | '_' | '`' | '~'))
                .collect()
        }
    }
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        assert_eq!(escape_html("<b>&\""), "&lt;b&gt;&amp;&quot;");
        assert_eq!(unescape_html(&escape_html("a < b & \"c\"")), "a < b & \"c\"");
    }

    #[test]
    fn strips_html_tags_and_entities() {
        let html = "🏃 <b>Maratona</b> de <i>Porto Alegre</i>\n<a href=\"https://x.y\">site</a> &amp; mais";
        assert_eq!(
            strip_markup(html, MessageFormat::Html),
            "🏃 Maratona de Porto Alegre\nsite & mais"
        );
    }

    #[test]
    fn strips_markdown() {
        assert_eq!(
            strip_markup("*Corrida* _10km_ [mapa](https://maps.example)", MessageFormat::Markdown),
            "Corrida 10km mapa (https://maps.example)"
        );
        assert_eq!(strip_markup("<b>", MessageFormat::Plain), "<b>");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("Meia Maratona", 20), "Meia Maratona");
        assert_eq!(truncate_chars("Circuito das Estações", 10), "Circuit...");
    }
}
