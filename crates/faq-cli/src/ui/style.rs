//! Message styling for CLI output.
//!
//! | Prefix | Meaning | Color |
//! |--------|---------|-------|
//! | `[ok]` | Success | Green |
//! | `[err]` | Error | Red |
//! | `[warn]` | Warning | Yellow |
//! | `[info]` | Information | Blue |
//! | `[hint]` | Suggestion | Cyan |
//! | `[skip]` | Skipped | Dim |

use faq_core::Confidence;
use owo_colors::OwoColorize;

use super::color::ColorMode;

/// Message severity/type for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Ok,
    Err,
    Warn,
    Info,
    Hint,
    Skip,
}

impl MessageType {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
            Self::Skip => "[skip]",
        }
    }
}

/// Styling interface shared by all command handlers.
///
/// ```text
/// [ok] Trained vectorizer 3f2a9c1e
///      Documents: 124
///      Vocabulary: 1,812 terms
/// ```
#[derive(Debug, Clone)]
pub struct Style {
    color_mode: ColorMode,
}

impl Style {
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    pub fn colors_enabled(&self) -> bool {
        self.color_mode.is_enabled()
    }

    /// Format a message with its type prefix, e.g. `[ok] Done`.
    pub fn message(&self, msg_type: MessageType, text: &str) -> String {
        let prefix = msg_type.prefix();
        if !self.colors_enabled() {
            return format!("{} {}", prefix, text);
        }
        let colored_prefix = match msg_type {
            MessageType::Ok => prefix.green().to_string(),
            MessageType::Err => prefix.red().to_string(),
            MessageType::Warn => prefix.yellow().to_string(),
            MessageType::Info => prefix.blue().to_string(),
            MessageType::Hint => prefix.cyan().to_string(),
            MessageType::Skip => prefix.dimmed().to_string(),
        };
        format!("{} {}", colored_prefix, text)
    }

    /// Detail line under a message, indented to align with its text.
    pub fn message_detail(&self, label: &str, value: &str) -> String {
        format!("     {}: {}", label, value)
    }

    pub fn section(&self, title: &str) -> String {
        if self.colors_enabled() {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Error message followed by optional `Cause:` and `Hint:` lines.
    pub fn error_with_context(&self, msg: &str, cause: Option<&str>, hint: Option<&str>) -> String {
        let mut output = self.message(MessageType::Err, msg);
        if let Some(cause) = cause {
            output.push_str(&format!("\n      Cause: {}", cause));
        }
        if let Some(hint) = hint {
            output.push_str(&format!("\n      Hint: {}", hint));
        }
        output
    }

    pub fn key_value(&self, key: &str, value: &str) -> String {
        if self.colors_enabled() {
            format!("{}: {}", key.dimmed(), value)
        } else {
            format!("{}: {}", key, value)
        }
    }

    /// Similarity score with two decimals.
    ///
    /// Green at 0.8 and above, yellow from 0.5, red below.
    pub fn score(&self, value: f32) -> String {
        let formatted = format!("{:.2}", value);
        if !self.colors_enabled() {
            formatted
        } else if value >= 0.8 {
            formatted.green().to_string()
        } else if value >= 0.5 {
            formatted.yellow().to_string()
        } else {
            formatted.red().to_string()
        }
    }

    /// Confidence band in brackets, colored like [`Style::score`].
    pub fn confidence(&self, confidence: Confidence) -> String {
        let label = format!("[{}]", confidence);
        if !self.colors_enabled() {
            return label;
        }
        match confidence {
            Confidence::High => label.green().to_string(),
            Confidence::Medium => label.yellow().to_string(),
            Confidence::Low => label.red().to_string(),
        }
    }

    /// Dimmed secondary text (ids, timestamps).
    pub fn muted(&self, text: &str) -> String {
        if self.colors_enabled() {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }
}
