//! Color mode detection for CLI output.
//!
//! Respects the `NO_COLOR` environment variable (https://no-color.org/) and
//! disables colors when stdout is not a terminal.

use std::io::IsTerminal;

/// Color output mode, set with `--color` or `FAQBOT_COLOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    Always,
    Never,
    /// Colors only on a terminal without `NO_COLOR`.
    #[default]
    Auto,
}

impl ColorMode {
    /// Parse a `--color` value: "always", "never" or "auto".
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
        }
    }
}
