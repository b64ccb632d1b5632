//! # CLI UI Module
//!
//! Styling and formatting layer for faqbot output. Human output uses
//! `[ok]`/`[err]`-style prefixes and plain tables; every command also has a
//! `--json` form for scripts. Colors respect `NO_COLOR` and TTY detection.
//!
//! - `color`: color mode detection
//! - `style`: message prefixes, scores and confidence badges
//! - `format`: truncation, thousands separators, relative time
//! - `table`: hit, category and rule tables (comfy-table)

pub mod color;
pub mod format;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use style::{MessageType, Style};
