//! # faqbot CLI
//!
//! Command-line front end for `faq-core`: train the vectorizer, ask
//! questions, record feedback and inspect the corpus.
//! Run `faqbot --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
