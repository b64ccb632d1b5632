//! CLI definition and command dispatch for faqbot.
//!
//! ## Configuration Precedence
//!
//! 1. CLI flags (`--config`, `--data-dir`, `--verbose`, `--color`)
//! 2. Environment variables (`FAQBOT_CONFIG`, `FAQBOT_DATA_DIR`, `FAQBOT_VERBOSE`, `FAQBOT_COLOR`)
//! 3. Config file (`~/.faqbot/config.yaml` or the `--config` path)
//! 4. Built-in defaults

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use faq_core::{
    FaqConfig, FaqEngine, FaqError, FeedbackKind, NewFeedback, Resolution, RetrievalResponse,
};
use faq_db::DbError;

use crate::ui::{format, table, ColorMode, MessageType, Style};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// faqbot – answer questions from a FAQ corpus
#[derive(Parser, Debug)]
#[command(name = "faqbot")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "FAQBOT_VERBOSE")]
    pub verbose: bool,

    /// Path to configuration file (default: ~/.faqbot/config.yaml)
    #[arg(long, global = true, env = "FAQBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory holding corpus.json, rules.yaml and the trained model
    #[arg(long, global = true, env = "FAQBOT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Color output mode: always, never, or auto (default: auto)
    #[arg(long, global = true, env = "FAQBOT_COLOR", default_value = "auto")]
    pub color: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fit a new vectorizer on the corpus and rebuild the vector index
    #[command(after_help = r#"EXAMPLES:
    # Train on <data-dir>/corpus.json
    faqbot train

    # Train a corpus kept elsewhere
    faqbot --data-dir ./faq-data train
"#)]
    Train {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Rebuild the vector index with the current vectorizer
    Reindex {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Ask a question
    #[command(after_help = r#"EXAMPLES:
    # Best answer with up to 3 alternatives
    faqbot ask "Comment réinitialiser mon mot de passe ?"

    # Only answers scoring at least 0.3
    faqbot ask "notes d'examen" --min-score 0.3

    # Scripting
    faqbot ask "certificat de scolarité" --json | jq '.hits[0].answer'
"#)]
    Ask {
        /// The question, in free text
        question: String,

        /// Maximum number of answers (default from config: retrieval.topK)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Drop answers scoring below this value, in [0, 1]
        #[arg(long)]
        min_score: Option<f32>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Record feedback on an answer
    #[command(after_help = r#"EXAMPLES:
    # The answer to FAQ 12 helped
    faqbot feedback 12 --positive

    # It did not
    faqbot feedback 12 --negative --question "mot de passe" --comment "lien cassé"
"#)]
    Feedback {
        /// Id of the FAQ the feedback is about
        faq_id: u64,

        /// The answer helped (raises the FAQ's popularity)
        #[arg(long, conflicts_with = "negative", required_unless_present = "negative")]
        positive: bool,

        /// The answer did not help
        #[arg(long)]
        negative: bool,

        /// Question the user asked
        #[arg(long)]
        question: Option<String>,

        /// Score the answer was returned with
        #[arg(long)]
        score: Option<f32>,

        /// Free-text comment
        #[arg(long)]
        comment: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show corpus, model and index statistics
    Stats {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List conversational rules
    Rules {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Entry point
// ============================================================================

/// Parse arguments, build the engine and dispatch.
///
/// Returns `ExitCode::FAILURE` on any error, after printing it to stderr.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always; debug with --verbose
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!(
        "faq_core={},faq_db={},faqbot={}",
        log_level, log_level, log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let color_mode = ColorMode::from_str(&cli.color).unwrap_or_default();
    let style = Style::new(color_mode);

    let config = match &cli.config {
        Some(path) => FaqConfig::from_path(path),
        None => FaqConfig::load_default(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            let hint = match &cli.config {
                Some(path) => format!("Check your config at {}", path.display()),
                None => "Check your config at ~/.faqbot/config.yaml".to_string(),
            };
            eprintln!(
                "{}",
                style.error_with_context("Failed to load configuration", Some(&e.to_string()), Some(&hint))
            );
            return ExitCode::FAILURE;
        }
    };
    let config = match cli.data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    };

    let engine = match FaqEngine::from_config(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to initialize faqbot",
                    Some(&format!("{:#}", e)),
                    Some("Check that corpus.json in the data directory is valid"),
                )
            );
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(
        "Using data dir {}",
        engine.config().resolved_data_dir().display()
    );

    let result = match cli.command {
        Command::Train { json } => handle_train(&style, &engine, json),
        Command::Reindex { json } => handle_reindex(&style, &engine, json),
        Command::Ask {
            question,
            top_k,
            min_score,
            json,
        } => handle_ask(&style, &engine, &question, top_k, min_score, json),
        Command::Feedback {
            faq_id,
            positive,
            negative: _,
            question,
            score,
            comment,
            json,
        } => {
            let kind = if positive {
                FeedbackKind::Positive
            } else {
                FeedbackKind::Negative
            };
            let mut feedback = NewFeedback::new(faq_id, kind);
            feedback.question = question.unwrap_or_default();
            feedback.score = score;
            feedback.comment = comment.unwrap_or_default();
            handle_feedback(&style, &engine, feedback, json)
        }
        Command::Stats { json } => handle_stats(&style, &engine, json),
        Command::Rules { json } => handle_rules(&style, &engine, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                style.error_with_context(&e.to_string(), None, hint_for(&e))
            );
            ExitCode::FAILURE
        }
    }
}

/// Actionable next step for errors the user can fix.
fn hint_for(err: &FaqError) -> Option<&'static str> {
    match err {
        FaqError::ModelNotTrained | FaqError::EmptyCorpus => {
            Some("Place corpus.json in the data directory and run `faqbot train`")
        }
        FaqError::IndexIncompatible { .. } => Some("Run `faqbot reindex`"),
        FaqError::InvalidArgument(_) => Some("See `faqbot ask --help`"),
        FaqError::Store(DbError::FaqNotFound { .. }) => {
            Some("Use an id from `faqbot ask --json` (hits[].faqId)")
        }
        FaqError::VectorizerIo { .. } | FaqError::VectorizerParse { .. } => {
            Some("Run `faqbot train` to rebuild the vectorizer")
        }
        _ => None,
    }
}

// ============================================================================
// Command handlers
// ============================================================================

fn handle_train(style: &Style, engine: &FaqEngine, json: bool) -> Result<(), FaqError> {
    let report = engine.train()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        return Ok(());
    }

    println!(
        "{}",
        style.message(
            MessageType::Ok,
            &format!("Trained vectorizer {}", short_id(&report.model_id))
        )
    );
    println!(
        "{}",
        style.message_detail("Documents", &format::format_thousands(report.documents as u64))
    );
    println!(
        "{}",
        style.message_detail(
            "Vocabulary",
            &format!("{} terms", format::format_thousands(report.dimension as u64))
        )
    );
    println!(
        "{}",
        style.message_detail(
            "Indexed",
            &format!(
                "{} FAQs in {} batches",
                format::format_thousands(report.index.indexed as u64),
                report.index.batches
            )
        )
    );
    if report.index.pruned > 0 {
        println!(
            "{}",
            style.message_detail("Pruned", &format!("{} stale entries", report.index.pruned))
        );
    }
    Ok(())
}

fn handle_reindex(style: &Style, engine: &FaqEngine, json: bool) -> Result<(), FaqError> {
    let report = engine.reindex()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        return Ok(());
    }

    println!(
        "{}",
        style.message(
            MessageType::Ok,
            &format!(
                "Indexed {} FAQs with vectorizer {}",
                format::format_thousands(report.indexed as u64),
                short_id(&report.model_id)
            )
        )
    );
    println!("{}", style.message_detail("Batches", &report.batches.to_string()));
    println!("{}", style.message_detail("Pruned", &report.pruned.to_string()));
    Ok(())
}

fn handle_ask(
    style: &Style,
    engine: &FaqEngine,
    question: &str,
    top_k: Option<usize>,
    min_score: Option<f32>,
    json: bool,
) -> Result<(), FaqError> {
    let response = engine.ask(question, top_k, min_score)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
        return Ok(());
    }

    println!("{} {}", style.confidence(response.confidence), response.reply);
    println!();
    println!("  {}", style.key_value("Resolution", &describe_resolution(&response)));
    if let Some(best) = response.best() {
        println!("  {}", style.key_value("Matched", &best.question));
        println!("  {}", style.key_value("Score", &style.score(best.score)));
    }

    if response.hits.len() > 1 {
        println!();
        println!("{}", style.section("ANSWERS"));
        println!();
        println!("{}", table::render_hits_table(&response.hits));
    }

    if matches!(response.resolution, Resolution::NotUnderstood) {
        println!();
        println!(
            "{}",
            style.message(MessageType::Hint, "None of the question's words appear in the corpus")
        );
    }
    Ok(())
}

fn describe_resolution(response: &RetrievalResponse) -> String {
    match &response.resolution {
        Resolution::Rule { intent } => format!("rule `{}`", intent),
        Resolution::Category {
            name, from_cache, ..
        } => {
            let cached = if *from_cache { ", cached" } else { "" };
            format!(
                "category `{}` ({} probed{})",
                name, response.categories_probed, cached
            )
        }
        Resolution::Global => format!(
            "global search ({} categories probed, {} pages)",
            response.categories_probed, response.fallback_pages
        ),
        other => other.label().to_string(),
    }
}

fn handle_feedback(
    style: &Style,
    engine: &FaqEngine,
    feedback: NewFeedback,
    json: bool,
) -> Result<(), FaqError> {
    let stored = engine.feedback(feedback)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stored).unwrap_or_default());
        return Ok(());
    }

    println!(
        "{}",
        style.message(
            MessageType::Ok,
            &format!("Recorded {} feedback for FAQ #{}", stored.kind, stored.faq_id)
        )
    );
    println!("{}", style.message_detail("Id", &style.muted(&stored.id.to_string())));
    Ok(())
}

fn handle_stats(style: &Style, engine: &FaqEngine, json: bool) -> Result<(), FaqError> {
    let stats = engine.stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
        return Ok(());
    }

    println!("{}", style.section("CORPUS"));
    println!();
    println!("  {}", style.key_value("Data dir", &stats.data_dir.display().to_string()));
    println!(
        "{}",
        table::render_metrics_table(&[
            ("Active FAQs", format::format_thousands(stats.active_faqs as u64)),
            ("Categories", stats.categories.len().to_string()),
            ("Rules", stats.rules.to_string()),
        ])
    );

    println!();
    println!("{}", style.section("MODEL"));
    println!();
    match &stats.model {
        Some(model) => {
            println!("  {}", style.key_value("Vectorizer", short_id(&model.model_id)));
            println!(
                "  {}",
                style.key_value("Vocabulary", &format::format_thousands(model.dimension as u64))
            );
            println!(
                "  {}",
                style.key_value("Documents", &format::format_thousands(model.num_documents as u64))
            );
            println!(
                "  {}",
                style.key_value("Trained", &format::format_relative_time(model.trained_at))
            );
        }
        None => {
            println!("{}", style.message(MessageType::Info, "No trained vectorizer"));
            println!("{}", style.message(MessageType::Hint, "Run `faqbot train`"));
        }
    }

    if let Some(index) = &stats.index {
        println!(
            "  {}",
            style.key_value(
                "Index",
                &format!(
                    "{} entries, built {}",
                    format::format_thousands(index.entries as u64),
                    format::format_relative_time(index.built_at)
                )
            )
        );
        let stale = stats
            .model
            .as_ref()
            .is_some_and(|model| model.model_id != index.model_id);
        if stale {
            println!(
                "{}",
                style.message(
                    MessageType::Warn,
                    "Index was built with another vectorizer; run `faqbot reindex`"
                )
            );
        }
    }

    if !stats.categories.is_empty() {
        println!();
        println!("{}", style.section("CATEGORIES"));
        println!();
        println!("{}", table::render_categories_table(&stats.categories));
    }
    Ok(())
}

fn handle_rules(style: &Style, engine: &FaqEngine, json: bool) -> Result<(), FaqError> {
    let rules = engine.rules();

    if json {
        println!("{}", serde_json::to_string_pretty(rules).unwrap_or_default());
        return Ok(());
    }

    if rules.is_empty() {
        println!("{}", style.message(MessageType::Info, "No conversational rules loaded"));
        println!(
            "{}",
            style.message(MessageType::Hint, "Add rules.yaml to the data directory")
        );
        return Ok(());
    }

    println!("{}", table::render_rules_table(rules));
    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_feedback_requires_a_kind() {
        assert!(Cli::try_parse_from(["faqbot", "feedback", "3"]).is_err());
        assert!(Cli::try_parse_from(["faqbot", "feedback", "3", "--positive", "--negative"]).is_err());

        let cli = Cli::try_parse_from(["faqbot", "feedback", "3", "--negative"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Feedback {
                faq_id: 3,
                positive: false,
                negative: true,
                ..
            }
        ));
    }

    #[test]
    fn test_ask_options() {
        let cli =
            Cli::try_parse_from(["faqbot", "ask", "mot de passe", "-k", "5", "--min-score", "0.2"])
                .unwrap();
        match cli.command {
            Command::Ask {
                question,
                top_k,
                min_score,
                json,
            } => {
                assert_eq!(question, "mot de passe");
                assert_eq!(top_k, Some(5));
                assert_eq!(min_score, Some(0.2));
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("3f2a9c1e-7d4b"), "3f2a9c1e");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_hints() {
        assert!(hint_for(&FaqError::ModelNotTrained).unwrap().contains("faqbot train"));
        assert!(hint_for(&FaqError::CategoryLookupFailure {
            category_id: 1,
            name: "x".into()
        })
        .is_none());
    }
}
