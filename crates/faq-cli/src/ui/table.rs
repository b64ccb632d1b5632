//! Table rendering with comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `faqbot ask` | `render_hits_table()` |
//! | `faqbot stats` | `render_categories_table()`, `render_metrics_table()` |
//! | `faqbot rules` | `render_rules_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};
use faq_core::{CategorySummary, ConversationalRule, RankedFaq};

use super::format::{format_thousands, truncate_str};

fn plain_table() -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table
}

/// Render ranked hits for `faqbot ask`.
///
/// ```text
///  #   SCORE   ID   CATEGORY    QUESTION
///  1    0.94    1   Compte      Comment réinitialiser mon mot de passe ?
///  2    0.19    4   Compte      Comment modifier mon adresse e-mail ?
/// ```
pub fn render_hits_table(hits: &[RankedFaq]) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("SCORE").set_alignment(CellAlignment::Right),
        Cell::new("ID").set_alignment(CellAlignment::Right),
        Cell::new("CATEGORY"),
        Cell::new("QUESTION"),
    ]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(3)),
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),
        ColumnConstraint::LowerBoundary(Width::Fixed(4)),
        ColumnConstraint::LowerBoundary(Width::Fixed(10)),
        ColumnConstraint::LowerBoundary(Width::Fixed(20)),
    ]);

    for (rank, hit) in hits.iter().enumerate() {
        let category = if hit.category.is_empty() {
            "-".to_string()
        } else {
            truncate_str(&hit.category, 18)
        };
        table.add_row(vec![
            Cell::new(rank + 1).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", hit.score)).set_alignment(CellAlignment::Right),
            Cell::new(hit.faq_id).set_alignment(CellAlignment::Right),
            Cell::new(category),
            Cell::new(truncate_str(&hit.question, 60)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render active categories in Tier-1 probe order.
///
/// ```text
///  ID   CATEGORY     FAQS   POPULARITY
///   1   Compte         12          340
///   2   Scolarité       8           97
/// ```
pub fn render_categories_table(categories: &[CategorySummary]) -> String {
    if categories.is_empty() {
        return String::new();
    }

    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("ID").set_alignment(CellAlignment::Right),
        Cell::new("CATEGORY"),
        Cell::new("FAQS").set_alignment(CellAlignment::Right),
        Cell::new("POPULARITY").set_alignment(CellAlignment::Right),
    ]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(4)),
        ColumnConstraint::LowerBoundary(Width::Fixed(12)),
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),
        ColumnConstraint::LowerBoundary(Width::Fixed(10)),
    ]);

    for category in categories {
        table.add_row(vec![
            Cell::new(category.id.value()).set_alignment(CellAlignment::Right),
            Cell::new(truncate_str(&category.name, 30)),
            Cell::new(format_thousands(category.faq_count as u64))
                .set_alignment(CellAlignment::Right),
            Cell::new(format_thousands(category.popularity)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render conversational rules in match order.
pub fn render_rules_table(rules: &[ConversationalRule]) -> String {
    if rules.is_empty() {
        return String::new();
    }

    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("INTENT"),
        Cell::new("PATTERNS"),
        Cell::new("RESPONSE"),
    ]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(10)),
        ColumnConstraint::LowerBoundary(Width::Fixed(20)),
        ColumnConstraint::LowerBoundary(Width::Fixed(20)),
    ]);

    for rule in rules {
        table.add_row(vec![
            Cell::new(&rule.intent),
            Cell::new(truncate_str(&rule.patterns.join(", "), 40)),
            Cell::new(truncate_str(&rule.response, 50)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render a two-column metric/value table.
pub fn render_metrics_table(metrics: &[(&str, String)]) -> String {
    if metrics.is_empty() {
        return String::new();
    }

    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("METRIC"),
        Cell::new("VALUE").set_alignment(CellAlignment::Right),
    ]);
    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(18)),
        ColumnConstraint::LowerBoundary(Width::Fixed(12)),
    ]);

    for (key, value) in metrics {
        table.add_row(vec![
            Cell::new(*key),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }

    table.trim_fmt().to_string()
}
