//! Conversational rules (Tier 0).
//!
//! Canned exchanges such as greetings or thanks are answered by substring
//! match before any vector work. Rules are tried in declaration order and
//! the first rule with a matching pattern wins.
//!
//! # Source format
//!
//! A JSON or YAML document, either a bare list or an object with a `rules`
//! (or `intents`) list:
//!
//! ```yaml
//! rules:
//!   - intent: greeting
//!     patterns: ["bonjour", "salut"]
//!     response: "Bonjour ! Comment puis-je vous aider ?"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::FaqError;

/// A canned conversational exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationalRule {
    pub intent: String,
    /// Substring triggers, lower-cased at load time.
    #[serde(alias = "examples")]
    pub patterns: Vec<String>,
    pub response: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RulesDocument {
    List(Vec<ConversationalRule>),
    Rules { rules: Vec<ConversationalRule> },
    Intents { intents: Vec<ConversationalRule> },
}

impl RulesDocument {
    fn into_rules(self) -> Vec<ConversationalRule> {
        match self {
            Self::List(rules) | Self::Rules { rules } | Self::Intents { intents: rules } => rules,
        }
    }
}

/// Ordered rule list with first-match lookup.
#[derive(Debug, Clone, Default)]
pub struct RuleMatcher {
    rules: Vec<ConversationalRule>,
}

impl RuleMatcher {
    /// Build a matcher, normalizing patterns.
    ///
    /// Empty patterns are discarded; rules left without any pattern are
    /// dropped with a warning.
    pub fn new(rules: Vec<ConversationalRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter_map(|mut rule| {
                rule.patterns = rule
                    .patterns
                    .iter()
                    .map(|p| p.trim().to_lowercase())
                    .filter(|p| !p.is_empty())
                    .collect();
                if rule.patterns.is_empty() {
                    tracing::warn!("Dropping rule `{}`: no usable patterns", rule.intent);
                    None
                } else {
                    Some(rule)
                }
            })
            .collect();
        Self { rules }
    }

    /// Load rules from a JSON or YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::MalformedRulesSource`] if the file is missing,
    /// unreadable or not a valid rules document.
    pub fn from_path(path: &Path) -> Result<Self, FaqError> {
        let content = fs::read_to_string(path).map_err(|e| FaqError::MalformedRulesSource {
            path: path.to_path_buf(),
            message: format!("Failed to read rules: {}", e),
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str::<RulesDocument>(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<RulesDocument>(&content).map_err(|e| e.to_string())
        };

        let document = parsed.map_err(|message| FaqError::MalformedRulesSource {
            path: path.to_path_buf(),
            message,
        })?;

        let matcher = Self::new(document.into_rules());
        tracing::debug!(
            "Loaded {} conversational rules from {}",
            matcher.len(),
            path.display()
        );
        Ok(matcher)
    }

    /// Load rules, degrading to an empty matcher on any failure.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::from_path(path) {
            Ok(matcher) => matcher,
            Err(e) => {
                tracing::warn!("{}; conversational rules disabled", e);
                Self::default()
            }
        }
    }

    /// First rule with a pattern contained in the (lower-cased) question.
    pub fn find(&self, question: &str) -> Option<&ConversationalRule> {
        let lowered = question.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.patterns.iter().any(|p| lowered.contains(p.as_str())))
    }

    pub fn rules(&self) -> &[ConversationalRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rule(intent: &str, patterns: &[&str], response: &str) -> ConversationalRule {
        ConversationalRule {
            intent: intent.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            response: response.to_string(),
        }
    }

    #[test]
    fn test_case_insensitive_substring_match() {
        let matcher = RuleMatcher::new(vec![rule("greeting", &["Bonjour"], "Salut !")]);
        let hit = matcher.find("BONJOUR, j'ai une question").unwrap();
        assert_eq!(hit.intent, "greeting");
        assert!(matcher.find("Au revoir").is_none());
    }

    #[test]
    fn test_first_declared_rule_wins() {
        let matcher = RuleMatcher::new(vec![
            rule("thanks", &["merci"], "De rien."),
            rule("greeting", &["bonjour"], "Bonjour !"),
        ]);
        let hit = matcher.find("bonjour et merci").unwrap();
        assert_eq!(hit.intent, "thanks");
    }

    #[test]
    fn test_rules_without_patterns_dropped() {
        let matcher = RuleMatcher::new(vec![
            rule("empty", &["", "   "], "never"),
            rule("greeting", &["salut"], "Salut !"),
        ]);
        assert_eq!(matcher.len(), 1);
        // An empty pattern would otherwise match everything
        assert!(matcher.find("question sans rapport").is_none());
    }

    #[test]
    fn test_load_yaml_wrapped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rules.yaml");
        fs::write(
            &path,
            r#"
rules:
  - intent: greeting
    patterns: ["bonjour", "salut"]
    response: "Bonjour ! Comment puis-je vous aider ?"
"#,
        )
        .unwrap();

        let matcher = RuleMatcher::from_path(&path).unwrap();
        assert_eq!(matcher.len(), 1);
        assert_eq!(
            matcher.find("salut").unwrap().response,
            "Bonjour ! Comment puis-je vous aider ?"
        );
    }

    #[test]
    fn test_load_json_list_and_intents() {
        let temp = TempDir::new().unwrap();
        let list = temp.path().join("list.json");
        fs::write(
            &list,
            r#"[{"intent": "bye", "patterns": ["au revoir"], "response": "À bientôt"}]"#,
        )
        .unwrap();
        assert_eq!(RuleMatcher::from_path(&list).unwrap().len(), 1);

        let intents = temp.path().join("intents.json");
        fs::write(
            &intents,
            r#"{"intents": [{"intent": "thanks", "examples": ["merci"], "response": "De rien"}]}"#,
        )
        .unwrap();
        let matcher = RuleMatcher::from_path(&intents).unwrap();
        assert_eq!(matcher.find("merci beaucoup").unwrap().intent, "thanks");
    }

    #[test]
    fn test_malformed_source_degrades_to_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rules.json");
        fs::write(&path, "{ not json").unwrap();

        let err = RuleMatcher::from_path(&path).unwrap_err();
        assert!(matches!(err, FaqError::MalformedRulesSource { .. }));
        assert!(RuleMatcher::load_or_empty(&path).is_empty());
        assert!(RuleMatcher::load_or_empty(&temp.path().join("missing.yaml")).is_empty());
    }
}
