//! Unicode-aware French tokenizer with optional stemming.
//!
//! Text preprocessing shared by training and querying:
//! - Elision split (`l'application` → `l application`)
//! - Unicode word segmentation
//! - Case folding (lowercasing)
//! - Stop word removal
//! - Snowball stemming (French)
//! - Minimum token length filtering

use std::collections::HashSet;

use bincode::{Decode, Encode};
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::constants::DEFAULT_MIN_TOKEN_LENGTH;

/// Tokenizer configuration.
///
/// Stored inside the trained vectorizer so queries are tokenized exactly as
/// the training corpus was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct TokenizerConfig {
    /// Apply Snowball stemming to tokens.
    pub stemming: bool,
    /// Remove common stop words.
    pub remove_stopwords: bool,
    /// Minimum token length to include (in chars).
    pub min_token_length: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            stemming: true,
            remove_stopwords: true,
            min_token_length: DEFAULT_MIN_TOKEN_LENGTH,
        }
    }
}

/// French tokenizer.
pub struct Tokenizer {
    config: TokenizerConfig,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<&'static str>,
}

impl Tokenizer {
    /// Create a new tokenizer with the given configuration.
    pub fn new(config: TokenizerConfig) -> Self {
        let stemmer = if config.stemming {
            Some(Stemmer::create(Algorithm::French))
        } else {
            None
        };

        Self {
            config,
            stemmer,
            stopwords: Self::default_stopwords(),
        }
    }

    /// The configuration this tokenizer was built with.
    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Tokenize text into processed terms, in order of appearance.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let split = text.replace(['\'', '’'], " ");
        split
            .unicode_words()
            .filter_map(|word| self.process_token(word))
            .collect()
    }

    fn process_token(&self, word: &str) -> Option<String> {
        let lower = word.to_lowercase();

        // Pure numbers and symbols carry no meaning for FAQ matching
        if !lower.chars().any(|c| c.is_alphabetic()) {
            return None;
        }

        if lower.chars().count() < self.config.min_token_length {
            return None;
        }

        if self.config.remove_stopwords && self.stopwords.contains(lower.as_str()) {
            return None;
        }

        let token = match self.stemmer {
            Some(ref stemmer) => stemmer.stem(&lower).to_string(),
            None => lower,
        };

        // Some stems become too short
        if token.chars().count() < self.config.min_token_length {
            return None;
        }

        Some(token)
    }

    /// French stop words.
    ///
    /// Function words only; interrogatives such as "comment" or "pourquoi"
    /// are kept because they separate how-to questions from the rest.
    fn default_stopwords() -> HashSet<&'static str> {
        [
            // Articles & determiners
            "le", "la", "les", "un", "une", "des", "du", "de", "au", "aux", "ce", "cet", "cette",
            "ces", // Possessives
            "mon", "ma", "mes", "ton", "ta", "tes", "son", "sa", "ses", "notre", "nos", "votre",
            "vos", "leur", "leurs", // Pronouns
            "je", "tu", "il", "elle", "on", "nous", "vous", "ils", "elles", "me", "te", "se",
            "moi", "toi", "lui", "eux", "en", "y", "qui", "que", "qu", "quoi", "dont",
            // Prepositions & conjunctions
            "à", "dans", "par", "pour", "sur", "avec", "sans", "sous", "chez", "entre", "vers",
            "et", "ou", "mais", "donc", "or", "ni", "car", "si", // Negation & adverbs
            "ne", "pas", "plus", "très", "aussi", "même", "déjà", // Common auxiliaries
            "est", "sont", "suis", "es", "sommes", "êtes", "été", "être", "ai", "as", "avons",
            "avez", "ont", "avoir", "fait", "faire", "peux", "peut", "pouvez", "puis", "dois",
            "doit", "devez",
        ]
        .into_iter()
        .collect()
    }

    /// Get the number of stop words.
    #[cfg(test)]
    fn stopword_count(&self) -> usize {
        self.stopwords.len()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Tokenizer {
        Tokenizer::new(TokenizerConfig {
            stemming: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_basic_tokenization() {
        let tokens = plain().tokenize("Bonjour le monde");
        assert_eq!(tokens, vec!["bonjour", "monde"]);
    }

    #[test]
    fn test_stopword_removal_keeps_interrogatives() {
        let tokens = plain().tokenize("Comment réinitialiser mon mot de passe ?");
        assert_eq!(tokens, vec!["comment", "réinitialiser", "mot", "passe"]);
    }

    #[test]
    fn test_elision_split() {
        let tokens = plain().tokenize("Où télécharger l'application d’inscription ?");
        assert!(tokens.contains(&"application".to_string()));
        assert!(tokens.contains(&"inscription".to_string()));
        assert!(!tokens.iter().any(|t| t.contains('\'')));
    }

    #[test]
    fn test_stemming_conflates_inflections() {
        let tokenizer = Tokenizer::default();
        let a = tokenizer.tokenize("mot");
        let b = tokenizer.tokenize("mots");
        assert_eq!(a, b);
    }

    #[test]
    fn test_query_and_question_share_stems() {
        let tokenizer = Tokenizer::default();
        let question = tokenizer.tokenize("Comment réinitialiser mon mot de passe ?");
        let query = tokenizer.tokenize("réinitialiser mot de passe");
        for term in &query {
            assert!(question.contains(term), "missing {term}");
        }
    }

    #[test]
    fn test_numbers_and_short_tokens_dropped() {
        let tokens = plain().tokenize("a 42 b3 wifi");
        assert_eq!(tokens, vec!["b3", "wifi"]);
    }

    #[test]
    fn test_accents_count_as_letters() {
        let tokens = plain().tokenize("Été déjà ÉLÈVE");
        assert_eq!(tokens, vec!["élève"]);
    }

    #[test]
    fn test_stopwords_disabled() {
        let tokenizer = Tokenizer::new(TokenizerConfig {
            stemming: false,
            remove_stopwords: false,
            min_token_length: 2,
        });
        let tokens = tokenizer.tokenize("le mot de passe");
        assert_eq!(tokens, vec!["le", "mot", "de", "passe"]);
        assert!(tokenizer.stopword_count() > 50);
    }
}
