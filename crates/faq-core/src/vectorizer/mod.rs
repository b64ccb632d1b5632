//! TF-IDF vectorizer with a bounded vocabulary.
//!
//! A [`VectorizerModel`] is fitted once on the corpus questions and then maps
//! any text to a dense vector of dimension `D = vocabulary size`:
//!
//! ```text
//! w(t, text) = count(t, text) * idf(t)
//! idf(t)     = ln((1 + N) / (1 + df(t))) + 1
//! ```
//!
//! Vectors are not normalized; the Euclidean norm is returned alongside so
//! cosine similarity can use it directly.
//!
//! ## Key Components
//!
//! - [`VectorizerModel`]: fitted vocabulary + IDF table
//! - [`storage`]: bincode persistence with a JSON metadata sidecar
//! - [`ModelSlot`]: lazy load-or-train holder shared by request workers

mod slot;
mod storage;

pub use slot::ModelSlot;
pub use storage::{
    load_vectorizer, load_vectorizer_meta, save_vectorizer, VectorizerMeta, MODEL_FILENAME,
    VECTORIZER_META_FILENAME,
};

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use bincode::de::Decoder;
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::VectorizerConfig;
use crate::errors::FaqError;
use crate::tokenizer::{Tokenizer, TokenizerConfig};

/// A fitted TF-IDF model.
///
/// Immutable once trained. Retraining produces a new model with a new
/// `model_id`; vectors from different ids must never be compared.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct VectorizerModel {
    /// Generation id, minted per training run.
    model_id: String,
    /// Tokenizer settings used at training time.
    tokenizer_config: TokenizerConfig,
    /// Term → dimension index.
    vocabulary: HashMap<String, usize>,
    /// IDF weight per dimension.
    idf: Vec<f32>,
    /// Number of training documents.
    num_documents: usize,
    /// Unix timestamp (seconds) of the training run.
    trained_at: i64,
    #[serde(skip)]
    tokenizer: TokenizerCell,
}

/// Tokenizer rebuilt from `tokenizer_config` on first use. Never persisted.
#[derive(Default)]
struct TokenizerCell(OnceLock<Tokenizer>);

impl TokenizerCell {
    fn ready(tokenizer: Tokenizer) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(tokenizer);
        Self(cell)
    }
}

impl Clone for TokenizerCell {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl fmt::Debug for TokenizerCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TokenizerCell")
            .field(&self.0.get().is_some())
            .finish()
    }
}

impl Encode for TokenizerCell {
    fn encode<E: Encoder>(&self, _encoder: &mut E) -> Result<(), EncodeError> {
        Ok(())
    }
}

impl<Context> Decode<Context> for TokenizerCell {
    fn decode<D: Decoder<Context = Context>>(_decoder: &mut D) -> Result<Self, DecodeError> {
        Ok(Self::default())
    }
}

bincode::impl_borrow_decode!(TokenizerCell);

impl VectorizerModel {
    /// Fit a model on a corpus of texts.
    ///
    /// The vocabulary keeps the `max_features` terms with the highest total
    /// count across the corpus (ties broken lexicographically). Dimensions are
    /// assigned in lexicographic term order.
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::EmptyCorpus`] if the corpus is empty or yields no terms.
    pub fn train<I, S>(corpus: I, config: &VectorizerConfig) -> Result<Self, FaqError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokenizer_config = config.tokenizer_config();
        let tokenizer = Tokenizer::new(tokenizer_config.clone());

        let mut term_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        let mut num_documents = 0usize;

        for text in corpus {
            num_documents += 1;
            let tokens = tokenizer.tokenize(text.as_ref());
            let mut seen: HashSet<&str> = HashSet::new();
            for token in &tokens {
                *term_counts.entry(token.clone()).or_insert(0) += 1;
                if seen.insert(token.as_str()) {
                    *doc_freqs.entry(token.clone()).or_insert(0) += 1;
                }
            }
        }

        if num_documents == 0 || term_counts.is_empty() {
            return Err(FaqError::EmptyCorpus);
        }

        let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(config.max_features.max(1));

        let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let n = num_documents as f32;
        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (index, term) in terms.into_iter().enumerate() {
            let df = doc_freqs.get(&term).copied().unwrap_or(0) as f32;
            idf.push(((1.0 + n) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        tracing::info!(
            "Trained vectorizer on {} documents: {} terms kept",
            num_documents,
            vocabulary.len()
        );

        Ok(Self {
            model_id: Uuid::new_v4().to_string(),
            tokenizer_config,
            vocabulary,
            idf,
            num_documents,
            trained_at: Utc::now().timestamp(),
            tokenizer: TokenizerCell::ready(tokenizer),
        })
    }

    /// Map text to its dense TF-IDF vector and that vector's L2 norm.
    ///
    /// Out-of-vocabulary terms contribute nothing; a text made only of unknown
    /// terms yields the zero vector with norm 0.
    pub fn vectorize(&self, text: &str) -> (Vec<f32>, f32) {
        let mut vector = vec![0.0f32; self.idf.len()];

        for token in self.tokenizer().tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                vector[index] += self.idf[index];
            }
        }

        let norm = l2_norm(&vector);
        (vector, norm)
    }

    /// Generation id of this model.
    pub fn id(&self) -> &str {
        &self.model_id
    }

    /// Output dimension (vocabulary size).
    pub fn dimension(&self) -> usize {
        self.idf.len()
    }

    /// Number of documents the model was trained on.
    pub fn num_documents(&self) -> usize {
        self.num_documents
    }

    /// Training time.
    pub fn trained_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.trained_at, 0)
            .single()
            .unwrap_or_default()
    }

    /// Tokenizer settings baked into the model.
    pub fn tokenizer_config(&self) -> &TokenizerConfig {
        &self.tokenizer_config
    }

    /// IDF weight of a (tokenized) term, if it is in the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f32> {
        self.vocabulary.get(term).map(|&i| self.idf[i])
    }

    fn tokenizer(&self) -> &Tokenizer {
        self.tokenizer
            .0
            .get_or_init(|| Tokenizer::new(self.tokenizer_config.clone()))
    }

    /// Whether the (tokenized) term is in the vocabulary.
    pub fn contains(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }
}

/// Euclidean norm of a vector.
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_features: usize) -> VectorizerConfig {
        VectorizerConfig {
            max_features,
            stemming: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_corpus_rejected() {
        let corpus: Vec<&str> = vec![];
        let result = VectorizerModel::train(corpus, &config(10));
        assert!(matches!(result, Err(FaqError::EmptyCorpus)));

        let stopwords_only = VectorizerModel::train(["le la les", "de"], &config(10));
        assert!(matches!(stopwords_only, Err(FaqError::EmptyCorpus)));
    }

    #[test]
    fn test_vocabulary_bounded_by_frequency() {
        let corpus = ["alpha alpha beta", "alpha gamma", "beta delta"];
        let model = VectorizerModel::train(corpus, &config(2)).unwrap();

        assert_eq!(model.dimension(), 2);
        assert!(model.contains("alpha"));
        assert!(model.contains("beta"));
        assert!(!model.contains("gamma"));
    }

    #[test]
    fn test_frequency_ties_break_lexicographically() {
        let corpus = ["zeta alpha", "mu"];
        let model = VectorizerModel::train(corpus, &config(2)).unwrap();
        assert!(model.contains("alpha"));
        assert!(model.contains("mu"));
        assert!(!model.contains("zeta"));
    }

    #[test]
    fn test_smoothed_idf() {
        let corpus = ["alpha beta", "alpha gamma", "alpha delta"];
        let model = VectorizerModel::train(corpus, &config(10)).unwrap();

        // df = n => idf = ln(1) + 1 = 1
        assert!((model.idf("alpha").unwrap() - 1.0).abs() < 1e-6);
        // df = 1, n = 3 => ln(4/2) + 1
        let expected = (4.0f32 / 2.0).ln() + 1.0;
        assert!((model.idf("beta").unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_vectorize_raw_tf_times_idf() {
        let corpus = ["alpha beta", "alpha gamma", "alpha delta"];
        let model = VectorizerModel::train(corpus, &config(10)).unwrap();

        let (vector, norm) = model.vectorize("beta beta alpha");
        let beta_idf = model.idf("beta").unwrap();

        let nonzero: Vec<f32> = vector.iter().copied().filter(|v| *v != 0.0).collect();
        assert_eq!(nonzero.len(), 2);
        assert!(nonzero.iter().any(|v| (v - 2.0 * beta_idf).abs() < 1e-6));
        assert!((norm - l2_norm(&vector)).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_terms_yield_zero_vector() {
        let model = VectorizerModel::train(["alpha beta"], &config(10)).unwrap();
        let (vector, norm) = model.vectorize("xyzzy qwerty");

        assert_eq!(vector.len(), model.dimension());
        assert!(vector.iter().all(|v| *v == 0.0));
        assert_eq!(norm, 0.0);
    }

    #[test]
    fn test_repeated_and_cloned_vectorize_agree() {
        let model = VectorizerModel::train(["alpha beta", "beta gamma"], &config(10)).unwrap();
        let first = model.vectorize("alpha beta beta");
        assert_eq!(model.vectorize("alpha beta beta"), first);

        let copy = model.clone();
        assert_eq!(copy.vectorize("alpha beta beta"), first);
        assert_eq!(copy.vectorize("gamma").1, model.vectorize("gamma").1);
    }

    #[test]
    fn test_each_training_run_gets_new_id() {
        let a = VectorizerModel::train(["alpha"], &config(10)).unwrap();
        let b = VectorizerModel::train(["alpha"], &config(10)).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.num_documents(), 1);
    }
}
