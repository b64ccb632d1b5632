//! File-backed corpus store.
//!
//! Storage layout:
//!
//! ```text
//! <data_dir>/
//! ├── corpus.json        # Categories + FAQs (popularity rewritten on feedback)
//! ├── vectors.bin        # bincode Vec<FaqVectorEntry>
//! ├── index_meta.json    # VectorIndexMeta of the last completed build
//! └── feedback.jsonl     # Append-only feedback log
//! ```
//!
//! Vector upserts stay in memory until [`CorpusStore::set_index_meta`] (or
//! [`FileCorpusStore::flush`]) writes them, so a batched rebuild touches the
//! disk once.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use bincode::config;
use tracing::{debug, warn};

use super::memory::InMemoryCorpus;
use super::types::{
    Category, CategoryId, CategorySummary, FaqId, FaqRecord, FaqVectorEntry, Feedback,
    IndexedFaq, NewFeedback, VectorIndexMeta,
};
use super::{CorpusDocument, CorpusStore};
use crate::error::{DbError, DbResult};

/// Corpus document filename.
pub const CORPUS_FILENAME: &str = "corpus.json";

/// Vector entries filename.
pub const VECTORS_FILENAME: &str = "vectors.bin";

/// Index metadata filename.
pub const INDEX_META_FILENAME: &str = "index_meta.json";

/// Feedback log filename.
pub const FEEDBACK_FILENAME: &str = "feedback.jsonl";

/// Corpus store persisted under a data directory.
pub struct FileCorpusStore {
    root: PathBuf,
    inner: InMemoryCorpus,
    vectors_dirty: AtomicBool,
}

impl FileCorpusStore {
    /// Open the store at `root`, creating the directory if needed.
    ///
    /// A missing corpus file yields an empty corpus. An unreadable vector file
    /// is discarded with a warning (the index metadata is dropped with it so
    /// the caller rebuilds).
    pub fn open(root: impl AsRef<Path>) -> DbResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            DbError::corpus_io(&root, format!("Failed to create data directory: {}", e))
        })?;

        let doc = Self::load_document(&root.join(CORPUS_FILENAME))?;
        let inner = InMemoryCorpus::from_document(doc)?;

        {
            let mut state = inner.write()?;
            match Self::load_vectors(&root.join(VECTORS_FILENAME)) {
                Ok(vectors) => {
                    for entry in vectors {
                        state.vectors.insert(entry.faq_id, entry);
                    }
                    state.meta = Self::load_meta(&root.join(INDEX_META_FILENAME))?;
                }
                Err(e) => {
                    warn!("Discarding unreadable vector store: {}", e);
                    state.meta = None;
                }
            }
            state.feedback = Self::load_feedback(&root.join(FEEDBACK_FILENAME))?;
            debug!(
                "Opened corpus at {}: {} categories, {} faqs, {} vectors",
                root.display(),
                state.categories.len(),
                state.faqs.len(),
                state.vectors.len()
            );
        }

        Ok(Self {
            root,
            inner,
            vectors_dirty: AtomicBool::new(false),
        })
    }

    /// Write a corpus document to `root` and open the store on it.
    pub fn create(root: impl AsRef<Path>, doc: CorpusDocument) -> DbResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| {
            DbError::corpus_io(root, format!("Failed to create data directory: {}", e))
        })?;
        Self::write_document(&root.join(CORPUS_FILENAME), &doc)?;
        Self::open(root)
    }

    /// The data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist pending vector changes.
    pub fn flush(&self) -> DbResult<()> {
        if !self.vectors_dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let state = self.inner.read()?;
        let mut entries: Vec<&FaqVectorEntry> = state.vectors.values().collect();
        entries.sort_by_key(|e| e.faq_id);

        let path = self.root.join(VECTORS_FILENAME);
        let file = File::create(&path)
            .map_err(|e| DbError::vector_io(&path, format!("Failed to create vector file: {}", e)))?;
        let mut writer = BufWriter::new(file);
        bincode::encode_into_std_write(&entries, &mut writer, config::standard())
            .map_err(|e| DbError::vector_parse(&path, format!("Failed to encode vectors: {}", e)))?;
        writer
            .flush()
            .map_err(|e| DbError::vector_io(&path, format!("Failed to write vectors: {}", e)))?;

        debug!("Saved {} vectors to {}", entries.len(), path.display());
        Ok(())
    }

    fn load_document(path: &Path) -> DbResult<CorpusDocument> {
        if !path.exists() {
            debug!("No corpus at {}, starting empty", path.display());
            return Ok(CorpusDocument::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| DbError::corpus_io(path, format!("Failed to read corpus: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| DbError::corpus_parse(path, format!("Failed to parse corpus: {}", e)))
    }

    fn write_document(path: &Path, doc: &CorpusDocument) -> DbResult<()> {
        let json = serde_json::to_string_pretty(doc)?;
        fs::write(path, json)
            .map_err(|e| DbError::corpus_io(path, format!("Failed to write corpus: {}", e)))
    }

    fn load_vectors(path: &Path) -> DbResult<Vec<FaqVectorEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path)
            .map_err(|e| DbError::vector_io(path, format!("Failed to open vector file: {}", e)))?;
        let mut reader = BufReader::new(file);
        bincode::decode_from_std_read(&mut reader, config::standard())
            .map_err(|e| DbError::vector_parse(path, format!("Failed to decode vectors: {}", e)))
    }

    fn load_meta(path: &Path) -> DbResult<Option<VectorIndexMeta>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .map_err(|e| DbError::vector_io(path, format!("Failed to read index metadata: {}", e)))?;
        match serde_json::from_str(&content) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) => {
                warn!("Ignoring unreadable index metadata at {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn load_feedback(path: &Path) -> DbResult<Vec<Feedback>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path)?;
        let mut entries = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Feedback>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => debug!("Skipping invalid feedback line {}: {}", line_num + 1, e),
            }
        }
        Ok(entries)
    }

    fn append_feedback(&self, feedback: &Feedback) -> DbResult<()> {
        let path = self.root.join(FEEDBACK_FILENAME);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", serde_json::to_string(feedback)?)?;
        Ok(())
    }
}

impl CorpusStore for FileCorpusStore {
    fn active_categories(&self) -> DbResult<Vec<CategorySummary>> {
        self.inner.active_categories()
    }

    fn category(&self, id: CategoryId) -> DbResult<Option<Category>> {
        self.inner.category(id)
    }

    fn faq(&self, id: FaqId) -> DbResult<Option<FaqRecord>> {
        self.inner.faq(id)
    }

    fn active_faq_count(&self) -> DbResult<usize> {
        self.inner.active_faq_count()
    }

    fn active_faqs(&self, offset: usize, limit: usize) -> DbResult<Vec<FaqRecord>> {
        self.inner.active_faqs(offset, limit)
    }

    fn indexed_faqs_in_category(&self, category: CategoryId) -> DbResult<Vec<IndexedFaq>> {
        self.inner.indexed_faqs_in_category(category)
    }

    fn indexed_faqs(&self, offset: usize, limit: usize) -> DbResult<Vec<IndexedFaq>> {
        self.inner.indexed_faqs(offset, limit)
    }

    fn upsert_vectors(&self, entries: Vec<FaqVectorEntry>) -> DbResult<()> {
        self.inner.upsert_vectors(entries)?;
        self.vectors_dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn prune_vectors(&self, model_id: &str) -> DbResult<usize> {
        let removed = self.inner.prune_vectors(model_id)?;
        if removed > 0 {
            self.vectors_dirty.store(true, Ordering::SeqCst);
        }
        Ok(removed)
    }

    fn index_meta(&self) -> DbResult<Option<VectorIndexMeta>> {
        self.inner.index_meta()
    }

    fn set_index_meta(&self, meta: VectorIndexMeta) -> DbResult<()> {
        self.flush()?;
        let path = self.root.join(INDEX_META_FILENAME);
        let json = serde_json::to_string_pretty(&meta)?;
        fs::write(&path, json).map_err(|e| {
            DbError::vector_io(&path, format!("Failed to write index metadata: {}", e))
        })?;
        self.inner.set_index_meta(meta)
    }

    fn record_feedback(&self, feedback: NewFeedback) -> DbResult<Feedback> {
        let stored = self.inner.record_feedback(feedback)?;
        self.append_feedback(&stored)?;
        let doc = self.inner.to_document()?;
        Self::write_document(&self.root.join(CORPUS_FILENAME), &doc)?;
        Ok(stored)
    }
}
