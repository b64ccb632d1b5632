//! Lazily initialized, process-wide vectorizer holder.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use faq_db::{CorpusStore, InitCoordinator, InitRole};

use super::{load_vectorizer, save_vectorizer, VectorizerModel};
use crate::config::VectorizerConfig;
use crate::errors::FaqError;

/// Page size used when reading training questions from the store.
const TRAINING_PAGE_SIZE: usize = 1000;

/// Holds the active vectorizer.
///
/// The first caller of [`ModelSlot::get_or_init`] loads the persisted model,
/// or trains one from the live corpus when none is usable. Concurrent
/// workers in other processes are serialized through the
/// [`InitCoordinator`]: one leader trains and persists while the others wait.
pub struct ModelSlot {
    dir: PathBuf,
    config: VectorizerConfig,
    coordinator: Arc<dyn InitCoordinator>,
    wait_timeout: Duration,
    current: RwLock<Option<Arc<VectorizerModel>>>,
}

impl ModelSlot {
    pub fn new(
        dir: impl Into<PathBuf>,
        config: VectorizerConfig,
        coordinator: Arc<dyn InitCoordinator>,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            dir: dir.into(),
            config,
            coordinator,
            wait_timeout,
            current: RwLock::new(None),
        }
    }

    /// Directory the model is persisted to.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// The loaded model, if any. Never triggers a load.
    pub fn get(&self) -> Option<Arc<VectorizerModel>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Install a model directly, replacing the current one.
    pub fn install(&self, model: VectorizerModel) -> Arc<VectorizerModel> {
        let model = Arc::new(model);
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(model.clone());
        model
    }

    /// Return the active model, loading or training it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::ModelNotTrained`] when there is no usable persisted
    /// model and the corpus has no trainable text, or a store error if the
    /// corpus cannot be read.
    pub fn get_or_init(&self, store: &dyn CorpusStore) -> Result<Arc<VectorizerModel>, FaqError> {
        if let Some(model) = self.get() {
            return Ok(model);
        }

        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        // Another thread may have finished while we waited for the lock
        if let Some(ref model) = *guard {
            return Ok(model.clone());
        }

        let model = Arc::new(self.load_or_train(store)?);
        *guard = Some(model.clone());
        Ok(model)
    }

    /// Train a fresh model from the corpus, persist it and make it active.
    ///
    /// Unlike the lazy path, persistence failures are returned to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`FaqError::EmptyCorpus`] if the corpus has no trainable text.
    pub fn retrain(&self, store: &dyn CorpusStore) -> Result<Arc<VectorizerModel>, FaqError> {
        let model = train_from_store(store, &self.config)?;
        save_vectorizer(&model, &self.dir)?;
        Ok(self.install(model))
    }

    fn load_persisted(&self) -> Option<VectorizerModel> {
        match load_vectorizer(&self.dir) {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!("Ignoring unusable persisted vectorizer: {}", e);
                None
            }
        }
    }

    fn load_or_train(&self, store: &dyn CorpusStore) -> Result<VectorizerModel, FaqError> {
        if let Some(model) = self.load_persisted() {
            return Ok(model);
        }

        match self.coordinator.try_lead()? {
            InitRole::Leader => {
                tracing::debug!("Building vectorizer as init leader");
                let result = self.train_and_persist(store);
                if let Err(e) = self.coordinator.release(result.is_ok()) {
                    tracing::warn!("Could not release vectorizer init lock: {}", e);
                }
                result
            }
            InitRole::Follower => {
                tracing::debug!("Waiting for another worker to build the vectorizer");
                if !self.coordinator.wait_ready(self.wait_timeout) {
                    tracing::warn!(
                        "Vectorizer build did not finish within {:?}",
                        self.wait_timeout
                    );
                }
                match self.load_persisted() {
                    Some(model) => Ok(model),
                    None => {
                        tracing::warn!("No persisted vectorizer after waiting, training locally");
                        self.train_and_persist(store)
                    }
                }
            }
        }
    }

    fn train_and_persist(&self, store: &dyn CorpusStore) -> Result<VectorizerModel, FaqError> {
        let model = match train_from_store(store, &self.config) {
            Ok(model) => model,
            Err(FaqError::EmptyCorpus) => return Err(FaqError::ModelNotTrained),
            Err(e) => return Err(e),
        };

        if let Err(e) = save_vectorizer(&model, &self.dir) {
            tracing::warn!("Could not persist vectorizer, keeping it in memory: {}", e);
        }
        Ok(model)
    }
}

/// Fit a vectorizer on the questions of every active FAQ.
pub(crate) fn train_from_store(
    store: &dyn CorpusStore,
    config: &VectorizerConfig,
) -> Result<VectorizerModel, FaqError> {
    let mut questions = Vec::new();
    let mut offset = 0;
    loop {
        let page = store.active_faqs(offset, TRAINING_PAGE_SIZE)?;
        if page.is_empty() {
            break;
        }
        offset += page.len();
        questions.extend(page.into_iter().map(|faq| faq.question));
    }

    VectorizerModel::train(questions, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use faq_db::{Category, DbError, DbResult, FaqRecord, InMemoryCorpus, LocalCoordinator};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn corpus() -> InMemoryCorpus {
        let corpus = InMemoryCorpus::new();
        corpus.add_category(Category::new(1, "Compte")).unwrap();
        corpus
            .add_faq(FaqRecord::new(
                1,
                1,
                "Comment réinitialiser mon mot de passe ?",
                "Via le portail.",
            ))
            .unwrap();
        corpus
    }

    fn slot(dir: &std::path::Path, coordinator: Arc<dyn InitCoordinator>) -> ModelSlot {
        ModelSlot::new(
            dir.join("vectorizer"),
            VectorizerConfig::default(),
            coordinator,
            Duration::from_millis(50),
        )
    }

    /// Follower that never sees the leader finish.
    struct StuckFollower {
        waits: AtomicUsize,
    }

    impl InitCoordinator for StuckFollower {
        fn try_lead(&self) -> DbResult<InitRole> {
            Ok(InitRole::Follower)
        }
        fn release(&self, _ready: bool) -> DbResult<()> {
            Ok(())
        }
        fn wait_ready(&self, _timeout: Duration) -> bool {
            self.waits.fetch_add(1, Ordering::SeqCst);
            false
        }
    }

    /// Leader whose lock cannot be released.
    struct StuckLeader;

    impl InitCoordinator for StuckLeader {
        fn try_lead(&self) -> DbResult<InitRole> {
            Ok(InitRole::Leader)
        }
        fn release(&self, _ready: bool) -> DbResult<()> {
            Err(DbError::internal("lock file vanished"))
        }
        fn wait_ready(&self, _timeout: Duration) -> bool {
            true
        }
    }

    #[test]
    fn test_trains_and_persists_on_first_use() {
        let temp = TempDir::new().unwrap();
        let slot = slot(temp.path(), Arc::new(LocalCoordinator));
        assert!(slot.get().is_none());

        let model = slot.get_or_init(&corpus()).unwrap();
        assert!(temp.path().join("vectorizer").join("model.bin").exists());

        let again = slot.get_or_init(&corpus()).unwrap();
        assert_eq!(model.id(), again.id());
    }

    #[test]
    fn test_loads_persisted_model() {
        let temp = TempDir::new().unwrap();
        let first = slot(temp.path(), Arc::new(LocalCoordinator))
            .get_or_init(&corpus())
            .unwrap();

        // Empty corpus: only the persisted model can satisfy this
        let second = slot(temp.path(), Arc::new(LocalCoordinator))
            .get_or_init(&InMemoryCorpus::new())
            .unwrap();
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn test_empty_corpus_without_model_is_not_trained() {
        let temp = TempDir::new().unwrap();
        let err = slot(temp.path(), Arc::new(LocalCoordinator))
            .get_or_init(&InMemoryCorpus::new())
            .unwrap_err();
        assert!(matches!(err, FaqError::ModelNotTrained));
    }

    #[test]
    fn test_corrupt_model_triggers_retraining() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("vectorizer");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("model.bin"), b"garbage").unwrap();

        let model = slot(temp.path(), Arc::new(LocalCoordinator))
            .get_or_init(&corpus())
            .unwrap();
        assert!(model.dimension() > 0);
    }

    #[test]
    fn test_follower_trains_locally_after_timeout() {
        let temp = TempDir::new().unwrap();
        let follower = Arc::new(StuckFollower {
            waits: AtomicUsize::new(0),
        });
        let model = slot(temp.path(), follower.clone())
            .get_or_init(&corpus())
            .unwrap();

        assert_eq!(follower.waits.load(Ordering::SeqCst), 1);
        assert!(model.dimension() > 0);
    }

    #[test]
    fn test_leader_keeps_model_when_release_fails() {
        let temp = TempDir::new().unwrap();
        let slot = slot(temp.path(), Arc::new(StuckLeader));

        let model = slot.get_or_init(&corpus()).unwrap();
        assert!(model.dimension() > 0);
        assert_eq!(slot.get().unwrap().id(), model.id());
    }

    #[test]
    fn test_retrain_replaces_model() {
        let temp = TempDir::new().unwrap();
        let slot = slot(temp.path(), Arc::new(LocalCoordinator));
        let first = slot.get_or_init(&corpus()).unwrap();
        let second = slot.retrain(&corpus()).unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(slot.get().unwrap().id(), second.id());
        assert!(matches!(
            slot.retrain(&InMemoryCorpus::new()),
            Err(FaqError::EmptyCorpus)
        ));
    }
}
