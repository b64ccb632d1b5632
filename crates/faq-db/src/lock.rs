//! Cross-worker coordination for the one-time model build.
//!
//! Several worker processes may start at once and find no persisted
//! vectorizer. Exactly one of them should train and persist it while the
//! others wait. The retrieval core only sees the [`InitCoordinator`] trait.
//!
//! [`LockFileCoordinator`] implements it with two files in the data
//! directory:
//!
//! ```text
//! <data_dir>/
//! ├── init.lock    # Held by the leader while it builds (created with O_EXCL)
//! └── init.ready   # Written by the leader after a successful build
//! ```

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// Lock filename.
pub const INIT_LOCK_FILENAME: &str = "init.lock";

/// Ready flag filename.
pub const INIT_READY_FILENAME: &str = "init.ready";

/// Role handed out by [`InitCoordinator::try_lead`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitRole {
    /// This worker builds the model and must call [`InitCoordinator::release`].
    Leader,
    /// Another worker is building; wait with [`InitCoordinator::wait_ready`].
    Follower,
}

/// Leader election for model initialization.
pub trait InitCoordinator: Send + Sync {
    /// Try to become the worker that builds the model.
    fn try_lead(&self) -> DbResult<InitRole>;

    /// Leader only: release the lock, flagging whether the build succeeded.
    fn release(&self, ready: bool) -> DbResult<()>;

    /// Follower only: block until the leader releases or `timeout` elapses.
    ///
    /// Returns `true` when the leader flagged success.
    fn wait_ready(&self, timeout: Duration) -> bool;
}

/// Coordinator for a single process: the caller always leads.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCoordinator;

impl InitCoordinator for LocalCoordinator {
    fn try_lead(&self) -> DbResult<InitRole> {
        Ok(InitRole::Leader)
    }

    fn release(&self, _ready: bool) -> DbResult<()> {
        Ok(())
    }

    fn wait_ready(&self, _timeout: Duration) -> bool {
        true
    }
}

/// Lock-file based coordinator shared by processes on one host.
#[derive(Debug, Clone)]
pub struct LockFileCoordinator {
    lock_path: PathBuf,
    ready_path: PathBuf,
    poll_interval: Duration,
    stale_after: Duration,
}

impl LockFileCoordinator {
    /// Create a coordinator using files under `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            lock_path: dir.join(INIT_LOCK_FILENAME),
            ready_path: dir.join(INIT_READY_FILENAME),
            poll_interval: Duration::from_millis(200),
            stale_after: Duration::from_secs(600),
        }
    }

    /// Set how often followers poll the lock.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the age after which an abandoned lock is broken.
    pub fn with_stale_after(mut self, age: Duration) -> Self {
        self.stale_after = age;
        self
    }

    fn create_lock(&self) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)?;
        writeln!(file, "{}", std::process::id())
    }

    fn lock_is_stale(&self) -> bool {
        fs::metadata(&self.lock_path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .map(|age| age > self.stale_after)
            .unwrap_or(false)
    }
}

impl InitCoordinator for LockFileCoordinator {
    fn try_lead(&self) -> DbResult<InitRole> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        match self.create_lock() {
            Ok(()) => {
                debug!("Acquired init lock {}", self.lock_path.display());
                Ok(InitRole::Leader)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if self.lock_is_stale() {
                    warn!("Breaking stale init lock {}", self.lock_path.display());
                    let _ = fs::remove_file(&self.lock_path);
                    return match self.create_lock() {
                        Ok(()) => Ok(InitRole::Leader),
                        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(InitRole::Follower),
                        Err(e) => Err(DbError::InitLock {
                            path: self.lock_path.clone(),
                            message: e.to_string(),
                        }),
                    };
                }
                Ok(InitRole::Follower)
            }
            Err(e) => Err(DbError::InitLock {
                path: self.lock_path.clone(),
                message: e.to_string(),
            }),
        }
    }

    fn release(&self, ready: bool) -> DbResult<()> {
        if ready {
            fs::write(&self.ready_path, b"ready\n").map_err(|e| DbError::InitLock {
                path: self.ready_path.clone(),
                message: e.to_string(),
            })?;
        }
        match fs::remove_file(&self.lock_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DbError::InitLock {
                path: self.lock_path.clone(),
                message: e.to_string(),
            }),
        }
    }

    fn wait_ready(&self, timeout: Duration) -> bool {
        let started = Instant::now();
        while self.lock_path.exists() {
            if started.elapsed() >= timeout {
                warn!(
                    "Timed out after {:?} waiting for init lock {}",
                    timeout,
                    self.lock_path.display()
                );
                break;
            }
            thread::sleep(self.poll_interval);
        }
        self.ready_path.exists()
    }
}
