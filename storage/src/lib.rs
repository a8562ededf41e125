use redwatch_core::{CoreError, History, SeenSet, StorageError, Token};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info};


/// Everything the pipeline persists, committed as one unit. The
/// view/config layer reads this; only the poll cycle writes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerState {
    pub token: Option<Token>,
    pub seen: SeenSet,
    pub history: History,
    /// End of the most recently completed poll cycle, epoch seconds.
    /// Zero means no cycle has ever completed.
    pub last_check: i64,
}

/// Persistence seam for the poll cycle. `store` must be
/// all-or-nothing: a failed write leaves the previously committed
/// state readable.
pub trait StateStore: Send + Sync {
    fn load(&self) -> impl std::future::Future<Output = Result<TrackerState, CoreError>> + Send;
    fn store(
        &self,
        state: &TrackerState,
    ) -> impl std::future::Future<Output = Result<(), CoreError>> + Send;
}

impl<S: StateStore> StateStore for std::sync::Arc<S> {
    async fn load(&self) -> Result<TrackerState, CoreError> {
        (**self).load().await
    }

    async fn store(&self, state: &TrackerState) -> Result<(), CoreError> {
        (**self).store(state).await
    }
}

/// On-disk store: a single JSON snapshot, committed by writing a
/// sibling temp file and renaming it over the target. The rename is
/// the commit point.
#[derive(Debug)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        PathBuf::from(temp)
    }
}

impl StateStore for JsonStateStore {
    async fn load(&self) -> Result<TrackerState, CoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no state file at {}, starting fresh", self.path.display());
                return Ok(TrackerState::default());
            }
            Err(err) => {
                return Err(StorageError::Read {
                    reason: err.to_string(),
                }
                .into())
            }
        };

        let state = serde_json::from_str(&contents).map_err(|err| StorageError::Corrupt {
            details: err.to_string(),
        })?;
        Ok(state)
    }

    async fn store(&self, state: &TrackerState) -> Result<(), CoreError> {
        let contents =
            serde_json::to_string_pretty(state).map_err(|err| StorageError::Write {
                reason: err.to_string(),
            })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|err| StorageError::Write {
                        reason: err.to_string(),
                    })?;
            }
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, contents)
            .await
            .map_err(|err| StorageError::Write {
                reason: err.to_string(),
            })?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|err| StorageError::Write {
                reason: err.to_string(),
            })?;

        info!(
            history = state.history.len(),
            seen = state.seen.len(),
            "state committed to {}",
            self.path.display()
        );
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs. Writes can be made
/// to fail on demand to exercise the persist-abort path.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<TrackerState>,
    fail_writes: AtomicBool,
}

impl MemoryStateStore {
    pub fn new(initial: TrackerState) -> Self {
        Self {
            state: Mutex::new(initial),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<TrackerState, CoreError> {
        Ok(self.state.lock().await.clone())
    }

    async fn store(&self, state: &TrackerState) -> Result<(), CoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write {
                reason: "write failure injected".to_string(),
            }
            .into());
        }
        *self.state.lock().await = state.clone();
        Ok(())
    }
}
