//! Checkpoint store collaborator
//!
//! The pipeline persists exactly one value, the resume cursor, under one key.
//! [`CheckpointStore`] is the narrow seam to whatever durable store hosts it
//! (a secret manager, a bucket, a local file). Two stores ship here:
//! [`FileCheckpointStore`] for deployments with a persistent volume and
//! [`MemoryCheckpointStore`] for tests and dry runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

/// Failures reported by a checkpoint store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The resource holding the checkpoint was never created
    #[error("checkpoint '{0}' does not exist")]
    NotFound(String),

    /// The resource exists but no value was ever written
    #[error("checkpoint '{0}' has no value yet")]
    Empty(String),

    #[error("checkpoint store unavailable: {0}")]
    Unavailable(String),
}

/// Durable key/value storage for the resume cursor
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the current value
    ///
    /// Returns [`StoreError::NotFound`] when the resource does not exist and
    /// [`StoreError::Empty`] when it exists without a value.
    async fn get(&self, key: &str) -> Result<String, StoreError>;

    /// Create the resource without a value. Creating an existing resource is a no-op.
    async fn create(&self, key: &str) -> Result<(), StoreError>;

    /// Replace the current value
    async fn update(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: CheckpointStore + ?Sized> CheckpointStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        (**self).get(key).await
    }

    async fn create(&self, key: &str) -> Result<(), StoreError> {
        (**self).create(key).await
    }

    async fn update(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).update(key, value).await
    }
}

// ============================================================================
// File store
// ============================================================================

/// One file per key under a directory
///
/// Updates write a sibling temp file and rename it over the checkpoint, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StoreError::Unavailable(format!("invalid checkpoint key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.checkpoint", key)))
    }
}

fn unavailable(path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) if value.trim().is_empty() => Err(StoreError::Empty(key.to_string())),
            Ok(value) => Ok(value.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            },
            Err(e) => Err(unavailable(&path, e)),
        }
    }

    async fn create(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| unavailable(&self.dir, e))?;

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => {
                debug!(path = %path.display(), "Created checkpoint file");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(unavailable(&path, e)),
        }
    }

    async fn update(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("checkpoint.tmp");

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| unavailable(&self.dir, e))?;
        tokio::fs::write(&tmp, value.as_bytes())
            .await
            .map_err(|e| unavailable(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| unavailable(&path, e))?;

        debug!(path = %path.display(), "Checkpoint updated");
        Ok(())
    }
}

// ============================================================================
// Memory store
// ============================================================================

/// In-process store that remembers every write
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    values: HashMap<String, Option<String>>,
    history: HashMap<String, Vec<String>>,
    creates: usize,
    outage: Option<String>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose resource already holds `value`
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.inner.lock() {
            state.values.insert(key.to_string(), Some(value.to_string()));
        }
        store
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`]
    pub fn set_outage(&self, reason: Option<&str>) {
        if let Ok(mut state) = self.inner.lock() {
            state.outage = reason.map(str::to_string);
        }
    }

    /// Values written through `update`, oldest first
    pub fn history(&self, key: &str) -> Vec<String> {
        self.inner
            .lock()
            .map(|state| state.history.get(key).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Number of resources created through `create`
    pub fn creates(&self) -> usize {
        self.inner.lock().map(|state| state.creates).unwrap_or_default()
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StoreError> {
        let state = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        match &state.outage {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        match self.state()?.values.get(key) {
            None => Err(StoreError::NotFound(key.to_string())),
            Some(None) => Err(StoreError::Empty(key.to_string())),
            Some(Some(value)) => Ok(value.clone()),
        }
    }

    async fn create(&self, key: &str) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if !state.values.contains_key(key) {
            state.values.insert(key.to_string(), None);
            state.creates += 1;
        }
        Ok(())
    }

    async fn update(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.values.insert(key.to_string(), Some(value.to_string()));
        state
            .history
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }
}
