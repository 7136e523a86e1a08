//! Cursor lifecycle on top of a checkpoint store

use ioc_common::types::Cursor;
use ioc_common::{IngestError, Result};
use tracing::{debug, info};

use crate::checkpoint::{CheckpointStore, StoreError};

/// Owns the resume cursor and its only persistence, the checkpoint store
pub struct CursorManager<S> {
    store: S,
    key: String,
    loaded: Option<Cursor>,
}

impl<S: CheckpointStore> CursorManager<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            loaded: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted cursor
    ///
    /// A missing checkpoint means first run: the resource is created and
    /// `Unset` returned. Any failure other than "no value yet" is
    /// [`IngestError::CheckpointUnavailable`].
    pub async fn load(&mut self) -> Result<Cursor> {
        let cursor = match self.store.get(&self.key).await {
            Ok(value) => Cursor::from_persisted(Some(&value)),
            Err(StoreError::NotFound(_)) => {
                info!(key = %self.key, "No checkpoint found, first run");
                self.store
                    .create(&self.key)
                    .await
                    .map_err(|e| IngestError::checkpoint(e.to_string()))?;
                Cursor::Unset
            },
            Err(StoreError::Empty(_)) => Cursor::Unset,
            Err(e) => return Err(IngestError::checkpoint(e.to_string())),
        };

        debug!(key = %self.key, cursor = %cursor, "Cursor loaded");
        self.loaded = Some(cursor.clone());
        Ok(cursor)
    }

    /// Persist `Active(token)`
    pub async fn advance(&mut self, token: &str) -> Result<()> {
        self.persist(Cursor::Active(token.to_string())).await
    }

    /// Persist `Exhausted`
    ///
    /// Returns `false` without writing when the cursor loaded at start was
    /// already `Exhausted`.
    pub async fn exhaust(&mut self) -> Result<bool> {
        if self.loaded == Some(Cursor::Exhausted) {
            debug!(key = %self.key, "Checkpoint already marks the feed as drained");
            return Ok(false);
        }
        self.persist(Cursor::Exhausted).await?;
        Ok(true)
    }

    async fn persist(&mut self, cursor: Cursor) -> Result<()> {
        let Some(value) = cursor.to_persisted() else {
            return Ok(());
        };

        self.store
            .update(&self.key, value)
            .await
            .map_err(|e| IngestError::checkpoint(e.to_string()))?;

        info!(key = %self.key, cursor = %cursor, "Checkpoint persisted");
        self.loaded = Some(cursor);
        Ok(())
    }
}
