//! Shared key-value directory with per-key expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{RegistryError, Result};

/// A live value read from the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// The stored value.
    pub value: String,
    /// When the value stops being visible.
    pub expires_at: Instant,
}

/// A key-value store whose entries expire after a time-to-live.
///
/// Expired entries must never be returned by [`Directory::get`].
#[async_trait]
pub trait Directory: Send + Sync {
    /// Upserts `key` with `value`, visible for `ttl` from now.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Returns the live entry for `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<DirectoryEntry>>;
}

#[derive(Debug, Default)]
struct InMemoryDirectoryState {
    entries: HashMap<String, DirectoryEntry>,
    fail_on_set: bool,
}

/// In-memory directory with lazy expiry, shared by cloning.
///
/// Uses the tokio clock so tests can pause and advance time.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<InMemoryDirectoryState>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the directory to reject writes.
    pub async fn set_fail_on_set(&self, fail: bool) {
        self.state.write().await.fail_on_set = fail;
    }

    /// Returns the number of stored entries, including ones not yet purged.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_set {
            return Err(RegistryError::Directory("directory rejected write".to_string()));
        }

        state.entries.insert(
            key.to_string(),
            DirectoryEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<DirectoryEntry>> {
        let now = Instant::now();
        {
            let state = self.state.read().await;
            match state.entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.clone())),
                Some(_) => {}
            }
        }

        // Expired: purge unless a refresh landed in between.
        let mut state = self.state.write().await;
        if let Some(entry) = state.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.clone()));
            }
            state.entries.remove(key);
        }
        Ok(None)
    }
}
