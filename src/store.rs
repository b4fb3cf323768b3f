//! Shared key/value store backing the game session.
//!
//! Holds the turn log and the cached pseudonyms under well-known keys. Every
//! mutation replaces the whole value, rewrites the backing file and publishes a
//! [`StoreChange`] to all subscribers. A mutation whose file write fails leaves
//! the in-memory contents untouched. There is no compare-and-swap: concurrent
//! writers race and the last write wins.

use crate::types::Turn;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::{broadcast, RwLock};

pub const MESSAGES_KEY: &str = "imitation-messages";
pub const HUMAN_USERNAME_KEY: &str = "imitation-human-username";
pub const AI_USERNAME_KEY: &str = "imitation-ai-username";
pub const ANON_USERNAMES_KEY: &str = "imitation-anon-usernames";

/// All keys owned by a game session (cleared together on reset)
pub const SESSION_KEYS: [&str; 4] = [
    MESSAGES_KEY,
    HUMAN_USERNAME_KEY,
    AI_USERNAME_KEY,
    ANON_USERNAMES_KEY,
];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to persist store: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode store contents: {0}")]
    Json(#[from] serde_json::Error),
}

/// Published after every mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: String,
}

pub struct SharedStore {
    entries: RwLock<HashMap<String, String>>,
    path: Option<PathBuf>,
    changes: broadcast::Sender<StoreChange>,
}

impl SharedStore {
    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self::with_entries(HashMap::new(), None)
    }

    /// Load the store from `path`. A missing or unreadable file starts empty.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(entries) => {
                    tracing::info!("Loaded {} store keys from {}", entries.len(), path.display());
                    entries
                }
                Err(e) => {
                    tracing::warn!(
                        "Store file {} is malformed ({}), starting empty",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}, starting empty", path.display(), e);
                HashMap::new()
            }
        };

        Self::with_entries(entries, Some(path))
    }

    fn with_entries(entries: HashMap<String, String>, path: Option<PathBuf>) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            entries: RwLock::new(entries),
            path,
            changes: tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    pub async fn get_item(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.flush(&next).await?;
        *entries = next;
        drop(entries);

        self.notify(key);
        Ok(())
    }

    pub async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next).await?;
        *entries = next;
        drop(entries);

        self.notify(key);
        Ok(())
    }

    /// Copy of every key/value pair
    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.entries.read().await.clone()
    }

    /// Swap in a complete set of entries (used by state import)
    pub async fn replace_all(&self, new_entries: HashMap<String, String>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let mut touched: Vec<String> = entries.keys().cloned().collect();
        touched.extend(new_entries.keys().filter(|k| !entries.contains_key(*k)).cloned());

        self.flush(&new_entries).await?;
        *entries = new_entries;
        drop(entries);

        for key in touched {
            self.notify(&key);
        }
        Ok(())
    }

    /// Current turn log. Missing or malformed data reads as empty.
    pub async fn read(&self) -> Vec<Turn> {
        let Some(raw) = self.get_item(MESSAGES_KEY).await else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(turns) => turns,
            Err(e) => {
                tracing::warn!("Stored message log is malformed ({}), treating as empty", e);
                Vec::new()
            }
        }
    }

    /// Replace the whole turn log
    pub async fn write(&self, turns: &[Turn]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(turns)?;
        self.set_item(MESSAGES_KEY, raw).await
    }

    async fn flush(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(path, raw).await?;
        Ok(())
    }

    fn notify(&self, key: &str) {
        // No subscribers is fine
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
        });
    }
}
