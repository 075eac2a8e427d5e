//! Local persistence for the session history
//!
//! A tiny key-value store (one JSON file per key) and the history record kept
//! under the fixed `chatHistory` key. The record is always the full message
//! list; there are no partial updates and no schema versioning.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, warn};

use crate::state::Message;

pub const HISTORY_KEY: &str = "chatHistory";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("history record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// String values stored as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct KvStore {
    dir: PathBuf,
}

impl KvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, HistoryError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), HistoryError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    /// Removing a missing key is not an error
    pub fn remove(&self, key: &str) -> Result<(), HistoryError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    kv: KvStore,
}

impl HistoryStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(KvStore::new(dir))
    }

    /// Read the persisted history. A missing record is an empty history, and
    /// so is a record that can't be read back.
    pub fn load(&self) -> Vec<Message> {
        match self.try_load() {
            Ok(messages) => {
                debug!(count = messages.len(), "loaded chat history");
                messages
            }
            Err(e) => {
                warn!("ignoring unreadable chat history: {}", e);
                Vec::new()
            }
        }
    }

    pub fn try_load(&self) -> Result<Vec<Message>, HistoryError> {
        match self.kv.get(HISTORY_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn save(&self, messages: &[Message]) -> Result<(), HistoryError> {
        let raw = serde_json::to_string(messages)?;
        self.kv.set(HISTORY_KEY, &raw)
    }

    pub fn erase(&self) -> Result<(), HistoryError> {
        self.kv.remove(HISTORY_KEY)
    }

    pub fn exists(&self) -> bool {
        self.kv.path_for(HISTORY_KEY).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Conversation, MessageDraft};
    use tempfile::tempdir;

    #[test]
    fn test_missing_record_is_empty_history() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::open(dir.path());
        assert!(store.load().is_empty());
        assert!(!store.exists());
    }

    #[test]
    fn test_save_and_reload_preserves_order_and_fields() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::open(dir.path());

        let mut conversation = Conversation::new();
        conversation.append(MessageDraft::user("first"));
        conversation.append(MessageDraft::assistant("**Summary**\n- point"));
        conversation.append(MessageDraft::error("index not built"));
        store.save(conversation.messages()).unwrap();

        let reloaded = HistoryStore::open(dir.path()).load();
        assert_eq!(reloaded, conversation.messages());
    }

    #[test]
    fn test_erase_removes_record() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::open(dir.path());
        let mut conversation = Conversation::new();
        conversation.append(MessageDraft::user("hi"));
        store.save(conversation.messages()).unwrap();
        assert!(store.exists());

        store.erase().unwrap();
        assert!(!store.exists());
        // Erasing twice is fine
        store.erase().unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_record_loads_as_empty() {
        let dir = tempdir().unwrap();
        let kv = KvStore::new(dir.path());
        kv.set(HISTORY_KEY, "{not json").unwrap();

        let store = HistoryStore::new(kv);
        assert!(store.try_load().is_err());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_kv_store_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let kv = KvStore::new(&nested);

        kv.set("key", "value").unwrap();
        assert_eq!(kv.get("key").unwrap().as_deref(), Some("value"));
        assert_eq!(kv.get("other").unwrap(), None);
    }
}
