//! Key-Value Store - one item per row, every attribute stored as a string.
//!
//! Write-only: nothing in the retrieval path reads items back.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::error::{DataError, Result};

use super::Backend;

/// One stored item. `key` carries the record identifier by convention; key
/// schema validation is left to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvItem {
    pub key: String,
    pub attributes: BTreeMap<String, String>,
}

pub trait KeyValueStore: Send + Sync {
    /// Inserts or replaces the item with the same key.
    fn put_item(&self, table: &str, item: &KvItem) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    tables: Mutex<HashMap<String, BTreeMap<String, KvItem>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a table's items, ordered by key. Inspection only.
    pub fn items(&self, table: &str) -> Vec<KvItem> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn put_item(&self, table: &str, item: &KvItem) -> Result<()> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table.to_string())
            .or_default()
            .insert(item.key.clone(), item.clone());
        Ok(())
    }
}

/// Items as JSON files: `{root}/{table}/{key}.json`.
#[derive(Debug, Clone)]
pub struct DirectoryKeyValueStore {
    root: PathBuf,
}

impl DirectoryKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl KeyValueStore for DirectoryKeyValueStore {
    fn put_item(&self, table: &str, item: &KvItem) -> Result<()> {
        if item.key.is_empty() || item.key.contains(|c: char| c == '/' || c == '\\') || item.key.starts_with('.') {
            return Err(DataError::BackendUnavailable {
                backend: Backend::KeyValue,
                detail: format!("invalid item key '{}'", item.key),
            });
        }
        let dir = self.root.join(table);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string(&item.attributes)?;
        fs::write(dir.join(format!("{}.json", item.key)), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, city: &str) -> KvItem {
        KvItem {
            key: key.to_string(),
            attributes: BTreeMap::from([
                ("train_number".to_string(), key.to_string()),
                ("to_city".to_string(), city.to_string()),
            ]),
        }
    }

    #[test]
    fn test_memory_put_replaces_by_key() {
        let store = MemoryKeyValueStore::new();
        store.put_item("webapp-train", &item("T000001", "Oslo")).unwrap();
        store.put_item("webapp-train", &item("T000001", "Lima")).unwrap();
        store.put_item("webapp-train", &item("T000002", "Kyoto")).unwrap();

        let items = store.items("webapp-train");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].attributes["to_city"], "Lima");
        assert!(store.items("webapp-bus").is_empty());
    }

    #[test]
    fn test_directory_store_writes_one_file_per_item() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryKeyValueStore::new(dir.path());
        store.put_item("webapp-train", &item("T000001", "Oslo")).unwrap();

        let raw = fs::read_to_string(dir.path().join("webapp-train/T000001.json")).unwrap();
        let attributes: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(attributes["to_city"], "Oslo");

        assert!(store.put_item("webapp-train", &item("../escape", "x")).is_err());
    }
}
