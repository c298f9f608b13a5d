//! Storage backends - the three places a dataset can live.
//!
//! Local files and the object store can be probed and read; the key-value
//! store is write-only.

pub mod kv;
pub mod local;
pub mod object;

pub use kv::{DirectoryKeyValueStore, KeyValueStore, KvItem, MemoryKeyValueStore};
pub use local::{DirectoryStore, LocalStore};
pub use object::{DirectoryObjectStore, HttpObjectStore, MemoryObjectStore, ObjectStore};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::category::Category;
use crate::config::{ObjectStoreConfig, StoreConfig};
use crate::error::{DataError, Result};

/// Backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Backend {
    Local,
    Object,
    KeyValue,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Local => "local filesystem",
            Backend::Object => "object store",
            Backend::KeyValue => "key-value store",
        })
    }
}

/// Stored artifact flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactFormat {
    Csv,
    Json,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Csv => "csv",
            ArtifactFormat::Json => "json",
        }
    }
}

/// Result of an existence probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Exists,
    Absent,
    /// The backend could not be reached or refused the request.
    Unreachable(String),
}

impl Presence {
    pub fn exists(&self) -> bool {
        matches!(self, Presence::Exists)
    }
}

/// Stored bodies are UTF-8 text; anything else is malformed, not unavailable.
pub(crate) fn utf8_body(bytes: Vec<u8>, artifact: &str) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| DataError::MalformedInput(format!("{} is not valid UTF-8: {}", artifact, e.utf8_error())))
}

/// Storage Location Descriptor: where one category lives on one backend.
///
/// Built per call from [`StoreConfig::location`]; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub backend: Backend,
    pub category: Category,
    /// Credentials profile identifier.
    pub profile: Option<String>,
    /// Bucket name for the object store, table name for the key-value store.
    pub container: Option<String>,
}

impl Location {
    /// `{category}.csv` or `{category}.json`
    pub fn artifact(&self, format: ArtifactFormat) -> String {
        format!("{}.{}", self.category, format.extension())
    }

    pub fn container(&self) -> &str {
        self.container.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.container {
            Some(container) => write!(f, "{} '{}' ({})", self.backend, container, self.category),
            None => write!(f, "{} ({})", self.backend, self.category),
        }
    }
}

/// Concrete stores shared by the resolver, retrieval engine and writer.
#[derive(Clone)]
pub struct Backends {
    pub local: Arc<dyn LocalStore>,
    pub object: Arc<dyn ObjectStore>,
    pub kv: Arc<dyn KeyValueStore>,
}

impl Backends {
    pub fn new(
        local: Arc<dyn LocalStore>,
        object: Arc<dyn ObjectStore>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self { local, object, kv }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let object: Arc<dyn ObjectStore> = match &config.object_store {
            ObjectStoreConfig::Directory { root } => Arc::new(DirectoryObjectStore::new(root.clone())),
            ObjectStoreConfig::Http { endpoint } => Arc::new(HttpObjectStore::new(endpoint.clone())?),
        };
        Ok(Self {
            local: Arc::new(DirectoryStore::new(config.data_dir.clone())),
            object,
            kv: Arc::new(DirectoryKeyValueStore::new(config.kv_dir.clone())),
        })
    }
}
