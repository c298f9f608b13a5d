//! Store configuration: defaults, overridable from the environment (and `.env`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::category::Category;
use crate::codec::KeyMode;
use crate::error::{DataError, Result};
use crate::storage::{Backend, Location};

/// Which object store implementation to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ObjectStoreConfig {
    /// Buckets as directories under `root`.
    Directory { root: PathBuf },
    /// Path-style S3-compatible HTTP endpoint.
    Http { endpoint: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Local Filesystem Store root.
    pub data_dir: PathBuf,
    pub bucket: String,
    /// Credentials profile identifier, carried in every descriptor.
    pub profile: String,
    /// Key-value table name is `{table_prefix}{category}`.
    pub table_prefix: String,
    pub object_store: ObjectStoreConfig,
    pub kv_dir: PathBuf,
    pub key_mode: KeyMode,
    /// Rows generated when a dataset has to be created on demand.
    pub default_row_count: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("generate_data"),
            bucket: "web-app-python".to_string(),
            profile: "webapp".to_string(),
            table_prefix: "webapp-".to_string(),
            object_store: ObjectStoreConfig::Directory {
                root: PathBuf::from("object_store"),
            },
            kv_dir: PathBuf::from("kv_store"),
            key_mode: KeyMode::Lenient,
            default_row_count: 100,
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by `TRANSPORT_*` variables; loads `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("TRANSPORT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(bucket) = lookup("TRANSPORT_BUCKET") {
            config.bucket = bucket;
        }
        if let Some(profile) = lookup("TRANSPORT_PROFILE") {
            config.profile = profile;
        }
        if let Some(prefix) = lookup("TRANSPORT_TABLE_PREFIX") {
            config.table_prefix = prefix;
        }
        if let Some(endpoint) = lookup("TRANSPORT_OBJECT_ENDPOINT") {
            config.object_store = ObjectStoreConfig::Http { endpoint };
        } else if let Some(root) = lookup("TRANSPORT_OBJECT_DIR") {
            config.object_store = ObjectStoreConfig::Directory {
                root: PathBuf::from(root),
            };
        }
        if let Some(dir) = lookup("TRANSPORT_KV_DIR") {
            config.kv_dir = PathBuf::from(dir);
        }
        if let Some(strict) = lookup("TRANSPORT_STRICT_KEYS") {
            config.key_mode = if parse_flag("TRANSPORT_STRICT_KEYS", &strict)? {
                KeyMode::Strict
            } else {
                KeyMode::Lenient
            };
        }
        if let Some(rows) = lookup("TRANSPORT_DEFAULT_ROWS") {
            config.default_row_count = rows
                .trim()
                .parse()
                .ok()
                .filter(|&n: &usize| n > 0)
                .ok_or_else(|| {
                    DataError::Config(format!("TRANSPORT_DEFAULT_ROWS must be a positive integer, got '{}'", rows))
                })?;
        }

        Ok(config)
    }

    pub fn kv_table(&self, category: Category) -> String {
        format!("{}{}", self.table_prefix, category)
    }

    /// Storage Location Descriptor for one backend and category.
    pub fn location(&self, backend: Backend, category: Category) -> Location {
        let container = match backend {
            Backend::Local => None,
            Backend::Object => Some(self.bucket.clone()),
            Backend::KeyValue => Some(self.kv_table(category)),
        };
        Location {
            backend,
            category,
            profile: Some(self.profile.clone()),
            container,
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(DataError::Config(format!("{} must be a boolean, got '{}'", name, other))),
    }
}
