//! Object Store - bucket + key addressed text objects.

use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::error::{DataError, Result};

use super::{utf8_body, Backend, Presence};

pub trait ObjectStore: Send + Sync {
    /// Metadata-only existence probe; never transfers the body.
    fn head(&self, bucket: &str, key: &str) -> Presence;
    fn get(&self, bucket: &str, key: &str) -> Result<String>;
    fn put(&self, bucket: &str, key: &str, body: &str) -> Result<()>;
}

fn unavailable(detail: impl ToString) -> DataError {
    DataError::BackendUnavailable {
        backend: Backend::Object,
        detail: detail.to_string(),
    }
}

/// In-process object store.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryObjectStore {
    fn head(&self, bucket: &str, key: &str) -> Presence {
        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        if objects.contains_key(&(bucket.to_string(), key.to_string())) {
            Presence::Exists
        } else {
            Presence::Absent
        }
    }

    fn get(&self, bucket: &str, key: &str) -> Result<String> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| DataError::NotFound {
                artifact: format!("{}/{}", bucket, key),
            })
    }

    fn put(&self, bucket: &str, key: &str, body: &str) -> Result<()> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((bucket.to_string(), key.to_string()), body.to_string());
        Ok(())
    }
}

/// Buckets as directories under `root`: `{root}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct DirectoryObjectStore {
    root: PathBuf,
}

impl DirectoryObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }
}

impl ObjectStore for DirectoryObjectStore {
    fn head(&self, bucket: &str, key: &str) -> Presence {
        match self.bucket_dir(bucket).join(key).metadata() {
            Ok(meta) if meta.is_file() => Presence::Exists,
            Ok(_) => Presence::Absent,
            Err(e) if e.kind() == ErrorKind::NotFound => Presence::Absent,
            Err(e) => Presence::Unreachable(e.to_string()),
        }
    }

    fn get(&self, bucket: &str, key: &str) -> Result<String> {
        match fs::read(self.bucket_dir(bucket).join(key)) {
            Ok(bytes) => utf8_body(bytes, key),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DataError::NotFound {
                artifact: format!("{}/{}", bucket, key),
            }),
            Err(e) => Err(unavailable(e)),
        }
    }

    fn put(&self, bucket: &str, key: &str, body: &str) -> Result<()> {
        let dir = self.bucket_dir(bucket);
        fs::create_dir_all(&dir).map_err(unavailable)?;
        fs::write(dir.join(key), body).map_err(unavailable)
    }
}

/// Path-style S3-compatible endpoint: `{endpoint}/{bucket}/{key}`.
///
/// Requests are unsigned; network timeouts are whatever the client defaults to.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    endpoint: String,
    client: Client,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| DataError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, bucket, key)
    }
}

impl ObjectStore for HttpObjectStore {
    fn head(&self, bucket: &str, key: &str) -> Presence {
        match self.client.head(self.url(bucket, key)).send() {
            Ok(resp) if resp.status().is_success() => Presence::Exists,
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => Presence::Absent,
            Ok(resp) => Presence::Unreachable(format!("HTTP {}", resp.status())),
            Err(e) => Presence::Unreachable(e.to_string()),
        }
    }

    fn get(&self, bucket: &str, key: &str) -> Result<String> {
        let resp = self
            .client
            .get(self.url(bucket, key))
            .send()
            .map_err(unavailable)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(DataError::NotFound {
                artifact: format!("{}/{}", bucket, key),
            });
        }
        let bytes = resp
            .error_for_status()
            .map_err(unavailable)?
            .bytes()
            .map_err(unavailable)?;
        utf8_body(bytes.to_vec(), key)
    }

    fn put(&self, bucket: &str, key: &str, body: &str) -> Result<()> {
        self.client
            .put(self.url(bucket, key))
            .body(body.to_string())
            .send()
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?;
        Ok(())
    }
}
