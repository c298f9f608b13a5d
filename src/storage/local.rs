//! Local Filesystem Store - `<category>.csv` / `<category>.json` under a data directory.

use std::fs;
use std::path::PathBuf;

use crate::error::Result;

use super::{utf8_body, Presence};

pub trait LocalStore: Send + Sync {
    fn exists(&self, file_name: &str) -> Presence;
    fn read(&self, file_name: &str) -> Result<String>;
    /// Full overwrite; creates the data directory when missing.
    fn write(&self, file_name: &str, body: &str) -> Result<()>;
}

/// Filesystem store rooted at the configured data directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }
}

impl LocalStore for DirectoryStore {
    fn exists(&self, file_name: &str) -> Presence {
        match self.path(file_name).try_exists() {
            Ok(true) => Presence::Exists,
            Ok(false) => Presence::Absent,
            Err(e) => Presence::Unreachable(e.to_string()),
        }
    }

    fn read(&self, file_name: &str) -> Result<String> {
        utf8_body(fs::read(self.path(file_name))?, file_name)
    }

    fn write(&self, file_name: &str, body: &str) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.path(file_name), body)?;
        Ok(())
    }
}
