//! Persistent single-value cell
//!
//! Keeps one JSON document on disk and a cached copy in memory. Suited to
//! small settings blobs that are read often and written rarely; use
//! [`Store`](crate::Store) for keyed data.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{JournalError, Result};

/// A value persisted as a pretty-printed JSON file
pub struct PersistentCell<T> {
    path: PathBuf,
    cached: Option<T>,
}

impl<T: Serialize + DeserializeOwned> PersistentCell<T> {
    /// Open the cell at `path`, writing `default` if the file is missing
    ///
    /// An existing file is read eagerly so a malformed document fails here.
    pub fn open(path: impl Into<PathBuf>, default: T) -> Result<Self> {
        let mut cell = Self {
            path: path.into(),
            cached: None,
        };

        if cell.path.try_exists()? {
            cell.load()?;
        } else {
            cell.set(default)?;
        }

        Ok(cell)
    }

    /// Current value, read from disk only on a cache miss
    pub fn get(&mut self) -> Result<&T> {
        if self.cached.is_none() {
            tracing::debug!(path = %self.path.display(), "cell cache miss");
            self.load()?;
        }

        self.cached
            .as_ref()
            .ok_or_else(|| JournalError::Serialization("cell value missing after load".to_string()))
    }

    /// Replace the value on disk (temp file + rename) and in the cache
    pub fn set(&mut self, value: T) -> Result<()> {
        let json = serde_json::to_vec_pretty(&value)
            .map_err(|e| JournalError::Serialization(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        tracing::debug!(path = %self.path.display(), bytes = json.len(), "cell written");
        self.cached = Some(value);
        Ok(())
    }

    /// Drop the cached value and read the file again
    pub fn reload(&mut self) -> Result<&T> {
        self.cached = None;
        self.get()
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self) -> Result<()> {
        let bytes = fs::read(&self.path)?;
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            JournalError::Serialization(format!("{}: {}", self.path.display(), e))
        })?;
        self.cached = Some(value);
        Ok(())
    }
}
