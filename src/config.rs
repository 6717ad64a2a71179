//! Configuration for JournalKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{JournalError, Result};

/// Main configuration for a JournalKV store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the journal file. One store instance per path.
    /// Parent directories are created on open.
    pub path: PathBuf,

    // -------------------------------------------------------------------------
    // Log Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often the write worker fsyncs the journal
    pub sync_strategy: SyncStrategy,

    /// Rewrite the journal as a single snapshot after this many delta
    /// frames (`None` = only on open and explicit `compact()`)
    pub auto_compact_after: Option<usize>,

    // -------------------------------------------------------------------------
    // Logging
    // -------------------------------------------------------------------------
    /// Subscriber used for recovery and the write worker. `None` captures
    /// the dispatcher that is current on the thread calling `Store::open`.
    pub dispatch: Option<tracing::Dispatch>,
}

/// Journal sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every frame (safest, slowest)
    EveryWrite,

    /// fsync after N appended frames (balanced durability/performance)
    EveryNEntries { count: usize },

    /// fsync only on `flush()` / `close()`
    OnFlush,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./journalkv.log"),
            sync_strategy: SyncStrategy::EveryNEntries { count: 100 },
            auto_compact_after: None,
            dispatch: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the configuration for values the store cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(JournalError::Config("journal path is empty".to_string()));
        }

        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(JournalError::Config(
                "EveryNEntries sync count must be at least 1".to_string(),
            ));
        }

        if self.auto_compact_after == Some(0) {
            return Err(JournalError::Config(
                "auto_compact_after must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the journal file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Compact automatically after `frames` delta frames
    pub fn auto_compact_after(mut self, frames: usize) -> Self {
        self.config.auto_compact_after = Some(frames);
        self
    }

    /// Route the store's logging to a specific subscriber
    pub fn dispatch(mut self, dispatch: tracing::Dispatch) -> Self {
        self.config.dispatch = Some(dispatch);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
