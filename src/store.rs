//! Store Module
//!
//! The public key-value surface that coordinates all components.
//!
//! ## Responsibilities
//! - Recover and compact the journal on open
//! - Serve reads from the MemTable only
//! - Apply mutations in memory, then hand them to the write queue
//! - Expose flush/compact/close for orderly shutdown
//!
//! ## Durability Contract
//! Errors before the store is usable (creating the file, replaying the
//! journal) are returned from [`Store::open`]. Errors on the background
//! worker afterwards are logged and counted in [`StoreStats`], never
//! returned: a failed append leaves the journal one frame behind memory,
//! and a crash before the next successful write loses that update.

use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{JournalError, Result};
use crate::memtable::MemTable;
use crate::queue::{QueueStats, WriteQueue};
use crate::wal::{Payload, Record, Recovery, RecoveryResult};

/// An embedded journaled key-value store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader
///
/// - **Writes** (set/delete/compact): serialized by `write_lock`, which is
///   held across the MemTable update and the enqueue, so the journal order
///   always matches the order mutations were applied in memory
///
/// - **Reads** (get/iterate): MemTable read lock only, never disk
///
/// - **Journal I/O**: exclusively on the write queue's worker thread
pub struct Store<V> {
    /// Store configuration
    config: Config,

    /// Authoritative in-memory state (internal RwLock)
    memtable: MemTable<V>,

    /// Background writer owning the journal file handle
    queue: WriteQueue<V>,

    /// Serializes write operations; counts delta frames since the last snapshot
    write_lock: Mutex<usize>,

    /// What `open` found in the journal
    recovery: RecoveryResult,
}

/// Point-in-time store statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Live keys in memory
    pub entries: usize,

    /// Tasks not yet processed by the worker
    pub pending_writes: usize,

    /// Worker counters
    pub queue: QueueStats,
}

impl<V: Payload> Store<V> {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Replay the journal (if any) into a map
    /// 2. Atomically rewrite it as a single snapshot
    /// 3. Hand the append handle to the write queue
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let dispatch = config
            .dispatch
            .clone()
            .unwrap_or_else(|| tracing::dispatcher::get_default(|current| current.clone()));

        let (map, writer, recovery) = tracing::dispatcher::with_default(&dispatch, || {
            Recovery::recover::<V>(&config.path, config.sync_strategy)
        })?;

        let memtable = MemTable::from_map(map);
        let queue = WriteQueue::spawn(writer, dispatch)?;

        Ok(Self {
            config,
            memtable,
            queue,
            write_lock: Mutex::new(0),
            recovery,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified journal path
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().path(path.as_ref()).build();
        Self::open(config)
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<V> {
        self.memtable.get(key)
    }

    /// Check whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.memtable.contains_key(key)
    }

    /// Set a key
    ///
    /// The value is visible to `get` when this returns; it reaches the
    /// journal later, on the worker. A value that cannot be encoded is
    /// rejected with `Serialization` and memory is left unchanged.
    pub fn set(&self, key: impl Into<String>, value: V) -> Result<()> {
        let key = key.into();
        Self::check_key(&key)?;

        let mut deltas = self.write_lock.lock();
        self.queue.enqueue(Record::Set {
            key: key.clone(),
            value: value.clone(),
        })?;
        self.memtable.put(key, value);
        self.record_delta(&mut deltas)
    }

    /// Delete a key, returning its previous value
    ///
    /// A delete frame is journaled even when the key is absent.
    pub fn delete(&self, key: &str) -> Result<Option<V>> {
        Self::check_key(key)?;

        let mut deltas = self.write_lock.lock();
        self.queue.enqueue(Record::Delete {
            key: key.to_string(),
        })?;
        let previous = self.memtable.delete(key);
        self.record_delta(&mut deltas)?;
        Ok(previous)
    }

    /// Set `key` to `value`, or delete it when `value` is `None`
    pub fn update(&self, key: impl Into<String>, value: Option<V>) -> Result<()> {
        let key = key.into();
        match value {
            Some(value) => self.set(key, value),
            None => self.delete(&key).map(|_| ()),
        }
    }

    /// Sorted point-in-time copy of all entries
    pub fn all_entries(&self) -> Vec<(String, V)> {
        self.memtable.entries()
    }

    /// Point-in-time copy of the whole map
    pub fn snapshot(&self) -> BTreeMap<String, V> {
        self.memtable.snapshot()
    }

    /// Sorted copy of all keys
    pub fn keys(&self) -> Vec<String> {
        self.memtable.keys()
    }

    pub fn len(&self) -> usize {
        self.memtable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memtable.is_empty()
    }

    /// Block until every mutation made so far is written and synced
    pub fn flush(&self) -> Result<()> {
        self.queue.flush()
    }

    /// Rewrite the journal as a single snapshot of the current state
    ///
    /// Writers are only held up while the snapshot is taken and queued.
    pub fn compact(&self) -> Result<()> {
        let pending = {
            let mut deltas = self.write_lock.lock();
            let pending = self.queue.begin_compaction(self.memtable.snapshot())?;
            *deltas = 0;
            pending
        };
        pending.wait()
    }

    /// Close the store gracefully
    ///
    /// Drains the write queue, syncs the journal and stops the worker.
    pub fn close(mut self) -> Result<()> {
        self.queue.flush()?;
        self.queue.shutdown()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Journal file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replay statistics from `open`
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Current statistics
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            entries: self.memtable.len(),
            pending_writes: self.queue.pending(),
            queue: self.queue.stats(),
        }
    }

    fn check_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(JournalError::InvalidKey("key must not be empty".to_string()));
        }
        Ok(())
    }

    /// Called with the write lock held, after the MemTable update
    fn record_delta(&self, deltas: &mut usize) -> Result<()> {
        *deltas += 1;
        if let Some(limit) = self.config.auto_compact_after {
            if *deltas >= limit {
                self.queue.compact_in_background(self.memtable.snapshot())?;
                *deltas = 0;
            }
        }
        Ok(())
    }
}
