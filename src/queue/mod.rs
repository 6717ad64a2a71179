//! Write Queue Module
//!
//! Moves journal I/O off the caller's thread.
//!
//! ## Responsibilities
//! - Single background worker owning the journal file handle
//! - Strict FIFO: frames reach the file in enqueue order
//! - Flush barrier for orderly shutdown and deterministic tests
//! - Runtime compaction without a second writer
//!
//! ## Failure Policy
//! Records are encoded on the caller's thread, so a value that cannot be
//! serialized is rejected by `enqueue` before anything is queued.
//!
//! Writes are best-effort. A failed write is logged at `error`, counted in
//! [`QueueStats::write_failures`] and dropped; it is never retried. The
//! in-memory state can therefore run ahead of the durable journal.

mod worker;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::channel::Sender;

use crate::error::Result;

pub use worker::{Completion, WriteQueue};

/// Work item consumed by the worker
enum Task<V> {
    /// Append one encoded record
    Append {
        kind: &'static str,
        key: Option<String>,
        payload: Vec<u8>,
    },

    /// Sync the file, then reply; every earlier task is done by then
    Flush(Sender<Result<()>>),

    /// Replace the journal with a snapshot of `entries`
    Compact {
        entries: BTreeMap<String, V>,
        reply: Option<Sender<Result<()>>>,
    },
}

/// Counters shared between the queue handle and its worker
#[derive(Debug, Default)]
struct Counters {
    frames_appended: AtomicU64,
    write_failures: AtomicU64,
    compactions: AtomicU64,
    compaction_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn load(&self) -> QueueStats {
        QueueStats {
            frames_appended: self.frames_appended.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            compactions: self.compactions.load(Ordering::Relaxed),
            compaction_failures: self.compaction_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time worker statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Delta frames appended successfully
    pub frames_appended: u64,

    /// Records dropped because their write failed
    pub write_failures: u64,

    /// Compactions completed by the worker
    pub compactions: u64,

    /// Compactions that failed (the previous journal stays in use)
    pub compaction_failures: u64,
}
