//! # JournalKV
//!
//! An embedded, append-only journaled key-value store with:
//! - A length-prefixed, checksummed journal of JSON records
//! - Crash recovery that tolerates a torn trailing frame
//! - Snapshot compaction on open (atomic temp-file swap)
//! - A background write queue so callers never block on disk I/O
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Store                                 │
//! │          get / set / delete / all_entries / flush            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  MemTable   │          │ Write Queue │
//!   │  (RwLock)   │          │  (worker)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │   Journal   │
//!                           │  (append)   │
//!                           └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use journalkv::Store;
//!
//! # fn main() -> journalkv::Result<()> {
//! let store: Store<Vec<String>> = Store::open_path("meta/tags.journal")?;
//! store.set("demo-1", vec!["starred".to_string()])?;
//! assert!(store.get("demo-1").is_some());
//! store.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod memtable;
pub mod queue;
pub mod store;
pub mod cell;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{JournalError, Result};
pub use config::{Config, SyncStrategy};
pub use store::{Store, StoreStats};
pub use wal::Record;
pub use cell::PersistentCell;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of JournalKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
