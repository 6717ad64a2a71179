//! MemTable Module
//!
//! Authoritative in-memory state of the store.
//!
//! ## Responsibilities
//! - Serve every read without touching disk
//! - Single-writer/multi-reader access pattern
//! - Hand out point-in-time copies for iteration and snapshots
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock:
//! - Ordered keys give deterministic snapshots and listings
//! - The dataset is small (thousands of entries)

mod table;

pub use table::MemTable;
