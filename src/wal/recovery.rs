//! Journal Recovery
//!
//! Replays the journal into a map and compacts it to a single snapshot.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::SyncStrategy;
use crate::error::Result;

use super::{LogReader, LogWriter, Record};

/// Rebuilds state from a journal file
pub struct Recovery;

/// Result of a replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Frames decoded and applied
    pub frames_replayed: u64,

    /// Snapshot frames among them
    pub snapshots_applied: u64,

    /// Live keys after replay
    pub live_entries: usize,

    /// Bytes covered by the replayed frames (header included)
    pub bytes_replayed: u64,

    /// Whether a torn trailing frame was discarded
    pub was_truncated: bool,
}

impl Recovery {
    /// Replay the journal at `path` without modifying it
    ///
    /// A missing file replays to an empty map. Any other failure to stat the
    /// path (permissions, a file where a directory should be) is an error.
    pub fn replay<V: DeserializeOwned>(path: &Path) -> Result<(BTreeMap<String, V>, RecoveryResult)> {
        let mut map = BTreeMap::new();
        let mut result = RecoveryResult::default();

        if !path.try_exists()? {
            return Ok((map, result));
        }

        let mut reader = LogReader::open(path)?;
        while let Some(record) = reader.next_record::<V>()? {
            if matches!(record, Record::Snapshot { .. }) {
                result.snapshots_applied += 1;
            }
            Self::apply(&mut map, record);
            result.frames_replayed += 1;
        }

        result.live_entries = map.len();
        result.bytes_replayed = reader.offset();
        result.was_truncated = reader.was_truncated();

        Ok((map, result))
    }

    /// Apply one record to `map`
    ///
    /// A snapshot replaces the map wholesale; deltas after it still apply.
    pub fn apply<V>(map: &mut BTreeMap<String, V>, record: Record<V>) {
        match record {
            Record::Start => {}
            Record::Set { key, value } => {
                map.insert(key, value);
            }
            Record::Delete { key } => {
                map.remove(&key);
            }
            Record::Snapshot { entries } => {
                *map = entries;
            }
        }
    }

    /// Replay the journal, then atomically rewrite it as one snapshot
    ///
    /// If replay fails the file is left untouched. The returned writer is
    /// positioned after the snapshot, ready for deltas.
    pub fn recover<V: Serialize + DeserializeOwned>(
        path: &Path,
        sync_strategy: SyncStrategy,
    ) -> Result<(BTreeMap<String, V>, LogWriter, RecoveryResult)> {
        let (map, result) = Self::replay::<V>(path)?;

        tracing::info!(
            path = %path.display(),
            frames = result.frames_replayed,
            snapshots = result.snapshots_applied,
            entries = result.live_entries,
            truncated = result.was_truncated,
            "journal replayed"
        );

        let writer = LogWriter::rewrite(path, &map, sync_strategy)?;

        tracing::info!(
            path = %path.display(),
            bytes = writer.len(),
            "journal compacted to snapshot"
        );

        Ok((map, writer, result))
    }

    /// Verify that a journal replays cleanly, without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result) = Self::replay::<serde_json::Value>(path)?;
        Ok(result)
    }
}
