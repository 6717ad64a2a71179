//! Journal records
//!
//! Defines the operations stored in the journal and their JSON encoding.
//!
//! ```text
//! "start"
//! {"set":{"key":"x","value":{...}}}
//! {"delete":{"key":"x"}}
//! {"snapshot":{"entries":{"x":{...}}}}
//! ```

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{JournalError, Result};

/// Bounds every stored value must satisfy
pub trait Payload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// A single operation in the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Record<V> {
    /// Marker for a fresh journal (no-op on replay)
    Start,

    /// Insert or overwrite a key
    Set { key: String, value: V },

    /// Remove a key
    Delete { key: String },

    /// Full dump of all live entries; replaces everything before it
    Snapshot { entries: BTreeMap<String, V> },
}

/// Borrowed form of `Record::Snapshot`, encodes to identical bytes
#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum SnapshotRef<'a, V> {
    Snapshot { entries: &'a BTreeMap<String, V> },
}

impl<V> Record<V> {
    /// Short name of the variant, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Start => "start",
            Record::Set { .. } => "set",
            Record::Delete { .. } => "delete",
            Record::Snapshot { .. } => "snapshot",
        }
    }

    /// Key touched by a delta record
    pub fn key(&self) -> Option<&str> {
        match self {
            Record::Set { key, .. } | Record::Delete { key } => Some(key),
            Record::Start | Record::Snapshot { .. } => None,
        }
    }
}

impl<V: Serialize> Record<V> {
    /// Encode to a frame payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| JournalError::Serialization(e.to_string()))
    }

    /// Encode a snapshot of `entries` without cloning the map
    pub fn encode_snapshot(entries: &BTreeMap<String, V>) -> Result<Vec<u8>> {
        serde_json::to_vec(&SnapshotRef::Snapshot { entries })
            .map_err(|e| JournalError::Serialization(e.to_string()))
    }
}

impl<V: DeserializeOwned> Record<V> {
    /// Decode a frame payload
    ///
    /// Malformed JSON, an unknown variant or a value of the wrong shape
    /// all surface as `CorruptRecord`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| JournalError::CorruptRecord(e.to_string()))
    }
}
