//! Journal Writer
//!
//! Handles appending frames to the journal file and replacing the file
//! with a compacted snapshot.
//!
//! A frame that fails partway through is cut off again, so the file never
//! holds a half-written frame followed by a good one.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::config::SyncStrategy;
use crate::error::{JournalError, Result};

use super::{frame_len, write_frame, write_header, Record, HEADER_SIZE};

/// File handle operations the writer relies on
pub trait JournalFile: Write + Seek {
    /// Truncate or extend the file to `len` bytes
    fn set_len(&self, len: u64) -> io::Result<()>;

    /// Flush file data (not necessarily metadata) to the device
    fn sync_data(&self) -> io::Result<()>;
}

impl JournalFile for File {
    fn set_len(&self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync_data(&self) -> io::Result<()> {
        File::sync_data(self)
    }
}

/// Appends frames to the journal file
///
/// Owned by exactly one thread at a time (the write queue worker once
/// the store is open).
pub struct LogWriter<F = File> {
    path: PathBuf,
    file: F,
    sync_strategy: SyncStrategy,
    /// Frames appended since the last fsync
    unsynced: usize,
    /// Frames appended through this handle, the initial snapshot included
    frames_written: u64,
    /// Length of the file up to the end of the last complete frame
    len: u64,
    /// Set when a partial frame could not be cut off; appends are refused
    failed: bool,
}

impl LogWriter {
    /// Atomically replace the journal at `path` with a header and a
    /// single `Snapshot(entries)` frame
    ///
    /// The new content is written to a temporary file in the same directory,
    /// fsynced, then renamed over `path`. A crash at any point leaves either
    /// the old journal or the new one, never neither.
    pub fn rewrite<V: Serialize>(
        path: &Path,
        entries: &BTreeMap<String, V>,
        sync_strategy: SyncStrategy,
    ) -> Result<Self> {
        let dir = parent_dir(path);
        fs::create_dir_all(&dir)?;

        let payload = Record::encode_snapshot(entries)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        write_header(&mut tmp)?;
        write_frame(&mut tmp, &payload)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;

        // The persisted handle's cursor sits at the end of the snapshot,
        // so further writes append.
        let file = tmp.persist(path)?;
        sync_dir(&dir);

        Ok(Self {
            path: path.to_path_buf(),
            file,
            sync_strategy,
            unsynced: 0,
            frames_written: 1,
            len: HEADER_SIZE + frame_len(payload.len()),
            failed: false,
        })
    }
}

impl<F: JournalFile> LogWriter<F> {
    /// Wrap a handle positioned at the end of a valid journal `len` bytes long
    pub fn from_file(path: impl Into<PathBuf>, file: F, len: u64, sync_strategy: SyncStrategy) -> Self {
        Self {
            path: path.into(),
            file,
            sync_strategy,
            unsynced: 0,
            frames_written: 0,
            len,
            failed: false,
        }
    }

    /// Append a record
    pub fn append<V: Serialize>(&mut self, record: &Record<V>) -> Result<()> {
        let payload = record.encode()?;
        self.append_frame(&payload)
    }

    /// Append an already-encoded payload as one frame
    ///
    /// On a write error the file is truncated back to the last complete
    /// frame before the error is returned. If that fails too, the writer
    /// refuses every later append.
    pub fn append_frame(&mut self, payload: &[u8]) -> Result<()> {
        if self.failed {
            return Err(JournalError::WriterFailed(format!(
                "{} has a partial frame at offset {}",
                self.path.display(),
                self.len
            )));
        }

        if let Err(e) = write_frame(&mut self.file, payload) {
            if matches!(e, JournalError::Io(_)) {
                self.roll_back();
            }
            return Err(e);
        }
        self.frames_written += 1;
        self.len += frame_len(payload.len());
        self.unsynced += 1;

        match self.sync_strategy {
            SyncStrategy::EveryWrite => self.sync()?,
            SyncStrategy::EveryNEntries { count } if self.unsynced >= count => self.sync()?,
            _ => {}
        }

        Ok(())
    }

    /// Cut the file back to the end of the last complete frame
    fn roll_back(&mut self) {
        let len = self.len;
        let restored = self
            .file
            .set_len(len)
            .and_then(|()| self.file.seek(SeekFrom::Start(len)).map(|_| ()));

        match restored {
            Ok(()) => {
                tracing::warn!(path = %self.path.display(), len, "discarded partial frame");
            }
            Err(e) => {
                self.failed = true;
                tracing::error!(
                    path = %self.path.display(),
                    len,
                    error = %e,
                    "could not discard partial frame, refusing further appends"
                );
            }
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        if self.unsynced > 0 {
            self.file.sync_data()?;
            self.unsynced = 0;
        }
        Ok(())
    }

    /// Journal file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames written through this handle (the snapshot counts as one)
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Current length of the journal file in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the journal holds only its header
    pub fn is_empty(&self) -> bool {
        self.len <= HEADER_SIZE
    }

    /// Whether a partial frame is stuck in the file
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Configured sync strategy
    pub fn sync_strategy(&self) -> SyncStrategy {
        self.sync_strategy
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// fsync the directory so the rename itself is durable (best effort)
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        if let Err(e) = handle.sync_all() {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to fsync journal directory");
        }
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
