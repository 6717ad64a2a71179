//! Journal Reader
//!
//! Reads frames sequentially from the journal file. A torn tail (short
//! frame header, short payload, or a bad checksum on the very last frame)
//! ends the stream instead of failing it.

use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{JournalError, Result};

use super::{Record, FORMAT_VERSION, FRAME_HEADER_SIZE, HEADER_SIZE, MAGIC, MAX_FRAME_SIZE};

/// Reads frames from the journal file
pub struct LogReader {
    reader: BufReader<File>,
    /// Byte offset of the next frame
    offset: u64,
    file_size: u64,
    /// Set once a partial trailing frame has been seen
    truncated: bool,
}

impl LogReader {
    /// Open a journal file for reading and validate its header
    ///
    /// A zero-length file reads as an empty journal; a file shorter than the
    /// header reads as an empty, truncated journal.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        if file_size == 0 {
            return Ok(Self { reader, offset: 0, file_size, truncated: false });
        }

        if file_size < HEADER_SIZE {
            return Ok(Self { reader, offset: file_size, file_size, truncated: true });
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        reader.read_exact(&mut header)?;

        if &header[..4] != MAGIC {
            return Err(JournalError::InvalidHeader(format!(
                "expected magic {:?}, found {:?}",
                MAGIC,
                &header[..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != FORMAT_VERSION {
            return Err(JournalError::UnsupportedVersion(version));
        }

        Ok(Self {
            reader,
            offset: HEADER_SIZE,
            file_size,
            truncated: false,
        })
    }

    /// Read the next frame payload
    ///
    /// Returns `Ok(None)` at end of file or at a torn trailing frame.
    pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.truncated {
            return Ok(None);
        }

        let remaining = self.file_size - self.offset;
        if remaining == 0 {
            return Ok(None);
        }

        if remaining < FRAME_HEADER_SIZE {
            return Ok(self.torn_tail("partial frame header"));
        }

        let mut header = [0u8; FRAME_HEADER_SIZE as usize];
        self.reader.read_exact(&mut header)?;
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if u64::from(len) > remaining - FRAME_HEADER_SIZE {
            return Ok(self.torn_tail("declared length exceeds remaining bytes"));
        }

        if len > MAX_FRAME_SIZE {
            return Err(JournalError::CorruptRecord(format!(
                "frame at offset {} declares {} bytes (limit {})",
                self.offset, len, MAX_FRAME_SIZE
            )));
        }

        let mut payload = vec![0u8; len as usize];
        self.reader.read_exact(&mut payload)?;

        let frame_end = self.offset + FRAME_HEADER_SIZE + u64::from(len);
        if crc32fast::hash(&payload) != expected_crc {
            if frame_end == self.file_size {
                return Ok(self.torn_tail("checksum mismatch in final frame"));
            }
            return Err(JournalError::CorruptRecord(format!(
                "checksum mismatch in frame at offset {}",
                self.offset
            )));
        }

        self.offset = frame_end;
        Ok(Some(payload))
    }

    /// Read and decode the next record
    pub fn next_record<V: DeserializeOwned>(&mut self) -> Result<Option<Record<V>>> {
        let offset = self.offset;
        match self.read_frame()? {
            Some(payload) => Record::decode(&payload).map(Some).map_err(|e| match e {
                JournalError::CorruptRecord(msg) => {
                    JournalError::CorruptRecord(format!("frame at offset {}: {}", offset, msg))
                }
                other => other,
            }),
            None => Ok(None),
        }
    }

    /// Iterate over all readable records
    pub fn records<V: DeserializeOwned>(self) -> Records<V> {
        Records {
            reader: self,
            failed: false,
            _marker: PhantomData,
        }
    }

    /// Whether a torn trailing frame was hit
    pub fn was_truncated(&self) -> bool {
        self.truncated
    }

    /// Byte offset just past the last frame read successfully
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size of the file when it was opened
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    fn torn_tail(&mut self, reason: &str) -> Option<Vec<u8>> {
        tracing::warn!(
            offset = self.offset,
            discarded = self.file_size - self.offset,
            reason,
            "ignoring truncated journal tail"
        );
        self.truncated = true;
        None
    }
}

/// Iterator over journal records
///
/// Yields at most one error, then stops.
pub struct Records<V> {
    reader: LogReader,
    failed: bool,
    _marker: PhantomData<V>,
}

impl<V> Records<V> {
    /// Underlying reader (offset and truncation state)
    pub fn reader(&self) -> &LogReader {
        &self.reader
    }
}

impl<V: DeserializeOwned> Iterator for Records<V> {
    type Item = Result<Record<V>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
