//! Journal (append log) Module
//!
//! Durable, append-only record of every mutation.
//!
//! ## Responsibilities
//! - Encode records as self-describing JSON payloads
//! - Frame payloads with a fixed-width length prefix and CRC32
//! - Tolerate a torn tail left by a crash mid-append
//! - Replay and compact the journal into a single snapshot
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────────────────┐
//! │ Header: Magic "JKVL" (4) │ Version (2)    │
//! ├───────────────────────────────────────────┤
//! │ Frame 1 (always a Snapshot after open)    │
//! │ ┌─────────┬─────────┬───────────────────┐ │
//! │ │ Len (4) │ CRC (4) │ JSON payload      │ │
//! │ └─────────┴─────────┴───────────────────┘ │
//! ├───────────────────────────────────────────┤
//! │ Frame 2..N (Set / Delete deltas)          │
//! └───────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian regardless of host.

mod record;
mod writer;
mod reader;
mod recovery;

use std::io::Write;

use bytes::{BufMut, BytesMut};

use crate::error::{JournalError, Result};

pub use record::{Payload, Record};
pub use writer::{JournalFile, LogWriter};
pub use reader::{LogReader, Records};
pub use recovery::{Recovery, RecoveryResult};

/// File magic
pub const MAGIC: &[u8; 4] = b"JKVL";

/// On-disk format version
pub const FORMAT_VERSION: u16 = 1;

/// File header size: magic (4) + version (2)
pub const HEADER_SIZE: u64 = 6;

/// Frame header size: len (4) + crc (4)
pub const FRAME_HEADER_SIZE: u64 = 8;

/// Maximum payload size of a single frame (16 MB)
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Write the file header
pub fn write_header<W: Write>(out: &mut W) -> Result<()> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE as usize);
    buf.put_slice(MAGIC);
    buf.put_u16_le(FORMAT_VERSION);
    out.write_all(&buf)?;
    Ok(())
}

/// Write one frame as a single `write_all` call
pub fn write_frame<W: Write>(out: &mut W, payload: &[u8]) -> Result<()> {
    let buf = encode_frame(payload)?;
    out.write_all(&buf)?;
    Ok(())
}

/// Total on-disk size of a frame carrying `payload_len` bytes
pub fn frame_len(payload_len: usize) -> u64 {
    FRAME_HEADER_SIZE + payload_len as u64
}

fn encode_frame(payload: &[u8]) -> Result<BytesMut> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_SIZE)
        .ok_or_else(|| {
            JournalError::Serialization(format!(
                "record of {} bytes exceeds the {} byte frame limit",
                payload.len(),
                MAX_FRAME_SIZE
            ))
        })?;

    let mut buf = BytesMut::with_capacity(frame_len(payload.len()) as usize);
    buf.put_u32_le(len);
    buf.put_u32_le(crc32fast::hash(payload));
    buf.put_slice(payload);
    Ok(buf)
}
