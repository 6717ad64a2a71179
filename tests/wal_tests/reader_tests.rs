//! Tests for the journal reader
//!
//! These tests verify:
//! - Header validation
//! - Sequential frame reads
//! - Torn tails end the stream quietly
//! - Mid-file damage is reported as corruption

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use journalkv::wal::{write_frame, write_header, LogReader, Record, FORMAT_VERSION, MAGIC};
use journalkv::JournalError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_journal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.journal");
    (temp_dir, path)
}

fn set(key: &str, value: i32) -> Vec<u8> {
    Record::Set { key: key.to_string(), value }.encode().unwrap()
}

/// Header followed by one frame per payload
fn journal_bytes(payloads: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_header(&mut buf).unwrap();
    for payload in payloads {
        write_frame(&mut buf, payload).unwrap();
    }
    buf
}

fn write_file(path: &PathBuf, bytes: &[u8]) {
    let mut file = File::create(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_empty_file_reads_as_empty_journal() {
    let (_temp, path) = setup_temp_journal();
    write_file(&path, &[]);

    let mut reader = LogReader::open(&path).unwrap();

    assert_eq!(reader.read_frame().unwrap(), None);
    assert!(!reader.was_truncated());
}

#[test]
fn test_partial_header_reads_as_truncated() {
    let (_temp, path) = setup_temp_journal();
    write_file(&path, &MAGIC[..3]);

    let mut reader = LogReader::open(&path).unwrap();

    assert_eq!(reader.read_frame().unwrap(), None);
    assert!(reader.was_truncated());
}

#[test]
fn test_bad_magic() {
    let (_temp, path) = setup_temp_journal();
    write_file(&path, b"NOPE\x01\x00");

    let result = LogReader::open(&path);

    assert!(matches!(result, Err(JournalError::InvalidHeader(_))));
}

#[test]
fn test_unsupported_version() {
    let (_temp, path) = setup_temp_journal();
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
    write_file(&path, &bytes);

    let result = LogReader::open(&path);

    assert!(matches!(result, Err(JournalError::UnsupportedVersion(v)) if v == FORMAT_VERSION + 1));
}

#[test]
fn test_missing_file() {
    let (_temp, path) = setup_temp_journal();
    assert!(matches!(LogReader::open(&path), Err(JournalError::Io(_))));
}

// =============================================================================
// Sequential Read Tests
// =============================================================================

#[test]
fn test_read_frames_in_order() {
    let (_temp, path) = setup_temp_journal();
    let payloads = vec![set("a", 1), set("b", 2), set("c", 3)];
    write_file(&path, &journal_bytes(&payloads));

    let mut reader = LogReader::open(&path).unwrap();
    for expected in &payloads {
        assert_eq!(reader.read_frame().unwrap().as_ref(), Some(expected));
    }
    assert_eq!(reader.read_frame().unwrap(), None);
    assert!(!reader.was_truncated());
    assert_eq!(reader.offset(), reader.file_size());
}

#[test]
fn test_records_iterator() {
    let (_temp, path) = setup_temp_journal();
    write_file(&path, &journal_bytes(&[set("a", 1), set("b", 2)]));

    let records: Vec<Record<i32>> = LogReader::open(&path)
        .unwrap()
        .records::<i32>()
        .collect::<journalkv::Result<_>>()
        .unwrap();

    assert_eq!(
        records,
        vec![
            Record::Set { key: "a".to_string(), value: 1 },
            Record::Set { key: "b".to_string(), value: 2 },
        ]
    );
}

#[test]
fn test_records_iterator_stops_after_error() {
    let (_temp, path) = setup_temp_journal();
    write_file(&path, &journal_bytes(&[set("a", 1), b"garbage".to_vec(), set("b", 2)]));

    let mut records = LogReader::open(&path).unwrap().records::<i32>();

    assert!(records.next().unwrap().is_ok());
    assert!(matches!(records.next(), Some(Err(JournalError::CorruptRecord(_)))));
    assert!(records.next().is_none());
}

// =============================================================================
// Torn Tail Tests (was_truncated = true)
// =============================================================================

#[test]
fn test_partial_frame_header_at_tail() {
    let (_temp, path) = setup_temp_journal();
    let mut bytes = journal_bytes(&[set("a", 1)]);
    bytes.extend_from_slice(&[0u8; 5]);
    write_file(&path, &bytes);

    let mut reader = LogReader::open(&path).unwrap();

    assert!(reader.read_frame().unwrap().is_some());
    assert_eq!(reader.read_frame().unwrap(), None);
    assert!(reader.was_truncated());
}

#[test]
fn test_declared_length_exceeds_file() {
    let (_temp, path) = setup_temp_journal();
    let good = journal_bytes(&[set("a", 1)]);
    let mut torn = Vec::new();
    write_frame(&mut torn, &set("b", 2)).unwrap();
    torn.truncate(torn.len() - 3);

    let mut bytes = good.clone();
    bytes.extend_from_slice(&torn);
    write_file(&path, &bytes);

    let mut reader = LogReader::open(&path).unwrap();

    assert_eq!(reader.read_frame().unwrap(), Some(set("a", 1)));
    assert_eq!(reader.read_frame().unwrap(), None);
    assert!(reader.was_truncated());
    assert_eq!(reader.offset(), good.len() as u64);

    // Stays at end
    assert_eq!(reader.read_frame().unwrap(), None);
}

#[test]
fn test_checksum_mismatch_in_final_frame() {
    let (_temp, path) = setup_temp_journal();
    let mut bytes = journal_bytes(&[set("a", 1), set("b", 2)]);
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    write_file(&path, &bytes);

    let mut reader = LogReader::open(&path).unwrap();

    assert_eq!(reader.read_frame().unwrap(), Some(set("a", 1)));
    assert_eq!(reader.read_frame().unwrap(), None);
    assert!(reader.was_truncated());
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_checksum_mismatch_mid_file() {
    let (_temp, path) = setup_temp_journal();
    let first = journal_bytes(&[set("a", 1)]);
    let mut bytes = journal_bytes(&[set("a", 1), set("b", 2)]);
    // Flip a payload byte of the first frame
    bytes[first.len() - 2] ^= 0xFF;
    write_file(&path, &bytes);

    let mut reader = LogReader::open(&path).unwrap();

    assert!(matches!(reader.read_frame(), Err(JournalError::CorruptRecord(_))));
}

#[test]
fn test_undecodable_payload() {
    let (_temp, path) = setup_temp_journal();
    write_file(&path, &journal_bytes(&[br#"{"unknown":{}}"#.to_vec()]));

    let mut reader = LogReader::open(&path).unwrap();
    let result = reader.next_record::<i32>();

    match result {
        Err(JournalError::CorruptRecord(msg)) => assert!(msg.contains("offset 6")),
        other => panic!("expected CorruptRecord, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_reader_does_not_modify_file() {
    let (_temp, path) = setup_temp_journal();
    let mut bytes = journal_bytes(&[set("a", 1)]);
    bytes.extend_from_slice(&[1, 2, 3]);
    write_file(&path, &bytes);

    let mut reader = LogReader::open(&path).unwrap();
    while reader.read_frame().unwrap().is_some() {}

    assert_eq!(fs::read(&path).unwrap(), bytes);
}
