//! Tests for reader/writer isolation
//!
//! These tests verify:
//! - A snapshot keeps serving the generation it was taken from
//! - Snapshots and value views outlive one compaction of their arena
//! - Readers pick up new generations on their next lookup
//! - A reader thread racing a writer never observes a torn value

use std::thread;

use crossbeam::channel;
use shmkv::header::BufferSide;
use shmkv::{Store, StoreConfig};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_writer_and_reader(
    key_capacity: u32,
    value_size_bound: u32,
) -> (TempDir, Store, Store) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("swmr.store");
    let writer = Store::init(StoreConfig::writer(&path, key_capacity, value_size_bound)).unwrap();
    let reader = Store::open_reader(&path, key_capacity, value_size_bound).unwrap();
    (temp_dir, writer, reader)
}

// =============================================================================
// Snapshot Isolation Tests
// =============================================================================

#[test]
fn test_snapshot_survives_replace() {
    let (_temp, mut writer, mut reader) = setup_writer_and_reader(8, 64);
    writer.set(b"key", b"old").unwrap();

    let snapshot = reader.snapshot().unwrap();
    writer.set(b"key", b"new").unwrap();

    assert_eq!(snapshot.get(b"key").unwrap().as_bytes(), b"old");
}

#[test]
fn test_snapshot_survives_delete_and_insert() {
    let (_temp, mut writer, mut reader) = setup_writer_and_reader(8, 64);
    writer.set(b"a", b"1").unwrap();
    writer.set(b"b", b"2").unwrap();

    let snapshot = reader.snapshot().unwrap();
    writer.del(b"a").unwrap();
    writer.set(b"c", b"3").unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.get(b"a").unwrap().as_bytes(), b"1");
    assert!(snapshot.get(b"c").unwrap_err().is_not_found());
    let keys: Vec<&[u8]> = snapshot.keys().collect();
    assert_eq!(keys, vec![&b"a"[..], &b"b"[..]]);
}

#[test]
fn test_snapshot_survives_value_compaction() {
    let (_temp, mut writer, mut reader) = setup_writer_and_reader(8, 64);
    writer.set(b"a", b"old").unwrap();
    writer.set(b"b", b"other").unwrap();

    let snapshot = reader.snapshot().unwrap();
    let view = snapshot.get(b"b").unwrap();

    writer.compact_values().unwrap();
    writer.set(b"a", b"newer").unwrap();

    assert_eq!(writer.dump_header().unwrap().value_buf, BufferSide::B);
    assert_eq!(snapshot.get(b"a").unwrap().as_bytes(), b"old");
    assert_eq!(view.as_bytes(), b"other");
    assert_eq!(writer.get(b"a").unwrap().as_bytes(), b"newer");
}

#[test]
fn test_snapshot_survives_automatic_value_compaction() {
    // value arena: 2 · 4 · 2 = 16 bytes
    let (_temp, mut writer, mut reader) = setup_writer_and_reader(2, 4);
    writer.set(b"a", b"old").unwrap();

    let snapshot = reader.snapshot().unwrap();

    // 4 + 8 bytes appended, then 8 more only fit after compacting
    writer.set(b"a", b"1234567").unwrap();
    writer.set(b"a", b"7654321").unwrap();

    assert_eq!(writer.dump_header().unwrap().value_buf, BufferSide::B);
    assert_eq!(snapshot.get(b"a").unwrap().as_bytes(), b"old");
    assert_eq!(writer.get(b"a").unwrap().as_bytes(), b"7654321");
}

#[test]
fn test_snapshot_survives_key_compaction() {
    let (_temp, mut writer, mut reader) = setup_writer_and_reader(8, 64);
    writer.set(b"gone", b"1").unwrap();
    writer.set(b"kept", b"2").unwrap();

    let snapshot = reader.snapshot().unwrap();

    writer.del(b"gone").unwrap();
    writer.compact_keys().unwrap();
    writer.set(b"late", b"3").unwrap();

    assert_eq!(writer.dump_header().unwrap().key_buf, BufferSide::B);
    let keys: Vec<&[u8]> = snapshot.keys().collect();
    assert_eq!(keys, vec![&b"gone"[..], &b"kept"[..]]);
    assert_eq!(snapshot.get(b"gone").unwrap().as_bytes(), b"1");
    assert!(snapshot.get(b"late").unwrap_err().is_not_found());
}

#[test]
fn test_reader_sees_next_generation() {
    let (_temp, mut writer, mut reader) = setup_writer_and_reader(8, 64);
    writer.set(b"key", b"v1").unwrap();
    assert_eq!(reader.get(b"key").unwrap().as_bytes(), b"v1");

    writer.set(b"key", b"v2").unwrap();
    writer.set(b"other", b"x").unwrap();

    assert_eq!(reader.get(b"key").unwrap().as_bytes(), b"v2");
    assert_eq!(reader.len().unwrap(), 2);

    let snapshot = reader.snapshot().unwrap();
    assert_eq!(snapshot.selection(), writer.snapshot().unwrap().selection());
}

#[test]
fn test_snapshot_records_match_dump() {
    let (_temp, mut writer, mut reader) = setup_writer_and_reader(8, 64);
    writer.set(b"x", b"1").unwrap();
    writer.set(b"yy", b"2").unwrap();

    let entries = writer.dump_index().unwrap();
    let snapshot = reader.snapshot().unwrap();

    let records: Vec<_> = entries.iter().map(|entry| entry.record).collect();
    assert_eq!(snapshot.records(), &records[..]);
}

// =============================================================================
// Threaded Tests
// =============================================================================

#[test]
fn test_threaded_reader_never_sees_torn_values() {
    const KEYS: u8 = 4;
    const ROUNDS: usize = 250;

    // 8 · 4096 · 2 bytes of values: no compaction within the test
    let (_temp, mut writer, mut reader) = setup_writer_and_reader(8, 4096);
    for k in 0..KEYS {
        writer.set(&[b'k', k], &[0u8; 16]).unwrap();
    }

    let (done_tx, done_rx) = channel::bounded::<()>(1);
    let (count_tx, count_rx) = channel::bounded::<usize>(1);

    let handle = thread::spawn(move || {
        let mut reads = 0;
        loop {
            let finished = done_rx.try_recv().is_ok();
            for k in 0..KEYS {
                let value = reader.get(&[b'k', k]).unwrap();
                assert_eq!(value.len(), 16);
                let first = value[0];
                assert!(value.iter().all(|&b| b == first), "torn value {:?}", value);
                reads += 1;
            }
            if finished {
                break;
            }
        }
        count_tx.send(reads).unwrap();
    });

    for round in 0..ROUNDS {
        let fill = (round % 251) as u8 + 1;
        writer.set(&[b'k', (round % KEYS as usize) as u8], &[fill; 16]).unwrap();
    }
    done_tx.send(()).unwrap();

    let reads = count_rx.recv().unwrap();
    handle.join().unwrap();
    assert!(reads >= KEYS as usize);

    assert_eq!(writer.dump_header().unwrap().value_buf, BufferSide::A);
}
