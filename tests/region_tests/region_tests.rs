//! Tests for SharedRegion
//!
//! These tests verify:
//! - Writer create/size/attach rules
//! - Reader attach rules (missing, empty, differently sized files)
//! - Bounds checks on byte access
//! - Writer stores are visible through a separate reader mapping
//! - Backing file removal

use std::fs;

use shmkv::region::{RegionOffset, SharedRegion, MAX_REGION_SIZE};
use shmkv::{AccessMode, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn temp_path(name: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(name);
    (temp_dir, path)
}

// =============================================================================
// Writer Attach Tests
// =============================================================================

#[test]
fn test_writer_creates_and_sizes_file() {
    let (_temp, path) = temp_path("region.store");

    let region = SharedRegion::create_or_attach(&path, 4096, AccessMode::Write).unwrap();

    assert_eq!(region.len(), 4096);
    assert_eq!(region.mode(), AccessMode::Write);
    assert_eq!(fs::metadata(&path).unwrap().len(), 4096);
    assert!(region.bytes(RegionOffset::ZERO, 4096).unwrap().iter().all(|&b| b == 0));
}

#[test]
fn test_writer_reattaches_same_size() {
    let (_temp, path) = temp_path("region.store");

    {
        let mut region = SharedRegion::create_or_attach(&path, 1024, AccessMode::Write).unwrap();
        region.bytes_mut(RegionOffset::new(10), 3).unwrap().copy_from_slice(b"abc");
    }

    let region = SharedRegion::create_or_attach(&path, 1024, AccessMode::Write).unwrap();
    assert_eq!(region.bytes(RegionOffset::new(10), 3).unwrap(), b"abc");
}

#[test]
fn test_writer_rejects_size_mismatch() {
    let (_temp, path) = temp_path("region.store");
    drop(SharedRegion::create_or_attach(&path, 1024, AccessMode::Write).unwrap());

    let result = SharedRegion::create_or_attach(&path, 2048, AccessMode::Write);

    match result {
        Err(StoreError::SizeMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 2048);
            assert_eq!(actual, 1024);
        }
        other => panic!("expected SizeMismatch, got {:?}", other.err()),
    }
}

#[test]
fn test_region_size_ceiling() {
    let (_temp, path) = temp_path("region.store");

    let result = SharedRegion::create_or_attach(&path, MAX_REGION_SIZE + 1, AccessMode::Write);

    assert!(matches!(result, Err(StoreError::Capacity(_))));
    assert!(!path.exists());
}

// =============================================================================
// Reader Attach Tests
// =============================================================================

#[test]
fn test_reader_missing_file() {
    let (_temp, path) = temp_path("missing.store");

    let result = SharedRegion::create_or_attach(&path, 1024, AccessMode::Read);

    assert!(matches!(result, Err(StoreError::NotInitialized(_))));
    assert!(!path.exists());
}

#[test]
fn test_reader_empty_file() {
    let (_temp, path) = temp_path("empty.store");
    fs::write(&path, b"").unwrap();

    let result = SharedRegion::create_or_attach(&path, 1024, AccessMode::Read);

    assert!(matches!(result, Err(StoreError::NotInitialized(_))));
}

#[test]
fn test_reader_tolerates_size_difference() {
    let (_temp, path) = temp_path("region.store");
    drop(SharedRegion::create_or_attach(&path, 1024, AccessMode::Write).unwrap());

    let region = SharedRegion::create_or_attach(&path, 4096, AccessMode::Read).unwrap();

    assert_eq!(region.len(), 1024);
    assert_eq!(region.mode(), AccessMode::Read);
}

#[test]
fn test_reader_is_read_only() {
    let (_temp, path) = temp_path("region.store");
    drop(SharedRegion::create_or_attach(&path, 1024, AccessMode::Write).unwrap());

    let mut region = SharedRegion::create_or_attach(&path, 1024, AccessMode::Read).unwrap();

    assert!(matches!(
        region.bytes_mut(RegionOffset::ZERO, 4),
        Err(StoreError::ReadOnly)
    ));
    assert!(matches!(
        region.copy_within(RegionOffset::ZERO, RegionOffset::new(8), 4),
        Err(StoreError::ReadOnly)
    ));
    region.sync().unwrap();
}

// =============================================================================
// Access Tests
// =============================================================================

#[test]
fn test_bytes_bounds() {
    let (_temp, path) = temp_path("region.store");
    let mut region = SharedRegion::create_or_attach(&path, 256, AccessMode::Write).unwrap();

    assert!(region.bytes(RegionOffset::new(250), 6).is_some());
    assert!(region.bytes(RegionOffset::new(250), 7).is_none());
    assert!(region.bytes(RegionOffset::new(usize::MAX), 2).is_none());
    assert!(matches!(
        region.bytes_mut(RegionOffset::new(255), 2),
        Err(StoreError::Corrupted(_))
    ));
}

#[test]
fn test_copy_within() {
    let (_temp, path) = temp_path("region.store");
    let mut region = SharedRegion::create_or_attach(&path, 256, AccessMode::Write).unwrap();

    region.bytes_mut(RegionOffset::new(0), 5).unwrap().copy_from_slice(b"hello");
    region.copy_within(RegionOffset::new(0), RegionOffset::new(100), 5).unwrap();

    assert_eq!(region.bytes(RegionOffset::new(100), 5).unwrap(), b"hello");
    assert!(matches!(
        region.copy_within(RegionOffset::new(0), RegionOffset::new(252), 5),
        Err(StoreError::Corrupted(_))
    ));
}

#[test]
fn test_writer_stores_visible_to_reader() {
    let (_temp, path) = temp_path("region.store");
    let mut writer = SharedRegion::create_or_attach(&path, 512, AccessMode::Write).unwrap();
    let reader = SharedRegion::create_or_attach(&path, 512, AccessMode::Read).unwrap();

    writer.bytes_mut(RegionOffset::new(64), 4).unwrap().copy_from_slice(b"ping");

    assert_eq!(reader.bytes(RegionOffset::new(64), 4).unwrap(), b"ping");
}

#[test]
fn test_offset_arithmetic() {
    let offset = RegionOffset::new(64) + 16usize + 4u32;

    assert_eq!(offset.get(), 84);
    assert_eq!(offset.to_string(), "0x54");
    assert!(RegionOffset::new(usize::MAX).checked_add(1).is_none());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_detach_flushes_writes_to_file() {
    let (_temp, path) = temp_path("region.store");
    let mut region = SharedRegion::create_or_attach(&path, 128, AccessMode::Write).unwrap();
    region.bytes_mut(RegionOffset::new(32), 4).unwrap().copy_from_slice(b"sync");

    region.detach().unwrap();

    let contents = fs::read(&path).unwrap();
    assert_eq!(contents.len(), 128);
    assert_eq!(&contents[32..36], b"sync");
}

#[test]
fn test_reader_detach() {
    let (_temp, path) = temp_path("region.store");
    drop(SharedRegion::create_or_attach(&path, 128, AccessMode::Write).unwrap());

    let reader = SharedRegion::create_or_attach(&path, 128, AccessMode::Read).unwrap();

    reader.detach().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 128);
}

#[test]
fn test_remove_backing_file() {
    let (_temp, path) = temp_path("region.store");
    let region = SharedRegion::create_or_attach(&path, 128, AccessMode::Write).unwrap();
    region.detach().unwrap();

    assert!(SharedRegion::remove(&path).unwrap());
    assert!(!path.exists());
    assert!(!SharedRegion::remove(&path).unwrap());
}
