//! Tests for Layout
//!
//! These tests verify:
//! - Sizing of every sub-region from (key capacity, value size bound)
//! - Capacity ceilings
//! - Rebuilding a layout from stored capacities

use shmkv::header::{BufferSide, HEADER_SIZE};
use shmkv::index::RECORD_SIZE;
use shmkv::layout::{ArenaKind, Layout, KEY_SLOT_SIZE, MAX_KEY_CAPACITY, MAX_VALUE_SIZE};
use shmkv::region::MAX_REGION_SIZE;
use shmkv::StoreError;

// =============================================================================
// Sizing Tests
// =============================================================================

#[test]
fn test_layout_capacities() {
    let layout = Layout::compute(4, 10).unwrap();

    assert_eq!(layout.item_max(), 4);
    assert_eq!(layout.key_max(), 4 * KEY_SLOT_SIZE);
    assert_eq!(layout.value_max(), 2 * 10 * 4);
    assert_eq!(layout.arena_max(ArenaKind::Key), layout.key_max());
    assert_eq!(layout.arena_max(ArenaKind::Value), layout.value_max());
}

#[test]
fn test_layout_total_size() {
    let layout = Layout::compute(4, 10).unwrap();

    // 64 + 2·4·16 + 2·512 + 2·80
    assert_eq!(layout.total_size(), 64 + 128 + 1024 + 160);
}

#[test]
fn test_layout_sub_regions_in_order() {
    let layout = Layout::compute(8, 32).unwrap();
    let items = 8 * RECORD_SIZE;

    assert_eq!(layout.item_buffer(BufferSide::A).get(), HEADER_SIZE);
    assert_eq!(layout.item_buffer(BufferSide::B).get(), HEADER_SIZE + items);
    assert_eq!(layout.key_arena(BufferSide::A).get(), HEADER_SIZE + 2 * items);
    assert_eq!(
        layout.value_arena(BufferSide::A).get(),
        layout.key_arena(BufferSide::B).get() + layout.key_max() as usize
    );
    assert_eq!(
        layout.value_arena(BufferSide::B).get() + layout.value_max() as usize,
        layout.total_size()
    );
    assert_eq!(
        layout.arena(ArenaKind::Value, BufferSide::B),
        layout.value_arena(BufferSide::B)
    );
}

#[test]
fn test_layout_zero_value_bound_is_allowed() {
    let layout = Layout::compute(2, 0).unwrap();
    assert_eq!(layout.value_max(), 0);
}

// =============================================================================
// Ceiling Tests
// =============================================================================

#[test]
fn test_layout_rejects_zero_keys() {
    let result = Layout::compute(0, 16);
    assert!(matches!(result, Err(StoreError::Capacity(_))));
}

#[test]
fn test_layout_rejects_too_many_keys() {
    assert!(Layout::compute(MAX_KEY_CAPACITY, 0).is_ok());

    let result = Layout::compute(MAX_KEY_CAPACITY + 1, 0);
    assert!(matches!(result, Err(StoreError::Capacity(_))));
}

#[test]
fn test_layout_rejects_large_values() {
    let result = Layout::compute(1, MAX_VALUE_SIZE + 1);
    assert!(matches!(result, Err(StoreError::Capacity(_))));
}

#[test]
fn test_layout_rejects_oversized_region() {
    // 2 · 16 MiB · 64 per arena, two arenas: 4 GiB
    let result = Layout::compute(64, MAX_VALUE_SIZE);
    assert!(matches!(result, Err(StoreError::Capacity(_))));

    let fits = Layout::compute(8, MAX_VALUE_SIZE).unwrap();
    assert!(fits.total_size() <= MAX_REGION_SIZE);
}

// =============================================================================
// Stored Capacity Tests
// =============================================================================

#[test]
fn test_layout_from_capacities_matches_compute() {
    let computed = Layout::compute(16, 100).unwrap();
    let rebuilt =
        Layout::from_capacities(computed.item_max(), computed.key_max(), computed.value_max())
            .unwrap();

    assert_eq!(computed, rebuilt);
}

#[test]
fn test_layout_from_capacities_rejects_garbage() {
    assert!(matches!(
        Layout::from_capacities(0, 128, 128),
        Err(StoreError::Corrupted(_))
    ));
    assert!(matches!(
        Layout::from_capacities(MAX_KEY_CAPACITY + 1, 128, 128),
        Err(StoreError::Corrupted(_))
    ));
}
