//! Key ordering
//!
//! Keys sort by stored length first, then bytewise. This is not plain
//! lexicographic order: `b"b"` sorts before `b"aa"`, and a key never sits next
//! to its longer extensions. Search and insertion must both use it.

use std::cmp::Ordering;

use super::IndexRecord;

/// Length-then-lexicographic comparison of two raw keys
pub fn compare_keys(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// The key bytes of `record` inside `key_arena`, terminator excluded.
///
/// Out-of-bounds records yield an empty key; callers validate records with
/// [`IndexRecord::fits`] before searching.
pub fn record_key<'a>(record: &IndexRecord, key_arena: &'a [u8]) -> &'a [u8] {
    let start = record.key_offset as usize;
    key_arena
        .get(start..start + record.key_content_len())
        .unwrap_or_default()
}

/// Binary search `records` for `key`.
///
/// `Ok(i)` is the matching record; `Err(i)` is the insertion point, the first
/// record whose key sorts after `key`.
pub fn search(records: &[IndexRecord], key_arena: &[u8], key: &[u8]) -> Result<usize, usize> {
    records.binary_search_by(|record| {
        // Lengths decide most comparisons without touching the arena.
        record
            .key_content_len()
            .cmp(&key.len())
            .then_with(|| record_key(record, key_arena).cmp(key))
    })
}
