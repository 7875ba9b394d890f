//! Read path
//!
//! Snapshots of the published index and point lookups against them.

use std::fmt;
use std::ops::Deref;

use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::header::{BufferSelection, Header};
use crate::index::{self, shared_records, IndexRecord};
use crate::layout::Layout;
use crate::region::SharedRegion;

use super::Store;

/// Copy the records of the item buffer named by `selection` into `into`.
///
/// The used count is clamped to the buffer capacity so a torn or stale
/// counter can never send the copy past the buffer.
pub(super) fn load_records(
    region: &SharedRegion,
    layout: &Layout,
    header: &Header,
    selection: BufferSelection,
    into: &mut Vec<IndexRecord>,
) -> Result<()> {
    let used = header.item_used(selection.item).min(layout.item_max()) as usize;
    let shared = shared_records(region, layout.item_buffer(selection.item), used)
        .ok_or_else(|| StoreError::Corrupted("item buffer outside region".into()))?;

    into.clear();
    into.extend(shared.iter().map(|slot| slot.load()));
    Ok(())
}

/// A consistent, private copy of one published index generation.
///
/// Key and value bytes are read in place from the shared arenas, which the
/// writer (possibly another process) keeps changing. The side of each arena a
/// snapshot reads survives one compaction of that arena untouched; the next
/// compaction packs back into it and may overwrite the bytes under the
/// snapshot. Take a fresh snapshot rather than holding one across writes.
pub struct Snapshot<'a> {
    records: &'a [IndexRecord],
    key_arena: &'a [u8],
    value_arena: &'a [u8],
    selection: BufferSelection,
}

impl<'a> Snapshot<'a> {
    /// Look up `key` in this snapshot
    pub fn get(&self, key: &[u8]) -> Result<ValueView<'a>> {
        let position = index::search(self.records, self.key_arena, key)
            .map_err(|_| StoreError::KeyNotFound)?;
        let record = &self.records[position];

        let start = record.value_offset as usize;
        let bytes = self
            .value_arena
            .get(start..start + record.value_content_len())
            .ok_or_else(|| StoreError::Corrupted("value outside arena".into()))?;

        tracing::trace!(
            "Snapshot hit at position {} (value {}+{})",
            position,
            record.value_offset,
            record.value_len
        );

        Ok(ValueView {
            bytes,
            offset: record.value_offset,
        })
    }

    /// Keys in index order
    pub fn keys(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        let arena = self.key_arena;
        self.records.iter().map(move |record| index::record_key(record, arena))
    }

    pub fn records(&self) -> &'a [IndexRecord] {
        self.records
    }

    pub fn selection(&self) -> BufferSelection {
        self.selection
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A value inside the live shared value arena (not copied).
///
/// Valid through one compaction of the value arena after it was looked up;
/// the compaction after that may overwrite it. Use [`ValueView::to_bytes`]
/// or [`ValueView::to_vec`] to keep a value longer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ValueView<'a> {
    bytes: &'a [u8],
    offset: u32,
}

impl<'a> ValueView<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Offset of the value inside its arena
    pub fn arena_offset(&self) -> u32 {
        self.offset
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Owned copy that outlives the view
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.bytes)
    }
}

impl Deref for ValueView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl AsRef<[u8]> for ValueView<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

impl fmt::Debug for ValueView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueView")
            .field("offset", &self.offset)
            .field("bytes", &String::from_utf8_lossy(self.bytes))
            .finish()
    }
}

impl Store {
    /// Copy the published index into the private snapshot buffer.
    ///
    /// Steps:
    /// 1. Load `reader_id` and decode the selection
    /// 2. Copy the published item buffer
    /// 3. Validate every record against the arena capacities
    pub fn snapshot(&mut self) -> Result<Snapshot<'_>> {
        let Store {
            region,
            layout,
            snapshot_buf,
            ..
        } = self;
        let region = &*region;

        let header = Header::require(region)?;
        let selection = header.selection()?;
        load_records(region, layout, header, selection, snapshot_buf)?;
        let records = snapshot_buf.as_slice();

        if let Some(bad) = records
            .iter()
            .position(|record| !record.fits(layout.key_max(), layout.value_max()))
        {
            return Err(StoreError::Corrupted(format!(
                "record {} points outside its arena",
                bad
            )));
        }

        let key_arena = region
            .bytes(layout.key_arena(selection.key), layout.key_max() as usize)
            .ok_or_else(|| StoreError::Corrupted("key arena outside region".into()))?;
        let value_arena = region
            .bytes(layout.value_arena(selection.value), layout.value_max() as usize)
            .ok_or_else(|| StoreError::Corrupted("value arena outside region".into()))?;

        tracing::trace!(
            "Snapshot of {} records taken ({})",
            records.len(),
            selection
        );

        Ok(Snapshot {
            records,
            key_arena,
            value_arena,
            selection,
        })
    }

    /// Get the value stored under `key`.
    ///
    /// Snapshots the index and searches it; the returned view borrows the
    /// live value arena, see [`ValueView`] for how long its bytes hold.
    pub fn get(&mut self, key: &[u8]) -> Result<ValueView<'_>> {
        self.snapshot()?.get(key)
    }
}
