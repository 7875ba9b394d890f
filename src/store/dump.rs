//! Diagnostics: header and index dumps, key listing.
//!
//! Dumps are lossy on purpose: a record that points outside its arena shows
//! an empty key instead of failing the whole dump.

use std::fmt;

use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::header::{BufferSide, Header, HeaderDump};
use crate::index::{record_key, shared_records, IndexRecord};
use crate::layout::Layout;
use crate::region::SharedRegion;

use super::Store;

/// One record of an item buffer, with its key resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub position: usize,
    pub key: Bytes,
    pub record: IndexRecord,
}

impl fmt::Display for IndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>5}  {:<24} key@{}+{}  value@{}+{}",
            self.position,
            String::from_utf8_lossy(&self.key),
            self.record.key_offset,
            self.record.key_len,
            self.record.value_offset,
            self.record.value_len
        )
    }
}

/// Resolve the first `used` records of item buffer `items` against key arena
/// `keys`.
fn entries(
    region: &SharedRegion,
    layout: &Layout,
    items: BufferSide,
    used: u32,
    keys: BufferSide,
) -> Result<Vec<IndexEntry>> {
    let used = used.min(layout.item_max()) as usize;
    let slots = shared_records(region, layout.item_buffer(items), used)
        .ok_or_else(|| StoreError::Corrupted("item buffer outside region".into()))?;
    let key_arena = region
        .bytes(layout.key_arena(keys), layout.key_max() as usize)
        .unwrap_or_default();

    Ok(slots
        .iter()
        .enumerate()
        .map(|(position, slot)| {
            let record = slot.load();
            IndexEntry {
                position,
                key: Bytes::copy_from_slice(record_key(&record, key_arena)),
                record,
            }
        })
        .collect())
}

impl Store {
    pub fn dump_header(&self) -> Result<HeaderDump> {
        Ok(Header::require(&self.region)?.dump())
    }

    /// The published index, in order
    pub fn dump_index(&self) -> Result<Vec<IndexEntry>> {
        let header = Header::require(&self.region)?;
        let selection = header.selection()?;
        entries(
            &self.region,
            &self.layout,
            selection.item,
            header.item_used(selection.item),
            selection.key,
        )
    }

    /// Both physical item buffers, `[A, B]`.
    ///
    /// Keys are resolved against the published key arena, so the
    /// unpublished buffer may show stale keys after a key compaction.
    pub fn dump_all_indexes(&self) -> Result<[Vec<IndexEntry>; 2]> {
        let header = Header::require(&self.region)?;
        let keys = header.selection()?.key;
        let dump = |side: BufferSide| {
            entries(&self.region, &self.layout, side, header.item_used(side), keys)
        };
        Ok([dump(BufferSide::A)?, dump(BufferSide::B)?])
    }

    /// Owned copies of every published key, in index order
    pub fn list_keys(&mut self) -> Result<Vec<Bytes>> {
        Ok(self.snapshot()?.keys().map(Bytes::copy_from_slice).collect())
    }

    /// Log the header and the published index at `info`
    pub fn log_state(&self) -> Result<()> {
        let header = self.dump_header()?;
        tracing::info!(
            "Store {}: reader_id={} items={} key bytes={} value bytes={}",
            self.path().display(),
            header.reader_id,
            header.item_used[header.item_buf.index()],
            header.key_used[header.key_buf.index()],
            header.value_used[header.value_buf.index()]
        );
        for entry in self.dump_index()? {
            tracing::info!("{}", entry);
        }
        Ok(())
    }
}
