//! Write path
//!
//! Every mutation is copy-on-write against the published generation:
//!
//! ```text
//!  1. begin    copy published records -> scratch
//!  2. plan     capacity checks for every arena the write touches
//!  3. apply    compact arenas that need it (into the unpublished side)
//!  4. append   key/value bytes past the arena high-water mark
//!  5. commit   scratch -> unpublished item buffer, publish reader_id
//! ```
//!
//! Nothing a reader of the current generation can observe is written before
//! step 3, so a failed plan leaves the store exactly as it was.

use crate::error::{Result, StoreError};
use crate::header::{BufferSelection, BufferSide, Header, Publish};
use crate::index::{self, shared_records, IndexRecord};
use crate::layout::{ArenaKind, Layout, MAX_KEY_LEN};
use crate::region::SharedRegion;

use super::compaction::{self, ArenaPlan};
use super::reader::load_records;
use super::Store;

/// One in-flight mutation of the index
struct WriteTxn<'a> {
    region: &'a mut SharedRegion,
    layout: &'a Layout,
    records: &'a mut Vec<IndexRecord>,
    /// Generation the transaction started from
    current: BufferSelection,
    /// Arena sides the commit will publish
    key_side: BufferSide,
    value_side: BufferSide,
    key_used: u32,
    value_used: u32,
}

impl<'a> WriteTxn<'a> {
    fn begin(
        region: &'a mut SharedRegion,
        layout: &'a Layout,
        records: &'a mut Vec<IndexRecord>,
    ) -> Result<Self> {
        let header = Header::require(region)?;
        let current = header.selection()?;
        let key_used = header.key_used(current.key);
        let value_used = header.value_used(current.value);
        load_records(region, layout, header, current, records)?;

        if records
            .iter()
            .any(|record| !record.fits(layout.key_max(), layout.value_max()))
        {
            return Err(StoreError::Corrupted(
                "published index points outside its arenas".into(),
            ));
        }

        Ok(Self {
            region,
            layout,
            records,
            current,
            key_side: current.key,
            value_side: current.value,
            key_used,
            value_used,
        })
    }

    /// Binary search the working records for `key`
    fn search(&self, key: &[u8]) -> Result<std::result::Result<usize, usize>> {
        let key_arena = self
            .region
            .bytes(self.layout.key_arena(self.key_side), self.layout.key_max() as usize)
            .ok_or_else(|| StoreError::Corrupted("key arena outside region".into()))?;
        Ok(index::search(self.records.as_slice(), key_arena, key))
    }

    fn used(&self, arena: ArenaKind) -> u32 {
        match arena {
            ArenaKind::Key => self.key_used,
            ArenaKind::Value => self.value_used,
        }
    }

    fn side(&self, arena: ArenaKind) -> BufferSide {
        match arena {
            ArenaKind::Key => self.key_side,
            ArenaKind::Value => self.value_side,
        }
    }

    fn plan(&self, arena: ArenaKind, need: u64) -> Result<ArenaPlan> {
        compaction::plan(
            self.records.as_slice(),
            arena,
            self.used(arena),
            self.layout.arena_max(arena),
            need,
        )
    }

    fn apply(&mut self, arena: ArenaKind, plan: ArenaPlan) -> Result<()> {
        if plan == ArenaPlan::Append {
            return Ok(());
        }

        let from = self.side(arena);
        let records = self.records.as_mut_slice();
        let packed = compaction::compact(self.region, self.layout, arena, from, records)?;
        match arena {
            ArenaKind::Key => {
                self.key_side = from.other();
                self.key_used = packed;
            }
            ArenaKind::Value => {
                self.value_side = from.other();
                self.value_used = packed;
            }
        }
        Ok(())
    }

    /// Append `bytes` plus a terminator. Returns `(offset, stored_len)`.
    fn append(&mut self, arena: ArenaKind, bytes: &[u8]) -> Result<(u32, u32)> {
        let offset = self.used(arena);
        let max = self.layout.arena_max(arena);
        let stored = u32::try_from(bytes.len() + 1)
            .ok()
            .filter(|&stored| u64::from(offset) + u64::from(stored) <= u64::from(max))
            .ok_or(StoreError::ArenaOverflow {
                arena,
                needed: u64::from(offset) + bytes.len() as u64 + 1,
                capacity: max,
            })?;

        let start = self.layout.arena(arena, self.side(arena)) + offset;
        let dst = self.region.bytes_mut(start, stored as usize)?;
        dst[..bytes.len()].copy_from_slice(bytes);
        dst[bytes.len()] = 0;

        match arena {
            ArenaKind::Key => self.key_used += stored,
            ArenaKind::Value => self.value_used += stored,
        }
        Ok((offset, stored))
    }

    /// Write the records into the unpublished item buffer and publish
    fn commit(self) -> Result<Publish> {
        let next = BufferSelection {
            item: self.current.item.other(),
            key: self.key_side,
            value: self.value_side,
        };

        let buffer = self.layout.item_buffer(next.item);
        let slots = shared_records(self.region, buffer, self.records.len())
            .ok_or_else(|| StoreError::Corrupted("item buffer outside region".into()))?;
        for (slot, record) in slots.iter().zip(self.records.iter()) {
            slot.store(record);
        }

        let publish = Publish {
            selection: next,
            item_used: self.records.len() as u32,
            key_used: self.key_used,
            value_used: self.value_used,
        };
        Header::require(self.region)?.publish(&publish);
        Ok(publish)
    }
}

impl Store {
    /// Insert or replace `key`.
    ///
    /// A replace keeps the key bytes and index position and only points the
    /// record at a freshly appended value. An insert fails with `IndexFull`
    /// once `key_capacity` keys are stored.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        if key.len() > MAX_KEY_LEN {
            return Err(StoreError::KeyTooLong {
                len: key.len(),
                max: MAX_KEY_LEN,
            });
        }

        let Store {
            region,
            layout,
            scratch,
            ..
        } = self;
        let mut txn = WriteTxn::begin(region, layout, scratch)?;
        let value_need = value.len() as u64 + 1;

        let replaced = match txn.search(key)? {
            Ok(position) => {
                let plan = txn.plan(ArenaKind::Value, value_need)?;
                txn.apply(ArenaKind::Value, plan)?;

                let (offset, len) = txn.append(ArenaKind::Value, value)?;
                let record = &mut txn.records[position];
                record.value_offset = offset;
                record.value_len = len;
                true
            }
            Err(position) => {
                let capacity = txn.layout.item_max();
                if txn.records.len() >= capacity as usize {
                    return Err(StoreError::IndexFull { capacity });
                }

                let key_plan = txn.plan(ArenaKind::Key, key.len() as u64 + 1)?;
                let value_plan = txn.plan(ArenaKind::Value, value_need)?;
                txn.apply(ArenaKind::Key, key_plan)?;
                txn.apply(ArenaKind::Value, value_plan)?;

                let (key_offset, key_len) = txn.append(ArenaKind::Key, key)?;
                let (value_offset, value_len) = txn.append(ArenaKind::Value, value)?;
                txn.records.insert(
                    position,
                    IndexRecord {
                        key_offset,
                        key_len,
                        value_offset,
                        value_len,
                    },
                );
                false
            }
        };

        let publish = txn.commit()?;
        tracing::debug!(
            "Set {} byte key ({} byte value, replaced: {}), {} keys, reader_id {}",
            key.len(),
            value.len(),
            replaced,
            publish.item_used,
            publish.selection.reader_id()
        );
        Ok(())
    }

    /// Remove `key`. Its bytes stay in the arenas until the next compaction.
    pub fn del(&mut self, key: &[u8]) -> Result<()> {
        self.ensure_writable()?;

        let Store {
            region,
            layout,
            scratch,
            ..
        } = self;
        let mut txn = WriteTxn::begin(region, layout, scratch)?;

        let position = txn.search(key)?.map_err(|_| StoreError::KeyNotFound)?;
        txn.records.remove(position);

        let publish = txn.commit()?;
        tracing::debug!(
            "Deleted {} byte key, {} keys, reader_id {}",
            key.len(),
            publish.item_used,
            publish.selection.reader_id()
        );
        Ok(())
    }

    /// Pack one arena into its other side and publish the result.
    ///
    /// Returns the number of bytes still in use.
    pub fn compact(&mut self, arena: ArenaKind) -> Result<u32> {
        self.ensure_writable()?;

        let Store {
            region,
            layout,
            scratch,
            ..
        } = self;
        let mut txn = WriteTxn::begin(region, layout, scratch)?;
        txn.apply(arena, ArenaPlan::Compact)?;
        let used = txn.used(arena);
        txn.commit()?;
        Ok(used)
    }

    pub fn compact_values(&mut self) -> Result<u32> {
        self.compact(ArenaKind::Value)
    }

    pub fn compact_keys(&mut self) -> Result<u32> {
        self.compact(ArenaKind::Key)
    }
}
