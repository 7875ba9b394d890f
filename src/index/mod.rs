//! Index Module
//!
//! Fixed-size index records and the key ordering they are sorted by.
//!
//! ## Record Format (16 bytes)
//! ```text
//! ┌────────────────┬─────────────┬──────────────────┬───────────────┐
//! │ KeyOffset (4)  │ KeyLen (4)  │ ValueOffset (4)  │ ValueLen (4)  │
//! └────────────────┴─────────────┴──────────────────┴───────────────┘
//! ```
//! Offsets are relative to the published key/value arena. Both lengths count
//! one trailing terminator byte that is stored but never compared or
//! returned.

mod ordering;

pub use ordering::{compare_keys, record_key, search};

use std::sync::atomic::{AtomicU32, Ordering};

use crate::layout::ArenaKind;
use crate::region::{RegionOffset, SharedRegion};

/// Size of one record in an item buffer
pub const RECORD_SIZE: usize = 16;

/// Locates one key/value pair inside the arenas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexRecord {
    pub key_offset: u32,
    pub key_len: u32,
    pub value_offset: u32,
    pub value_len: u32,
}

impl IndexRecord {
    /// `(offset, stored_len)` of this record's bytes in `arena`
    pub fn span(&self, arena: ArenaKind) -> (u32, u32) {
        match arena {
            ArenaKind::Key => (self.key_offset, self.key_len),
            ArenaKind::Value => (self.value_offset, self.value_len),
        }
    }

    pub(crate) fn set_offset(&mut self, arena: ArenaKind, offset: u32) {
        match arena {
            ArenaKind::Key => self.key_offset = offset,
            ArenaKind::Value => self.value_offset = offset,
        }
    }

    /// Key length without the terminator
    pub fn key_content_len(&self) -> usize {
        self.key_len.saturating_sub(1) as usize
    }

    /// Value length without the terminator
    pub fn value_content_len(&self) -> usize {
        self.value_len.saturating_sub(1) as usize
    }

    /// True if both spans carry a terminator and end inside their arenas
    pub fn fits(&self, key_max: u32, value_max: u32) -> bool {
        let within = |offset: u32, len: u32, max: u32| {
            len >= 1 && u64::from(offset) + u64::from(len) <= u64::from(max)
        };
        within(self.key_offset, self.key_len, key_max)
            && within(self.value_offset, self.value_len, value_max)
    }
}

/// A record slot inside the shared mapping
#[repr(C)]
pub(crate) struct SharedRecord {
    words: [AtomicU32; 4],
}

const _: () = assert!(std::mem::size_of::<SharedRecord>() == RECORD_SIZE);

impl SharedRecord {
    pub fn load(&self) -> IndexRecord {
        IndexRecord {
            key_offset: self.words[0].load(Ordering::Relaxed),
            key_len: self.words[1].load(Ordering::Relaxed),
            value_offset: self.words[2].load(Ordering::Relaxed),
            value_len: self.words[3].load(Ordering::Relaxed),
        }
    }

    pub fn store(&self, record: &IndexRecord) {
        self.words[0].store(record.key_offset, Ordering::Relaxed);
        self.words[1].store(record.key_len, Ordering::Relaxed);
        self.words[2].store(record.value_offset, Ordering::Relaxed);
        self.words[3].store(record.value_len, Ordering::Relaxed);
    }
}

/// View `count` record slots starting at `offset`
pub(crate) fn shared_records(
    region: &SharedRegion,
    offset: RegionOffset,
    count: usize,
) -> Option<&[SharedRecord]> {
    let words = region.words(offset, count.checked_mul(RECORD_SIZE / 4)?)?;

    // Safety: `SharedRecord` is `repr(C)` over four `AtomicU32`, and `words`
    // holds exactly `count * 4` aligned words.
    Some(unsafe { std::slice::from_raw_parts(words.as_ptr() as *const SharedRecord, count) })
}
