//! Header Module
//!
//! The control block at offset 0 of every region. It is the single source of
//! truth for which half of each double-buffered sub-region is published.
//!
//! ## Format (64 bytes, native-endian u32 words)
//! ```text
//! ┌───────┬─────────┬────────────┬───────────┬─────────────┐
//! │ magic │ version │ item_used  │ key_used  │ value_used  │
//! │       │         │ [A, B]     │ [A, B]    │ [A, B]      │
//! ├───────┴───┬─────┴───┬────────┴──┬────────┴──┬──────────┤
//! │ item_buf  │ key_buf │ value_buf │ reader_id │ item_max │
//! ├───────────┼─────────┴──┬────────┴───────────┴──────────┤
//! │ key_max   │ value_max  │ layout_crc                    │
//! └───────────┴────────────┴───────────────────────────────┘
//! ```
//!
//! ## Publication
//! Every word is an `AtomicU32`. The writer stores counters and selectors
//! `Relaxed`, then stores `reader_id` with `Release`; readers load `reader_id`
//! with `Acquire` and decode everything else from it. A reader that observes a
//! `reader_id` therefore also observes the records and arena bytes written
//! before it was published.

mod selector;

pub use selector::{BufferSelection, BufferSide, ReaderId};

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Result, StoreError};
use crate::layout::Layout;
use crate::region::{RegionOffset, SharedRegion};

/// Size of the header sub-region
pub const HEADER_SIZE: usize = 64;

/// "SHKV", stored once the writer has initialized the header
pub const MAGIC: u32 = 0x5348_4B56;

/// Current region format version
pub const FORMAT_VERSION: u32 = 1;

const HEADER_WORDS: usize = HEADER_SIZE / 4;

/// The shared control block, viewed in place inside the mapping.
#[repr(C)]
pub struct Header {
    magic: AtomicU32,
    version: AtomicU32,
    item_used: [AtomicU32; 2],
    key_used: [AtomicU32; 2],
    value_used: [AtomicU32; 2],
    item_buf: AtomicU32,
    key_buf: AtomicU32,
    value_buf: AtomicU32,
    reader_id: AtomicU32,
    item_max: AtomicU32,
    key_max: AtomicU32,
    value_max: AtomicU32,
    layout_crc: AtomicU32,
}

const _: () = assert!(std::mem::size_of::<Header>() == HEADER_SIZE);

/// Counters and selection installed by one publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Publish {
    pub selection: BufferSelection,
    pub item_used: u32,
    pub key_used: u32,
    pub value_used: u32,
}

impl Header {
    /// View the header of `region`, or `None` if the region is too small.
    pub(crate) fn view(region: &SharedRegion) -> Option<&Header> {
        let words = region.words(RegionOffset::ZERO, HEADER_WORDS)?;

        // Safety: `Header` is `repr(C)` and consists of exactly
        // `HEADER_WORDS` `AtomicU32`s; `words` is aligned and in bounds.
        Some(unsafe { &*(words.as_ptr() as *const Header) })
    }

    /// Like `view`, as an error for callers that already validated the region
    pub(crate) fn require(region: &SharedRegion) -> Result<&Header> {
        Self::view(region).ok_or_else(|| {
            StoreError::Corrupted(format!(
                "region of {} bytes cannot hold a header",
                region.len()
            ))
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.magic.load(Ordering::Acquire) == MAGIC
    }

    /// Reset every field for `layout`. The magic is stored last so a reader
    /// never attaches to a half-written header.
    pub(crate) fn initialize(&self, layout: &Layout) {
        self.magic.store(0, Ordering::Relaxed);
        self.version.store(FORMAT_VERSION, Ordering::Relaxed);

        for side in 0..2 {
            self.item_used[side].store(0, Ordering::Relaxed);
            self.key_used[side].store(0, Ordering::Relaxed);
            self.value_used[side].store(0, Ordering::Relaxed);
        }

        let initial = BufferSelection::INITIAL;
        self.item_buf.store(initial.item.bit(), Ordering::Relaxed);
        self.key_buf.store(initial.key.bit(), Ordering::Relaxed);
        self.value_buf.store(initial.value.bit(), Ordering::Relaxed);
        self.reader_id
            .store(u32::from(initial.reader_id().get()), Ordering::Relaxed);

        self.item_max.store(layout.item_max(), Ordering::Relaxed);
        self.key_max.store(layout.key_max(), Ordering::Relaxed);
        self.value_max.store(layout.value_max(), Ordering::Relaxed);
        self.layout_crc.store(
            layout_checksum(layout.item_max(), layout.key_max(), layout.value_max()),
            Ordering::Relaxed,
        );

        self.magic.store(MAGIC, Ordering::Release);
    }

    /// Check the version and the capacity checksum
    pub fn verify(&self) -> Result<()> {
        let version = self.version.load(Ordering::Relaxed);
        if version != FORMAT_VERSION {
            return Err(StoreError::Corrupted(format!(
                "unsupported region format version {}",
                version
            )));
        }

        let (item_max, key_max, value_max) = self.capacities();
        let expected = layout_checksum(item_max, key_max, value_max);
        let stored = self.layout_crc.load(Ordering::Relaxed);
        if stored != expected {
            return Err(StoreError::Corrupted(format!(
                "layout checksum mismatch: stored {:#010x}, computed {:#010x}",
                stored, expected
            )));
        }
        Ok(())
    }

    /// `(item_max, key_max, value_max)` as fixed at creation
    pub fn capacities(&self) -> (u32, u32, u32) {
        (
            self.item_max.load(Ordering::Relaxed),
            self.key_max.load(Ordering::Relaxed),
            self.value_max.load(Ordering::Relaxed),
        )
    }

    // =========================================================================
    // Read Side
    // =========================================================================

    /// Load `reader_id` and decode the published selection
    pub fn selection(&self) -> Result<BufferSelection> {
        let raw = self.reader_id.load(Ordering::Acquire);
        let id = ReaderId::new(raw)
            .ok_or_else(|| StoreError::Corrupted(format!("invalid reader_id {}", raw)))?;
        Ok(BufferSelection::from_reader_id(id))
    }

    pub fn item_used(&self, side: BufferSide) -> u32 {
        self.item_used[side.index()].load(Ordering::Relaxed)
    }

    pub fn key_used(&self, side: BufferSide) -> u32 {
        self.key_used[side.index()].load(Ordering::Relaxed)
    }

    pub fn value_used(&self, side: BufferSide) -> u32 {
        self.value_used[side.index()].load(Ordering::Relaxed)
    }

    // =========================================================================
    // Write Side
    // =========================================================================

    /// Install a new generation. `reader_id` is stored last, with `Release`.
    pub(crate) fn publish(&self, publish: &Publish) {
        let selection = publish.selection;

        self.item_used[selection.item.index()].store(publish.item_used, Ordering::Relaxed);
        self.key_used[selection.key.index()].store(publish.key_used, Ordering::Relaxed);
        self.value_used[selection.value.index()].store(publish.value_used, Ordering::Relaxed);

        self.item_buf.store(selection.item.bit(), Ordering::Relaxed);
        self.key_buf.store(selection.key.bit(), Ordering::Relaxed);
        self.value_buf.store(selection.value.bit(), Ordering::Relaxed);

        self.reader_id
            .store(u32::from(selection.reader_id().get()), Ordering::Release);
    }

    /// Copy every field out for diagnostics
    pub fn dump(&self) -> HeaderDump {
        let (item_max, key_max, value_max) = self.capacities();
        HeaderDump {
            initialized: self.is_initialized(),
            version: self.version.load(Ordering::Relaxed),
            item_buf: BufferSide::from_bit(self.item_buf.load(Ordering::Relaxed)),
            key_buf: BufferSide::from_bit(self.key_buf.load(Ordering::Relaxed)),
            value_buf: BufferSide::from_bit(self.value_buf.load(Ordering::Relaxed)),
            reader_id: self.reader_id.load(Ordering::Acquire),
            item_used: [self.item_used(BufferSide::A), self.item_used(BufferSide::B)],
            key_used: [self.key_used(BufferSide::A), self.key_used(BufferSide::B)],
            value_used: [self.value_used(BufferSide::A), self.value_used(BufferSide::B)],
            item_max,
            key_max,
            value_max,
        }
    }
}

/// CRC32 over the three capacities, in header order
fn layout_checksum(item_max: u32, key_max: u32, value_max: u32) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&item_max.to_ne_bytes());
    hasher.update(&key_max.to_ne_bytes());
    hasher.update(&value_max.to_ne_bytes());
    hasher.finalize()
}

/// Point-in-time copy of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderDump {
    pub initialized: bool,
    pub version: u32,
    pub item_buf: BufferSide,
    pub key_buf: BufferSide,
    pub value_buf: BufferSide,
    /// Raw word, may be out of range on a corrupted region
    pub reader_id: u32,
    pub item_used: [u32; 2],
    pub key_used: [u32; 2],
    pub value_used: [u32; 2],
    pub item_max: u32,
    pub key_max: u32,
    pub value_max: u32,
}

impl fmt::Display for HeaderDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "initialized:  {} (version {})", self.initialized, self.version)?;
        writeln!(f, "reader_id:    {}", self.reader_id)?;
        writeln!(
            f,
            "selectors:    items={} keys={} values={}",
            self.item_buf, self.key_buf, self.value_buf
        )?;
        writeln!(
            f,
            "items used:   A={} B={} (max {})",
            self.item_used[0], self.item_used[1], self.item_max
        )?;
        writeln!(
            f,
            "keys used:    A={} B={} (max {})",
            self.key_used[0], self.key_used[1], self.key_max
        )?;
        write!(
            f,
            "values used:  A={} B={} (max {})",
            self.value_used[0], self.value_used[1], self.value_max
        )
    }
}
