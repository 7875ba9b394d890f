//! Layout Calculator
//!
//! Maps (key capacity, value size bound) to the size of the region and the
//! offset of every sub-region.
//!
//! ## Region Layout
//! ```text
//! ┌──────────┬─────────┬─────────┬────────┬────────┬──────────┬──────────┐
//! │ Header   │ Items A │ Items B │ Keys A │ Keys B │ Values A │ Values B │
//! │ (64)     │ N × 16  │ N × 16  │ 128·N  │ 128·N  │ 2·V·N    │ 2·V·N    │
//! └──────────┴─────────┴─────────┴────────┴────────┴──────────┴──────────┘
//! ```
//!
//! Offsets inside the region are 32-bit, which is why the ceilings below
//! exist.

use std::fmt;

use crate::error::{Result, StoreError};
use crate::header::{BufferSide, HEADER_SIZE};
use crate::index::RECORD_SIZE;
use crate::region::{RegionOffset, MAX_REGION_SIZE};

/// Most keys a store may hold
pub const MAX_KEY_CAPACITY: u32 = 65_536;

/// Largest value size bound (16 MiB)
pub const MAX_VALUE_SIZE: u32 = 16 * 1024 * 1024;

/// Key arena bytes reserved per key, terminator included
pub const KEY_SLOT_SIZE: u32 = 128;

/// Longest key accepted by `set`, leaving room for the terminator
pub const MAX_KEY_LEN: usize = KEY_SLOT_SIZE as usize - 1;

/// The two double-buffered byte arenas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaKind {
    Key,
    Value,
}

impl fmt::Display for ArenaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArenaKind::Key => f.write_str("key"),
            ArenaKind::Value => f.write_str("value"),
        }
    }
}

/// Sizes and offsets of one store region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    item_max: u32,
    key_max: u32,
    value_max: u32,
    total_size: usize,
}

impl Layout {
    /// Compute the layout for `key_capacity` keys of at most
    /// `value_size_bound` bytes each.
    ///
    /// The value arenas get twice the minimum (`2·V·N` each) so replaced
    /// values can accumulate before a compaction is needed.
    pub fn compute(key_capacity: u32, value_size_bound: u32) -> Result<Self> {
        if key_capacity == 0 {
            return Err(StoreError::Capacity("key capacity must be at least 1".into()));
        }
        if key_capacity > MAX_KEY_CAPACITY {
            return Err(StoreError::Capacity(format!(
                "key capacity {} exceeds {}",
                key_capacity, MAX_KEY_CAPACITY
            )));
        }
        if value_size_bound > MAX_VALUE_SIZE {
            return Err(StoreError::Capacity(format!(
                "value size bound {} exceeds {}",
                value_size_bound, MAX_VALUE_SIZE
            )));
        }

        let n = u64::from(key_capacity);
        let key_max = u64::from(KEY_SLOT_SIZE) * n;
        let value_max = 2 * u64::from(value_size_bound) * n;

        Self::from_parts(n, key_max, value_max)
    }

    /// Rebuild the layout from capacities stored in a header.
    pub fn from_capacities(item_max: u32, key_max: u32, value_max: u32) -> Result<Self> {
        if item_max == 0 || item_max > MAX_KEY_CAPACITY {
            return Err(StoreError::Corrupted(format!(
                "stored item capacity {} out of range",
                item_max
            )));
        }
        Self::from_parts(u64::from(item_max), u64::from(key_max), u64::from(value_max))
    }

    fn from_parts(item_max: u64, key_max: u64, value_max: u64) -> Result<Self> {
        let total = HEADER_SIZE as u64
            + 2 * item_max * RECORD_SIZE as u64
            + 2 * key_max
            + 2 * value_max;

        if total > MAX_REGION_SIZE as u64 {
            return Err(StoreError::Capacity(format!(
                "region size {} exceeds {}",
                total, MAX_REGION_SIZE
            )));
        }

        // Everything below the 1 GiB ceiling fits in u32.
        Ok(Self {
            item_max: item_max as u32,
            key_max: key_max as u32,
            value_max: value_max as u32,
            total_size: total as usize,
        })
    }

    // =========================================================================
    // Capacities
    // =========================================================================

    /// Record slots per item buffer
    pub fn item_max(&self) -> u32 {
        self.item_max
    }

    /// Bytes per key arena
    pub fn key_max(&self) -> u32 {
        self.key_max
    }

    /// Bytes per value arena
    pub fn value_max(&self) -> u32 {
        self.value_max
    }

    /// Bytes per arena of the given kind
    pub fn arena_max(&self, arena: ArenaKind) -> u32 {
        match arena {
            ArenaKind::Key => self.key_max,
            ArenaKind::Value => self.value_max,
        }
    }

    /// Size of the whole region
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    // =========================================================================
    // Sub-region Offsets
    // =========================================================================

    fn item_buffer_size(&self) -> usize {
        self.item_max as usize * RECORD_SIZE
    }

    pub fn item_buffer(&self, side: BufferSide) -> RegionOffset {
        RegionOffset::new(HEADER_SIZE) + side.index() * self.item_buffer_size()
    }

    pub fn key_arena(&self, side: BufferSide) -> RegionOffset {
        let base = RegionOffset::new(HEADER_SIZE) + 2 * self.item_buffer_size();
        base + side.index() * self.key_max as usize
    }

    pub fn value_arena(&self, side: BufferSide) -> RegionOffset {
        let base = self.key_arena(BufferSide::A) + 2 * self.key_max as usize;
        base + side.index() * self.value_max as usize
    }

    pub fn arena(&self, arena: ArenaKind, side: BufferSide) -> RegionOffset {
        match arena {
            ArenaKind::Key => self.key_arena(side),
            ArenaKind::Value => self.value_arena(side),
        }
    }
}
