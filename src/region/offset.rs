//! Region offsets
//!
//! Absolute byte offsets into a [`SharedRegion`](super::SharedRegion).

use std::fmt;
use std::ops::Add;

/// Byte offset from the start of the mapped region.
///
/// Only meaningful together with the region it was computed for; the region's
/// accessors perform the bounds-checked translation to local memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionOffset(usize);

impl RegionOffset {
    /// The start of the region, where the header lives
    pub const ZERO: RegionOffset = RegionOffset(0);

    pub const fn new(offset: usize) -> Self {
        Self(offset)
    }

    pub const fn get(self) -> usize {
        self.0
    }

    /// Offset `bytes` further into the region, or `None` on overflow
    pub fn checked_add(self, bytes: usize) -> Option<Self> {
        self.0.checked_add(bytes).map(Self)
    }
}

impl Add<usize> for RegionOffset {
    type Output = RegionOffset;

    fn add(self, bytes: usize) -> Self::Output {
        Self(self.0 + bytes)
    }
}

impl Add<u32> for RegionOffset {
    type Output = RegionOffset;

    fn add(self, bytes: u32) -> Self::Output {
        Self(self.0 + bytes as usize)
    }
}

impl fmt::Display for RegionOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
