//! Buffer selection
//!
//! Each of the three double-buffered dimensions (items, keys, values) has one
//! published side. The triple is what a reader needs to decode a consistent
//! view, and it travels through the header as a single 3-bit `reader_id`:
//!
//! ```text
//! reader_id = item << 2 | key << 1 | value
//! ```

use std::fmt;

/// One of the two physical copies of a double-buffered sub-region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferSide {
    A,
    B,
}

impl BufferSide {
    /// The side that is not `self`
    pub const fn other(self) -> Self {
        match self {
            BufferSide::A => BufferSide::B,
            BufferSide::B => BufferSide::A,
        }
    }

    /// 0 for A, 1 for B
    pub const fn index(self) -> usize {
        match self {
            BufferSide::A => 0,
            BufferSide::B => 1,
        }
    }

    pub const fn bit(self) -> u32 {
        self.index() as u32
    }

    /// Decode a selector bit; only the lowest bit is considered
    pub const fn from_bit(bit: u32) -> Self {
        if bit & 1 == 0 {
            BufferSide::A
        } else {
            BufferSide::B
        }
    }
}

impl fmt::Display for BufferSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferSide::A => f.write_str("A"),
            BufferSide::B => f.write_str("B"),
        }
    }
}

/// The 3-bit encoding of a [`BufferSelection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReaderId(u8);

impl ReaderId {
    /// Validate a raw header word; anything above 7 is not a selection
    pub fn new(raw: u32) -> Option<Self> {
        (raw < 8).then_some(Self(raw as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ReaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of each dimension is published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferSelection {
    pub item: BufferSide,
    pub key: BufferSide,
    pub value: BufferSide,
}

impl BufferSelection {
    /// Selection of a freshly initialized header
    pub const INITIAL: BufferSelection = BufferSelection {
        item: BufferSide::A,
        key: BufferSide::A,
        value: BufferSide::A,
    };

    pub fn reader_id(self) -> ReaderId {
        ReaderId((self.item.bit() << 2 | self.key.bit() << 1 | self.value.bit()) as u8)
    }

    pub fn from_reader_id(id: ReaderId) -> Self {
        let raw = u32::from(id.get());
        Self {
            item: BufferSide::from_bit(raw >> 2),
            key: BufferSide::from_bit(raw >> 1),
            value: BufferSide::from_bit(raw),
        }
    }
}

impl fmt::Display for BufferSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "items={} keys={} values={} (reader_id={})",
            self.item,
            self.key,
            self.value,
            self.reader_id()
        )
    }
}
