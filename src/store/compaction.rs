//! Arena compaction
//!
//! Arenas are append-only between compactions: replaced values and deleted
//! keys leave dead bytes behind. When an append would run past the arena
//! capacity, the live bytes are packed into the other copy of the arena.
//!
//! ```text
//!   published (A)                      unpublished (B)
//! ┌────┬──────┬────┬──────┬──────┐    ┌────┬────┬──────┬─────────────┐
//! │ k1 │ dead │ k2 │ dead │ k3 │ │ -> │ k1 │ k2 │ k3   │    free     │
//! └────┴──────┴────┴──────┴──────┘    └────┴────┴──────┴─────────────┘
//! ```
//!
//! The copy goes in index order, so the packed arena is also sorted.

use crate::error::{Result, StoreError};
use crate::header::BufferSide;
use crate::index::IndexRecord;
use crate::layout::{ArenaKind, Layout};
use crate::region::SharedRegion;

/// What an append of `need` bytes requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ArenaPlan {
    /// Fits after the current high-water mark
    Append,
    /// Only fits once the live bytes are packed into the other arena
    Compact,
}

/// Bytes referenced by `records` in `arena`
pub(super) fn live_bytes(records: &[IndexRecord], arena: ArenaKind) -> u64 {
    records
        .iter()
        .map(|record| u64::from(record.span(arena).1))
        .sum()
}

/// Decide how `need` more bytes get into `arena`.
///
/// Fails with `ArenaOverflow` if even a packed arena cannot hold them. Pure:
/// nothing is written.
pub(super) fn plan(
    records: &[IndexRecord],
    arena: ArenaKind,
    used: u32,
    max: u32,
    need: u64,
) -> Result<ArenaPlan> {
    if u64::from(used) + need <= u64::from(max) {
        return Ok(ArenaPlan::Append);
    }

    let needed = live_bytes(records, arena) + need;
    if needed > u64::from(max) {
        return Err(StoreError::ArenaOverflow {
            arena,
            needed,
            capacity: max,
        });
    }
    Ok(ArenaPlan::Compact)
}

/// Pack the bytes of `records` from arena side `from` into the other side,
/// rewriting each record's offset. Returns the packed length.
pub(super) fn compact(
    region: &mut SharedRegion,
    layout: &Layout,
    arena: ArenaKind,
    from: BufferSide,
    records: &mut [IndexRecord],
) -> Result<u32> {
    let max = layout.arena_max(arena);
    let src = layout.arena(arena, from);
    let dst = layout.arena(arena, from.other());
    let mut cursor: u32 = 0;

    for record in records.iter_mut() {
        let (offset, len) = record.span(arena);

        let end = cursor
            .checked_add(len)
            .filter(|&end| end <= max)
            .ok_or(StoreError::ArenaOverflow {
                arena,
                needed: u64::from(cursor) + u64::from(len),
                capacity: max,
            })?;

        region.copy_within(src + offset, dst + cursor, len as usize)?;
        record.set_offset(arena, cursor);
        cursor = end;
    }

    tracing::debug!(
        "Compacted {} arena {} -> {}: {} records, {} bytes live",
        arena,
        from,
        from.other(),
        records.len(),
        cursor
    );

    Ok(cursor)
}
