//! Region Module
//!
//! The file-backed memory mapping shared by the writer and all readers.
//!
//! ## Responsibilities
//! - Create, size, and map the backing file (writer)
//! - Attach read-only to an existing file (readers)
//! - Translate region offsets into byte slices and atomic words
//! - Sync and unmap on detach, remove the file on request
//!
//! ## Addressing
//! Nothing inside the region stores a pointer. Every process may map the file
//! at a different base address, so sub-regions are named by [`RegionOffset`]
//! and translated against the local mapping on each access.

mod mapping;
mod offset;

pub use mapping::SharedRegion;
pub use offset::RegionOffset;

/// Largest region the store will map (1 GiB)
pub const MAX_REGION_SIZE: usize = 1 << 30;
