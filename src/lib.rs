//! # shmkv
//!
//! A key-value store that lives entirely inside one memory-mapped file, shared
//! between processes:
//! - One writer, any number of lock-free readers
//! - Double-buffered index and arenas, published with a single header word
//! - Fixed capacity chosen at creation, compaction instead of growth
//!
//! ## Region Layout
//!
//! ```text
//! ┌────────┬─────────┬─────────┬─────────┬─────────┬──────────┬──────────┐
//! │ Header │ Items A │ Items B │ Keys A  │ Keys B  │ Values A │ Values B │
//! │  64 B  │  16·N   │  16·N   │  128·N  │  128·N  │  2·V·N   │  2·V·N   │
//! └───┬────┴─────────┴─────────┴─────────┴─────────┴──────────┴──────────┘
//!     │
//!     └── reader_id: which of A/B is published for items, keys and values
//! ```
//!
//! ## Write / Read Flow
//!
//! ```text
//!   writer                                   readers
//!   ──────                                   ───────
//!   copy published items ─┐                  load reader_id (Acquire)
//!   mutate, append bytes  │                  copy published items
//!   write unpublished ────┘                  binary search
//!   store reader_id (Release) ──────────────▶ next lookup sees new index
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod region;
pub mod layout;
pub mod header;
pub mod index;
pub mod store;
pub mod shared;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::{AccessMode, StoreConfig};
pub use layout::{ArenaKind, Layout};
pub use store::{IndexEntry, Snapshot, Store, ValueView};
pub use shared::SharedStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of shmkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
