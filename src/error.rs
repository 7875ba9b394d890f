//! Error types for shmkv
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::layout::ArenaKind;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for shmkv operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Initialization Errors
    // -------------------------------------------------------------------------
    #[error("Capacity ceiling exceeded: {0}")]
    Capacity(String),

    #[error("Region size mismatch for {path:?}: expected {expected} bytes, found {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Region {0:?} has not been initialized by a writer")]
    NotInitialized(PathBuf),

    #[error("Region corrupted: {0}")]
    Corrupted(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Write Path Errors
    // -------------------------------------------------------------------------
    #[error("Store is attached read-only")]
    ReadOnly,

    #[error("Index full: capacity of {capacity} keys exhausted")]
    IndexFull { capacity: u32 },

    #[error("{arena} arena overflow: {needed} bytes needed after compaction, capacity {capacity}")]
    ArenaOverflow {
        arena: ArenaKind,
        needed: u64,
        capacity: u32,
    },

    #[error("Key too long: {len} bytes (max {max})")]
    KeyTooLong { len: usize, max: usize },

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,
}

impl StoreError {
    /// True for the `KeyNotFound` outcome of Get/Del, which callers usually
    /// treat as a normal result rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::KeyNotFound)
    }
}
