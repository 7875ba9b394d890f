//! Configuration for shmkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// How a handle attaches to the backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// The single writer: maps the file read-write, may create and size it
    Write,

    /// A reader: maps the file read-only and never mutates shared bytes
    Read,
}

impl AccessMode {
    pub fn is_write(self) -> bool {
        matches!(self, AccessMode::Write)
    }
}

/// Main configuration for a store handle
#[derive(Debug, Clone)]
pub struct StoreConfig {
    // -------------------------------------------------------------------------
    // Backing File
    // -------------------------------------------------------------------------
    /// Path of the memory-mapped backing file
    pub path: PathBuf,

    // -------------------------------------------------------------------------
    // Capacity Configuration
    // -------------------------------------------------------------------------
    /// Maximum number of keys (index records)
    pub key_capacity: u32,

    /// Upper bound on the size of a single value (in bytes)
    pub value_size_bound: u32,

    // -------------------------------------------------------------------------
    // Attach Configuration
    // -------------------------------------------------------------------------
    /// Writer or reader
    pub mode: AccessMode,

    /// Reset the header and zero the item buffers after mapping (writer only)
    pub init_header: bool,

    /// Remove any existing backing file before attaching (writer only)
    pub init_disk: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./shmkv.store"),
            key_capacity: 1024,
            value_size_bound: 1024,
            mode: AccessMode::Read,
            init_header: false,
            init_disk: false,
        }
    }
}

impl StoreConfig {
    /// Create a new config builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Writer config that creates a fresh store at `path`
    pub fn writer(path: impl Into<PathBuf>, key_capacity: u32, value_size_bound: u32) -> Self {
        Self::builder()
            .path(path)
            .key_capacity(key_capacity)
            .value_size_bound(value_size_bound)
            .mode(AccessMode::Write)
            .init_header(true)
            .build()
    }

    /// Reader config attaching to an existing store at `path`
    pub fn reader(path: impl Into<PathBuf>, key_capacity: u32, value_size_bound: u32) -> Self {
        Self::builder()
            .path(path)
            .key_capacity(key_capacity)
            .value_size_bound(value_size_bound)
            .mode(AccessMode::Read)
            .build()
    }
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the backing file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the key capacity
    pub fn key_capacity(mut self, count: u32) -> Self {
        self.config.key_capacity = count;
        self
    }

    /// Set the value size bound (in bytes)
    pub fn value_size_bound(mut self, size: u32) -> Self {
        self.config.value_size_bound = size;
        self
    }

    /// Set the access mode
    pub fn mode(mut self, mode: AccessMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Reset the header on attach
    pub fn init_header(mut self, yes: bool) -> Self {
        self.config.init_header = yes;
        self
    }

    /// Remove the backing file on attach
    pub fn init_disk(mut self, yes: bool) -> Self {
        self.config.init_disk = yes;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}
