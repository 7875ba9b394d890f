//! Store Module
//!
//! The index store: a handle over one shared region that serves point
//! lookups to readers and applies Set/Del for the single writer.
//!
//! ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR) across processes
//!
//! - **Writes** (set/del/compact): copy the published index into the
//!   unpublished item buffer, mutate it there, append bytes past the arena
//!   high-water mark (or compact into the unpublished arena), then publish a
//!   new `reader_id`. Readers of the previous generation are never disturbed.
//!
//! - **Reads** (get/snapshot): load `reader_id`, copy the published index into
//!   a private buffer, binary-search it. No locks, no retries.
//!
//! Only one writer may be attached to a file at a time; serializing writer
//! processes is up to the caller.

mod compaction;
mod dump;
mod reader;
mod writer;

pub use dump::IndexEntry;
pub use reader::{Snapshot, ValueView};

use std::path::Path;

use crate::config::{AccessMode, StoreConfig};
use crate::error::{Result, StoreError};
use crate::header::{BufferSide, Header};
use crate::index::{IndexRecord, RECORD_SIZE};
use crate::layout::Layout;
use crate::region::SharedRegion;

/// Handle to a shared key-value region.
///
/// Attaching happens in [`Store::init`]; dropping the handle syncs (writer)
/// and unmaps the region.
pub struct Store {
    /// Configuration the handle was attached with
    config: StoreConfig,

    /// The mapped backing file
    region: SharedRegion,

    /// Layout in effect; for readers this comes from the header
    layout: Layout,

    /// Private copy of the published index, reused by every snapshot
    snapshot_buf: Vec<IndexRecord>,

    /// Writer-side working copy of the index, reused by every write
    scratch: Vec<IndexRecord>,
}

impl Store {
    /// Attach to (and, for writers, create or initialize) a store.
    ///
    /// Writer:
    /// 1. Remove the file if `init_disk`
    /// 2. Create/size and map the file read-write
    /// 3. Initialize the header if `init_header` or if the region is blank
    /// 4. Otherwise require the stored capacities to match the parameters
    ///
    /// Reader:
    /// 1. Map the existing file read-only
    /// 2. Require an initialized, checksummed header
    /// 3. Use the stored capacities, warning if they differ from ours
    pub fn init(config: StoreConfig) -> Result<Self> {
        let requested = Layout::compute(config.key_capacity, config.value_size_bound)?;

        if !config.mode.is_write() && (config.init_header || config.init_disk) {
            return Err(StoreError::Config(
                "init_header and init_disk require write mode".into(),
            ));
        }

        if config.init_disk {
            SharedRegion::remove(&config.path)?;
        }

        let mut region =
            SharedRegion::create_or_attach(&config.path, requested.total_size(), config.mode)?;

        let layout = match config.mode {
            AccessMode::Write => Self::attach_writer(&mut region, requested, config.init_header)?,
            AccessMode::Read => Self::attach_reader(&region, requested)?,
        };

        tracing::info!(
            "Store attached at {} ({:?}): {} keys, {} key bytes, {} value bytes",
            config.path.display(),
            config.mode,
            layout.item_max(),
            layout.key_max(),
            layout.value_max()
        );

        Ok(Self {
            config,
            region,
            layout,
            snapshot_buf: Vec::with_capacity(layout.item_max() as usize),
            scratch: Vec::new(),
        })
    }

    /// Attach as the writer, creating the store if needed.
    ///
    /// Uses default config with the specified path and capacities; an
    /// existing store with the same capacities is reused as is.
    pub fn open_writer(path: impl AsRef<Path>, key_capacity: u32, value_size_bound: u32) -> Result<Self> {
        let config = StoreConfig::builder()
            .path(path.as_ref())
            .key_capacity(key_capacity)
            .value_size_bound(value_size_bound)
            .mode(AccessMode::Write)
            .build();
        Self::init(config)
    }

    /// Attach as a reader to an existing store
    pub fn open_reader(path: impl AsRef<Path>, key_capacity: u32, value_size_bound: u32) -> Result<Self> {
        Self::init(StoreConfig::reader(path.as_ref(), key_capacity, value_size_bound))
    }

    fn attach_writer(region: &mut SharedRegion, layout: Layout, init_header: bool) -> Result<Layout> {
        let blank = !Header::require(region)?.is_initialized();

        if init_header || blank {
            if blank && !init_header {
                tracing::info!("Blank region at {}, initializing header", region.path().display());
            }

            // Zero both item buffers before the magic makes the header visible.
            let items = layout.item_buffer(BufferSide::A);
            let len = 2 * layout.item_max() as usize * RECORD_SIZE;
            region.bytes_mut(items, len)?.fill(0);

            Header::require(region)?.initialize(&layout);
            return Ok(layout);
        }

        let header = Header::require(region)?;
        header.verify()?;

        let (item_max, key_max, value_max) = header.capacities();
        if (item_max, key_max, value_max) != (layout.item_max(), layout.key_max(), layout.value_max()) {
            return Err(StoreError::Config(format!(
                "writer parameters (items={}, keys={}, values={}) differ from stored (items={}, keys={}, values={})",
                layout.item_max(),
                layout.key_max(),
                layout.value_max(),
                item_max,
                key_max,
                value_max
            )));
        }
        Ok(layout)
    }

    fn attach_reader(region: &SharedRegion, requested: Layout) -> Result<Layout> {
        let header = Header::view(region)
            .filter(|header| header.is_initialized())
            .ok_or_else(|| StoreError::NotInitialized(region.path().to_path_buf()))?;
        header.verify()?;

        let (item_max, key_max, value_max) = header.capacities();
        let stored = Layout::from_capacities(item_max, key_max, value_max)?;

        if stored != requested {
            tracing::warn!(
                "Reader of {} asked for {} keys but the store holds {}, using stored capacities",
                region.path().display(),
                requested.item_max(),
                item_max
            );
        }

        if stored.total_size() > region.len() {
            return Err(StoreError::Corrupted(format!(
                "region of {} bytes is smaller than its layout ({} bytes)",
                region.len(),
                stored.total_size()
            )));
        }
        Ok(stored)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Flush the writer's dirty pages to the backing file
    pub fn sync(&self) -> Result<()> {
        self.region.sync()
    }

    /// Sync and detach
    pub fn close(self) -> Result<()> {
        self.region.detach()
    }

    /// Delete a store's backing file. Attached handles keep their mapping.
    pub fn remove(path: impl AsRef<Path>) -> Result<bool> {
        SharedRegion::remove(path)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn path(&self) -> &Path {
        self.region.path()
    }

    pub fn mode(&self) -> AccessMode {
        self.region.mode()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of keys in the published index
    pub fn len(&self) -> Result<usize> {
        let header = Header::require(&self.region)?;
        let selection = header.selection()?;
        Ok(header.item_used(selection.item).min(self.layout.item_max()) as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn ensure_writable(&self) -> Result<()> {
        match self.region.mode() {
            AccessMode::Write => Ok(()),
            AccessMode::Read => Err(StoreError::ReadOnly),
        }
    }
}
