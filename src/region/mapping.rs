//! Shared region mapping
//!
//! Owns the `memmap2` mapping of the backing file.

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU32;

use memmap2::{Mmap, MmapMut};

use crate::config::AccessMode;
use crate::error::{Result, StoreError};

use super::{RegionOffset, MAX_REGION_SIZE};

/// The mapped backing file.
///
/// The writer maps it read-write and shared, readers map it read-only and
/// shared, so every attached process observes the writer's stores. Dropping
/// the region syncs (writer only) and unmaps it.
pub struct SharedRegion {
    /// Backing file path
    path: PathBuf,
    /// Writer or reader mapping
    map: Mapping,
    /// Set once `detach` has synced, so `Drop` does not sync again
    detached: bool,
}

enum Mapping {
    ReadWrite(MmapMut),
    ReadOnly(Mmap),
}

impl SharedRegion {
    /// Create or attach the backing file and map it.
    ///
    /// Write mode:
    /// 1. Open the file, creating it if missing
    /// 2. Grow a zero-length file to exactly `size`
    /// 3. Reject an existing file of any other size
    ///
    /// Read mode never creates or resizes. A size different from `size` is
    /// tolerated (the actual size is mapped) so readers may attach with
    /// approximate parameters; an empty or missing file is not initialized.
    pub fn create_or_attach(path: impl AsRef<Path>, size: usize, mode: AccessMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if size > MAX_REGION_SIZE {
            return Err(StoreError::Capacity(format!(
                "region size {} exceeds {}",
                size, MAX_REGION_SIZE
            )));
        }

        let map = match mode {
            AccessMode::Write => Mapping::ReadWrite(Self::map_writer(&path, size)?),
            AccessMode::Read => Mapping::ReadOnly(Self::map_reader(&path, size)?),
        };

        let region = Self {
            path,
            map,
            detached: false,
        };
        tracing::info!(
            "Region {} attached ({} bytes, {:?})",
            region.path.display(),
            region.len(),
            mode
        );
        Ok(region)
    }

    fn map_writer(path: &Path, size: usize) -> Result<MmapMut> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let actual = file.metadata()?.len();
        if actual == 0 {
            file.set_len(size as u64)?;
            tracing::debug!("Sized new backing file {} to {} bytes", path.display(), size);
        } else if actual != size as u64 {
            return Err(StoreError::SizeMismatch {
                path: path.to_path_buf(),
                expected: size as u64,
                actual,
            });
        }

        // Safety: the file stays sized for the lifetime of the mapping; other
        // processes touch it only through the store protocol, which never
        // truncates an attached file.
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(map)
    }

    fn map_reader(path: &Path, size: usize) -> Result<Mmap> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotInitialized(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let actual = file.metadata()?.len();
        if actual == 0 {
            return Err(StoreError::NotInitialized(path.to_path_buf()));
        }
        if actual != size as u64 {
            tracing::warn!(
                "Reader of {} asked for {} bytes but the file has {}, mapping actual size",
                path.display(),
                size,
                actual
            );
        }

        // Safety: see `map_writer`; readers never write through this mapping.
        let map = unsafe { Mmap::map(&file)? };
        Ok(map)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> AccessMode {
        match self.map {
            Mapping::ReadWrite(_) => AccessMode::Write,
            Mapping::ReadOnly(_) => AccessMode::Read,
        }
    }

    /// Mapped size in bytes
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Base address of the local mapping. Only valid in this process.
    pub fn as_ptr(&self) -> *const u8 {
        self.as_slice().as_ptr()
    }

    fn as_slice(&self) -> &[u8] {
        match &self.map {
            Mapping::ReadWrite(map) => map,
            Mapping::ReadOnly(map) => map,
        }
    }

    /// Bytes `[offset, offset + len)`, or `None` if outside the mapping
    pub fn bytes(&self, offset: RegionOffset, len: usize) -> Option<&[u8]> {
        let end = offset.get().checked_add(len)?;
        self.as_slice().get(offset.get()..end)
    }

    /// Mutable bytes `[offset, offset + len)`. Writer only.
    pub fn bytes_mut(&mut self, offset: RegionOffset, len: usize) -> Result<&mut [u8]> {
        let map = match &mut self.map {
            Mapping::ReadWrite(map) => map,
            Mapping::ReadOnly(_) => return Err(StoreError::ReadOnly),
        };

        let end = offset
            .get()
            .checked_add(len)
            .filter(|&end| end <= map.len())
            .ok_or_else(|| {
                StoreError::Corrupted(format!("write of {} bytes at {} out of bounds", len, offset))
            })?;
        Ok(&mut map[offset.get()..end])
    }

    /// Copy `len` bytes from `src` to `dst` inside the region. Writer only.
    pub fn copy_within(&mut self, src: RegionOffset, dst: RegionOffset, len: usize) -> Result<()> {
        let map = match &mut self.map {
            Mapping::ReadWrite(map) => map,
            Mapping::ReadOnly(_) => return Err(StoreError::ReadOnly),
        };

        let in_bounds = |start: RegionOffset| {
            start
                .get()
                .checked_add(len)
                .map_or(false, |end| end <= map.len())
        };
        if !in_bounds(src) || !in_bounds(dst) {
            return Err(StoreError::Corrupted(format!(
                "copy of {} bytes from {} to {} out of bounds",
                len, src, dst
            )));
        }

        map.copy_within(src.get()..src.get() + len, dst.get());
        Ok(())
    }

    /// View `count` 32-bit words at `offset` as atomics.
    ///
    /// Returns `None` when the range leaves the mapping or `offset` is not
    /// 4-byte aligned. On a read-only mapping only loads are permitted.
    pub(crate) fn words(&self, offset: RegionOffset, count: usize) -> Option<&[AtomicU32]> {
        let len = count.checked_mul(4)?;
        let bytes = self.bytes(offset, len)?;
        if bytes.as_ptr() as usize % std::mem::align_of::<AtomicU32>() != 0 {
            return None;
        }

        // Safety: in bounds and aligned (checked above); `AtomicU32` has the
        // layout of `u32` and every bit pattern is valid. Shared memory is
        // only ever accessed through atomics at these offsets.
        Some(unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const AtomicU32, count) })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Flush dirty pages to the backing file. No-op for readers.
    pub fn sync(&self) -> Result<()> {
        if let Mapping::ReadWrite(map) = &self.map {
            map.flush()?;
        }
        Ok(())
    }

    /// Sync and unmap, reporting a failed sync instead of only logging it
    pub fn detach(mut self) -> Result<()> {
        self.sync()?;
        self.detached = true;
        Ok(())
    }

    /// Remove a backing file. A missing file is not an error.
    pub fn remove(path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!("Removed backing file {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        if !self.detached {
            if let Err(e) = self.sync() {
                tracing::warn!("Failed to sync region {} on drop: {}", self.path.display(), e);
            }
        }
        tracing::debug!("Region {} detached", self.path.display());
    }
}
