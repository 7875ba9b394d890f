//! Shared Store Module
//!
//! A [`Store`] handle behind a mutex, for threads of one process that want to
//! share a single attachment instead of each opening their own.
//!
//! Values come back as owned [`Bytes`] because a borrowed view cannot outlive
//! the lock guard.

use bytes::Bytes;
use parking_lot::Mutex;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::store::Store;

/// Thread-safe wrapper around a [`Store`]
pub struct SharedStore {
    inner: Mutex<Store>,
}

impl SharedStore {
    pub fn new(store: Store) -> Self {
        Self {
            inner: Mutex::new(store),
        }
    }

    /// Attach with `config` and wrap the handle
    pub fn init(config: StoreConfig) -> Result<Self> {
        Store::init(config).map(Self::new)
    }

    pub fn get(&self, key: &[u8]) -> Result<Bytes> {
        let mut store = self.inner.lock();
        let value = store.get(key)?;
        Ok(value.to_bytes())
    }

    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.lock().set(key, value)
    }

    pub fn del(&self, key: &[u8]) -> Result<()> {
        self.inner.lock().del(key)
    }

    pub fn list_keys(&self) -> Result<Vec<Bytes>> {
        self.inner.lock().list_keys()
    }

    /// Run `f` with exclusive access to the underlying handle
    pub fn with<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn into_inner(self) -> Store {
        self.inner.into_inner()
    }
}

impl From<Store> for SharedStore {
    fn from(store: Store) -> Self {
        Self::new(store)
    }
}
