use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::storage::cask::Cask;
use crate::storage::engine::Engine;
use crate::storage::stats::Stats;

/// The thread-safe engine: a [`Cask`] behind one non-reentrant mutex.
///
/// Clones share the same store. The lock is taken at the entry of every
/// operation and released at every exit, error paths included, and always
/// before an owned value is handed back to the caller. Compaction holds it
/// for its whole duration, so no reader ever observes a half-compacted
/// store. The stats collector lives inside the cask, so counter updates
/// happen under the same lock — there is no second lock to order against.
#[derive(Clone)]
pub struct SharedCask {
    inner: Arc<Mutex<Cask>>,
}

impl SharedCask {
    /// Opens the store at `path`; see [`Cask::open`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(SharedCask { inner: Arc::new(Mutex::new(Cask::open(path)?)) })
    }

    /// A panicking client must not brick the store for everyone else, so a
    /// poisoned lock is re-entered: the cask's state is consistent between
    /// operations, and a panic mid-operation aborts only that operation's
    /// append ordering, which the availability-first write path tolerates.
    fn lock(&self) -> MutexGuard<'_, Cask> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A snapshot of the usage counters.
    pub fn stats(&self) -> Stats {
        self.lock().stats()
    }

    /// Live keys in the store.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether recovery stopped at a corrupt record.
    pub fn corrupted(&self) -> bool {
        self.lock().corrupted()
    }

    /// When enabled, every append and compaction fsyncs before returning.
    pub fn set_sync_on_write(&mut self, sync_on_write: bool) {
        self.lock().set_sync_on_write(sync_on_write);
    }
}

impl Engine for SharedCask {
    fn put(&mut self, key: &[u8], value: &[u8], ttl: u64) -> Result<()> {
        self.lock().put(key, value, ttl)
    }

    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.lock().get(key)
    }

    fn delete(&mut self, key: &[u8]) -> Result<bool> {
        self.lock().delete(key)
    }

    fn compact(&mut self) -> Result<()> {
        self.lock().compact()
    }

    fn expire(&mut self) -> usize {
        self.lock().expire()
    }

    fn stats(&self) -> Stats {
        SharedCask::stats(self)
    }

    fn flush(&mut self) -> Result<()> {
        self.lock().flush()
    }
}
