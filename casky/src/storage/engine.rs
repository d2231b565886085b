use crate::error::Result;
use crate::storage::stats::Stats;

/// The common interface over the two engine flavours: the lockless
/// single-threaded [`Cask`](super::cask::Cask) and the mutex-guarded
/// [`SharedCask`](super::shared::SharedCask). The on-disk format is the same
/// for both; only the runtime discipline differs. Code that serves a store
/// (like the daemon) is written against this trait and picks a flavour at
/// build time.
///
/// Every operation is a synchronous, blocking call that runs to completion
/// or fails; there are no timeouts and no cancellation.
pub trait Engine {
    /// Stores a key/value pair. `ttl` is in seconds from now; 0 means the
    /// entry never expires.
    fn put(&mut self, key: &[u8], value: &[u8], ttl: u64) -> Result<()>;

    /// Returns an owned copy of the value for `key`, or `None` when absent
    /// or expired.
    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Deletes `key`, reporting whether it was present.
    fn delete(&mut self, key: &[u8]) -> Result<bool>;

    /// Rewrites the log to contain only live entries.
    fn compact(&mut self) -> Result<()>;

    /// Drops every expired entry from memory, returning the count.
    fn expire(&mut self) -> usize;

    /// A snapshot of the usage counters.
    fn stats(&self) -> Stats;

    /// Flushes the user-space side of the log (no fsync).
    fn flush(&mut self) -> Result<()>;
}

impl Engine for super::cask::Cask {
    fn put(&mut self, key: &[u8], value: &[u8], ttl: u64) -> Result<()> {
        Self::put(self, key, value, ttl)
    }

    fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Self::get(self, key)
    }

    fn delete(&mut self, key: &[u8]) -> Result<bool> {
        Self::delete(self, key)
    }

    fn compact(&mut self) -> Result<()> {
        Self::compact(self)
    }

    fn expire(&mut self) -> usize {
        Self::expire(self)
    }

    fn stats(&self) -> Stats {
        Self::stats(self)
    }

    fn flush(&mut self) -> Result<()> {
        Self::flush(self)
    }
}
