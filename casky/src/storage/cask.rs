use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::storage::keydir::Keydir;
use crate::storage::log::Log;
use crate::storage::record::Record;
use crate::storage::stats::Stats;

/// The single-threaded engine: a keydir over one append-only log file.
///
/// Exclusivity is `&mut self` — there is no lock to take, which keeps the
/// write path as short as the format allows. Share one store across threads
/// with [`super::shared::SharedCask`] instead; the on-disk format is
/// identical.
///
/// Every mutation hits memory first and the log second. A failed append
/// surfaces as an I/O error but the in-memory update stays: the store
/// prefers staying available over strict durability, and the log catches up
/// at the next compaction.
pub struct Cask {
    keydir: Keydir,
    log: Log,
    stats: Stats,
    corrupted: bool,
}

fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

fn check_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidKey("empty key".into()));
    }
    if key.len() > u32::MAX as usize {
        return Err(Error::InvalidKey(format!("key of {} bytes does not fit a record", key.len())));
    }
    Ok(())
}

fn check_value(value: &[u8]) -> Result<()> {
    if value.is_empty() {
        // An empty value on disk is a tombstone; deletes are the only way to
        // write one.
        return Err(Error::InvalidKey("empty value".into()));
    }
    if value.len() > u32::MAX as usize {
        return Err(Error::InvalidKey(format!(
            "value of {} bytes does not fit a record",
            value.len()
        )));
    }
    Ok(())
}

impl Cask {
    /// Opens the store at `path`, creating the log file if missing and
    /// replaying it into a fresh 1024-bucket keydir.
    ///
    /// Opening succeeds even when recovery meets a corrupt record: the scan
    /// stops there, the entries accepted so far stay usable, and
    /// [`corrupted`](Self::corrupted) reports the damage. Compacting rewrites
    /// the log from the surviving entries.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidPath("empty log path".into()));
        }

        let mut log = Log::open(path)?;
        let mut keydir = Keydir::new();
        let mut stats = Stats::default();
        let corrupted = log.recover(&mut keydir, &mut stats, now())?;

        Ok(Cask { keydir, log, stats, corrupted })
    }

    /// Stores a key/value pair. `ttl` is in seconds from now; 0 means the
    /// entry never expires.
    pub fn put(&mut self, key: &[u8], value: &[u8], ttl: u64) -> Result<()> {
        check_key(key)?;
        check_value(value)?;

        let timestamp = now();
        let expiration = if ttl > 0 { timestamp.saturating_add(ttl) } else { 0 };

        self.keydir.set(key, value, timestamp, expiration, &mut self.stats);
        self.log.append(&Record::put(key, value, timestamp, expiration))
    }

    /// Returns an owned copy of the value for `key`, or `None` when the key
    /// is absent or its entry has expired (expired entries are unlinked on
    /// the way out).
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        check_key(key)?;
        Ok(self.keydir.get(key, now(), &mut self.stats))
    }

    /// Deletes `key`, appending a tombstone. Returns false (and writes
    /// nothing) when the key was absent.
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        check_key(key)?;
        if !self.keydir.remove(key, &mut self.stats) {
            return Ok(false);
        }
        self.log.append(&Record::tombstone(key, now()))?;
        Ok(true)
    }

    /// Rewrites the log to exactly one PUT per live entry, dropping
    /// superseded writes and tombstones. The engine is unavailable for the
    /// duration; on failure the original log is untouched.
    pub fn compact(&mut self) -> Result<()> {
        self.log.compact(&self.keydir)
    }

    /// Removes every expired entry from memory, returning how many were
    /// dropped. Nothing is written to the log: the stale records are
    /// harmless and vanish at the next compaction.
    pub fn expire(&mut self) -> usize {
        self.keydir.sweep(now(), &mut self.stats)
    }

    /// A snapshot of the usage counters.
    pub fn stats(&self) -> Stats {
        self.stats.clone()
    }

    /// Live keys in the store.
    pub fn len(&self) -> usize {
        self.keydir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keydir.is_empty()
    }

    /// Whether recovery stopped at a corrupt record. The store still serves
    /// everything loaded before the damage; compact to rewrite a clean log.
    pub fn corrupted(&self) -> bool {
        self.corrupted
    }

    /// Flushes the user-space side of the log. Not an fsync: enable
    /// [`set_sync_on_write`](Self::set_sync_on_write) when buffered writes
    /// must survive power loss.
    pub fn flush(&mut self) -> Result<()> {
        self.log.flush()
    }

    /// When enabled, every append and compaction fsyncs before returning.
    pub fn set_sync_on_write(&mut self, sync_on_write: bool) {
        self.log.set_sync_on_write(sync_on_write);
    }

    pub fn path(&self) -> &Path {
        &self.log.path
    }
}

/// Attempt to flush the log when the store is closed. Deliberately no fsync
/// here; see [`Cask::flush`].
impl Drop for Cask {
    fn drop(&mut self) {
        if let Err(error) = self.flush() {
            log::error!("failed to flush {}: {}", self.path().display(), error);
        }
    }
}
