use serde_derive::{Deserialize, Serialize};

/// Usage counters for one engine. A fresh collector is attached to every
/// opened cask, and every mutation happens inside the engine's exclusion
/// (the mutex in the shared engine, `&mut self` in the single-threaded one),
/// so readers always observe a consistent snapshot.
///
/// `memory_bytes` is a running approximation, not allocator truth: it grows
/// by `key.len() + value.len()` on every put and shrinks by the same formula
/// when an entry is removed or expires, never going below zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Live keys in the keydir.
    pub total_keys: u64,
    /// Approximate bytes of key/value data held in memory.
    pub memory_bytes: u64,
    /// Puts applied, including records replayed during recovery.
    pub num_puts: u64,
    /// Gets served, hits and misses alike.
    pub num_gets: u64,
    /// Entries removed from memory: deletes, replayed tombstones, and
    /// expirations.
    pub num_deletes: u64,
}

impl Stats {
    pub(crate) fn on_put(&mut self, bytes: usize) {
        self.num_puts += 1;
        self.memory_bytes += bytes as u64;
    }

    pub(crate) fn on_insert(&mut self) {
        self.total_keys += 1;
    }

    pub(crate) fn on_get(&mut self) {
        self.num_gets += 1;
    }

    pub(crate) fn on_remove(&mut self, bytes: usize) {
        self.num_deletes += 1;
        self.total_keys = self.total_keys.saturating_sub(1);
        self.memory_bytes = self.memory_bytes.saturating_sub(bytes as u64);
    }
}
