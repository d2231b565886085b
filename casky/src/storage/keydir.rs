use crate::storage::stats::Stats;

/// Buckets in the in-memory index. Fixed for the life of a keydir; nothing
/// on disk depends on it.
pub const NUM_BUCKETS: usize = 1024;

/// A live key/value pair held in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Seconds since the epoch when the entry was written.
    pub timestamp: u64,
    /// Absolute second at which the entry becomes absent; 0 means never.
    pub expiration: u64,
}

impl Entry {
    fn expired(&self, now: u64) -> bool {
        self.expiration > 0 && self.expiration <= now
    }
}

struct EntryNode {
    entry: Entry,
    next: Option<Box<EntryNode>>,
}

/// The in-memory index: a fixed array of collision chains selected by a djb2
/// hash of the key. Each node owns its key and value; the keydir owns the
/// nodes; dropping the keydir is the only teardown needed.
///
/// Operations here are index-only: nothing is written to the log, and no
/// locking happens at this level. The engine facade provides both. Stats
/// hooks are threaded through so counters stay consistent with the chains.
pub struct Keydir {
    buckets: Vec<Option<Box<EntryNode>>>,
    num_entries: usize,
}

/// djb2 hash, XOR variant: `h = h * 33 ^ byte` from 5381. Used only for
/// bucket selection, and reproduced exactly so bucket membership is stable
/// across rebuilds of a running keydir.
fn djb2_xor(key: &[u8]) -> u64 {
    let mut hash: u64 = 5381;
    for &b in key {
        hash = hash.wrapping_mul(33) ^ b as u64;
    }
    hash
}

impl Keydir {
    pub fn new() -> Self {
        Self::with_buckets(NUM_BUCKETS)
    }

    fn with_buckets(num_buckets: usize) -> Self {
        let mut buckets = Vec::with_capacity(num_buckets);
        buckets.resize_with(num_buckets, || None);
        Keydir { buckets, num_entries: 0 }
    }

    /// Live entries in the index.
    pub fn len(&self) -> usize {
        self.num_entries
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    fn bucket(&self, key: &[u8]) -> usize {
        (djb2_xor(key) % self.buckets.len() as u64) as usize
    }

    /// Walks a chain to the link holding `key`, or to the empty link at the
    /// chain's tail when the key is absent.
    fn link_for<'a>(
        mut link: &'a mut Option<Box<EntryNode>>,
        key: &[u8],
    ) -> &'a mut Option<Box<EntryNode>> {
        while link.as_ref().map_or(false, |node| node.entry.key != key) {
            link = &mut link.as_mut().unwrap().next;
        }
        link
    }

    /// Inserts or replaces an entry. On a key match the value and timestamps
    /// are replaced in place and the entry count is unchanged; otherwise a
    /// new node is linked into the chain.
    pub fn set(
        &mut self,
        key: &[u8],
        value: &[u8],
        timestamp: u64,
        expiration: u64,
        stats: &mut Stats,
    ) {
        let index = self.bucket(key);
        stats.on_put(key.len() + value.len());
        let link = Self::link_for(&mut self.buckets[index], key);
        match link {
            Some(node) => {
                node.entry.value = value.to_vec();
                node.entry.timestamp = timestamp;
                node.entry.expiration = expiration;
            }
            None => {
                *link = Some(Box::new(EntryNode {
                    entry: Entry {
                        key: key.to_vec(),
                        value: value.to_vec(),
                        timestamp,
                        expiration,
                    },
                    next: None,
                }));
                self.num_entries += 1;
                stats.on_insert();
            }
        }
    }

    /// Unlinks the entry for `key`, reporting whether one was removed.
    pub fn remove(&mut self, key: &[u8], stats: &mut Stats) -> bool {
        let index = self.bucket(key);
        let link = Self::link_for(&mut self.buckets[index], key);
        match link.take() {
            Some(node) => {
                *link = node.next;
                self.num_entries -= 1;
                stats.on_remove(node.entry.key.len() + node.entry.value.len());
                true
            }
            None => false,
        }
    }

    /// Looks up `key` and returns a fresh owned copy of its value. An entry
    /// whose expiration has passed is unlinked on the way and reported
    /// absent.
    pub fn get(&mut self, key: &[u8], now: u64, stats: &mut Stats) -> Option<Vec<u8>> {
        stats.on_get();
        let index = self.bucket(key);
        let link = Self::link_for(&mut self.buckets[index], key);
        let expired = link.as_ref().map(|node| node.entry.expired(now))?;
        if expired {
            if let Some(node) = link.take() {
                *link = node.next;
                self.num_entries -= 1;
                stats.on_remove(node.entry.key.len() + node.entry.value.len());
            }
            return None;
        }
        link.as_ref().map(|node| node.entry.value.clone())
    }

    /// Unlinks every entry whose expiration has passed, returning how many
    /// were removed. Chains are relinked in place; nothing touches the log.
    pub fn sweep(&mut self, now: u64, stats: &mut Stats) -> usize {
        let mut removed = 0;
        for bucket in &mut self.buckets {
            let mut node = bucket.take();
            while let Some(mut boxed) = node {
                node = boxed.next.take();
                if boxed.entry.expired(now) {
                    removed += 1;
                    self.num_entries -= 1;
                    stats.on_remove(boxed.entry.key.len() + boxed.entry.value.len());
                } else {
                    boxed.next = bucket.take();
                    *bucket = Some(boxed);
                }
            }
        }
        removed
    }

    /// Iterates over every live entry, bucket by bucket. Order within a
    /// bucket is unspecified.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.buckets.iter().flat_map(|bucket| {
            std::iter::successors(bucket.as_deref(), |node| node.next.as_deref())
                .map(|node| &node.entry)
        })
    }
}

impl Default for Keydir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// The hash must stay bit-identical across rebuilds; these values pin
    /// the djb2 XOR variant.
    fn djb2_is_stable() {
        assert_eq!(djb2_xor(b""), 5381);
        assert_eq!(djb2_xor(b"a"), 177604);
        assert_eq!(djb2_xor(b"foo"), 193410979);
        assert_eq!(djb2_xor(b"bar"), 193415156);
        assert_eq!(djb2_xor(b"casky"), 210630151750);
    }

    #[test]
    fn set_get_remove() {
        let mut kd = Keydir::new();
        let mut stats = Stats::default();

        assert_eq!(kd.get(b"foo", 0, &mut stats), None);

        kd.set(b"foo", b"bar", 1, 0, &mut stats);
        assert_eq!(kd.len(), 1);
        assert_eq!(kd.get(b"foo", 0, &mut stats), Some(b"bar".to_vec()));

        // Replacing in place does not change the count.
        kd.set(b"foo", b"baz", 2, 0, &mut stats);
        assert_eq!(kd.len(), 1);
        assert_eq!(kd.get(b"foo", 0, &mut stats), Some(b"baz".to_vec()));

        kd.set(b"alice", b"bob", 3, 0, &mut stats);
        assert_eq!(kd.len(), 2);

        assert!(kd.remove(b"foo", &mut stats));
        assert!(!kd.remove(b"foo", &mut stats));
        assert_eq!(kd.len(), 1);
        assert_eq!(kd.get(b"foo", 0, &mut stats), None);
        assert_eq!(kd.get(b"alice", 0, &mut stats), Some(b"bob".to_vec()));
    }

    #[test]
    /// A single bucket forces every key onto one chain, exercising interior
    /// unlinks and the per-chain uniqueness of keys.
    fn collision_chain() {
        let mut kd = Keydir::with_buckets(1);
        let mut stats = Stats::default();

        for (key, value) in [(b"a", b"1"), (b"b", b"2"), (b"c", b"3")] {
            kd.set(key, value, 0, 0, &mut stats);
        }
        assert_eq!(kd.len(), 3);
        assert_eq!(kd.entries().count(), 3);

        // Replace the middle of the chain in place.
        kd.set(b"b", b"two", 1, 0, &mut stats);
        assert_eq!(kd.len(), 3);
        assert_eq!(kd.get(b"b", 0, &mut stats), Some(b"two".to_vec()));

        // Unlink from the middle, then the ends.
        assert!(kd.remove(b"b", &mut stats));
        assert_eq!(kd.len(), 2);
        assert_eq!(kd.get(b"a", 0, &mut stats), Some(b"1".to_vec()));
        assert_eq!(kd.get(b"c", 0, &mut stats), Some(b"3".to_vec()));
        assert!(kd.remove(b"a", &mut stats));
        assert!(kd.remove(b"c", &mut stats));
        assert!(kd.is_empty());
        assert_eq!(kd.entries().count(), 0);
    }

    #[test]
    /// The count always matches what a full walk of the buckets finds.
    fn count_matches_walk() {
        let mut kd = Keydir::with_buckets(4);
        let mut stats = Stats::default();

        for i in 0..100u32 {
            kd.set(format!("key{}", i).as_bytes(), b"v", 0, 0, &mut stats);
        }
        for i in 0..50u32 {
            kd.remove(format!("key{}", i * 2).as_bytes(), &mut stats);
        }
        assert_eq!(kd.len(), 50);
        assert_eq!(kd.entries().count(), kd.len());
    }

    #[test]
    fn passive_expiration_on_get() {
        let mut kd = Keydir::new();
        let mut stats = Stats::default();

        kd.set(b"session", b"token", 100, 160, &mut stats);
        assert_eq!(kd.get(b"session", 159, &mut stats), Some(b"token".to_vec()));
        // At the expiration second the entry is absent and gets unlinked.
        assert_eq!(kd.get(b"session", 160, &mut stats), None);
        assert_eq!(kd.len(), 0);
        // expiration == 0 never expires.
        kd.set(b"pinned", b"v", 100, 0, &mut stats);
        assert_eq!(kd.get(b"pinned", u64::MAX, &mut stats), Some(b"v".to_vec()));
    }

    #[test]
    fn sweep_removes_only_expired() {
        let mut kd = Keydir::with_buckets(2);
        let mut stats = Stats::default();

        kd.set(b"a", b"1", 100, 150, &mut stats);
        kd.set(b"b", b"2", 100, 0, &mut stats);
        kd.set(b"c", b"3", 100, 250, &mut stats);
        kd.set(b"d", b"4", 100, 120, &mut stats);

        assert_eq!(kd.sweep(200, &mut stats), 2);
        assert_eq!(kd.len(), 2);
        assert_eq!(kd.get(b"b", 200, &mut stats), Some(b"2".to_vec()));
        assert_eq!(kd.get(b"c", 200, &mut stats), Some(b"3".to_vec()));
        assert_eq!(kd.entries().count(), 2);

        // Sweeping again finds nothing new.
        assert_eq!(kd.sweep(200, &mut stats), 0);
    }

    #[test]
    fn stats_track_lifecycle() {
        let mut kd = Keydir::new();
        let mut stats = Stats::default();

        kd.set(b"foo", b"bar", 0, 0, &mut stats); // 6 bytes
        kd.set(b"foo", b"barbar", 0, 0, &mut stats); // +9 bytes, same key
        kd.set(b"alice", b"bob", 0, 0, &mut stats); // +8 bytes
        kd.get(b"foo", 0, &mut stats);
        kd.remove(b"foo", &mut stats); // -9 bytes

        assert_eq!(stats.num_puts, 3);
        assert_eq!(stats.num_gets, 1);
        assert_eq!(stats.num_deletes, 1);
        assert_eq!(stats.total_keys, 1);
        assert_eq!(stats.memory_bytes, 6 + 9 + 8 - 9);
    }
}
