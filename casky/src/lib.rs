//! `casky` is a Bitcask-style log-structured key-value store: every write is
//! appended to a single on-disk log file, and an in-memory index (the keydir)
//! maps each live key to its current entry. All live keys and values must fit
//! in memory. Deletes append a tombstone record, and the log can be compacted
//! into a fresh file containing only live data, dropping replaced values and
//! tombstones.
//!
//! The store comes in two flavours sharing one interface: [`storage::cask::Cask`]
//! for single-threaded embedding (exclusivity enforced by `&mut self`) and
//! [`storage::shared::SharedCask`] for sharing one engine across threads behind
//! a mutex.
//!
//! ## Getting started
//!
//! ```no_run
//! use casky::error::Result;
//! use casky::storage::cask::Cask;
//!
//! fn main() -> Result<()> {
//!     let mut cask = Cask::open("storage/caskydb")?;
//!
//!     cask.put(b"foo", b"bar", 0)?;
//!     assert_eq!(cask.get(b"foo")?, Some(b"bar".to_vec()));
//!
//!     // A value that expires 60 seconds from now.
//!     cask.put(b"session", b"token", 60)?;
//!
//!     cask.delete(b"foo")?;
//!     assert_eq!(cask.get(b"foo")?, None);
//!
//!     cask.compact()?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod storage;

/// The library version, as announced by the daemon banner.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
