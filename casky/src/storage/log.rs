use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use fs4::FileExt;

use crate::error::{Error, Result};
use crate::storage::keydir::Keydir;
use crate::storage::record::Record;
use crate::storage::stats::Stats;

/// The single append-only log file that is the authoritative on-disk state.
///
/// The log owns the live append handle and the durability policy. An
/// exclusive advisory lock is held on the handle for the life of the log, so
/// two processes (or two engines in one process) can never write the same
/// file.
pub struct Log {
    pub(crate) path: PathBuf,
    /// The live append handle, exclusively locked.
    file: File,
    /// When set, every append and compaction fsyncs before returning. Off by
    /// default: flushes stay in the OS cache, favouring throughput.
    sync_on_write: bool,
}

impl Log {
    /// Opens the log file at `path`, creating it (and its parent directory)
    /// if missing, and takes the exclusive lock.
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|err| Error::InvalidPath(format!("{}: {}", path.display(), err)))?;
        file.try_lock_exclusive()?;

        Ok(Log { path, file, sync_on_write: false })
    }

    pub fn set_sync_on_write(&mut self, sync_on_write: bool) {
        self.sync_on_write = sync_on_write;
    }

    /// Replays the log into the keydir from a fresh read handle.
    ///
    /// Each record is re-serialized and its CRC compared against the stored
    /// one. On the first mismatch the scan stops, everything accepted so far
    /// is kept, and `true` is returned: the file itself is left untouched,
    /// and a compaction will rewrite it from the surviving entries. PUT
    /// records that have already expired by `now` are dropped; tombstones
    /// replay as removals (a missing key is not an error).
    pub fn recover(&mut self, keydir: &mut Keydir, stats: &mut Stats, now: u64) -> Result<bool> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        loop {
            let record = match Record::read_from(&mut reader)? {
                Some(record) => record,
                None => return Ok(false),
            };
            if !record.crc_ok() {
                log::warn!(
                    "corrupt record in {}, abandoning the rest of the log",
                    self.path.display()
                );
                return Ok(true);
            }
            match record.value {
                Some(value) => {
                    if record.expiration == 0 || record.expiration > now {
                        keydir.set(&record.key, &value, record.timestamp, record.expiration, stats);
                    }
                }
                None => {
                    keydir.remove(&record.key, stats);
                }
            }
        }
    }

    /// Appends one record in a single write, fsyncing when `sync_on_write`
    /// is set.
    pub fn append(&mut self, record: &Record) -> Result<()> {
        self.file.write_all(&record.to_bytes())?;
        if self.sync_on_write {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Flushes the user-space side of the append handle. Deliberately not an
    /// fsync: buffered writes may still be lost on power failure unless
    /// `sync_on_write` is enabled.
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.file.flush()?)
    }

    /// Rewrites the log to contain exactly one PUT record per live entry and
    /// no tombstones, then atomically replaces the original file.
    ///
    /// The rewrite goes to a uniquely named `<logfile>.XXXXXX` temporary in
    /// the same directory; on any failure the temporary is removed and the
    /// original log is untouched. On success the new file is renamed over
    /// the original and reopened (and relocked) as the live append handle.
    pub fn compact(&mut self, keydir: &Keydir) -> Result<()> {
        let directory = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let prefix = match self.path.file_name() {
            Some(name) => format!("{}.", name.to_string_lossy()),
            None => return Err(Error::InvalidPath(format!("{}", self.path.display()))),
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .rand_bytes(6)
            .tempfile_in(directory)?;

        for entry in keydir.entries() {
            let record = Record::put(&entry.key, &entry.value, entry.timestamp, entry.expiration);
            tmp.as_file_mut().write_all(&record.to_bytes())?;
        }
        tmp.as_file_mut().flush()?;
        if self.sync_on_write {
            tmp.as_file().sync_all()?;
        }

        // Atomic on POSIX filesystems. A failed persist hands the temporary
        // back, and dropping it deletes the file.
        tmp.persist(&self.path).map_err(|err| Error::Io(err.to_string()))?;

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| Error::Io(format!("{}: {}", self.path.display(), err)))?;
        file.try_lock_exclusive()?;
        self.file = file;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_in(dir: &tempdir::TempDir) -> Result<Log> {
        Log::open(dir.path().join("log"))
    }

    #[test]
    fn open_creates_file_and_parents() -> Result<()> {
        let dir = tempdir::TempDir::new("casky")?;
        let path = dir.path().join("nested").join("log");
        let log = Log::open(path.clone())?;
        assert!(path.is_file());
        drop(log);
        Ok(())
    }

    #[test]
    /// The exclusive lock keeps a second process (or a second engine in this
    /// one) off the file until the first is dropped.
    fn lock_is_exclusive() -> Result<()> {
        let dir = tempdir::TempDir::new("casky")?;
        let log = open_in(&dir)?;
        assert!(open_in(&dir).is_err());
        drop(log);
        assert!(open_in(&dir).is_ok());
        Ok(())
    }

    #[test]
    fn recover_replays_puts_and_tombstones() -> Result<()> {
        let dir = tempdir::TempDir::new("casky")?;
        let mut log = open_in(&dir)?;
        log.append(&Record::put(b"a", b"1", 10, 0))?;
        log.append(&Record::put(b"b", b"2", 11, 0))?;
        log.append(&Record::put(b"a", b"one", 12, 0))?;
        log.append(&Record::tombstone(b"b", 13))?;
        log.append(&Record::tombstone(b"ghost", 14))?; // absent key, not an error

        let mut keydir = Keydir::new();
        let mut stats = Stats::default();
        assert!(!log.recover(&mut keydir, &mut stats, 100)?);

        assert_eq!(keydir.len(), 1);
        assert_eq!(keydir.get(b"a", 100, &mut stats), Some(b"one".to_vec()));
        assert_eq!(keydir.get(b"b", 100, &mut stats), None);
        Ok(())
    }

    #[test]
    /// Records that expired while the store was closed never reach memory.
    fn recover_drops_expired_records() -> Result<()> {
        let dir = tempdir::TempDir::new("casky")?;
        let mut log = open_in(&dir)?;
        log.append(&Record::put(b"gone", b"v", 10, 50))?;
        log.append(&Record::put(b"alive", b"v", 10, 500))?;
        log.append(&Record::put(b"pinned", b"v", 10, 0))?;

        let mut keydir = Keydir::new();
        let mut stats = Stats::default();
        assert!(!log.recover(&mut keydir, &mut stats, 100)?);

        assert_eq!(keydir.len(), 2);
        assert_eq!(keydir.get(b"gone", 100, &mut stats), None);
        assert_eq!(keydir.get(b"alive", 100, &mut stats), Some(b"v".to_vec()));
        Ok(())
    }

    #[test]
    /// The scan stops at the first CRC mismatch: earlier records survive,
    /// later ones are abandoned, and the file is not modified.
    fn recover_stops_at_corruption() -> Result<()> {
        let dir = tempdir::TempDir::new("casky")?;
        let path = dir.path().join("log");
        let mut log = Log::open(path.clone())?;
        log.append(&Record::put(b"first", b"1", 10, 0))?;
        log.append(&Record::put(b"second", b"2", 11, 0))?;
        log.append(&Record::put(b"third", b"3", 12, 0))?;
        let first_len = Record::put(b"first", b"1", 10, 0).to_bytes().len();
        let size = std::fs::metadata(&path)?.len();
        drop(log);

        // Flip a stored-CRC byte inside the second record.
        let mut bytes = std::fs::read(&path)?;
        bytes[first_len + 1] ^= 0x01;
        std::fs::write(&path, &bytes)?;

        let mut log = Log::open(path.clone())?;
        let mut keydir = Keydir::new();
        let mut stats = Stats::default();
        assert!(log.recover(&mut keydir, &mut stats, 100)?);

        assert_eq!(keydir.len(), 1);
        assert_eq!(keydir.get(b"first", 100, &mut stats), Some(b"1".to_vec()));
        assert_eq!(keydir.get(b"third", 100, &mut stats), None);
        // The log itself is untouched; compaction is what cleans it.
        assert_eq!(std::fs::metadata(&path)?.len(), size);
        Ok(())
    }

    #[test]
    /// A torn final record (partial write) reads as end of stream.
    fn recover_ignores_torn_tail() -> Result<()> {
        let dir = tempdir::TempDir::new("casky")?;
        let path = dir.path().join("log");
        let mut log = Log::open(path.clone())?;
        log.append(&Record::put(b"whole", b"1", 10, 0))?;
        log.append(&Record::put(b"torn", b"2", 11, 0))?;
        let size = std::fs::metadata(&path)?.len();
        drop(log);

        let file = OpenOptions::new().write(true).open(&path)?;
        file.set_len(size - 3)?;
        drop(file);

        let mut log = Log::open(path)?;
        let mut keydir = Keydir::new();
        let mut stats = Stats::default();
        assert!(!log.recover(&mut keydir, &mut stats, 100)?);
        assert_eq!(keydir.len(), 1);
        assert_eq!(keydir.get(b"whole", 100, &mut stats), Some(b"1".to_vec()));
        Ok(())
    }
}
