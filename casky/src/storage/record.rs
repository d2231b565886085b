use std::io::{BufRead, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::Result;

/// A single log record. The on-disk framing, with every integer
/// little-endian, is:
///
/// - `crc32` as u32, covering everything after itself.
/// - `timestamp` as u64 (seconds since the epoch).
/// - `expiration` as u64 (absolute second, 0 for "never").
/// - `key_len` as u32.
/// - `value_len` as u32, 0 for tombstones.
/// - Key as raw bytes, exactly `key_len`.
/// - Value as raw bytes, exactly `value_len` (absent for tombstones).
///
/// Records are concatenated with no file header, footer, or index.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// The stored checksum. Equal to `checksum()` for intact records.
    pub crc: u32,
    pub timestamp: u64,
    pub expiration: u64,
    pub key: Vec<u8>,
    /// None encodes a tombstone (`value_len == 0`, no value bytes).
    pub value: Option<Vec<u8>>,
}

/// Fixed byte size of the record header (fields before the key).
pub const HEADER_LEN: usize = 4 + 8 + 8 + 4 + 4;

impl Record {
    /// Builds a PUT record with a valid checksum.
    pub fn put(key: &[u8], value: &[u8], timestamp: u64, expiration: u64) -> Self {
        let mut record = Record {
            crc: 0,
            timestamp,
            expiration,
            key: key.to_vec(),
            value: Some(value.to_vec()),
        };
        record.crc = record.checksum();
        record
    }

    /// Builds a tombstone record for a deleted key.
    pub fn tombstone(key: &[u8], timestamp: u64) -> Self {
        let mut record =
            Record { crc: 0, timestamp, expiration: 0, key: key.to_vec(), value: None };
        record.crc = record.checksum();
        record
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    fn value_len(&self) -> u32 {
        self.value.as_ref().map_or(0, |v| v.len() as u32)
    }

    /// Serializes every field after the CRC, in on-disk order. This is the
    /// buffer the checksum is computed over, both when writing and when
    /// re-verifying during recovery.
    fn payload(&self) -> Vec<u8> {
        let value_len = self.value_len();
        let mut buf =
            Vec::with_capacity(HEADER_LEN - 4 + self.key.len() + value_len as usize);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.expiration.to_le_bytes());
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&value_len.to_le_bytes());
        buf.extend_from_slice(&self.key);
        if let Some(value) = &self.value {
            buf.extend_from_slice(value);
        }
        buf
    }

    /// The IEEE CRC-32 of the record's payload.
    pub fn checksum(&self) -> u32 {
        crc32fast::hash(&self.payload())
    }

    /// Whether the stored CRC matches the record's contents.
    pub fn crc_ok(&self) -> bool {
        self.crc == self.checksum()
    }

    /// The complete on-disk encoding of the record.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = self.payload();
        let mut buf = Vec::with_capacity(4 + payload.len());
        buf.extend_from_slice(&self.crc.to_le_bytes());
        buf.extend_from_slice(&payload);
        buf
    }

    /// Reads the next record from the stream. Decoding fails softly: a clean
    /// end of stream, or a stream that ends inside any field (a torn write),
    /// yields `None` and the partial bytes are discarded. The stored CRC is
    /// not verified here; callers compare `crc` against `checksum()`.
    pub fn read_from<R: BufRead>(r: &mut R) -> Result<Option<Record>> {
        let mut read = || -> std::io::Result<Record> {
            let crc = r.read_u32::<LittleEndian>()?;
            let timestamp = r.read_u64::<LittleEndian>()?;
            let expiration = r.read_u64::<LittleEndian>()?;
            let key_len = r.read_u32::<LittleEndian>()?;
            let value_len = r.read_u32::<LittleEndian>()?;

            // Sized through take() so a garbage length in a torn header can
            // never make us allocate past the end of the file.
            let mut key = Vec::new();
            if r.by_ref().take(key_len as u64).read_to_end(&mut key)? < key_len as usize {
                return Err(std::io::ErrorKind::UnexpectedEof.into());
            }

            let value = if value_len > 0 {
                let mut value = Vec::new();
                let read = r.by_ref().take(value_len as u64).read_to_end(&mut value)?;
                if read < value_len as usize {
                    return Err(std::io::ErrorKind::UnexpectedEof.into());
                }
                Some(value)
            } else {
                None
            };

            Ok(Record { crc, timestamp, expiration, key, value })
        };

        match read() {
            Ok(record) => Ok(Some(record)),
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
