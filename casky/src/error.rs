//! A universal error type for the store, plus the closed set of wire-level
//! error codes spoken by the daemon and `strerror`-style helpers.

use serde_derive::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// The log path was empty or could not be opened as a file.
    InvalidPath(String),
    /// Reading or writing the log failed.
    Io(String),
    /// Recovery met a record whose stored CRC disagrees with its contents.
    Corrupt(String),
    /// An empty key or value, or one whose length does not fit the record
    /// header.
    InvalidKey(String),
}

impl Error {
    /// The wire-level code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidPath(_) => ErrorCode::InvalidPath,
            Self::Io(_) => ErrorCode::Io,
            Self::Corrupt(_) => ErrorCode::Corrupt,
            Self::InvalidKey(_) => ErrorCode::InvalidKey,
        }
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath(s) | Self::Io(s) | Self::Corrupt(s) | Self::InvalidKey(s) => {
                write!(f, "{}", s)
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// The closed enumeration of error codes. The library reports errors through
/// [`Result`] values; this set exists for the protocol surface and for
/// embedders that want `errno`-style codes. `InvalidPointer`, `Memory` and
/// `KeyNotFound` are never produced by the Rust API itself (absence travels
/// as `Option`/`bool`), but remain part of the vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Ok,
    InvalidPath,
    InvalidPointer,
    Io,
    Memory,
    Corrupt,
    InvalidKey,
    KeyNotFound,
}

impl ErrorCode {
    /// The short token used in `ERROR <code>` protocol replies.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::InvalidPath => "invalid-path",
            Self::InvalidPointer => "invalid-pointer",
            Self::Io => "io",
            Self::Memory => "memory",
            Self::Corrupt => "corrupt",
            Self::InvalidKey => "invalid-key",
            Self::KeyNotFound => "key-not-found",
        }
    }

    /// A human-readable description, suitable for logging or display.
    pub fn strerror(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::InvalidPath => "Invalid path",
            Self::InvalidPointer => "Invalid pointer",
            Self::Io => "I/O error",
            Self::Memory => "Out of memory",
            Self::Corrupt => "Data corrupt",
            Self::InvalidKey => "Invalid key",
            Self::KeyNotFound => "Key not found",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
