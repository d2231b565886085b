//! The operational surface of casky: `caskyd`, a line-protocol TCP daemon
//! over one store, and `casky-logdump`, an inspection tool that prints every
//! record in a log file.
//!
//! The daemon speaks a whitespace-separated, case-insensitive protocol, one
//! command per line: `PUT <key> <value>`, `GET <key>`, `DEL <key>`,
//! `COMPACT`, `STATS`, `VER` and `QUIT`. With the `thread-safe` feature
//! (default) clients are served concurrently over a
//! [`SharedCask`](casky::storage::shared::SharedCask); without it the build
//! is paper-compatible: a lockless [`Cask`](casky::storage::cask::Cask),
//! one client at a time, and COMPACT rejected.

pub mod server;
pub mod session;
pub mod trace;
