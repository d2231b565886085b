pub mod cask;
pub mod engine;
pub mod keydir;
pub mod log;
pub mod record;
pub mod shared;
pub mod stats;
