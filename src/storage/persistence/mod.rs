//! Flat-file store implementations.

mod directory;
mod log;

pub use directory::{DirectoryStore, DirectoryStoreBuilder, ExistsFn, KeyFn};
pub use log::{LogStore, LogStoreBuilder};
