//! Storage collaborators: file store, run statistics, keyword metadata

mod io;
mod metadata;
mod stats;
mod store;

pub use io::{atomic_write, write_lines_atomic};
pub use metadata::{KeywordRow, MetadataStore};
pub use stats::{RunStats, STATS_FILE};
pub use store::{FileStore, Lines, Storage, StorageError};
