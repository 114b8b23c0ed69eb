//! Batch store adapters
//!
//! - [`FileBatchStore`] - JSON files under a data directory (default)
//! - [`InMemoryBatchStore`] - process memory only

mod file;
mod in_memory;

pub use file::FileBatchStore;
pub use in_memory::InMemoryBatchStore;
