//! Infrastructure layer for simbatch
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod generator;
pub mod logging;
pub mod spec_file;
pub mod store;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileConfig, FileGeneratorConfig, FileLoggingConfig, FileOutputConfig,
    FileOutputFormat, FileSchedulerConfig, FileStorageConfig, StorageBackend,
};
pub use generator::{DryRunGenerator, HttpTextGenerator, RetryingGenerator};
pub use logging::JsonlEventLogger;
pub use spec_file::{SpecFileError, load_batch_spec};
pub use store::{FileBatchStore, InMemoryBatchStore};
