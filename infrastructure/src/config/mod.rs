//! Configuration file loading for simbatch
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `SIMBATCH_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./simbatch.toml` or `./.simbatch.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/simbatch/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileConfig, FileGeneratorConfig, FileLoggingConfig, FileOutputConfig, FileOutputFormat,
    FileSchedulerConfig, FileStorageConfig, StorageBackend,
};
pub use loader::ConfigLoader;
