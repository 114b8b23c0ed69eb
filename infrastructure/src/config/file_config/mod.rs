//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod generator;
mod logging;
mod output;
mod scheduler;
mod storage;

pub use generator::FileGeneratorConfig;
pub use logging::FileLoggingConfig;
pub use output::{FileOutputConfig, FileOutputFormat};
pub use scheduler::FileSchedulerConfig;
pub use storage::{FileStorageConfig, StorageBackend};

use serde::{Deserialize, Serialize};
use simbatch_application::SchedulerParams;
use simbatch_domain::ConfigIssue;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Worker pool and batch limits
    pub scheduler: FileSchedulerConfig,
    /// Generation service connection and retry settings
    pub generator: FileGeneratorConfig,
    /// Where batches and results are kept
    pub storage: FileStorageConfig,
    /// Event log and diagnostic log files
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.scheduler.validate());
        issues.extend(self.generator.validate());
        issues.extend(self.storage.parse_backend().1);
        issues
    }

    /// Scheduler parameters, with the turn marker taken from `[generator]`.
    pub fn scheduler_params(&self) -> SchedulerParams {
        SchedulerParams::default()
            .with_max_concurrency(self.scheduler.max_concurrency)
            .with_max_tasks(self.scheduler.max_tasks)
            .with_turn_marker(self.generator.turn_marker.trim())
    }
}
