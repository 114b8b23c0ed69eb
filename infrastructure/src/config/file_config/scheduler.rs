//! Scheduler configuration from TOML (`[scheduler]` section)

use serde::{Deserialize, Serialize};
use simbatch_application::config::{DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_TASKS};
use simbatch_domain::{ConfigIssue, ConfigIssueCode};

/// Raw scheduler configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSchedulerConfig {
    /// Tasks allowed to run at once, across all batches of the process
    pub max_concurrency: usize,
    /// Largest task count a single batch may request
    pub max_tasks: usize,
}

impl Default for FileSchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_tasks: DEFAULT_MAX_TASKS,
        }
    }
}

impl FileSchedulerConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.max_concurrency == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroValue {
                    field: "scheduler.max_concurrency".to_string(),
                },
                "scheduler.max_concurrency must be at least 1",
            ));
        }
        if self.max_tasks == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroValue {
                    field: "scheduler.max_tasks".to_string(),
                },
                "scheduler.max_tasks must be at least 1",
            ));
        }
        issues
    }
}
