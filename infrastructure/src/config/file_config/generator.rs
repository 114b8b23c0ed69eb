//! Generator configuration from TOML (`[generator]` section)

use serde::{Deserialize, Serialize};
use simbatch_application::RetryPolicy;
use simbatch_domain::{ConfigIssue, ConfigIssueCode, DEFAULT_TURN_MARKER};
use std::time::Duration;

/// Raw generator configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGeneratorConfig {
    /// URL of the generation service; required unless running dry
    pub endpoint: Option<String>,
    /// Per-call timeout
    pub timeout_secs: u64,
    /// Attempts per round, including the first
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Word that precedes turn numbers in generated content
    pub turn_marker: String,
}

impl Default for FileGeneratorConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            endpoint: None,
            timeout_secs: retry.call_timeout.map_or(120, |t| t.as_secs()),
            max_attempts: retry.max_attempts,
            initial_backoff_ms: retry.initial_backoff.as_millis() as u64,
            max_backoff_ms: retry.max_backoff.as_millis() as u64,
            turn_marker: DEFAULT_TURN_MARKER.to_string(),
        }
    }
}

impl FileGeneratorConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if let Some(endpoint) = &self.endpoint
            && endpoint.trim().is_empty()
        {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyValue {
                    field: "generator.endpoint".to_string(),
                },
                "generator.endpoint is set but empty",
            ));
        }

        if self.timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroValue {
                    field: "generator.timeout_secs".to_string(),
                },
                "generator.timeout_secs must be at least 1",
            ));
        }

        if self.max_attempts == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroValue {
                    field: "generator.max_attempts".to_string(),
                },
                "generator.max_attempts is 0, using 1 (no retries)",
            ));
        }

        if self.initial_backoff_ms > self.max_backoff_ms {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::Inconsistent {
                    field: "generator.initial_backoff_ms".to_string(),
                },
                format!(
                    "generator.initial_backoff_ms ({}) exceeds max_backoff_ms ({}); every wait is capped",
                    self.initial_backoff_ms, self.max_backoff_ms
                ),
            ));
        }

        let marker = self.turn_marker.trim();
        if marker.is_empty() || marker.contains(char::is_whitespace) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyValue {
                    field: "generator.turn_marker".to_string(),
                },
                "generator.turn_marker must be a single non-empty word",
            ));
        }

        issues
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_backoff(
                Duration::from_millis(self.initial_backoff_ms),
                Duration::from_millis(self.max_backoff_ms),
            )
            .with_call_timeout(Some(Duration::from_secs(self.timeout_secs)))
    }
}
