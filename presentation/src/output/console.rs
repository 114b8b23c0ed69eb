//! Console output formatter for batches and task results

use crate::progress::reporter::status_label;
use colored::Colorize;
use serde::Serialize;
use simbatch_domain::{Batch, BatchRecord, TaskRecord, TaskResult, TurnSource};

/// Formats batches for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Batch header: identity, status, counts and timing
    pub fn format_batch(batch: &Batch) -> String {
        let mut output = String::new();
        let spec = batch.spec();

        output.push_str(&Self::header(&format!("Batch {}", spec.name)));
        output.push('\n');

        output.push_str(&format!("{} {}\n", "ID:".cyan().bold(), batch.id()));
        output.push_str(&format!(
            "{} {}\n",
            "Status:".cyan().bold(),
            status_label(batch.status())
        ));
        if let Some(description) = &spec.description {
            output.push_str(&format!("{} {}\n", "About:".cyan().bold(), description));
        }
        output.push_str(&format!(
            "{} {} entities, {} per task, {} rounds x {} turns\n",
            "Shape:".cyan().bold(),
            spec.entities.len(),
            spec.interaction_size,
            spec.rounds_per_task,
            spec.turns_per_round
        ));

        let summary = batch.summary();
        output.push_str(&format!(
            "{} {} planned ({} requested), {} succeeded, {} failed, {} pending\n",
            "Tasks:".cyan().bold(),
            summary.total,
            spec.task_count,
            summary.succeeded.to_string().green(),
            summary.failed.to_string().red(),
            summary.pending
        ));

        let record = batch.record();
        output.push_str(&format!(
            "{} {}\n",
            "Created:".dimmed(),
            record.created_at.to_rfc3339()
        ));
        if let (Some(started), Some(finished)) = (record.started_at, record.finished_at) {
            let elapsed = finished - started;
            output.push_str(&format!(
                "{} {:.1}s\n",
                "Ran for:".dimmed(),
                elapsed.num_milliseconds() as f64 / 1000.0
            ));
        }

        if let Some(error) = batch.error() {
            output.push_str(&format!("\n{} {}\n", "Rejected:".red().bold(), error));
        }

        output
    }

    /// Task results in sequence order; `full` includes generated content.
    pub fn format_results<'a>(
        results: impl IntoIterator<Item = &'a TaskRecord>,
        full: bool,
    ) -> String {
        let mut output = Self::section_header("Results");

        let mut empty = true;
        for record in results {
            empty = false;
            output.push_str(&Self::format_task(record, full));
        }
        if empty {
            output.push_str(&format!("{}\n", "(no results)".dimmed()));
        }

        output
    }

    fn format_task(record: &TaskRecord, full: bool) -> String {
        let entities = record
            .entities
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        match &record.result {
            TaskResult::Success {
                content,
                final_turn_number,
                rounds,
            } => {
                let mut line = format!(
                    "{} {} [{}] turn {}\n",
                    "v".green(),
                    format!("#{}", record.sequence).bold(),
                    entities,
                    final_turn_number
                );
                let guessed = rounds
                    .iter()
                    .filter(|r| r.turn_source != TurnSource::Reported)
                    .count();
                if guessed > 0 {
                    line.push_str(&format!(
                        "    {}\n",
                        format!("{} round(s) without a usable reported turn", guessed).yellow()
                    ));
                }
                if full {
                    line.push_str(&Self::indent(content, "    "));
                    line.push_str("\n\n");
                }
                line
            }
            TaskResult::Failure {
                error,
                failed_round,
            } => {
                let round = failed_round
                    .map(|r| format!(" in round {}", r))
                    .unwrap_or_default();
                format!(
                    "{} {} [{}] failed{}: {}\n",
                    "x".red(),
                    format!("#{}", record.sequence).bold(),
                    entities,
                    round,
                    error
                )
            }
        }
    }

    /// One line per batch
    pub fn format_batch_list(records: &[BatchRecord]) -> String {
        if records.is_empty() {
            return format!("{}\n", "No batches found.".dimmed());
        }

        let mut output = String::new();
        for record in records {
            output.push_str(&format!(
                "{}  {:<12} {:>4} tasks  {}  {}\n",
                record.id,
                status_label(record.status),
                record.planned_tasks,
                record.created_at.format("%Y-%m-%d %H:%M:%S"),
                record.spec.name
            ));
        }
        output
    }

    /// Format as JSON
    pub fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
