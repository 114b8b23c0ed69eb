//! Progress reporting for batch execution

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use simbatch_application::ports::progress::BatchProgressNotifier;
use simbatch_domain::{BatchId, BatchStatus, TaskRecord};
use std::collections::HashMap;
use std::sync::Mutex;

/// Reports progress with one progress bar per running batch
pub struct ProgressReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<BatchId, ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn batch_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn with_bar(&self, batch_id: &BatchId, f: impl FnOnce(&ProgressBar)) {
        if let Ok(bars) = self.bars.lock()
            && let Some(pb) = bars.get(batch_id)
        {
            f(pb);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchProgressNotifier for ProgressReporter {
    fn on_batch_start(&self, batch_id: &BatchId, total_tasks: usize) {
        let pb = self.multi.add(ProgressBar::new(total_tasks as u64));
        pb.set_style(Self::batch_style());
        pb.set_prefix(format!("Batch {}", batch_id.short()));
        pb.set_message("Starting...");

        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(batch_id.clone(), pb);
        }
    }

    fn on_round_complete(&self, batch_id: &BatchId, sequence: u32, round: u32, rounds: u32) {
        self.with_bar(batch_id, |pb| {
            pb.set_message(format!("#{} round {}/{}", sequence, round, rounds));
        });
    }

    fn on_task_complete(&self, batch_id: &BatchId, record: &TaskRecord) {
        self.with_bar(batch_id, |pb| {
            let status = if record.is_success() {
                format!("{} #{}", "v".green(), record.sequence)
            } else {
                format!("{} #{}", "x".red(), record.sequence)
            };
            pb.set_message(status);
            pb.inc(1);
        });
    }

    fn on_batch_complete(&self, batch_id: &BatchId, status: BatchStatus) {
        let bar = self.bars.lock().ok().and_then(|mut bars| bars.remove(batch_id));
        if let Some(pb) = bar {
            pb.finish_with_message(format!("{}", status_label(status)));
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl BatchProgressNotifier for SimpleProgress {
    fn on_batch_start(&self, batch_id: &BatchId, total_tasks: usize) {
        println!(
            "{} {} ({} tasks)",
            "->".cyan(),
            format!("Batch {}", batch_id).bold(),
            total_tasks
        );
    }

    fn on_task_complete(&self, _batch_id: &BatchId, record: &TaskRecord) {
        let entities = record
            .entities
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        match record.result.error() {
            None => println!("  {} #{} [{}]", "v".green(), record.sequence, entities),
            Some(error) => println!(
                "  {} #{} [{}] (failed: {})",
                "x".red(),
                record.sequence,
                entities,
                error
            ),
        }
    }

    fn on_batch_complete(&self, batch_id: &BatchId, status: BatchStatus) {
        println!("{} Batch {} {}", "->".cyan(), batch_id, status_label(status));
    }
}

/// Batch status colored by outcome.
pub fn status_label(status: BatchStatus) -> colored::ColoredString {
    match status {
        BatchStatus::Completed => status.as_str().green().bold(),
        BatchStatus::Partial => status.as_str().yellow().bold(),
        BatchStatus::Failed => status.as_str().red().bold(),
        BatchStatus::Pending | BatchStatus::InProgress => status.as_str().cyan(),
    }
}
