//! Task scheduler
//!
//! Runs tasks on a bounded, process-wide pool. One semaphore is shared by
//! every batch scheduled through the same scheduler, so the number of tasks
//! running at once never exceeds the configured limit no matter how many
//! batches are active.
//!
//! Results are streamed back in completion order. Every submitted task
//! yields exactly one [`TaskRecord`]: a panicking or cancelled task becomes
//! a failure instead of disappearing.

use crate::config::SchedulerParams;
use crate::use_cases::run_continuation::ContinuationRunner;
use crate::ports::text_generator::TextGenerator;
use futures::FutureExt;
use simbatch_domain::{EntityId, TaskRecord, TaskResult, TaskSpec};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Bounded worker pool for continuation tasks
pub struct TaskScheduler<G: TextGenerator + 'static> {
    runner: Arc<ContinuationRunner<G>>,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
}

impl<G: TextGenerator + 'static> TaskScheduler<G> {
    /// Create a scheduler allowing at most `max_concurrency` running tasks
    /// (at least one).
    pub fn new(runner: Arc<ContinuationRunner<G>>, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            runner,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        }
    }

    pub fn from_params(runner: Arc<ContinuationRunner<G>>, params: &SchedulerParams) -> Self {
        Self::new(runner, params.max_concurrency)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Permits not currently held by a running task.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Submit `tasks` and return a stream of their results.
    ///
    /// Tasks queue for a slot on the shared pool; the stream closes once
    /// every task has produced its record. Must be called inside a Tokio
    /// runtime.
    pub fn schedule(&self, tasks: Vec<TaskSpec>) -> mpsc::Receiver<TaskRecord> {
        let (tx, rx) = mpsc::channel(tasks.len().max(1));
        let runner = Arc::clone(&self.runner);
        let permits = Arc::clone(&self.permits);

        tokio::spawn(Self::drive(runner, permits, tasks, tx));
        rx
    }

    /// Submit `tasks` and wait for all of them. Records are sorted by
    /// sequence number.
    pub async fn run_all(&self, tasks: Vec<TaskSpec>) -> Vec<TaskRecord> {
        let mut rx = self.schedule(tasks);
        let mut records = Vec::new();
        while let Some(record) = rx.recv().await {
            records.push(record);
        }
        records.sort_by_key(|r| r.sequence);
        records
    }

    async fn drive(
        runner: Arc<ContinuationRunner<G>>,
        permits: Arc<Semaphore>,
        tasks: Vec<TaskSpec>,
        tx: mpsc::Sender<TaskRecord>,
    ) {
        // Entities of every task still owed a record
        let mut outstanding: BTreeMap<u32, Vec<EntityId>> = tasks
            .iter()
            .map(|t| (t.sequence, t.entities.clone()))
            .collect();

        let mut join_set = JoinSet::new();
        for task in tasks {
            let runner = Arc::clone(&runner);
            let permits = Arc::clone(&permits);

            join_set.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        debug!("Task {} acquired a slot", task.label());
                        AssertUnwindSafe(runner.run(&task))
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|panic| {
                                let message = panic_message(panic.as_ref());
                                error!("Task {} panicked: {}", task.label(), message);
                                TaskResult::failure(format!("task panicked: {}", message))
                            })
                    }
                    Err(_) => TaskResult::failure("worker pool was shut down"),
                };
                TaskRecord::new(task.sequence, task.entities, result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(record) => {
                    outstanding.remove(&record.sequence);
                    if tx.send(record).await.is_err() {
                        warn!("Result receiver dropped; remaining results are discarded");
                    }
                }
                Err(e) => warn!("Task join error: {}", e),
            }
        }

        for (sequence, entities) in outstanding {
            error!("Task #{} ended without a result", sequence);
            let record = TaskRecord::new(
                sequence,
                entities,
                TaskResult::failure("task aborted before producing a result"),
            );
            if tx.send(record).await.is_err() {
                break;
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
