//! Continuation runner
//!
//! Drives one task through its rounds. Each round is one generator call
//! that continues from the turn number and content of the rounds before it:
//!
//! ```text
//! round 1: turns=T, last_turn=0,  prior=None
//! round 2: turns=T, last_turn=t1, prior=content1
//! round 3: turns=T, last_turn=t2, prior=content1 + "\n\n" + content2
//! ```
//!
//! A task is atomic: the first failed round ends it with a failure and the
//! content of earlier rounds is dropped. Retrying is the generator's job.

use crate::ports::event_logger::{BatchEvent, BatchEventLogger, NoEventLogger};
use crate::ports::progress::{BatchProgressNotifier, NoProgress};
use crate::ports::text_generator::{GenerationRequest, TextGenerator};
use simbatch_domain::{
    DEFAULT_TURN_MARKER, RoundMetadata, TaskResult, TaskSpec, TurnSource, TurnState,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Runs the rounds of a single task against the generator
pub struct ContinuationRunner<G: TextGenerator + 'static> {
    generator: Arc<G>,
    turn_marker: String,
    progress: Arc<dyn BatchProgressNotifier>,
    logger: Arc<dyn BatchEventLogger>,
}

impl<G: TextGenerator + 'static> ContinuationRunner<G> {
    pub fn new(generator: Arc<G>) -> Self {
        Self {
            generator,
            turn_marker: DEFAULT_TURN_MARKER.to_string(),
            progress: Arc::new(NoProgress),
            logger: Arc::new(NoEventLogger),
        }
    }

    pub fn with_turn_marker(mut self, marker: impl Into<String>) -> Self {
        self.turn_marker = marker.into();
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn BatchProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_event_logger(mut self, logger: Arc<dyn BatchEventLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Run every round of `task` and produce its single result.
    pub async fn run(&self, task: &TaskSpec) -> TaskResult {
        let mut state = TurnState::new();
        let mut rounds = Vec::with_capacity(task.rounds as usize);

        for round in 1..=task.rounds {
            let start_turn = state.last_turn_number();
            let request = GenerationRequest {
                entities: task.entities.clone(),
                context: task.context.clone(),
                turns: task.turns_per_round,
                last_turn_number: start_turn,
                prior_content: state.prior_content().map(str::to_string),
            };

            let started = Instant::now();
            let generation = match self.generator.generate(&request).await {
                Ok(generation) => generation,
                Err(e) => {
                    warn!(
                        "Task {} failed in round {}/{}: {}",
                        task.label(),
                        round,
                        task.rounds,
                        e
                    );
                    self.logger.log(BatchEvent::new(
                        "round_failed",
                        serde_json::json!({
                            "batch_id": task.batch_id,
                            "sequence": task.sequence,
                            "round": round,
                            "error": e.to_string(),
                        }),
                    ));
                    return TaskResult::round_failure(e.to_string(), round);
                }
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let (final_turn, turn_source) = state.apply_round(
                &generation.content,
                generation.final_turn_number.as_deref(),
                &self.turn_marker,
            );

            match turn_source {
                TurnSource::Reported => {}
                TurnSource::ContentScan => debug!(
                    "Task {} round {}: reported turn {:?} unusable, recovered {} from content",
                    task.label(),
                    round,
                    generation.final_turn_number,
                    final_turn
                ),
                TurnSource::Unchanged => warn!(
                    "Task {} round {}: no turn number found, keeping {}",
                    task.label(),
                    round,
                    final_turn
                ),
                TurnSource::Regressed => warn!(
                    "Task {} round {}: turn number went backwards ({:?}), keeping {}",
                    task.label(),
                    round,
                    generation.final_turn_number,
                    final_turn
                ),
            }

            let metadata = RoundMetadata {
                round,
                turns_requested: task.turns_per_round,
                start_turn,
                reported_turn: generation.final_turn_number.clone(),
                final_turn,
                turn_source,
                content_chars: generation.content.chars().count(),
                elapsed_ms,
            };

            self.logger.log(BatchEvent::new(
                "round_completed",
                serde_json::json!({
                    "batch_id": task.batch_id,
                    "sequence": task.sequence,
                    "entities": task.entities,
                    "round": metadata,
                    "content": generation.content,
                }),
            ));
            self.progress
                .on_round_complete(&task.batch_id, task.sequence, round, task.rounds);

            rounds.push(metadata);
        }

        let (content, final_turn) = state.into_parts();
        debug!(
            "Task {} completed {} rounds at turn {}",
            task.label(),
            rounds.len(),
            final_turn
        );
        TaskResult::success(content, final_turn, rounds)
    }
}
