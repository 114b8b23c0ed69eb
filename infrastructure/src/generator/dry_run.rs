//! Offline generator for `--dry-run` and demos.

use async_trait::async_trait;
use simbatch_application::ports::text_generator::{
    Generation, GenerationError, GenerationRequest, TextGenerator,
};
use std::time::Duration;

/// Deterministic generator that writes one `Turn N: <entity> ...` line per
/// requested turn, rotating speakers through the task's entities.
#[derive(Debug, Clone, Default)]
pub struct DryRunGenerator {
    latency: Option<Duration>,
}

impl DryRunGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before answering, to make progress output observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl TextGenerator for DryRunGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if request.entities.is_empty() {
            return Err(GenerationError::RequestFailed(
                "no entities to speak".to_string(),
            ));
        }

        let first = request.last_turn_number + 1;
        let last = request.last_turn_number + request.turns;
        let lines: Vec<String> = (first..=last)
            .map(|turn| {
                let speaker = &request.entities[(turn as usize - 1) % request.entities.len()];
                if turn == 1 && !request.context.is_empty() {
                    format!("Turn {}: {} opens. ({})", turn, speaker, request.context)
                } else {
                    format!("Turn {}: {} responds.", turn, speaker)
                }
            })
            .collect();

        Ok(Generation::new(lines.join("\n")).with_final_turn(last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simbatch_domain::EntityId;

    fn request(last_turn_number: u32, turns: u32) -> GenerationRequest {
        GenerationRequest {
            entities: vec![EntityId::from("ann"), EntityId::from("ben")],
            context: "market".into(),
            turns,
            last_turn_number,
            prior_content: None,
        }
    }

    #[tokio::test]
    async fn test_first_round() {
        let generation = DryRunGenerator::new().generate(&request(0, 2)).await.unwrap();
        assert_eq!(
            generation.content,
            "Turn 1: ann opens. (market)\nTurn 2: ben responds."
        );
        assert_eq!(generation.final_turn_number.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_continues_numbering() {
        let generation = DryRunGenerator::new().generate(&request(2, 3)).await.unwrap();
        assert!(generation.content.starts_with("Turn 3: ann responds."));
        assert!(generation.content.ends_with("Turn 5: ann responds."));
        assert_eq!(generation.final_turn_number.as_deref(), Some("5"));
    }
}
