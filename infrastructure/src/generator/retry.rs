//! Retry decorator for text generators.
//!
//! Wraps any [`TextGenerator`] with a per-call timeout and bounded
//! exponential backoff. Only errors that [`GenerationError::is_retryable`]
//! accepts are retried; the last error is returned once attempts run out.

use async_trait::async_trait;
use simbatch_application::RetryPolicy;
use simbatch_application::ports::text_generator::{
    Generation, GenerationError, GenerationRequest, TextGenerator,
};
use tracing::{debug, warn};

pub struct RetryingGenerator<G: TextGenerator> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: TextGenerator> RetryingGenerator<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        match self.policy.call_timeout {
            Some(limit) => tokio::time::timeout(limit, self.inner.generate(request))
                .await
                .map_err(|_| GenerationError::Timeout(limit))?,
            None => self.inner.generate(request).await,
        }
    }
}

#[async_trait]
impl<G: TextGenerator> TextGenerator for RetryingGenerator<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(request).await {
                Ok(generation) => {
                    if attempt > 1 {
                        debug!("Generation succeeded on attempt {}", attempt);
                    }
                    return Ok(generation);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.backoff_for(attempt);
                    warn!(
                        "Generation attempt {}/{} failed: {} (retrying in {:?})",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if attempt > 1 => {
                    return Err(GenerationError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    // ==================== Test Mocks ====================

    struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<Generation, GenerationError>>>,
        calls: AtomicU32,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Result<Generation, GenerationError>>) -> Self {
            Self {
                responses: Mutex::new(VecDeque::from(responses)),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<Generation, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Generation::new("fallback")))
        }
    }

    struct HangingGenerator;

    #[async_trait]
    impl TextGenerator for HangingGenerator {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<Generation, GenerationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Generation::new("too late"))
        }
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(attempts)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(4))
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            entities: vec![],
            context: String::new(),
            turns: 1,
            last_turn_number: 0,
            prior_content: None,
        }
    }

    fn unavailable() -> GenerationError {
        GenerationError::Http {
            status: 503,
            message: "busy".into(),
        }
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let generator = RetryingGenerator::new(
            ScriptedGenerator::new(vec![
                Err(unavailable()),
                Err(GenerationError::Connection("reset".into())),
                Ok(Generation::new("Turn 1: ok").with_final_turn(1)),
            ]),
            fast_policy(3),
        );

        let generation = generator.generate(&request()).await.unwrap();
        assert_eq!(generation.content, "Turn 1: ok");
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let generator = RetryingGenerator::new(
            ScriptedGenerator::new(vec![Err(unavailable()), Err(unavailable()), Err(unavailable())]),
            fast_policy(2),
        );

        let err = generator.generate(&request()).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::RetriesExhausted {
                attempts: 2,
                last: Box::new(unavailable()),
            }
        );
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let bad_request = GenerationError::Http {
            status: 400,
            message: "bad".into(),
        };
        let generator = RetryingGenerator::new(
            ScriptedGenerator::new(vec![Err(bad_request.clone())]),
            fast_policy(5),
        );

        assert_eq!(generator.generate(&request()).await.unwrap_err(), bad_request);
        assert_eq!(generator.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout() {
        let generator = RetryingGenerator::new(
            HangingGenerator,
            RetryPolicy::no_retry().with_call_timeout(Some(Duration::from_secs(2))),
        );

        let err = generator.generate(&request()).await.unwrap_err();
        assert_eq!(err, GenerationError::Timeout(Duration::from_secs(2)));
    }
}
