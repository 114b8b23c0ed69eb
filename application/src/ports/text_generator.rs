//! Text generator port
//!
//! Defines the interface to the external generation service that produces
//! simulation content, one round at a time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use simbatch_domain::EntityId;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a generation call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Generation service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<GenerationError> },
}

impl GenerationError {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Timeouts, connection problems, rate limiting (429) and server errors
    /// (5xx) are transient; everything else is treated as permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Connection(_) | GenerationError::Timeout(_) => true,
            GenerationError::Http { status, .. } => *status == 429 || *status >= 500,
            GenerationError::InvalidResponse(_)
            | GenerationError::RequestFailed(_)
            | GenerationError::RetriesExhausted { .. } => false,
        }
    }
}

/// Input for one round of generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub entities: Vec<EntityId>,
    pub context: String,
    /// Turns to generate in this round
    pub turns: u32,
    /// Turn number to continue from (0 on the first round)
    pub last_turn_number: u32,
    /// Content of the previous rounds, absent on the first round
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_content: Option<String>,
}

/// Output of one round of generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub content: String,
    /// Final turn number as reported by the service, unparsed.
    ///
    /// Services are not reliable about this field, so it is kept as raw
    /// text and resolved by the continuation runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_turn_number: Option<String>,
}

impl Generation {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            final_turn_number: None,
        }
    }

    pub fn with_final_turn(mut self, turn: u32) -> Self {
        self.final_turn_number = Some(turn.to_string());
        self
    }

    pub fn with_reported_turn(mut self, raw: impl Into<String>) -> Self {
        self.final_turn_number = Some(raw.into());
        self
    }
}

/// Gateway to the external generation service
///
/// Implementations (adapters) live in the infrastructure layer. They must be
/// safe to call concurrently from many tasks, and each call is expected to
/// enforce its own timeout.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate one round of content
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError>;
}

#[async_trait]
impl<G: TextGenerator + ?Sized> TextGenerator for Arc<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        (**self).generate(request).await
    }
}

#[async_trait]
impl<G: TextGenerator + ?Sized> TextGenerator for Box<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        (**self).generate(request).await
    }
}
