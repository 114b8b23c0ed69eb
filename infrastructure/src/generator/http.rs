//! HTTP adapter for the generation service.
//!
//! Each round is one `POST` of a JSON [`GenerationRequest`]. The service
//! answers with
//!
//! ```json
//! { "content": "Turn 4: ...", "final_turn_number": 6 }
//! ```
//!
//! where `final_turn_number` may also be a string or missing entirely.

use async_trait::async_trait;
use serde::Deserialize;
use simbatch_application::ports::text_generator::{
    Generation, GenerationError, GenerationRequest, TextGenerator,
};
use std::time::Duration;
use tracing::debug;

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    content: String,
    #[serde(default)]
    final_turn_number: Option<serde_json::Value>,
}

/// Generator that calls a remote service over HTTP
pub struct HttpTextGenerator {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpTextGenerator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("simbatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout(self.timeout)
        } else if e.is_connect() {
            GenerationError::Connection(e.to_string())
        } else {
            GenerationError::RequestFailed(e.to_string())
        }
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        debug!(
            "POST {} ({} entities, {} turns from turn {})",
            self.endpoint,
            request.entities.len(),
            request.turns,
            request.last_turn_number
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http {
                status: status.as_u16(),
                message: truncate(body.trim(), MAX_ERROR_BODY),
            });
        }

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<Generation, GenerationError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

    Ok(Generation {
        content: parsed.content,
        final_turn_number: parsed.final_turn_number.and_then(reported_turn),
    })
}

/// Keep the reported turn as text; numbers, numeric strings and junk are
/// all resolved later.
fn reported_turn(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
