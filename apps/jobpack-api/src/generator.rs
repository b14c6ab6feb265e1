//! HTTP text generation client
//!
//! POSTs a [`GenerationRequest`] as JSON and expects `{"text": "..."}`
//! back.

use std::time::Duration;

use async_trait::async_trait;
use document_engine::{GenerationError, GenerationRequest, TextGenerator};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct GenerationResponse {
    text: String,
}

/// Text generator backed by an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpTextGenerator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        debug!(field = %request.field_id, "Requesting narrative text");

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout.as_millis() as u64)
                } else {
                    GenerationError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, field = %request.field_id, "Generator returned an error status");
            return Err(GenerationError::Unavailable(format!("HTTP {}", status)));
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        Ok(body.text)
    }
}
