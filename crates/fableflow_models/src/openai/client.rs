//! Chat-completions client for OpenAI-compatible servers.

use crate::openai::wire::{WireChatRequest, WireChatResponse};
use async_trait::async_trait;
use fableflow_core::{ChatCompletion, ChatRequest, FinishReason, TokenUsage};
use fableflow_error::{FableFlowResult, GenerationError, GenerationErrorKind, HttpError, JsonError};
use fableflow_interface::ChatDriver;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Chat client for any OpenAI-compatible `/chat/completions` endpoint.
///
/// Works against hosted APIs and local inference servers alike; the
/// base URL points at the `/v1` root (e.g. `http://localhost:1234/v1`).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> FableFlowResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::new(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait]
impl ChatDriver for OpenAiClient {
    #[instrument(skip(self, req), fields(provider = "openai", model = %self.model))]
    async fn generate(&self, req: &ChatRequest) -> FableFlowResult<ChatCompletion> {
        let wire_request = WireChatRequest::from_request(req, &self.model);

        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, messages = wire_request.messages.len(), "Sending chat request");

        let mut builder = self.client.post(&url).json(&wire_request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::new(format!("chat request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::new(GenerationErrorKind::Api {
                status,
                message,
            })
            .into());
        }

        let wire_response: WireChatResponse = response
            .json()
            .await
            .map_err(|e| JsonError::new(format!("failed to parse response body: {}", e)))?;

        let choice = wire_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::new(GenerationErrorKind::EmptyResponse))?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some(name) => FinishReason::from_wire(name),
            None => {
                warn!("Response carried no finish_reason; treating as unknown");
                FinishReason::Unknown
            }
        };

        let usage = wire_response
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));

        Ok(ChatCompletion {
            content: choice.message.content,
            finish_reason,
            usage,
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fableflow_core::Message;
    use fableflow_error::FableFlowErrorKind;

    #[tokio::test]
    async fn transport_failure_surfaces_as_http_error() {
        let client = OpenAiClient::new(
            "http://[unclosed",
            None,
            "test-model",
            Duration::from_millis(200),
        )
        .unwrap();
        let request = ChatRequest::builder()
            .messages(vec![Message::user("hello")])
            .build()
            .unwrap();

        let err = client.generate(&request).await.unwrap_err();
        assert!(matches!(err.kind(), FableFlowErrorKind::Http(_)));
    }
}
