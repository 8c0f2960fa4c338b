//! Image-generation client for OpenAI-compatible servers.

use crate::openai::wire::{WireImageRequest, WireImageResponse};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fableflow_error::{FableFlowResult, GenerationError, GenerationErrorKind, HttpError, JsonError};
use fableflow_interface::ImageDriver;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// Image client for an OpenAI-compatible `/images/generations` endpoint.
///
/// Requests base64-encoded output so the bytes can be written straight
/// to disk without a second fetch.
#[derive(Debug, Clone)]
pub struct OpenAiImageClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiImageClient {
    /// Creates a new image client.
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

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait]
impl ImageDriver for OpenAiImageClient {
    #[instrument(skip(self, prompt), fields(provider = "openai", model = %self.model))]
    async fn generate_image(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> FableFlowResult<Vec<u8>> {
        let wire_request = WireImageRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: format!("{}x{}", width, height),
            response_format: "b64_json".to_string(),
        };

        let url = format!("{}/images/generations", self.base_url);
        debug!(url = %url, "Sending image request");

        let mut builder = self.client.post(&url).json(&wire_request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::new(format!("image request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::new(GenerationErrorKind::Api {
                status,
                message,
            })
            .into());
        }

        let wire_response: WireImageResponse = response
            .json()
            .await
            .map_err(|e| JsonError::new(format!("failed to parse response body: {}", e)))?;

        let encoded = wire_response
            .data
            .into_iter()
            .next()
            .and_then(|datum| datum.b64_json)
            .ok_or_else(|| GenerationError::new(GenerationErrorKind::EmptyResponse))?;

        STANDARD.decode(encoded.as_bytes()).map_err(|e| {
            GenerationError::new(GenerationErrorKind::Parse(format!(
                "image payload was not valid base64: {}",
                e
            )))
            .into()
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
