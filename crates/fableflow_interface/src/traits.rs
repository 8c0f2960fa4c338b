//! Trait definitions for generation backends and their capabilities.

use async_trait::async_trait;
use fableflow_core::{ChatCompletion, ChatRequest};
use fableflow_error::FableFlowResult;

/// Core trait that all chat-completion backends must implement.
///
/// This provides the minimal interface for a single generation round trip.
/// Long-form generation with continuation is layered on top of this in
/// `fableflow_continuation` and never implemented by drivers themselves.
#[async_trait]
pub trait ChatDriver: Send + Sync {
    /// Generate a single completion for the given request.
    async fn generate(&self, req: &ChatRequest) -> FableFlowResult<ChatCompletion>;

    /// Provider name (e.g., "openai", "local").
    fn provider_name(&self) -> &'static str;

    /// Model identifier (e.g., "gemma-3-27b-it").
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<T: ChatDriver + ?Sized> ChatDriver for std::sync::Arc<T> {
    async fn generate(&self, req: &ChatRequest) -> FableFlowResult<ChatCompletion> {
        (**self).generate(req).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Trait for backends that generate images from text prompts.
#[async_trait]
pub trait ImageDriver: Send + Sync {
    /// Generate a single image and return the encoded bytes (PNG or JPEG).
    async fn generate_image(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> FableFlowResult<Vec<u8>>;

    /// Provider name for the image backend.
    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl<T: ImageDriver + ?Sized> ImageDriver for std::sync::Arc<T> {
    async fn generate_image(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
    ) -> FableFlowResult<Vec<u8>> {
        (**self).generate_image(prompt, width, height).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}
