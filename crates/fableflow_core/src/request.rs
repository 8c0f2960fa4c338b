//! Request types for chat-completion generation.

use crate::Message;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// A chat-completion request. Immutable once issued.
///
/// # Examples
///
/// ```
/// use fableflow_core::{ChatRequest, Message};
///
/// let request = ChatRequest::builder()
///     .messages(vec![Message::user("Hello!")])
///     .max_tokens(100u32)
///     .model("gemma-3-27b-it")
///     .build()
///     .unwrap();
///
/// assert_eq!(request.messages.len(), 1);
/// assert_eq!(request.max_tokens, Some(100));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, Builder)]
#[builder(setter(into), default)]
pub struct ChatRequest {
    /// The conversation messages to send
    pub messages: Vec<Message>,
    /// Maximum number of tokens to generate
    #[builder(setter(strip_option))]
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0 to 2.0)
    #[builder(setter(strip_option))]
    pub temperature: Option<f32>,
    /// Model identifier to use
    #[builder(setter(strip_option))]
    pub model: Option<String>,
}

impl ChatRequest {
    /// Creates a new request builder.
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }
}
