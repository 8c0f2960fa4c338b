//! The unified completion type returned by chat backends.

use crate::TokenUsage;
use serde::{Deserialize, Serialize};

/// Why the backend stopped generating.
///
/// Backends report this as a free-form string on the wire; anything
/// unrecognized maps to `Unknown` rather than failing the parse.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural completion
    Stop,
    /// Token-limit truncation
    Length,
    /// Content policy intervened
    ContentFilter,
    /// Model requested a function/tool call
    FunctionCall,
    /// Anything the backend reported that we do not recognize
    Unknown,
}

impl FinishReason {
    /// Parse a wire finish-reason string.
    ///
    /// # Examples
    ///
    /// ```
    /// use fableflow_core::FinishReason;
    ///
    /// assert_eq!(FinishReason::from_wire("stop"), FinishReason::Stop);
    /// assert_eq!(FinishReason::from_wire("tool_use"), FinishReason::Unknown);
    /// ```
    pub fn from_wire(name: &str) -> Self {
        match name {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            "function_call" => FinishReason::FunctionCall,
            _ => FinishReason::Unknown,
        }
    }
}

/// A single completion chunk from the backend.
///
/// # Examples
///
/// ```
/// use fableflow_core::{ChatCompletion, FinishReason};
///
/// let completion = ChatCompletion {
///     content: "Once upon a time...".to_string(),
///     finish_reason: FinishReason::Stop,
///     usage: None,
/// };
/// assert_eq!(completion.token_estimate(), "Once upon a time...".len() / 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// The generated text
    pub content: String,
    /// Why generation stopped
    pub finish_reason: FinishReason,
    /// Backend-reported token usage, when available
    pub usage: Option<TokenUsage>,
}

impl ChatCompletion {
    /// Total tokens for this chunk: backend-reported usage when present,
    /// otherwise the rough `len / 4` estimate.
    pub fn token_estimate(&self) -> usize {
        match &self.usage {
            Some(usage) => *usage.total_tokens(),
            None => crate::estimate_tokens(&self.content),
        }
    }
}
