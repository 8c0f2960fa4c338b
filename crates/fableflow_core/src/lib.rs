//! Core data types for the FableFlow generation pipeline.
//!
//! This crate provides the foundation data types used across all FableFlow
//! interfaces: conversation messages, chat requests, and the unified
//! completion type carrying finish-reason and token-usage metadata.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod completion;
mod message;
mod request;
mod role;
mod tokens;

pub use completion::{ChatCompletion, FinishReason};
pub use message::Message;
pub use request::{ChatRequest, ChatRequestBuilder};
pub use role::Role;
pub use tokens::{TokenUsage, estimate_tokens};
