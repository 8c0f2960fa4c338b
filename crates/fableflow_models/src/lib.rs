//! Backend integrations for FableFlow.
//!
//! The pipeline talks to any OpenAI-compatible chat-completions server
//! (a hosted API or a local inference server), and to an
//! OpenAI-compatible image-generation endpoint for illustrations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod openai;

pub use openai::{OpenAiClient, OpenAiImageClient};
