//! FableFlow - LLM Story Pipeline and Book Producer
//!
//! FableFlow turns a draft children's story into an illustrated,
//! press-ready book. A chain of LLM editorial passes refines the
//! manuscript, an illustration planner places image markup, an image
//! backend renders the artwork, and a document engine assembles the
//! result into paginated PDF and reflowable EPUB files.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fableflow::{OpenAiClient, OpenAiImageClient, Pipeline, PipelineContext, Settings};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load()?;
//!     let chat = OpenAiClient::new(
//!         &settings.chat.base_url,
//!         settings.chat.api_key(),
//!         &settings.chat.model,
//!         settings.chat.timeout(),
//!     )?;
//!     let image = OpenAiImageClient::new(
//!         &settings.image.base_url,
//!         settings.image.api_key(),
//!         &settings.image.model,
//!         settings.image.timeout(),
//!     )?;
//!
//!     let ctx = PipelineContext::new("output", Arc::new(chat), Arc::new(image));
//!     Pipeline::standard().run(&ctx).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! FableFlow is organized as a workspace with focused crates:
//!
//! - `fableflow_core` - Chat data types (Message, ChatCompletion, etc.)
//! - `fableflow_interface` - ChatDriver and ImageDriver trait definitions
//! - `fableflow_error` - Error types
//! - `fableflow_models` - OpenAI-compatible backend clients
//! - `fableflow_continuation` - Continuation-safe long-form generation
//! - `fableflow_book` - Document model, layout engine, PDF and EPUB writers
//! - `fableflow_pipeline` - Staged publishing pipeline with resume support
//!
//! This crate (`fableflow`) re-exports everything for convenience and
//! ships the CLI binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod settings;

pub use settings::{ModelConfig, PathsConfig, Settings};

pub use fableflow_book::*;
pub use fableflow_continuation::*;
pub use fableflow_core::*;
pub use fableflow_error::*;
pub use fableflow_interface::*;
pub use fableflow_models::*;
pub use fableflow_pipeline::*;
