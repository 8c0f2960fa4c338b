//! Continuation-safe long-form generation.
//!
//! Token-limited backends truncate long responses in two ways: hard
//! truncation signaled through `finish_reason=length`, and soft
//! truncation where the model emits its own "continuing in next
//! response..." sentence while still reporting `stop`. This crate
//! drives a [`fableflow_interface::ChatDriver`] through a bounded loop
//! that detects both signals, replays the partial assistant turn with a
//! continuation request, strips continuation artifacts, and merges the
//! chunks into one logical response.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cancel;
mod config;
mod indicators;
mod metadata;
mod service;

pub use cancel::CancelToken;
pub use config::ContinuationConfig;
pub use indicators::IndicatorSet;
pub use metadata::{CompletionStrategy, ContinuationMetadata, ContinuationResult, Outcome};
pub use service::ContinuationService;
