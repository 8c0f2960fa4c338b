//! Trait definitions for FableFlow generation backends.
//!
//! This crate provides the driver traits that text and image backends
//! implement. Everything above this layer (continuation, pipeline stages)
//! is written against these traits rather than any concrete client.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;

pub use traits::{ChatDriver, ImageDriver};
