//! OpenAI-compatible chat and image clients.

mod client;
mod image;
mod wire;

pub use client::OpenAiClient;
pub use image::OpenAiImageClient;
