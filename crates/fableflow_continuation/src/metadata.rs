//! Result metadata reported by the continuation loop.

use derive_getters::Getters;
use fableflow_core::FinishReason;
use serde::{Deserialize, Serialize};

/// Which generation strategy produced a result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStrategy {
    /// Continuation disabled; exactly one backend call was made.
    Single,
    /// Hybrid finish-reason plus tail-pattern detection.
    HybridDetection,
}

/// How the loop terminated, distinct from the raw finish reason.
///
/// Callers branch on this instead of inspecting error messages:
/// `Partial` means degraded-but-usable content, `Truncated` means the
/// continuation budget ran out while the backend still wanted to
/// continue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Natural completion.
    Complete,
    /// Generation ended early (content filter, unknown finish reason,
    /// or a backend failure after some content had accumulated).
    Partial,
    /// The configured continuation maximum was reached while the
    /// backend still signaled truncation.
    Truncated,
}

/// Metadata describing how a logical generation call unfolded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Getters)]
pub struct ContinuationMetadata {
    /// Number of continuation calls made beyond the first.
    total_continuations: u32,
    /// Finish reason from the last backend call.
    finish_reason: FinishReason,
    /// Total tokens across all chunks (backend-reported or estimated).
    total_tokens: usize,
    /// Strategy used for this request.
    strategy: CompletionStrategy,
    /// How the loop terminated.
    outcome: Outcome,
}

impl ContinuationMetadata {
    pub(crate) fn new(
        total_continuations: u32,
        finish_reason: FinishReason,
        total_tokens: usize,
        strategy: CompletionStrategy,
        outcome: Outcome,
    ) -> Self {
        Self {
            total_continuations,
            finish_reason,
            total_tokens,
            strategy,
            outcome,
        }
    }
}

/// A completed logical generation: the merged text plus metadata.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct ContinuationResult {
    /// The merged text of all chunks, continuation artifacts removed.
    text: String,
    /// How the result was produced.
    metadata: ContinuationMetadata,
}

impl ContinuationResult {
    pub(crate) fn new(text: String, metadata: ContinuationMetadata) -> Self {
        Self { text, metadata }
    }

    /// Consumes the result, returning the merged text.
    pub fn into_text(self) -> String {
        self.text
    }
}
