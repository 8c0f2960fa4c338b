//! Continuation behavior configuration.

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::ContinuationService`].
///
/// Constructed once at process entry and injected into the service;
/// nothing in this crate reads ambient global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuationConfig {
    /// Whether the continuation loop runs at all. When false every
    /// logical request maps to exactly one backend call.
    pub enabled: bool,
    /// Upper bound on continuation calls per logical request.
    pub max_continuations: u32,
    /// Token budget per chunk when the caller supplies no max.
    pub chunk_size: u32,
    /// Tail phrases that mark a self-reported truncation even when the
    /// backend reports `stop`. Matched case-insensitively against the
    /// end of each chunk. The defaults are tuned to observed model
    /// wording; extend this list per backend rather than assuming it
    /// is exhaustive.
    pub indicator_patterns: Vec<String>,
    /// Preamble phrases a continuation chunk may open with; stripped
    /// before the chunk is merged.
    pub preamble_prefixes: Vec<String>,
}

impl Default for ContinuationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_continuations: 5,
            chunk_size: 32_000,
            indicator_patterns: default_indicator_patterns(),
            preamble_prefixes: default_preamble_prefixes(),
        }
    }
}

fn default_indicator_patterns() -> Vec<String> {
    [
        // Bracket-style indicators
        "[continuing with remaining chapters in next response due to length...]",
        "[continuing in next response due to length constraints...]",
        "[continued in next response due to length limits...]",
        "[continuation follows in next response...]",
        "[remaining content in next response...]",
        // Parenthetical indicators
        "(continuing with remaining chapters in next response due to length...)",
        "(continued in next response due to length constraints...)",
        "(continuation follows due to length limits...)",
        // Direct statements
        "continuing with remaining chapters in next response due to length",
        "continued in next response due to length constraints",
        "continuation follows in next response",
        "remaining chapters will be provided in the next response",
        // General patterns
        "due to length constraints",
        "due to length limits",
        "in next response due to length",
        "continuing in next response",
        "continuation follows",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_preamble_prefixes() -> Vec<String> {
    [
        "Continuing from where I left off:",
        "Continuing:",
        "Here's the continuation:",
        "Resuming:",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
