//! Token accounting for generated text.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Token usage reported by a backend for a single request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Getters,
)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt
    prompt_tokens: usize,
    /// Tokens in the generated completion
    completion_tokens: usize,
    /// Combined total
    total_tokens: usize,
}

impl TokenUsage {
    /// Build a usage record; the total is derived.
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Rough token count for text whose backend reported no usage.
///
/// Uses the common approximation of one token per four characters,
/// which is close enough for budget accounting.
///
/// # Examples
///
/// ```
/// assert_eq!(fableflow_core::estimate_tokens("twelve chars"), 3);
/// ```
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_derived() {
        let usage = TokenUsage::new(120, 80);
        assert_eq!(*usage.total_tokens(), 200);
    }

    #[test]
    fn estimate_rounds_down() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
    }
}
