//! Detection and removal of self-reported continuation markers.

use regex::Regex;
use tracing::debug;

/// How many trailing characters to scan when a pattern is not an exact
/// suffix of the chunk. Handles markers followed by stray whitespace or
/// punctuation.
const TAIL_WINDOW_CHARS: usize = 200;

/// A compiled set of continuation-indicator phrases.
///
/// Detection checks the chunk tail for any phrase (case-insensitive).
/// Cleaning is narrower than detection: bracketed and parenthetical
/// artifact forms are stripped wherever they appear, while bare phrases
/// are stripped only at the end of a line, so story text that happens
/// to contain one survives.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    lowered: Vec<String>,
    cleaners: Vec<Regex>,
}

impl IndicatorSet {
    /// Compiles the given phrases. Phrases are treated as literals,
    /// never as regex syntax.
    pub fn new(patterns: &[String]) -> Self {
        let lowered = patterns.iter().map(|p| p.to_lowercase()).collect();
        let cleaners = patterns
            .iter()
            .filter_map(|p| {
                let escaped = regex::escape(p);
                let pattern = if p.starts_with('[') || p.starts_with('(') {
                    // Artifact forms are never story text.
                    format!("(?i){}", escaped)
                } else {
                    format!("(?im){}\\.{{0,3}}[ \\t]*$", escaped)
                };
                Regex::new(&pattern).ok()
            })
            .collect();
        Self { lowered, cleaners }
    }

    /// Whether the chunk's tail carries a continuation marker.
    ///
    /// Empty or whitespace-only content short-circuits to `false`.
    /// The exact-suffix check runs first; the windowed substring scan
    /// is the fallback for markers not at the very end.
    pub fn detect(&self, content: &str) -> bool {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return false;
        }
        let lowered = trimmed.to_lowercase();

        for pattern in &self.lowered {
            if lowered.ends_with(pattern.as_str()) {
                debug!(pattern = %pattern, "Detected continuation indicator");
                return true;
            }
        }

        let tail = tail_window(&lowered, TAIL_WINDOW_CHARS);
        for pattern in &self.lowered {
            if tail.contains(pattern.as_str()) {
                debug!(pattern = %pattern, "Detected continuation indicator in tail");
                return true;
            }
        }

        false
    }

    /// Strips indicator artifacts from the content and trims trailing
    /// whitespace left behind. Bare phrases away from a line end are
    /// left alone.
    pub fn clean(&self, content: &str) -> String {
        if content.is_empty() {
            return String::new();
        }

        let mut cleaned = content.to_string();
        for cleaner in &self.cleaners {
            if cleaner.is_match(&cleaned) {
                cleaned = cleaner.replace_all(&cleaned, "").into_owned();
            }
        }
        let cleaned = cleaned.trim_end().to_string();

        if cleaned.len() < content.len() {
            debug!(
                removed = content.len() - cleaned.len(),
                "Cleaned continuation indicator characters"
            );
        }
        cleaned
    }
}

/// Last `window` characters of `text`, on a char boundary.
fn tail_window(text: &str, window: usize) -> &str {
    let start = text
        .char_indices()
        .rev()
        .take(window)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0);
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContinuationConfig;

    fn default_set() -> IndicatorSet {
        IndicatorSet::new(&ContinuationConfig::default().indicator_patterns)
    }

    #[test]
    fn detects_exact_trailing_marker() {
        let set = default_set();
        assert!(set.detect(
            "The dragon slept.\n\n[Continuing in next response due to length constraints...]"
        ));
    }

    #[test]
    fn detects_marker_inside_tail_window() {
        let set = default_set();
        let content = format!(
            "Story text. Continuation follows in next response. {}",
            "x".repeat(50)
        );
        assert!(set.detect(&content));
    }

    #[test]
    fn marker_outside_tail_window_is_ignored() {
        let set = default_set();
        let content = format!(
            "Early note: continuation follows in next response. {}",
            "x".repeat(400)
        );
        assert!(!set.detect(&content));
    }

    #[test]
    fn whitespace_only_content_never_matches() {
        let set = default_set();
        assert!(!set.detect(""));
        assert!(!set.detect("   \n\t  "));
    }

    #[test]
    fn detection_is_case_insensitive() {
        let set = default_set();
        assert!(set.detect("done for now. CONTINUATION FOLLOWS"));
    }

    #[test]
    fn clean_strips_marker_and_trailing_whitespace() {
        let set = default_set();
        let cleaned = set.clean(
            "The dragon slept.\n\n[Continuing in next response due to length constraints...]",
        );
        assert_eq!(cleaned, "The dragon slept.");
    }

    #[test]
    fn clean_preserves_unmarked_content() {
        let set = default_set();
        assert_eq!(set.clean("A complete story."), "A complete story.");
    }

    #[test]
    fn clean_keeps_story_text_containing_a_bare_phrase() {
        let set = default_set();
        let content = "She trimmed the speech due to length constraints imposed by the mayor.\n\n\
                       [Continuing in next response due to length constraints...]";
        let cleaned = set.clean(content);
        assert_eq!(
            cleaned,
            "She trimmed the speech due to length constraints imposed by the mayor."
        );
    }

    #[test]
    fn clean_strips_bare_phrase_only_at_line_end() {
        let set = default_set();
        let cleaned = set.clean("The fox ran home.\nContinuation follows in next response.");
        assert_eq!(cleaned, "The fox ran home.");
    }

    #[test]
    fn tail_window_respects_char_boundaries() {
        let text = "é".repeat(300);
        let tail = tail_window(&text, 200);
        assert_eq!(tail.chars().count(), 200);
    }
}
