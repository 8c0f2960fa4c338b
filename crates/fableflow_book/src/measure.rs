//! Text width estimation for line breaking.

use crate::style::Font;

/// Measures rendered text width in points.
///
/// Layout only needs widths good enough for consistent line breaking;
/// exact glyph metrics are not required because both passes use the
/// same measurer and therefore agree on page counts.
pub trait TextMeasurer {
    /// Width of `text` set in `font` at `size` points.
    fn text_width(&self, text: &str, font: Font, size: f32) -> f32;

    /// Greedily wraps `text` into lines no wider than `max_width`.
    /// A single word wider than the frame gets its own line.
    fn wrap(&self, text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        for word in text.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if self.text_width(&candidate, font, size) <= max_width || current.is_empty() {
                current = candidate;
            } else {
                lines.push(current);
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }
}

/// Character-class width table for the base-14 faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMeasurer;

impl ApproxMeasurer {
    /// Creates a measurer.
    pub fn new() -> Self {
        Self
    }

    fn char_em(c: char, font: Font) -> f32 {
        let serif = matches!(font, Font::TimesRoman | Font::TimesItalic);
        let base = match c {
            'i' | 'j' | 'l' | '.' | ',' | '\'' | '!' | '|' | ':' | ';' => 0.28,
            'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' | ' ' => 0.35,
            'm' | 'w' => 0.78,
            'M' | 'W' => 0.94,
            '0'..='9' => 0.5,
            'A'..='Z' => 0.7,
            _ => 0.5,
        };
        // Times runs a little narrower than Helvetica.
        if serif { base * 0.93 } else { base }
    }
}

impl TextMeasurer for ApproxMeasurer {
    fn text_width(&self, text: &str, font: Font, size: f32) -> f32 {
        let bold = matches!(font, Font::HelveticaBold);
        let scale = if bold { 1.06 } else { 1.0 };
        text.chars()
            .map(|c| Self::char_em(c, font) * size * scale)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wider_text_measures_wider() {
        let measurer = ApproxMeasurer::new();
        let narrow = measurer.text_width("ill", Font::TimesRoman, 16.0);
        let wide = measurer.text_width("WMW", Font::TimesRoman, 16.0);
        assert!(wide > narrow * 2.0);
    }

    #[test]
    fn wrap_respects_max_width() {
        let measurer = ApproxMeasurer::new();
        let lines = measurer.wrap(
            "the quick brown fox jumps over the lazy dog",
            Font::TimesRoman,
            16.0,
            120.0,
        );
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(measurer.text_width(line, Font::TimesRoman, 16.0) <= 120.0);
        }
    }

    #[test]
    fn oversized_word_gets_its_own_line() {
        let measurer = ApproxMeasurer::new();
        let lines = measurer.wrap(
            "supercalifragilisticexpialidocious no",
            Font::TimesRoman,
            16.0,
            40.0,
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "no");
    }
}
