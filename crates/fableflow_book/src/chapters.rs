//! Chapter boundary detection for markdown story text.

use std::sync::LazyLock;

use regex::Regex;

/// Matches a chapter heading line, with or without a `##` prefix, with
/// numeric or spelled-out numbers ("Chapter 3", "## Chapter Two: The Storm").
static CHAPTER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:##\s*)?Chapter\s+(?:\d+|One|Two|Three|Four|Five|Six|Seven|Eight|Nine|Ten)(?:[:\s].*)?$",
    )
    .unwrap_or_else(|_| unreachable!("chapter marker pattern is valid"))
});

/// A detected chapter: its heading title and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChapter {
    /// The heading line with any `##` prefix stripped.
    pub title: String,
    /// Body lines joined with newlines, leading blanks removed.
    pub body: String,
}

/// Splits story markdown into chapters on chapter heading lines.
///
/// The first `#` heading is treated as the book title and skipped.
/// Text before the first chapter marker is discarded once a marker is
/// found; when no markers exist the substantive lines (not blank, not a
/// heading, not a `---` rule) become a single chapter titled "Story".
pub fn detect_chapters(text: &str) -> Vec<RawChapter> {
    let mut chapters: Vec<RawChapter> = Vec::new();
    let mut current_title: Option<String> = None;
    let mut current_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if CHAPTER_MARKER.is_match(line.trim()) {
            if let Some(title) = current_title.take() {
                chapters.push(finish_chapter(title, &current_lines));
                current_lines.clear();
            }
            let title = line.trim().trim_start_matches('#').trim().to_string();
            current_title = Some(title);
            continue;
        }
        if current_title.is_some() {
            current_lines.push(line);
        }
    }
    if let Some(title) = current_title.take() {
        chapters.push(finish_chapter(title, &current_lines));
    }

    if chapters.is_empty() {
        let body: Vec<&str> = text
            .lines()
            .filter(|l| {
                let t = l.trim();
                !t.starts_with('#') && t != "---"
            })
            .collect();
        let body = body.join("\n").trim().to_string();
        if body.is_empty() {
            return Vec::new();
        }
        return vec![RawChapter {
            title: "Story".to_string(),
            body,
        }];
    }

    chapters
}

fn finish_chapter(title: String, lines: &[&str]) -> RawChapter {
    let start = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(lines.len());
    RawChapter {
        title,
        body: lines[start..].join("\n").trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_chapters_with_spelled_numbers() {
        let text = "# The Sleepy Fox\n\n## Chapter 1: The Den\nFox slept.\n\nChapter Two\nFox woke.\n\n## Chapter 3: The Meadow\nFox ran.";
        let chapters = detect_chapters(text);
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].title, "Chapter 1: The Den");
        assert_eq!(chapters[0].body, "Fox slept.");
        assert_eq!(chapters[1].title, "Chapter Two");
        assert_eq!(chapters[2].body, "Fox ran.");
    }

    #[test]
    fn no_markers_produces_single_story_chapter() {
        let text = "# Title\n\nOnce upon a time.\n\nThe end.";
        let chapters = detect_chapters(text);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "Story");
        assert_eq!(chapters[0].body, "Once upon a time.\n\nThe end.");
    }

    #[test]
    fn pre_chapter_prose_is_discarded_once_a_marker_exists() {
        let text = "# Book\nA prologue line.\n\n## Chapter 1: Begin\nStory starts.";
        let chapters = detect_chapters(text);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].body, "Story starts.");
    }

    #[test]
    fn horizontal_rules_and_headings_are_not_prose() {
        let text = "# Book\n---\n## Not a chapter heading\n\n## Chapter 1\nHello.";
        let chapters = detect_chapters(text);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].body, "Hello.");
    }

    #[test]
    fn empty_text_yields_no_chapters() {
        assert!(detect_chapters("").is_empty());
        assert!(detect_chapters("# Only a title\n---\n").is_empty());
    }

    #[test]
    fn mid_sentence_chapter_word_is_not_a_marker() {
        let text = "## Chapter 1\nHe read a chapter 2 times.";
        let chapters = detect_chapters(text);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].body, "He read a chapter 2 times.");
    }
}
