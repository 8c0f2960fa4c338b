//! Converts story markdown into the page-structured HTML both
//! renderers consume.

use std::sync::LazyLock;

use regex::Regex;
use tracing::instrument;

use crate::chapters::detect_chapters;
use crate::meta::BookMeta;

/// Matches inline image markup: `<image>3 [A fox under the moon]</image>`.
/// The number is 1-based in the markup and maps to `image_{n-1}.png`.
static IMAGE_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<image>\s*(\d+)\s*\[([^\]]+)\]</image>")
        .unwrap_or_else(|_| unreachable!("image markup pattern is valid"))
});

/// Matches a whole line set in asterisk emphasis, treated as a poem line.
static POEM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\*(.+?)\*\s*$").unwrap_or_else(|_| unreachable!("poem line pattern is valid"))
});

/// Turns chapter-detected markdown into paged HTML sections.
#[derive(Debug, Clone, Default)]
pub struct StoryFormatter;

impl StoryFormatter {
    /// Creates a formatter.
    pub fn new() -> Self {
        Self
    }

    /// Formats a full story into page-spread HTML: one spread per
    /// chapter, preceded by a deterministic table of contents.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub fn format_story(&self, text: &str) -> String {
        let chapters = detect_chapters(text);
        let mut html = String::new();
        html.push_str(&self.format_toc(
            &chapters
                .iter()
                .map(|c| c.title.as_str())
                .collect::<Vec<_>>(),
        ));
        for chapter in &chapters {
            html.push_str(&self.format_chapter(&chapter.title, &chapter.body));
        }
        html
    }

    /// Formats a single chapter as a page spread with a chapter title
    /// heading and the formatted body.
    pub fn format_chapter(&self, title: &str, body: &str) -> String {
        let mut html = String::new();
        html.push_str("<div class=\"page-spread\">\n<div class=\"page\">\n");
        html.push_str(&format!(
            "<h2 class=\"chapter-title\">{}</h2>\n",
            escape_html(title)
        ));
        html.push_str(&self.format_body(body));
        html.push_str("</div>\n</div>\n");
        html
    }

    /// Formats chapter body markdown: image markup, poem grouping, and
    /// paragraph wrapping.
    pub fn format_body(&self, body: &str) -> String {
        let mut html = String::new();
        let mut paragraph: Vec<String> = Vec::new();
        let mut poem: Vec<String> = Vec::new();

        for line in body.lines() {
            let trimmed = line.trim();
            if let Some(caps) = IMAGE_MARKUP.captures(trimmed) {
                flush_paragraph(&mut html, &mut paragraph);
                flush_poem(&mut html, &mut poem);
                html.push_str(&render_image(&caps));
                continue;
            }
            if let Some(caps) = POEM_LINE.captures(line) {
                flush_paragraph(&mut html, &mut paragraph);
                poem.push(caps[1].to_string());
                continue;
            }
            if trimmed.is_empty() {
                flush_paragraph(&mut html, &mut paragraph);
                flush_poem(&mut html, &mut poem);
                continue;
            }
            flush_poem(&mut html, &mut poem);
            paragraph.push(trimmed.to_string());
        }
        flush_paragraph(&mut html, &mut paragraph);
        flush_poem(&mut html, &mut poem);
        html
    }

    /// Builds the table-of-contents spread from chapter titles. Page
    /// numbers are resolved by the fixed-page renderer, so entries here
    /// carry titles only.
    pub fn format_toc(&self, titles: &[&str]) -> String {
        let mut html = String::new();
        html.push_str("<div class=\"page-spread\">\n<div class=\"page toc-page\">\n");
        html.push_str("<h1 class=\"toc-title\">Table of Contents</h1>\n");
        for title in titles {
            html.push_str(&format!(
                "<div class=\"toc-entry\"><span class=\"chapter-name\">{}</span></div>\n",
                escape_html(title)
            ));
        }
        html.push_str("</div>\n</div>\n");
        html
    }

    /// Builds the full-bleed front cover page from metadata.
    pub fn front_cover(&self, meta: &BookMeta) -> String {
        let meta = meta.normalized();
        let subtitle = if meta.subtitle.is_empty() {
            String::new()
        } else {
            format!(
                "<h2 class=\"cover-subtitle\">{}</h2>\n",
                escape_html(&meta.subtitle)
            )
        };
        format!(
            "<div class=\"page-spread\">\n<div class=\"page front-cover\">\n\
             <img src=\"front_cover.png\" alt=\"{}\" class=\"cover-image\"/>\n\
             <h1 class=\"cover-title\">{}</h1>\n{}\
             <p class=\"cover-author\">{}</p>\n</div>\n</div>\n",
            escape_html(&meta.title),
            escape_html(&meta.title),
            subtitle,
            escape_html(&meta.author),
        )
    }

    /// Builds the formal interior title page.
    pub fn title_page(&self, meta: &BookMeta) -> String {
        let meta = meta.normalized();
        let subtitle = if meta.subtitle.is_empty() {
            String::new()
        } else {
            format!(
                "<h2 class=\"title-page-subtitle\">{}</h2>\n",
                escape_html(&meta.subtitle)
            )
        };
        format!(
            "<div class=\"page-spread\">\n<div class=\"page title-page\">\n\
             <h1 class=\"title-page-title\">{}</h1>\n{}\
             <p class=\"title-page-author\">by {}</p>\n\
             <p class=\"title-page-publisher\">{}</p>\n</div>\n</div>\n",
            escape_html(&meta.title),
            subtitle,
            escape_html(&meta.author),
            escape_html(&meta.publisher),
        )
    }

    /// Builds the publication-info (copyright) page. `epub` selects
    /// which ISBN is shown.
    pub fn publication_info(&self, meta: &BookMeta, epub: bool) -> String {
        let meta = meta.normalized();
        format!(
            "<div class=\"page-spread\">\n<div class=\"page publication-info\">\n\
             <p class=\"pub-line\">{}</p>\n\
             <p class=\"pub-line\">Copyright \u{a9} {} {}</p>\n\
             <p class=\"pub-line\">All rights reserved.</p>\n\
             <p class=\"pub-line\">{}</p>\n\
             <p class=\"pub-line\">{}, {}</p>\n\
             <p class=\"pub-line\">ISBN: {}</p>\n</div>\n</div>\n",
            escape_html(&meta.title),
            escape_html(&meta.publication_year),
            escape_html(&meta.author),
            escape_html(&meta.edition),
            escape_html(&meta.publisher),
            escape_html(&meta.publisher_location),
            escape_html(meta.isbn_for(epub)),
        )
    }

    /// Builds the full-bleed back cover with the book description.
    pub fn back_cover(&self, meta: &BookMeta) -> String {
        let meta = meta.normalized();
        format!(
            "<div class=\"page-spread\">\n<div class=\"page back-cover\">\n\
             <img src=\"back_cover.png\" alt=\"\" class=\"cover-image\"/>\n\
             <p class=\"back-cover-text\">{}</p>\n\
             <p class=\"back-cover-publisher\">{}</p>\n</div>\n</div>\n",
            escape_html(&meta.description),
            escape_html(&meta.publisher),
        )
    }
}

fn flush_paragraph(html: &mut String, paragraph: &mut Vec<String>) {
    if paragraph.is_empty() {
        return;
    }
    html.push_str(&format!(
        "<p class=\"story-text\">{}</p>\n",
        escape_html(&paragraph.join(" "))
    ));
    paragraph.clear();
}

fn flush_poem(html: &mut String, poem: &mut Vec<String>) {
    if poem.is_empty() {
        return;
    }
    html.push_str("<div class=\"poem-box\">\n");
    for line in poem.iter() {
        html.push_str(&format!(
            "<p class=\"poem-verse\">{}</p>\n",
            escape_html(line)
        ));
    }
    html.push_str("</div>\n");
    poem.clear();
}

fn render_image(caps: &regex::Captures<'_>) -> String {
    let number: usize = caps[1].parse().unwrap_or(1);
    let index = number.saturating_sub(1);
    let caption = caps[2].trim().to_string();
    format!(
        "<div class=\"image-full-page\">\n\
         <img src=\"image_{index}.png\" alt=\"{}\"/>\n\
         <div class=\"caption\">{}</div>\n</div>\n",
        escape_html(&caption),
        escape_html(&caption),
    )
}

/// Escapes the five XML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_markup_is_one_based() {
        let formatter = StoryFormatter::new();
        let html = formatter.format_body("<image>3 [A fox under the moon]</image>");
        assert!(html.contains("image_2.png"));
        assert!(html.contains("A fox under the moon"));
        assert!(html.contains("image-full-page"));
    }

    #[test]
    fn poem_lines_group_into_one_box() {
        let formatter = StoryFormatter::new();
        let html = formatter.format_body("*Roses are red*\n*Violets are blue*\n\nProse resumes.");
        assert_eq!(html.matches("poem-box").count(), 1);
        assert_eq!(html.matches("poem-verse").count(), 2);
        assert!(html.contains("<p class=\"story-text\">Prose resumes.</p>"));
    }

    #[test]
    fn paragraph_runs_join_with_spaces() {
        let formatter = StoryFormatter::new();
        let html = formatter.format_body("Line one\nline two.\n\nSecond paragraph.");
        assert!(html.contains("<p class=\"story-text\">Line one line two.</p>"));
        assert!(html.contains("<p class=\"story-text\">Second paragraph.</p>"));
    }

    #[test]
    fn format_story_emits_toc_then_chapters() {
        let formatter = StoryFormatter::new();
        let html = formatter.format_story("## Chapter 1: Intro\nHello world.");
        let toc_pos = html
            .find("toc-page")
            .unwrap_or_else(|| panic!("missing toc"));
        let chapter_pos = html
            .find("chapter-title")
            .unwrap_or_else(|| panic!("missing chapter"));
        assert!(toc_pos < chapter_pos);
        assert!(html.contains("Chapter 1: Intro"));
        assert_eq!(html.matches("Hello world.").count(), 1);
    }

    #[test]
    fn metadata_is_escaped_in_front_matter() {
        let formatter = StoryFormatter::new();
        let mut meta = BookMeta::default();
        meta.title = "Tom & Jerry <3".to_string();
        let html = formatter.title_page(&meta);
        assert!(html.contains("Tom &amp; Jerry &lt;3"));
    }
}
