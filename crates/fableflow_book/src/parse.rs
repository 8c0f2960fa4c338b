//! Parses paged HTML into the tagged [`Document`] model.

use std::sync::LazyLock;

use fableflow_error::{BookError, BookErrorKind, FableFlowResult};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{instrument, warn};

use crate::meta::BookMeta;
use crate::model::{Block, Document, ImageLayout, ParagraphStyle, PoemKind, Section, SectionKind};

/// Matches generated story image filenames for ordered extraction.
static IMAGE_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src="((?:images/)?image_\d+\.png)""#)
        .unwrap_or_else(|_| unreachable!("image filename pattern is valid"))
});

/// Matches legacy `<image>N [caption]</image>` markup left unconverted.
static LEGACY_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<image>\s*(\d+)\s*\[[^\]]*\]</image>")
        .unwrap_or_else(|_| unreachable!("legacy image pattern is valid"))
});

/// Matches a malformed img tag where attribute text leaked into bare
/// `word=""` fragments, e.g. `<img src="a.png" alt="A" fox="" ran=""/>`.
static BROKEN_IMG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<img\s+([^>]*?alt="[^"]*"(?:\s+[\w-]+="")+[^>]*?)/?>"#)
        .unwrap_or_else(|_| unreachable!("broken img pattern is valid"))
});

static EMPTY_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+([\w-]+)="""#).unwrap_or_else(|_| unreachable!("empty attr pattern is valid"))
});

/// Parses model-produced HTML into sections and typed blocks.
#[derive(Debug, Clone, Default)]
pub struct DocumentParser;

impl DocumentParser {
    /// Creates a parser.
    pub fn new() -> Self {
        Self
    }

    /// Strips markdown code fences and repairs malformed image tags.
    ///
    /// Model output sometimes arrives wrapped in ```` ```html ````
    /// fences, or with img alt text split into bare `word=""`
    /// attribute fragments. Both are fixed before parsing.
    pub fn clean_html(&self, raw: &str) -> String {
        let mut lines: Vec<&str> = Vec::new();
        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed == "```html" || trimmed == "```" {
                continue;
            }
            lines.push(line);
        }
        let joined = lines.join("\n");
        let unfenced = joined.replace("```", "");
        repair_img_tags(&unfenced)
    }

    /// Extracts image filenames referenced by the HTML, in document
    /// order: generated `image_N.png` sources first, then any legacy
    /// `<image>` markup still present.
    pub fn extract_image_references(&self, html: &str) -> Vec<String> {
        let mut refs: Vec<String> = Vec::new();
        for caps in IMAGE_FILENAME.captures_iter(html) {
            let name = caps[1].trim_start_matches("images/").to_string();
            if !refs.contains(&name) {
                refs.push(name);
            }
        }
        for caps in LEGACY_IMAGE.captures_iter(html) {
            if let Ok(number) = caps[1].parse::<usize>() {
                let name = format!("image_{}.png", number.saturating_sub(1));
                if !refs.contains(&name) {
                    refs.push(name);
                }
            }
        }
        refs
    }

    /// Parses cleaned HTML into a [`Document`]. Pages are classified by
    /// their CSS classes; the back cover is moved to the end by the
    /// document constructor.
    #[instrument(skip_all, fields(chars = html.len()))]
    pub fn parse(&self, html: &str, meta: BookMeta) -> FableFlowResult<Document> {
        let cleaned = self.clean_html(html);
        let fragment = Html::parse_fragment(&cleaned);
        let page_selector = selector("div.page")?;

        let mut sections: Vec<Section> = Vec::new();
        for page in fragment.select(&page_selector) {
            let kind = classify_page(&page);
            let title = page_title(&page, kind);
            let blocks = parse_blocks(&page)?;
            if blocks.is_empty() && !kind.is_cover() && kind != SectionKind::TableOfContents {
                warn!(?kind, "skipping empty page");
                continue;
            }
            sections.push(Section {
                kind,
                title,
                blocks,
            });
        }

        if sections.is_empty() {
            return Err(BookError::new(BookErrorKind::EmptyDocument).into());
        }
        Ok(Document::new(sections, meta))
    }
}

fn selector(css: &str) -> FableFlowResult<Selector> {
    Selector::parse(css)
        .map_err(|e| BookError::new(BookErrorKind::PdfAssembly(format!("selector: {e}"))).into())
}

fn repair_img_tags(html: &str) -> String {
    BROKEN_IMG
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let attrs = &caps[1];
            let mut extra_words: Vec<String> = Vec::new();
            for word in EMPTY_ATTR.captures_iter(attrs) {
                extra_words.push(word[1].to_string());
            }
            let cleaned = EMPTY_ATTR.replace_all(attrs, "").to_string();
            let suffix = extra_words.join(" ");
            let merged = if suffix.is_empty() {
                cleaned
            } else {
                // Fold the stray words back into the alt text.
                match cleaned.find("alt=\"") {
                    Some(start) => {
                        let end = cleaned[start + 5..]
                            .find('"')
                            .map(|i| start + 5 + i)
                            .unwrap_or(cleaned.len());
                        format!(
                            "{} {}{}",
                            &cleaned[..end],
                            suffix,
                            &cleaned[end..]
                        )
                    }
                    None => cleaned,
                }
            };
            format!("<img {}/>", merged.trim())
        })
        .into_owned()
}

fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn classify_page(page: &ElementRef<'_>) -> SectionKind {
    const CLASSES: &[(&str, SectionKind)] = &[
        ("front-cover", SectionKind::FrontCover),
        ("front-cover-page", SectionKind::FrontCover),
        ("title-page", SectionKind::TitlePage),
        ("explicit-title-page", SectionKind::TitlePage),
        ("publication-info", SectionKind::PublicationInfo),
        ("toc-page", SectionKind::TableOfContents),
        ("table-of-contents", SectionKind::TableOfContents),
        ("preface", SectionKind::Preface),
        ("about-author", SectionKind::AboutAuthor),
        ("acknowledgments", SectionKind::Acknowledgments),
        ("index-page", SectionKind::Index),
        ("back-cover", SectionKind::BackCover),
        ("back-cover-page", SectionKind::BackCover),
    ];
    for (class, kind) in CLASSES {
        if has_class(page, class) {
            return *kind;
        }
    }
    SectionKind::Chapter
}

fn page_title(page: &ElementRef<'_>, kind: SectionKind) -> String {
    for selector_str in ["h2.chapter-title", "h1", "h2"] {
        if let Ok(sel) = Selector::parse(selector_str) {
            if let Some(heading) = page.select(&sel).next() {
                let text: String = heading.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }
    kind.default_title().to_string()
}

fn parse_blocks(page: &ElementRef<'_>) -> FableFlowResult<Vec<Block>> {
    let mut blocks: Vec<Block> = Vec::new();
    for child in page.children() {
        let Some(element) = ElementRef::wrap(child) else {
            continue;
        };
        parse_element(&element, &mut blocks)?;
    }
    Ok(blocks)
}

fn parse_element(element: &ElementRef<'_>, blocks: &mut Vec<Block>) -> FableFlowResult<()> {
    let name = element.value().name();
    match name {
        "h1" | "h2" | "h3" => {
            // Headings become the section title, not a block.
        }
        "p" => {
            let text = element.text().collect::<String>().trim().to_string();
            if text.is_empty() {
                return Ok(());
            }
            let style = paragraph_style(element);
            blocks.push(Block::Paragraph { text, style });
        }
        "img" => {
            blocks.push(image_block(element, ImageLayout::Inline));
        }
        "hr" => blocks.push(Block::PageBreak),
        "div" => {
            if has_class(element, "poem-box")
                || has_class(element, "verse")
                || has_class(element, "chant")
                || has_class(element, "chant-box")
                || has_class(element, "song")
                || has_class(element, "song-lyrics")
                || has_class(element, "haiku")
                || has_class(element, "haiku-box")
                || has_class(element, "limerick")
                || has_class(element, "limerick-box")
                || has_class(element, "cinquain")
                || has_class(element, "cinquain-box")
            {
                blocks.push(poem_block(element)?);
            } else if has_class(element, "image-full-page")
                || has_class(element, "image-spread")
                || has_class(element, "image-inline")
                || has_class(element, "image-inline-left")
                || has_class(element, "image-inline-right")
                || has_class(element, "image-chapter-opener")
                || has_class(element, "chapter-opener-image")
            {
                blocks.push(image_container_block(element)?);
            } else if has_class(element, "toc-entry") {
                let text = element.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    blocks.push(Block::Paragraph {
                        text,
                        style: ParagraphStyle::Story,
                    });
                }
            } else if has_class(element, "story-break") {
                let text = element.text().collect::<String>().trim().to_string();
                blocks.push(Block::StoryBreak {
                    text: if text.is_empty() {
                        "* * *".to_string()
                    } else {
                        text
                    },
                });
            } else {
                // Unknown wrapper div, descend into it.
                for child in element.children() {
                    if let Some(inner) = ElementRef::wrap(child) {
                        parse_element(&inner, blocks)?;
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn paragraph_style(element: &ElementRef<'_>) -> ParagraphStyle {
    if has_class(element, "dialogue") {
        ParagraphStyle::Dialogue
    } else if has_class(element, "emphasis") {
        ParagraphStyle::Emphasis
    } else if has_class(element, "caption") {
        ParagraphStyle::Caption
    } else if has_class(element, "quote-box") {
        ParagraphStyle::Quote
    } else {
        ParagraphStyle::Story
    }
}

fn poem_block(element: &ElementRef<'_>) -> FableFlowResult<Block> {
    let kind = if has_class(element, "verse") {
        PoemKind::Verse
    } else if has_class(element, "chant") || has_class(element, "chant-box") {
        PoemKind::Chant
    } else if has_class(element, "song") || has_class(element, "song-lyrics") {
        PoemKind::Song
    } else if has_class(element, "haiku") || has_class(element, "haiku-box") {
        PoemKind::Haiku
    } else if has_class(element, "limerick") || has_class(element, "limerick-box") {
        PoemKind::Limerick
    } else if has_class(element, "cinquain") || has_class(element, "cinquain-box") {
        PoemKind::Cinquain
    } else {
        PoemKind::Poem
    };
    let line_selector = selector("p")?;
    let mut lines: Vec<String> = Vec::new();
    for line in element.select(&line_selector) {
        let text = line.text().collect::<String>().trim().to_string();
        if !text.is_empty() {
            lines.push(text);
        }
    }
    if lines.is_empty() {
        let text = element.text().collect::<String>();
        lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
    }
    Ok(Block::Poem { kind, lines })
}

fn image_container_block(element: &ElementRef<'_>) -> FableFlowResult<Block> {
    let layout = if has_class(element, "image-spread") {
        ImageLayout::Spread
    } else if has_class(element, "image-inline-left") {
        ImageLayout::InlineLeft
    } else if has_class(element, "image-inline-right") {
        ImageLayout::InlineRight
    } else if has_class(element, "image-chapter-opener")
        || has_class(element, "chapter-opener-image")
    {
        ImageLayout::ChapterOpener
    } else if has_class(element, "image-inline") {
        ImageLayout::Inline
    } else {
        ImageLayout::FullPage
    };
    let img_selector = selector("img")?;
    let caption_selector = selector("div.caption, p.caption")?;
    let filename = element
        .select(&img_selector)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| src.trim_start_matches("images/").to_string())
        .unwrap_or_default();
    let caption = element
        .select(&caption_selector)
        .next()
        .map(|c| c.text().collect::<String>().trim().to_string())
        .unwrap_or_default();
    Ok(Block::ImageRef {
        filename,
        caption,
        layout,
    })
}

fn image_block(element: &ElementRef<'_>, layout: ImageLayout) -> Block {
    let filename = element
        .value()
        .attr("src")
        .map(|src| src.trim_start_matches("images/").to_string())
        .unwrap_or_default();
    let caption = element.value().attr("alt").unwrap_or_default().to_string();
    Block::ImageRef {
        filename,
        caption,
        layout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_stripped() {
        let parser = DocumentParser::new();
        let cleaned = parser.clean_html("```html\n<div class=\"page\"><p>Hi</p></div>\n```\n");
        assert!(!cleaned.contains("```"));
        assert!(cleaned.contains("<p>Hi</p>"));
    }

    #[test]
    fn broken_img_alt_is_repaired() {
        let parser = DocumentParser::new();
        let cleaned = parser
            .clean_html(r#"<img src="image_0.png" alt="A" fox="" under="" the="" moon=""/>"#);
        assert!(cleaned.contains(r#"alt="A fox under the moon""#));
        assert!(!cleaned.contains(r#"fox="""#));
    }

    #[test]
    fn image_references_in_document_order() {
        let parser = DocumentParser::new();
        let html = r#"<img src="image_2.png"/> <img src="images/image_0.png"/> <image>2 [c]</image>"#;
        let refs = parser.extract_image_references(html);
        assert_eq!(refs, vec!["image_2.png", "image_0.png", "image_1.png"]);
    }

    #[test]
    fn pages_classify_and_back_cover_sorts_last() {
        let parser = DocumentParser::new();
        let html = r#"
            <div class="page front-cover"><h1>Book</h1></div>
            <div class="page back-cover"><p class="back-cover-text">Blurb</p></div>
            <div class="page"><h2 class="chapter-title">Chapter 1: Intro</h2>
              <p class="story-text">Hello world.</p></div>
        "#;
        let doc = parser.parse(html, BookMeta::default()).unwrap();
        assert_eq!(doc.sections.len(), 3);
        assert_eq!(doc.sections[1].kind, SectionKind::Chapter);
        assert_eq!(doc.sections[1].title, "Chapter 1: Intro");
        assert_eq!(doc.sections.last().unwrap().kind, SectionKind::BackCover);
    }

    #[test]
    fn poem_and_image_blocks_are_typed() {
        let parser = DocumentParser::new();
        let html = r#"
            <div class="page"><h2 class="chapter-title">Chapter 1</h2>
              <div class="poem-box"><p class="poem-verse">Line one</p><p class="poem-verse">Line two</p></div>
              <div class="image-full-page"><img src="image_0.png" alt="c"/><div class="caption">A fox</div></div>
            </div>
        "#;
        let doc = parser.parse(html, BookMeta::default()).unwrap();
        let blocks = &doc.sections[0].blocks;
        assert!(matches!(&blocks[0], Block::Poem { kind: PoemKind::Poem, lines } if lines.len() == 2));
        assert!(matches!(
            &blocks[1],
            Block::ImageRef { filename, caption, layout: ImageLayout::FullPage }
                if filename == "image_0.png" && caption == "A fox"
        ));
    }

    #[test]
    fn toc_entries_become_paragraphs() {
        let parser = DocumentParser::new();
        let html = r#"
            <div class="page toc-page"><h1 class="toc-title">Table of Contents</h1>
              <div class="toc-entry"><span class="chapter-name">Chapter 1: Intro</span></div>
            </div>
        "#;
        let doc = parser.parse(html, BookMeta::default()).unwrap();
        assert_eq!(doc.sections[0].kind, SectionKind::TableOfContents);
        assert!(matches!(
            &doc.sections[0].blocks[0],
            Block::Paragraph { text, .. } if text == "Chapter 1: Intro"
        ));
    }

    #[test]
    fn empty_html_is_an_error() {
        let parser = DocumentParser::new();
        assert!(parser.parse("<p>no pages</p>", BookMeta::default()).is_err());
    }
}
