//! The tagged document model shared by both renderers.

use serde::{Deserialize, Serialize};

/// What kind of page a section represents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Full-bleed front cover.
    FrontCover,
    /// Formal title page inside the book.
    TitlePage,
    /// Copyright/ISBN/edition page.
    PublicationInfo,
    /// Table of contents; entries are resolved at render time.
    TableOfContents,
    /// Preface or foreword.
    Preface,
    /// A story chapter.
    Chapter,
    /// About-the-author back matter.
    AboutAuthor,
    /// Acknowledgments back matter.
    Acknowledgments,
    /// Index back matter.
    Index,
    /// Full-bleed back cover; always rendered last.
    BackCover,
}

impl SectionKind {
    /// Whether this section uses the full-bleed cover template
    /// (near-zero margins, no page-number footer).
    pub fn is_cover(&self) -> bool {
        matches!(self, SectionKind::FrontCover | SectionKind::BackCover)
    }

    /// Whether this is a formal non-chapter section tracked by the
    /// bookmark pre-scan.
    pub fn is_tracked_section(&self) -> bool {
        matches!(
            self,
            SectionKind::Preface
                | SectionKind::AboutAuthor
                | SectionKind::Acknowledgments
                | SectionKind::Index
        )
    }

    /// Default display title for tracked sections without a heading.
    pub fn default_title(&self) -> &'static str {
        match self {
            SectionKind::FrontCover => "Front Cover",
            SectionKind::TitlePage => "Title Page",
            SectionKind::PublicationInfo => "Publication Info",
            SectionKind::TableOfContents => "Table of Contents",
            SectionKind::Preface => "Preface",
            SectionKind::Chapter => "Chapter",
            SectionKind::AboutAuthor => "About the Author",
            SectionKind::Acknowledgments => "Acknowledgments",
            SectionKind::Index => "Index",
            SectionKind::BackCover => "Back Cover",
        }
    }
}

/// Visual style of a paragraph block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphStyle {
    /// Regular story text.
    #[default]
    Story,
    /// Indented dialogue.
    Dialogue,
    /// Centered emphasis text.
    Emphasis,
    /// Image caption.
    Caption,
    /// Boxed quotation, kept together on one page.
    Quote,
}

/// The poem variants carried through from upstream markup, each with
/// its own box styling in the fixed-page renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PoemKind {
    /// Generic poem box.
    #[default]
    Poem,
    /// Verse without a box.
    Verse,
    /// Chant, set in the heading face.
    Chant,
    /// Song lyrics, set in italic.
    Song,
    /// Haiku.
    Haiku,
    /// Limerick.
    Limerick,
    /// Cinquain.
    Cinquain,
}

/// Placement of an image block, each with distinct sizing bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageLayout {
    /// Default inline placement.
    #[default]
    Inline,
    /// Fills most of the content frame.
    FullPage,
    /// Spans a page spread.
    Spread,
    /// Left-floated inline image (reduced bounds).
    InlineLeft,
    /// Right-floated inline image (reduced bounds).
    InlineRight,
    /// Oversized chapter-opener image.
    ChapterOpener,
}

/// One typed content block inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    /// A paragraph of text.
    Paragraph {
        /// The text content.
        text: String,
        /// Visual style.
        style: ParagraphStyle,
    },
    /// A poem, kept atomic by the fixed-page renderer.
    Poem {
        /// Poem variant.
        kind: PoemKind,
        /// Individual lines of the poem.
        lines: Vec<String>,
    },
    /// A reference to an image file, kept together with its caption.
    ImageRef {
        /// The image filename (relative to the book directory).
        filename: String,
        /// Caption text; empty means no caption.
        caption: String,
        /// Placement and sizing class.
        layout: ImageLayout,
    },
    /// Decorative scene separator.
    StoryBreak {
        /// Separator glyphs (e.g. "* * *").
        text: String,
    },
    /// Explicit page break.
    PageBreak,
}

/// An ordered run of blocks forming one page-spread unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// The section kind.
    pub kind: SectionKind,
    /// Display title (chapter title, section heading).
    pub title: String,
    /// Content blocks in reading order.
    pub blocks: Vec<Block>,
}

impl Section {
    /// Creates a section with no blocks.
    pub fn new(kind: SectionKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            blocks: Vec::new(),
        }
    }
}

/// The whole book: ordered sections plus metadata.
///
/// The back cover is normalized to the last position at construction,
/// so both renderers see the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Ordered sections.
    pub sections: Vec<Section>,
    /// Book metadata.
    pub meta: crate::BookMeta,
}

impl Document {
    /// Builds a document, moving any back-cover section to the end.
    pub fn new(sections: Vec<Section>, meta: crate::BookMeta) -> Self {
        let mut sections = sections;
        let mut back_covers: Vec<Section> = Vec::new();
        sections.retain(|s| {
            if s.kind == SectionKind::BackCover {
                back_covers.push(s.clone());
                false
            } else {
                true
            }
        });
        sections.extend(back_covers);
        Self { sections, meta }
    }

    /// Whether the document contains a table-of-contents section.
    /// When it does not, the fixed-page renderer skips its second pass.
    pub fn has_toc(&self) -> bool {
        self.sections
            .iter()
            .any(|s| s.kind == SectionKind::TableOfContents)
    }

    /// Titles of all chapter sections in order.
    pub fn chapter_titles(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| s.kind == SectionKind::Chapter)
            .map(|s| s.title.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BookMeta;

    #[test]
    fn back_cover_moves_to_end() {
        let sections = vec![
            Section::new(SectionKind::FrontCover, "Front Cover"),
            Section::new(SectionKind::BackCover, "Back Cover"),
            Section::new(SectionKind::Chapter, "Chapter 1: Start"),
        ];
        let doc = Document::new(sections, BookMeta::default());
        assert_eq!(doc.sections.last().unwrap().kind, SectionKind::BackCover);
        assert_eq!(doc.sections[1].kind, SectionKind::Chapter);
    }

    #[test]
    fn toc_detection() {
        let doc = Document::new(
            vec![Section::new(SectionKind::Chapter, "Chapter 1")],
            BookMeta::default(),
        );
        assert!(!doc.has_toc());
    }
}
