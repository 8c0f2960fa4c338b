//! Turns a [`Document`] into positioned pages of paint operations.
//!
//! Page numbers are known once layout completes, so the fixed-page
//! renderer runs this twice: first to discover where bookmarks land,
//! then again with the table of contents resolved. Entry heights do
//! not depend on whether page numbers are present, so both passes
//! paginate identically.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::bookmarks::BookmarkRegistry;
use crate::measure::TextMeasurer;
use crate::model::{Block, Document, ImageLayout, ParagraphStyle, PoemKind, Section, SectionKind};
use crate::style::{Font, PdfStyle};

/// Solid black text.
pub const BLACK: [f32; 3] = [0.0, 0.0, 0.0];
/// Table-of-contents link blue.
pub const LINK_BLUE: [f32; 3] = [0.0, 0.0, 0.8];
/// Dotted-leader gray.
pub const LEADER_GRAY: [f32; 3] = [0.5, 0.5, 0.5];

/// Number of dots in a table-of-contents leader.
const LEADER_DOTS: usize = 20;

/// Fallback image width in points when decoding fails.
const FALLBACK_MAX_WIDTH: f32 = 250.0;
/// Fallback image height in points when decoding fails.
const FALLBACK_MAX_HEIGHT: f32 = 150.0;

/// One positioned drawing command. Coordinates are PDF user space,
/// origin at the bottom-left of the page.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintOp {
    /// A run of text at a baseline position.
    Text {
        /// Left edge of the text.
        x: f32,
        /// Baseline y.
        y: f32,
        /// Face.
        font: Font,
        /// Size in points.
        size: f32,
        /// RGB fill color, each component in 0..=1.
        color: [f32; 3],
        /// The text itself.
        text: String,
    },
    /// An image placed with its bottom-left corner at `(x, y)`.
    Image {
        /// Image filename, resolved against the book directory.
        filename: String,
        /// Left edge.
        x: f32,
        /// Bottom edge.
        y: f32,
        /// Rendered width.
        width: f32,
        /// Rendered height.
        height: f32,
    },
}

/// A laid-out page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Physical page number, starting at 1.
    pub number: u32,
    /// Cover pages are full bleed and carry no footer.
    pub cover: bool,
    /// Paint operations in z-order.
    pub ops: Vec<PaintOp>,
}

/// Paginates a document against a [`PdfStyle`].
#[derive(Debug, Clone)]
pub struct LayoutEngine<M: TextMeasurer> {
    style: PdfStyle,
    measurer: M,
    image_dims: HashMap<String, (u32, u32)>,
}

struct Cursor {
    pages: Vec<Page>,
    ops: Vec<PaintOp>,
    cover: bool,
    y: f32,
    dirty: bool,
}

impl<M: TextMeasurer> LayoutEngine<M> {
    /// Creates an engine with the given style and measurer.
    pub fn new(style: PdfStyle, measurer: M) -> Self {
        Self {
            style,
            measurer,
            image_dims: HashMap::new(),
        }
    }

    /// Supplies intrinsic pixel dimensions for decoded images. Images
    /// absent from the map fall back to a conservative fixed size.
    pub fn with_image_dims(mut self, dims: HashMap<String, (u32, u32)>) -> Self {
        self.image_dims = dims;
        self
    }

    /// The style in use.
    pub fn style(&self) -> &PdfStyle {
        &self.style
    }

    /// Lays out the whole document. Bookmark pages recorded in
    /// `registry` are refreshed; when the registry already holds page
    /// numbers from a previous pass, table-of-contents entries render
    /// with resolved numbers and dotted leaders.
    #[instrument(skip_all, fields(sections = document.sections.len()))]
    pub fn layout(&self, document: &Document, registry: &mut BookmarkRegistry) -> Vec<Page> {
        let toc_pages: HashMap<String, u32> = registry
            .entries()
            .iter()
            .filter_map(|(id, title)| registry.page_for(id).map(|p| (title.clone(), p)))
            .collect();
        registry.reset_pages();

        let mut cursor = Cursor::new(&self.style, false);
        let mut first = true;
        for section in &document.sections {
            if !first {
                cursor.break_page(&self.style, section.kind.is_cover());
            } else {
                cursor.cover = section.kind.is_cover();
                first = false;
            }
            if let Some(id) = registry.id_for(&section.title).map(str::to_string) {
                registry.record_page(&id, cursor.page_number());
            }
            self.layout_section(section, &toc_pages, &mut cursor);
        }
        cursor.finish()
    }

    fn layout_section(
        &self,
        section: &Section,
        toc_pages: &HashMap<String, u32>,
        cursor: &mut Cursor,
    ) {
        match section.kind {
            SectionKind::FrontCover | SectionKind::BackCover => {
                self.layout_cover(section, cursor)
            }
            SectionKind::TableOfContents => self.layout_toc(section, toc_pages, cursor),
            SectionKind::TitlePage => self.layout_title_page(section, cursor),
            _ => {
                self.layout_heading(section, cursor);
                for block in &section.blocks {
                    self.layout_block(block, cursor);
                }
            }
        }
    }

    fn layout_heading(&self, section: &Section, cursor: &mut Cursor) {
        if section.title.is_empty() {
            return;
        }
        let (font, size) = (Font::HelveticaBold, self.style.chapter_size);
        self.centered_lines(
            std::slice::from_ref(&section.title),
            font,
            size,
            BLACK,
            cursor,
        );
        cursor.advance(self.style.space_after * 2.0);
    }

    fn layout_block(&self, block: &Block, cursor: &mut Cursor) {
        match block {
            Block::Paragraph { text, style } => self.layout_paragraph(text, *style, cursor),
            Block::Poem { kind, lines } => self.layout_poem(*kind, lines, cursor),
            Block::ImageRef {
                filename,
                caption,
                layout,
            } => self.layout_image(filename, caption, *layout, cursor),
            Block::StoryBreak { text } => {
                self.centered_lines(
                    std::slice::from_ref(text),
                    Font::TimesRoman,
                    self.style.body_size,
                    BLACK,
                    cursor,
                );
                cursor.advance(self.style.space_after);
            }
            Block::PageBreak => cursor.break_page(&self.style, false),
        }
    }

    fn layout_paragraph(&self, text: &str, style: ParagraphStyle, cursor: &mut Cursor) {
        let (font, size, centered, indent) = match style {
            ParagraphStyle::Story => (
                Font::TimesRoman,
                self.style.body_size,
                false,
                self.style.first_line_indent,
            ),
            ParagraphStyle::Dialogue => (Font::TimesRoman, self.style.body_size, false, 0.0),
            ParagraphStyle::Emphasis => (Font::TimesItalic, self.style.body_size, true, 0.0),
            ParagraphStyle::Caption => (Font::HelveticaOblique, self.style.caption_size, true, 0.0),
            ParagraphStyle::Quote => (Font::TimesItalic, self.style.body_size, false, 0.0),
        };
        let left_indent = if style == ParagraphStyle::Dialogue || style == ParagraphStyle::Quote {
            self.style.first_line_indent
        } else {
            0.0
        };
        let width = self.style.frame_width() - left_indent;
        let line_height = self.style.line_height(size);

        let first_width = width - indent;
        let mut lines = self.measurer.wrap(text, font, size, first_width);
        // Rewrap the remainder at full width once the indent no longer
        // applies.
        if indent > 0.0 && lines.len() > 1 {
            let rest = lines.split_off(1).join(" ");
            lines.extend(self.measurer.wrap(&rest, font, size, width));
        }

        for (i, line) in lines.iter().enumerate() {
            cursor.ensure(&self.style, line_height);
            let x = if centered {
                let w = self.measurer.text_width(line, font, size);
                self.left_edge() + (self.style.frame_width() - w).max(0.0) / 2.0
            } else if i == 0 {
                self.left_edge() + left_indent + indent
            } else {
                self.left_edge() + left_indent
            };
            cursor.advance(line_height);
            cursor.ops.push(PaintOp::Text {
                x,
                y: cursor.y,
                font,
                size,
                color: BLACK,
                text: line.clone(),
            });
            cursor.dirty = true;
        }
        cursor.advance(self.style.space_after);
    }

    fn layout_poem(&self, kind: PoemKind, lines: &[String], cursor: &mut Cursor) {
        let font = match kind {
            PoemKind::Chant => Font::HelveticaBold,
            PoemKind::Song => Font::TimesItalic,
            _ => Font::TimesItalic,
        };
        let size = self.style.body_size;
        let line_height = self.style.line_height(size);
        let total = 2.0 * self.style.poem_spacer + lines.len() as f32 * line_height;
        cursor.ensure(&self.style, total);

        cursor.advance(self.style.poem_spacer);
        self.centered_lines(lines, font, size, BLACK, cursor);
        cursor.advance(self.style.poem_spacer);
    }

    fn layout_image(
        &self,
        filename: &str,
        caption: &str,
        layout: ImageLayout,
        cursor: &mut Cursor,
    ) {
        let (width, height) = self.scaled_image_size(filename, layout);
        let caption_font = Font::HelveticaOblique;
        let caption_size = self.style.caption_size;
        let caption_lines = if caption.is_empty() {
            Vec::new()
        } else {
            self.measurer
                .wrap(caption, caption_font, caption_size, self.style.frame_width())
        };
        let caption_height =
            caption_lines.len() as f32 * self.style.line_height(caption_size);
        let total = height + caption_height + 2.0 * self.style.space_after;
        cursor.ensure(&self.style, total);

        cursor.advance(self.style.space_after);
        cursor.advance(height);
        let x = self.left_edge() + (self.style.frame_width() - width).max(0.0) / 2.0;
        cursor.ops.push(PaintOp::Image {
            filename: filename.to_string(),
            x,
            y: cursor.y,
            width,
            height,
        });
        cursor.dirty = true;
        self.centered_lines(&caption_lines, caption_font, caption_size, BLACK, cursor);
        cursor.advance(self.style.space_after);
    }

    /// Scales an image to its layout bounds, clamped to the frame,
    /// then enforced between one third and four fifths of the frame
    /// height while preserving the aspect ratio. Missing dimensions
    /// fall back to a fixed conservative size.
    fn scaled_image_size(&self, filename: &str, layout: ImageLayout) -> (f32, f32) {
        let bounds = self.style.image_bounds(layout);
        let frame_w = self.style.frame_width();
        let frame_h = self.style.frame_height();
        let max_w = bounds.width.min(frame_w);
        let max_h = bounds.height.min(frame_h);

        let Some(&(px_w, px_h)) = self.image_dims.get(filename) else {
            debug!(filename, "no intrinsic dimensions, using fallback size");
            let w = (bounds.width * 0.7).min(FALLBACK_MAX_WIDTH).min(frame_w);
            let h = (bounds.height * 0.7).min(FALLBACK_MAX_HEIGHT).min(frame_h);
            return (w, h);
        };
        let (px_w, px_h) = (px_w.max(1) as f32, px_h.max(1) as f32);
        let scale = (max_w / px_w).min(max_h / px_h);
        let mut w = px_w * scale;
        let mut h = px_h * scale;

        let min_h = frame_h / 3.0;
        let max_page_h = frame_h * 0.8;
        if h < min_h {
            let up = min_h / h;
            w *= up;
            h = min_h;
            if w > frame_w {
                let down = frame_w / w;
                w = frame_w;
                h *= down;
            }
        } else if h > max_page_h {
            let down = max_page_h / h;
            w *= down;
            h = max_page_h;
        }
        (w, h)
    }

    fn layout_cover(&self, section: &Section, cursor: &mut Cursor) {
        let frame = self.style.cover_frame();
        let mut text_y = self.style.page_height * 0.62;
        for block in &section.blocks {
            match block {
                Block::ImageRef { filename, .. } if !filename.is_empty() => {
                    cursor.ops.push(PaintOp::Image {
                        filename: filename.clone(),
                        x: self.style.cover_margin,
                        y: self.style.cover_margin,
                        width: frame.width,
                        height: frame.height,
                    });
                    cursor.dirty = true;
                }
                Block::Paragraph { text, .. } => {
                    let size = self.style.caption_size;
                    let w = self.measurer.text_width(text, Font::HelveticaBold, size);
                    cursor.ops.push(PaintOp::Text {
                        x: (self.style.page_width - w).max(0.0) / 2.0,
                        y: text_y,
                        font: Font::HelveticaBold,
                        size,
                        color: BLACK,
                        text: text.clone(),
                    });
                    cursor.dirty = true;
                    text_y -= self.style.line_height(size);
                }
                _ => {}
            }
        }
        // Cover titles come from the section heading.
        if !section.title.is_empty() && section.kind == SectionKind::FrontCover {
            let size = self.style.title_size;
            let w = self
                .measurer
                .text_width(&section.title, Font::HelveticaBold, size);
            cursor.ops.push(PaintOp::Text {
                x: (self.style.page_width - w).max(0.0) / 2.0,
                y: self.style.page_height * 0.72,
                font: Font::HelveticaBold,
                size,
                color: BLACK,
                text: section.title.clone(),
            });
            cursor.dirty = true;
        }
    }

    fn layout_title_page(&self, section: &Section, cursor: &mut Cursor) {
        // Drop down a third of the page before the title.
        cursor.advance(self.style.frame_height() / 3.0);
        self.centered_lines(
            std::slice::from_ref(&section.title),
            Font::HelveticaBold,
            self.style.title_size,
            BLACK,
            cursor,
        );
        cursor.advance(self.style.space_after * 2.0);
        for block in &section.blocks {
            if let Block::Paragraph { text, .. } = block {
                self.centered_lines(
                    std::slice::from_ref(text),
                    Font::TimesRoman,
                    self.style.caption_size,
                    BLACK,
                    cursor,
                );
                cursor.advance(self.style.space_after);
            }
        }
    }

    fn layout_toc(
        &self,
        section: &Section,
        toc_pages: &HashMap<String, u32>,
        cursor: &mut Cursor,
    ) {
        self.centered_lines(
            std::slice::from_ref(&section.title),
            Font::HelveticaBold,
            self.style.toc_title_size,
            BLACK,
            cursor,
        );
        cursor.advance(self.style.space_after * 2.0);

        let size = self.style.toc_entry_size;
        let line_height = self.style.line_height(size);
        for block in &section.blocks {
            let Block::Paragraph { text, .. } = block else {
                continue;
            };
            cursor.ensure(&self.style, line_height);
            cursor.advance(line_height);
            let title_w = self.measurer.text_width(text, Font::TimesRoman, size);
            cursor.ops.push(PaintOp::Text {
                x: self.left_edge(),
                y: cursor.y,
                font: Font::TimesRoman,
                size,
                color: LINK_BLUE,
                text: text.clone(),
            });
            cursor.dirty = true;
            if let Some(page) = toc_pages.get(text.as_str()) {
                let number = page.to_string();
                let number_w = self.measurer.text_width(&number, Font::TimesRoman, size);
                let dots = ".".repeat(LEADER_DOTS);
                cursor.ops.push(PaintOp::Text {
                    x: self.left_edge() + title_w + 6.0,
                    y: cursor.y,
                    font: Font::TimesRoman,
                    size,
                    color: LEADER_GRAY,
                    text: dots,
                });
                cursor.ops.push(PaintOp::Text {
                    x: self.left_edge() + self.style.frame_width() - number_w,
                    y: cursor.y,
                    font: Font::TimesRoman,
                    size,
                    color: BLACK,
                    text: number,
                });
            }
            cursor.advance(self.style.space_after / 2.0);
        }
    }

    fn centered_lines(
        &self,
        lines: &[String],
        font: Font,
        size: f32,
        color: [f32; 3],
        cursor: &mut Cursor,
    ) {
        let line_height = self.style.line_height(size);
        for line in lines {
            cursor.ensure(&self.style, line_height);
            cursor.advance(line_height);
            let w = self.measurer.text_width(line, font, size);
            cursor.ops.push(PaintOp::Text {
                x: self.left_edge() + (self.style.frame_width() - w).max(0.0) / 2.0,
                y: cursor.y,
                font,
                size,
                color,
                text: line.clone(),
            });
            cursor.dirty = true;
        }
    }

    fn left_edge(&self) -> f32 {
        self.style.margin_horizontal + self.style.frame_padding
    }
}

impl Cursor {
    fn new(style: &PdfStyle, cover: bool) -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            cover,
            y: Self::top(style),
            dirty: false,
        }
    }

    fn top(style: &PdfStyle) -> f32 {
        style.page_height - style.margin_vertical - style.frame_padding
    }

    fn bottom(style: &PdfStyle) -> f32 {
        style.margin_vertical + style.frame_padding + style.footer_reserve
    }

    fn page_number(&self) -> u32 {
        self.pages.len() as u32 + 1
    }

    fn advance(&mut self, height: f32) {
        self.y -= height;
    }

    /// Breaks to a fresh page unless the current one is still blank.
    fn break_page(&mut self, style: &PdfStyle, cover: bool) {
        if !self.dirty {
            self.cover = cover;
            self.y = Self::top(style);
            return;
        }
        let number = self.page_number();
        self.pages.push(Page {
            number,
            cover: self.cover,
            ops: std::mem::take(&mut self.ops),
        });
        self.cover = cover;
        self.y = Self::top(style);
        self.dirty = false;
    }

    /// Breaks the page when fewer than `height` points remain. Passing
    /// an atomic group's full height keeps the group on one page;
    /// groups taller than a page render from the top of a fresh page
    /// and overflow.
    fn ensure(&mut self, style: &PdfStyle, height: f32) {
        if self.y - height < Self::bottom(style) && self.dirty {
            self.break_page(style, false);
        }
    }

    fn finish(mut self) -> Vec<Page> {
        if self.dirty || self.pages.is_empty() {
            let number = self.page_number();
            self.pages.push(Page {
                number,
                cover: self.cover,
                ops: self.ops,
            });
        }
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::ApproxMeasurer;
    use crate::model::Section;
    use crate::BookMeta;

    fn engine() -> LayoutEngine<ApproxMeasurer> {
        LayoutEngine::new(PdfStyle::default(), ApproxMeasurer::new())
    }

    fn chapter(title: &str, text: &str) -> Section {
        let mut section = Section::new(SectionKind::Chapter, title);
        section.blocks.push(Block::Paragraph {
            text: text.to_string(),
            style: ParagraphStyle::Story,
        });
        section
    }

    #[test]
    fn each_section_starts_a_new_page() {
        let doc = Document::new(
            vec![chapter("Chapter 1", "one"), chapter("Chapter 2", "two")],
            BookMeta::default(),
        );
        let mut registry = BookmarkRegistry::prescan(&doc);
        let pages = engine().layout(&doc, &mut registry);
        assert_eq!(pages.len(), 2);
        assert_eq!(registry.page_for("chapter_0"), Some(1));
        assert_eq!(registry.page_for("chapter_1"), Some(2));
    }

    #[test]
    fn long_text_overflows_to_more_pages() {
        let body = "The quick brown fox jumps over the lazy dog. ".repeat(200);
        let doc = Document::new(vec![chapter("Chapter 1", &body)], BookMeta::default());
        let mut registry = BookmarkRegistry::prescan(&doc);
        let pages = engine().layout(&doc, &mut registry);
        assert!(pages.len() > 1);
        assert_eq!(pages.last().map(|p| p.number), Some(pages.len() as u32));
    }

    #[test]
    fn second_pass_resolves_toc_page_numbers() {
        let mut toc = Section::new(SectionKind::TableOfContents, "Table of Contents");
        toc.blocks.push(Block::Paragraph {
            text: "Chapter 1: Intro".to_string(),
            style: ParagraphStyle::Story,
        });
        let doc = Document::new(
            vec![toc, chapter("Chapter 1: Intro", "Hello world.")],
            BookMeta::default(),
        );
        let mut registry = BookmarkRegistry::prescan(&doc);
        let eng = engine();

        let first_pass = eng.layout(&doc, &mut registry);
        let chapter_page = registry
            .page_for_title("Chapter 1: Intro")
            .unwrap_or_else(|| panic!("bookmark unset"));
        assert!(chapter_page >= 1);

        let second_pass = eng.layout(&doc, &mut registry);
        assert_eq!(first_pass.len(), second_pass.len());
        let toc_texts: Vec<&str> = second_pass[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                PaintOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(toc_texts.contains(&"Chapter 1: Intro"));
        assert!(toc_texts.contains(&chapter_page.to_string().as_str()));
        assert!(toc_texts.iter().any(|t| t.starts_with("....")));
    }

    #[test]
    fn first_pass_has_bare_toc_titles() {
        let mut toc = Section::new(SectionKind::TableOfContents, "Table of Contents");
        toc.blocks.push(Block::Paragraph {
            text: "Chapter 1: Intro".to_string(),
            style: ParagraphStyle::Story,
        });
        let doc = Document::new(
            vec![toc, chapter("Chapter 1: Intro", "Hello.")],
            BookMeta::default(),
        );
        let mut registry = BookmarkRegistry::prescan(&doc);
        let pages = engine().layout(&doc, &mut registry);
        let has_leader = pages[0].ops.iter().any(|op| {
            matches!(op, PaintOp::Text { text, .. } if text.starts_with("...."))
        });
        assert!(!has_leader);
    }

    #[test]
    fn missing_image_dims_use_fallback_size() {
        let mut section = chapter("Chapter 1", "Intro.");
        section.blocks.push(Block::ImageRef {
            filename: "image_0.png".to_string(),
            caption: "A fox".to_string(),
            layout: ImageLayout::FullPage,
        });
        let doc = Document::new(vec![section], BookMeta::default());
        let mut registry = BookmarkRegistry::prescan(&doc);
        let pages = engine().layout(&doc, &mut registry);
        let image = pages
            .iter()
            .flat_map(|p| &p.ops)
            .find_map(|op| match op {
                PaintOp::Image { width, height, .. } => Some((*width, *height)),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no image op"));
        assert!(image.0 <= 250.0);
        assert!(image.1 <= 150.0);
    }

    #[test]
    fn decoded_image_height_is_clamped_to_frame_share() {
        let mut dims = HashMap::new();
        // A tiny wide strip would land below one third of the frame.
        dims.insert("strip.png".to_string(), (1200u32, 60u32));
        let eng = LayoutEngine::new(PdfStyle::default(), ApproxMeasurer::new())
            .with_image_dims(dims);
        let (w, h) = eng.scaled_image_size("strip.png", ImageLayout::Inline);
        let frame_h = eng.style().frame_height();
        // Width clamping caps the upscale short of the minimum share.
        assert!(h <= frame_h / 3.0 + 0.01);
        assert!(w <= eng.style().frame_width() + 0.01);
        assert!(h <= frame_h * 0.8);
    }

    #[test]
    fn poem_never_splits_across_pages() {
        // Sweep filler lengths so some run leaves too little room for
        // the whole poem; the verses must still land on a single page.
        for filler_len in [90, 100, 110, 120, 130] {
            let filler = "The quick brown fox jumps over the lazy dog. ".repeat(filler_len);
            let mut section = chapter("Chapter 1", &filler);
            section.blocks.push(Block::Poem {
                kind: PoemKind::Poem,
                lines: vec![
                    "verse the first".to_string(),
                    "verse the second".to_string(),
                    "verse the third".to_string(),
                    "verse the fourth".to_string(),
                ],
            });
            let doc = Document::new(vec![section], BookMeta::default());
            let mut registry = BookmarkRegistry::prescan(&doc);
            let pages = engine().layout(&doc, &mut registry);
            let verse_pages: Vec<u32> = pages
                .iter()
                .filter(|p| {
                    p.ops.iter().any(|op| {
                        matches!(op, PaintOp::Text { text, .. } if text.starts_with("verse the"))
                    })
                })
                .map(|p| p.number)
                .collect();
            assert_eq!(verse_pages.len(), 1, "filler {}", filler_len);
        }
    }

    #[test]
    fn covers_carry_no_footer_flag() {
        let mut cover = Section::new(SectionKind::FrontCover, "My Book");
        cover.blocks.push(Block::ImageRef {
            filename: "cover.png".to_string(),
            caption: String::new(),
            layout: ImageLayout::FullPage,
        });
        let doc = Document::new(
            vec![cover, chapter("Chapter 1", "Hello.")],
            BookMeta::default(),
        );
        let mut registry = BookmarkRegistry::prescan(&doc);
        let pages = engine().layout(&doc, &mut registry);
        assert!(pages[0].cover);
        assert!(!pages[1].cover);
    }
}
