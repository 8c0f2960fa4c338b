//! Fixed-page PDF rendering over [`lopdf`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use fableflow_error::{BookError, BookErrorKind, FableFlowResult};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document as PdfDocument, Object, ObjectId, Stream, StringFormat};
use tracing::{info, instrument, warn};

use crate::bookmarks::BookmarkRegistry;
use crate::layout::{LayoutEngine, Page, PaintOp};
use crate::measure::{ApproxMeasurer, TextMeasurer};
use crate::model::{Block, Document, Section};
use crate::style::{Font, PdfStyle};

/// Renders a [`Document`] to a PDF file.
///
/// Layout runs twice when a table of contents is present: the first
/// pass records which page every bookmark lands on, the second renders
/// the contents entries with resolved page numbers. Without a table of
/// contents a single pass suffices.
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer {
    style: PdfStyle,
    measurer: ApproxMeasurer,
}

impl PdfRenderer {
    /// Creates a renderer with the given style.
    pub fn new(style: PdfStyle) -> Self {
        Self {
            style,
            measurer: ApproxMeasurer::new(),
        }
    }

    /// Renders `document` to `output`, resolving image files against
    /// `book_dir`. A partially written file is removed on failure.
    #[instrument(skip_all, fields(output = %output.display()))]
    pub fn render(
        &self,
        document: &Document,
        book_dir: &Path,
        output: &Path,
    ) -> FableFlowResult<()> {
        if document.sections.is_empty() {
            return Err(BookError::new(BookErrorKind::EmptyDocument).into());
        }
        let dims = probe_image_dimensions(document, book_dir);
        let engine =
            LayoutEngine::new(self.style.clone(), self.measurer).with_image_dims(dims);
        let mut registry = BookmarkRegistry::prescan(document);

        let mut pages = engine.layout(document, &mut registry);
        if document.has_toc() {
            info!(pages = pages.len(), "resolving contents in a second pass");
            pages = engine.layout(document, &mut registry);
        }

        if let Err(err) = self.write_pdf(&pages, &registry, book_dir, output) {
            if fs::remove_file(output).is_ok() {
                warn!(path = %output.display(), "removed partial output");
            }
            return Err(err);
        }
        info!(pages = pages.len(), "wrote book");
        Ok(())
    }

    fn write_pdf(
        &self,
        pages: &[Page],
        registry: &BookmarkRegistry,
        book_dir: &Path,
        output: &Path,
    ) -> FableFlowResult<()> {
        let mut pdf = PdfDocument::with_version("1.5");
        let pages_id = pdf.new_object_id();

        let mut fonts = Dictionary::new();
        for font in Font::all() {
            let id = pdf.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_name(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), Object::Reference(id));
        }

        let mut xobjects = Dictionary::new();
        let mut image_names: HashMap<String, String> = HashMap::new();
        for (i, filename) in referenced_images(pages).iter().enumerate() {
            match embed_image(&mut pdf, &book_dir.join(filename)) {
                Ok(id) => {
                    let name = format!("Im{i}");
                    xobjects.set(name.as_bytes().to_vec(), Object::Reference(id));
                    image_names.insert(filename.clone(), name);
                }
                Err(err) => warn!(%err, filename, "skipping undecodable image"),
            }
        }

        let resources_id = pdf.add_object(dictionary! {
            "Font" => Object::Dictionary(fonts),
            "XObject" => Object::Dictionary(xobjects),
        });

        let mut kids: Vec<Object> = Vec::new();
        let mut page_ids: HashMap<u32, ObjectId> = HashMap::new();
        for page in pages {
            let content = self.page_content(page, &image_names);
            let encoded = content.encode().map_err(|e| {
                BookError::new(BookErrorKind::PdfAssembly(format!("content stream: {e}")))
            })?;
            let content_id = pdf.add_object(Stream::new(Dictionary::new(), encoded));
            let page_id = pdf.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(self.style.page_width),
                    Object::Real(self.style.page_height),
                ],
                "Contents" => Object::Reference(content_id),
                "Resources" => Object::Reference(resources_id),
            });
            kids.push(Object::Reference(page_id));
            page_ids.insert(page.number, page_id);
        }

        pdf.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages.len() as i64,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        };
        if let Some(outlines_id) = build_outlines(&mut pdf, registry, &page_ids) {
            catalog.set("Outlines", Object::Reference(outlines_id));
            catalog.set("PageMode", "UseOutlines");
        }
        let catalog_id = pdf.add_object(catalog);
        pdf.trailer.set("Root", Object::Reference(catalog_id));
        pdf.compress();
        pdf.save(output).map_err(|e| {
            BookError::new(BookErrorKind::FileWrite {
                path: output.display().to_string(),
                message: e.to_string(),
            })
        })?;
        Ok(())
    }

    fn page_content(&self, page: &Page, image_names: &HashMap<String, String>) -> Content {
        let mut operations: Vec<Operation> = Vec::new();
        for op in &page.ops {
            match op {
                PaintOp::Text {
                    x,
                    y,
                    font,
                    size,
                    color,
                    text,
                } => {
                    operations.push(Operation::new("BT", vec![]));
                    operations.push(Operation::new(
                        "Tf",
                        vec![font.resource_name().into(), (*size).into()],
                    ));
                    operations.push(Operation::new(
                        "rg",
                        vec![color[0].into(), color[1].into(), color[2].into()],
                    ));
                    operations.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                    operations.push(Operation::new(
                        "Tj",
                        vec![Object::String(
                            encode_win_ansi(text),
                            StringFormat::Literal,
                        )],
                    ));
                    operations.push(Operation::new("ET", vec![]));
                }
                PaintOp::Image {
                    filename,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let Some(name) = image_names.get(filename) else {
                        continue;
                    };
                    operations.push(Operation::new("q", vec![]));
                    operations.push(Operation::new(
                        "cm",
                        vec![
                            Object::Real(*width),
                            Object::Real(0.0),
                            Object::Real(0.0),
                            Object::Real(*height),
                            Object::Real(*x),
                            Object::Real(*y),
                        ],
                    ));
                    operations.push(Operation::new("Do", vec![name.as_str().into()]));
                    operations.push(Operation::new("Q", vec![]));
                }
            }
        }
        if !page.cover {
            self.footer_ops(page.number, &mut operations);
        }
        Content { operations }
    }

    fn footer_ops(&self, number: u32, operations: &mut Vec<Operation>) {
        let text = format!("\u{2014} {number} \u{2014}");
        let size = self.style.page_number_size;
        let width = self.measurer.text_width(&text, Font::Helvetica, size);
        let x = (self.style.page_width - width).max(0.0) / 2.0;
        let y = self.style.margin_vertical / 2.0;
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Font::Helvetica.resource_name().into(), size.into()],
        ));
        operations.push(Operation::new(
            "rg",
            vec![Object::Real(0.0), Object::Real(0.0), Object::Real(0.0)],
        ));
        operations.push(Operation::new("Td", vec![x.into(), y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(&text), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
}

/// Probes intrinsic pixel dimensions for every image the document
/// references. Unreadable files are left out so layout falls back to
/// its fixed conservative size.
fn probe_image_dimensions(document: &Document, book_dir: &Path) -> HashMap<String, (u32, u32)> {
    let mut dims = HashMap::new();
    for filename in document_images(document) {
        match image::image_dimensions(book_dir.join(&filename)) {
            Ok(size) => {
                dims.insert(filename, size);
            }
            Err(err) => warn!(%err, filename, "could not probe image dimensions"),
        }
    }
    dims
}

fn document_images(document: &Document) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    };
    for Section { blocks, .. } in &document.sections {
        for block in blocks {
            if let Block::ImageRef { filename, .. } = block {
                push(filename);
            }
        }
    }
    names
}

fn referenced_images(pages: &[Page]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for page in pages {
        for op in &page.ops {
            if let PaintOp::Image { filename, .. } = op {
                if !names.iter().any(|n| n == filename) {
                    names.push(filename.clone());
                }
            }
        }
    }
    names
}

fn embed_image(pdf: &mut PdfDocument, path: &Path) -> FableFlowResult<ObjectId> {
    let bytes = fs::read(path).map_err(|e| {
        BookError::new(BookErrorKind::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    })?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| {
        BookError::new(BookErrorKind::ImageDecode {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    })?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    );
    Ok(pdf.add_object(stream))
}

/// Builds a flat outline tree from the bookmark registry. Returns
/// `None` when no bookmark resolved to a page.
fn build_outlines(
    pdf: &mut PdfDocument,
    registry: &BookmarkRegistry,
    page_ids: &HashMap<u32, ObjectId>,
) -> Option<ObjectId> {
    let entries: Vec<(&str, ObjectId)> = registry
        .entries()
        .iter()
        .filter_map(|(id, title)| {
            let page = registry.page_for(id)?;
            Some((title.as_str(), *page_ids.get(&page)?))
        })
        .collect();
    if entries.is_empty() {
        return None;
    }

    let outlines_id = pdf.new_object_id();
    let item_ids: Vec<ObjectId> = entries.iter().map(|_| pdf.new_object_id()).collect();
    for (i, ((title, page_id), item_id)) in entries.iter().zip(&item_ids).enumerate() {
        let mut item = dictionary! {
            "Title" => Object::String(encode_win_ansi(title), StringFormat::Literal),
            "Parent" => Object::Reference(outlines_id),
            "Dest" => vec![Object::Reference(*page_id), "Fit".into()],
        };
        if i > 0 {
            item.set("Prev", Object::Reference(item_ids[i - 1]));
        }
        if i + 1 < item_ids.len() {
            item.set("Next", Object::Reference(item_ids[i + 1]));
        }
        pdf.objects.insert(*item_id, Object::Dictionary(item));
    }

    let first = *item_ids.first()?;
    let last = *item_ids.last()?;
    pdf.objects.insert(
        outlines_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => Object::Reference(first),
            "Last" => Object::Reference(last),
            "Count" => item_ids.len() as i64,
        }),
    );
    Some(outlines_id)
}

/// Maps text to WinAnsi bytes. Characters outside the encoding render
/// as a question mark.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{0000}'..='\u{007e}' => c as u8,
            '\u{00a0}'..='\u{00ff}' => c as u8,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2026}' => 0x85,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Document, ParagraphStyle, Section, SectionKind};
    use crate::BookMeta;

    fn chapter(title: &str, text: &str) -> Section {
        let mut section = Section::new(SectionKind::Chapter, title);
        section.blocks.push(Block::Paragraph {
            text: text.to_string(),
            style: ParagraphStyle::Story,
        });
        section
    }

    fn toc(titles: &[&str]) -> Section {
        let mut section = Section::new(SectionKind::TableOfContents, "Table of Contents");
        for title in titles {
            section.blocks.push(Block::Paragraph {
                text: title.to_string(),
                style: ParagraphStyle::Story,
            });
        }
        section
    }

    #[test]
    fn render_writes_a_loadable_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("book.pdf");
        let doc = Document::new(
            vec![
                toc(&["Chapter 1: Intro", "Chapter 2: Outro"]),
                chapter("Chapter 1: Intro", "Hello world."),
                chapter("Chapter 2: Outro", "Goodbye."),
            ],
            BookMeta::default(),
        );
        PdfRenderer::new(PdfStyle::default())
            .render(&doc, dir.path(), &output)
            .unwrap();

        let loaded = PdfDocument::load(&output).unwrap();
        assert_eq!(loaded.get_pages().len(), 3);
    }

    #[test]
    fn empty_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document {
            sections: Vec::new(),
            meta: BookMeta::default(),
        };
        let result =
            PdfRenderer::new(PdfStyle::default()).render(&doc, dir.path(), &dir.path().join("x.pdf"));
        assert!(result.is_err());
    }

    #[test]
    fn failed_save_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("missing").join("book.pdf");
        let doc = Document::new(
            vec![chapter("Chapter 1", "Hello.")],
            BookMeta::default(),
        );
        let result = PdfRenderer::new(PdfStyle::default()).render(&doc, dir.path(), &output);
        assert!(result.is_err());
        assert!(!output.exists());
    }

    #[test]
    fn win_ansi_dashes_map_into_high_bytes() {
        let bytes = encode_win_ansi("\u{2014} 7 \u{2014}");
        assert_eq!(bytes, vec![0x97, b' ', b'7', b' ', 0x97]);
    }

    #[test]
    fn missing_images_do_not_fail_the_render() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("book.pdf");
        let mut section = chapter("Chapter 1", "Look at this.");
        section.blocks.push(Block::ImageRef {
            filename: "image_0.png".to_string(),
            caption: "A fox".to_string(),
            layout: crate::model::ImageLayout::FullPage,
        });
        let doc = Document::new(vec![section], BookMeta::default());
        PdfRenderer::new(PdfStyle::default())
            .render(&doc, dir.path(), &output)
            .unwrap();
        assert!(output.exists());
    }
}
