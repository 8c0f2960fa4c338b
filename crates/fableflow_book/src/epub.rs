//! Reflowable EPUB 3 rendering over [`zip`].

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use fableflow_error::{BookError, BookErrorKind, FableFlowResult};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::bookmarks::BookmarkRegistry;
use crate::formatter::escape_html;
use crate::model::{Block, Document, ImageLayout, PoemKind, Section, SectionKind};

/// One spine entry: a section with its archive filename and anchor id.
struct SpineEntry<'a> {
    id: String,
    filename: String,
    section: &'a Section,
}

/// Renders a [`Document`] to an EPUB 3 archive with NCX back-compat.
///
/// Unlike the fixed-page renderer this is a single pass: the contents
/// page links by file, so no page numbers exist to resolve.
#[derive(Debug, Clone, Default)]
pub struct EpubRenderer;

impl EpubRenderer {
    /// Creates a renderer.
    pub fn new() -> Self {
        Self
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
        if let Err(err) = self.write_epub(document, book_dir, output) {
            if fs::remove_file(output).is_ok() {
                warn!(path = %output.display(), "removed partial output");
            }
            return Err(err);
        }
        info!(sections = document.sections.len(), "wrote book");
        Ok(())
    }

    fn write_epub(
        &self,
        document: &Document,
        book_dir: &Path,
        output: &Path,
    ) -> FableFlowResult<()> {
        let file = fs::File::create(output).map_err(|e| {
            BookError::new(BookErrorKind::FileWrite {
                path: output.display().to_string(),
                message: e.to_string(),
            })
        })?;
        let mut archive = ZipWriter::new(file);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let registry = BookmarkRegistry::prescan(document);
        let entries = spine_entries(document, &registry);
        let identifier = format!("urn:uuid:{}", Uuid::new_v4());
        let images = collect_images(document);

        // The mimetype entry must come first and must be stored.
        write_entry(&mut archive, "mimetype", stored, b"application/epub+zip", output)?;
        write_entry(
            &mut archive,
            "META-INF/container.xml",
            deflated,
            CONTAINER_XML.as_bytes(),
            output,
        )?;
        write_entry(
            &mut archive,
            "OEBPS/content.opf",
            deflated,
            content_opf(document, &entries, &images, &identifier).as_bytes(),
            output,
        )?;
        write_entry(
            &mut archive,
            "OEBPS/toc.ncx",
            deflated,
            toc_ncx(document, &entries, &identifier).as_bytes(),
            output,
        )?;
        write_entry(
            &mut archive,
            "OEBPS/nav.xhtml",
            deflated,
            nav_xhtml(&entries).as_bytes(),
            output,
        )?;
        write_entry(
            &mut archive,
            "OEBPS/styles/main.css",
            deflated,
            MAIN_CSS.as_bytes(),
            output,
        )?;

        for entry in &entries {
            let body = section_xhtml(entry.section, &entries);
            write_entry(
                &mut archive,
                &format!("OEBPS/{}", entry.filename),
                deflated,
                body.as_bytes(),
                output,
            )?;
        }

        for filename in &images {
            match fs::read(book_dir.join(filename)) {
                Ok(bytes) => write_entry(
                    &mut archive,
                    &format!("OEBPS/images/{filename}"),
                    deflated,
                    &bytes,
                    output,
                )?,
                Err(err) => warn!(%err, filename, "skipping missing image"),
            }
        }

        archive.finish().map_err(|e| {
            BookError::new(BookErrorKind::EpubAssembly(format!("finish archive: {e}")))
        })?;
        Ok(())
    }
}

fn write_entry<W: Write + std::io::Seek>(
    archive: &mut ZipWriter<W>,
    name: &str,
    options: SimpleFileOptions,
    bytes: &[u8],
    output: &Path,
) -> FableFlowResult<()> {
    archive.start_file(name, options).map_err(|e| {
        BookError::new(BookErrorKind::EpubAssembly(format!("start {name}: {e}")))
    })?;
    archive.write_all(bytes).map_err(|e| {
        BookError::new(BookErrorKind::FileWrite {
            path: output.display().to_string(),
            message: e.to_string(),
        })
    })?;
    Ok(())
}

fn spine_entries<'a>(
    document: &'a Document,
    registry: &BookmarkRegistry,
) -> Vec<SpineEntry<'a>> {
    let mut entries = Vec::new();
    let mut chapter_fallback = 0usize;
    for section in &document.sections {
        let id = match section.kind {
            SectionKind::FrontCover => "cover".to_string(),
            SectionKind::TitlePage => "title-page".to_string(),
            SectionKind::PublicationInfo => "publication-info".to_string(),
            SectionKind::TableOfContents => "toc-page".to_string(),
            SectionKind::BackCover => "back-cover".to_string(),
            _ => match registry.id_for(&section.title) {
                Some(id) => id.to_string(),
                None => {
                    // Duplicate chapter titles share a bookmark id, so
                    // fall back to a positional name.
                    chapter_fallback += 1;
                    format!("extra_{chapter_fallback}")
                }
            },
        };
        // Duplicate-titled chapters map to the same id; keep filenames
        // unique by suffixing repeats.
        let mut filename = format!("{id}.xhtml");
        let mut suffix = 1;
        while entries
            .iter()
            .any(|e: &SpineEntry<'_>| e.filename == filename)
        {
            filename = format!("{id}_{suffix}.xhtml");
            suffix += 1;
        }
        entries.push(SpineEntry {
            id: filename.trim_end_matches(".xhtml").to_string(),
            filename,
            section,
        });
    }
    entries
}

fn collect_images(document: &Document) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for section in &document.sections {
        for block in &section.blocks {
            if let Block::ImageRef { filename, .. } = block {
                if !filename.is_empty() && !names.iter().any(|n| n == filename) {
                    names.push(filename.clone());
                }
            }
        }
    }
    names
}

fn media_type(filename: &str) -> &'static str {
    if filename.ends_with(".jpg") || filename.ends_with(".jpeg") {
        "image/jpeg"
    } else {
        "image/png"
    }
}

fn content_opf(
    document: &Document,
    entries: &[SpineEntry<'_>],
    images: &[String],
    identifier: &str,
) -> String {
    let meta = document.meta.normalized();
    let modified = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let mut manifest = String::new();
    manifest.push_str(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
    );
    manifest.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );
    manifest.push_str(
        "    <item id=\"css\" href=\"styles/main.css\" media-type=\"text/css\"/>\n",
    );
    let mut spine = String::new();
    for entry in entries {
        manifest.push_str(&format!(
            "    <item id=\"{0}\" href=\"{1}\" media-type=\"application/xhtml+xml\"/>\n",
            entry.id, entry.filename
        ));
        spine.push_str(&format!("    <itemref idref=\"{}\"/>\n", entry.id));
    }
    for (i, image) in images.iter().enumerate() {
        manifest.push_str(&format!(
            "    <item id=\"img{i}\" href=\"images/{image}\" media-type=\"{}\"/>\n",
            media_type(image)
        ));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\" unique-identifier=\"bookid\">\n\
         \x20 <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n\
         \x20   <dc:identifier id=\"bookid\">{identifier}</dc:identifier>\n\
         \x20   <dc:title>{title}</dc:title>\n\
         \x20   <dc:creator>{author}</dc:creator>\n\
         \x20   <dc:language>en</dc:language>\n\
         \x20   <dc:publisher>{publisher}</dc:publisher>\n\
         \x20   <dc:date>{year}</dc:date>\n\
         \x20   <dc:identifier>ISBN {isbn}</dc:identifier>\n\
         \x20   <meta property=\"dcterms:modified\">{modified}</meta>\n\
         \x20 </metadata>\n\
         \x20 <manifest>\n{manifest}  </manifest>\n\
         \x20 <spine toc=\"ncx\">\n{spine}  </spine>\n\
         </package>\n",
        identifier = identifier,
        title = escape_html(&meta.title),
        author = escape_html(&meta.author),
        publisher = escape_html(&meta.publisher),
        year = escape_html(&meta.publication_year),
        isbn = escape_html(meta.isbn_for(true)),
        modified = modified,
        manifest = manifest,
        spine = spine,
    )
}

fn toc_ncx(document: &Document, entries: &[SpineEntry<'_>], identifier: &str) -> String {
    let meta = document.meta.normalized();
    let mut nav_points = String::new();
    let mut order = 0usize;
    for entry in entries {
        if entry.section.kind != SectionKind::Chapter
            && !entry.section.kind.is_tracked_section()
        {
            continue;
        }
        order += 1;
        nav_points.push_str(&format!(
            "    <navPoint id=\"nav_{order}\" playOrder=\"{order}\">\n\
             \x20     <navLabel><text>{}</text></navLabel>\n\
             \x20     <content src=\"{}\"/>\n\
             \x20   </navPoint>\n",
            escape_html(&entry.section.title),
            entry.filename,
        ));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\">\n\
         \x20 <head>\n\
         \x20   <meta name=\"dtb:uid\" content=\"{identifier}\"/>\n\
         \x20   <meta name=\"dtb:depth\" content=\"1\"/>\n\
         \x20 </head>\n\
         \x20 <docTitle><text>{}</text></docTitle>\n\
         \x20 <navMap>\n{nav_points}  </navMap>\n\
         </ncx>\n",
        escape_html(&meta.title),
    )
}

fn nav_xhtml(entries: &[SpineEntry<'_>]) -> String {
    let mut items = String::new();
    for entry in entries {
        if entry.section.kind != SectionKind::Chapter
            && !entry.section.kind.is_tracked_section()
        {
            continue;
        }
        items.push_str(&format!(
            "      <li><a href=\"{}\">{}</a></li>\n",
            entry.filename,
            escape_html(&entry.section.title),
        ));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\n\
         <head><title>Contents</title></head>\n\
         <body>\n\
         \x20 <nav epub:type=\"toc\" id=\"toc\">\n\
         \x20   <h1>Table of Contents</h1>\n\
         \x20   <ol>\n{items}    </ol>\n\
         \x20 </nav>\n\
         </body>\n\
         </html>\n",
    )
}

fn section_xhtml(section: &Section, entries: &[SpineEntry<'_>]) -> String {
    let mut body = String::new();
    match section.kind {
        SectionKind::TableOfContents => {
            body.push_str(&format!(
                "  <h1 class=\"toc-title\">{}</h1>\n",
                escape_html(&section.title)
            ));
            // The contents page links by file rather than page number.
            for entry in entries {
                if entry.section.kind != SectionKind::Chapter {
                    continue;
                }
                body.push_str(&format!(
                    "  <p class=\"toc-entry\"><a href=\"{}\">{}</a></p>\n",
                    entry.filename,
                    escape_html(&entry.section.title),
                ));
            }
        }
        SectionKind::FrontCover | SectionKind::BackCover => {
            for block in &section.blocks {
                body.push_str(&block_xhtml(block));
            }
        }
        _ => {
            let heading_class = match section.kind {
                SectionKind::Chapter => "chapter-title",
                _ => "section-title",
            };
            body.push_str(&format!(
                "  <h2 class=\"{heading_class}\">{}</h2>\n",
                escape_html(&section.title)
            ));
            for block in &section.blocks {
                body.push_str(&block_xhtml(block));
            }
        }
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\">\n\
         <head>\n\
         \x20 <title>{}</title>\n\
         \x20 <link rel=\"stylesheet\" type=\"text/css\" href=\"styles/main.css\"/>\n\
         </head>\n\
         <body>\n{body}</body>\n\
         </html>\n",
        escape_html(&section.title),
    )
}

fn block_xhtml(block: &Block) -> String {
    match block {
        Block::Paragraph { text, style } => {
            let class = match style {
                crate::model::ParagraphStyle::Story => "story-text",
                crate::model::ParagraphStyle::Dialogue => "dialogue",
                crate::model::ParagraphStyle::Emphasis => "emphasis",
                crate::model::ParagraphStyle::Caption => "caption",
                crate::model::ParagraphStyle::Quote => "quote-box",
            };
            format!("  <p class=\"{class}\">{}</p>\n", escape_html(text))
        }
        Block::Poem { kind, lines } => {
            let class = match kind {
                PoemKind::Verse => "verse",
                PoemKind::Chant => "chant",
                PoemKind::Song => "song",
                PoemKind::Haiku => "haiku",
                PoemKind::Limerick => "limerick",
                PoemKind::Cinquain => "cinquain",
                PoemKind::Poem => "poem-box",
            };
            let mut html = format!("  <div class=\"{class}\">\n");
            for line in lines {
                html.push_str(&format!(
                    "    <p class=\"poem-verse\">{}</p>\n",
                    escape_html(line)
                ));
            }
            html.push_str("  </div>\n");
            html
        }
        Block::ImageRef {
            filename,
            caption,
            layout,
        } => {
            if filename.is_empty() {
                return String::new();
            }
            let class = match layout {
                ImageLayout::FullPage | ImageLayout::Spread => "image-full-page",
                ImageLayout::InlineLeft => "image-inline-left",
                ImageLayout::InlineRight => "image-inline-right",
                ImageLayout::ChapterOpener => "chapter-opener-image",
                ImageLayout::Inline => "image-inline",
            };
            let mut html = format!(
                "  <div class=\"{class}\">\n    <img src=\"images/{filename}\" alt=\"{}\"/>\n",
                escape_html(caption)
            );
            if !caption.is_empty() {
                html.push_str(&format!(
                    "    <div class=\"caption\">{}</div>\n",
                    escape_html(caption)
                ));
            }
            html.push_str("  </div>\n");
            html
        }
        Block::StoryBreak { text } => {
            format!("  <p class=\"story-break\">{}</p>\n", escape_html(text))
        }
        // Page breaks have no meaning in a reflowable layout.
        Block::PageBreak => String::new(),
    }
}

const CONTAINER_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n\
  <rootfiles>\n\
    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>\n\
  </rootfiles>\n\
</container>\n";

const MAIN_CSS: &str = "body { font-family: serif; line-height: 1.5; margin: 1em; }\n\
h1, h2 { font-family: sans-serif; text-align: center; }\n\
.chapter-title { margin-top: 2em; }\n\
.story-text { text-indent: 1.5em; margin: 0 0 0.4em 0; }\n\
.dialogue { margin-left: 1.5em; }\n\
.emphasis { font-style: italic; text-align: center; }\n\
.poem-box, .verse, .chant, .song, .haiku, .limerick, .cinquain {\n\
  margin: 1.5em auto; text-align: center; font-style: italic;\n\
}\n\
.chant { font-style: normal; font-weight: bold; }\n\
.image-full-page img { display: block; margin: 0 auto; max-width: 100%; }\n\
.caption { text-align: center; font-style: italic; font-size: 0.9em; }\n\
.story-break { text-align: center; margin: 1.5em 0; }\n\
.toc-entry { margin: 0.3em 0; }\n\
.toc-entry a { color: #0000cc; text-decoration: none; }\n";

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::model::{Document, ParagraphStyle};
    use crate::BookMeta;

    fn sample() -> Document {
        let mut toc = Section::new(SectionKind::TableOfContents, "Table of Contents");
        toc.blocks.push(Block::Paragraph {
            text: "Chapter 1: Intro".to_string(),
            style: ParagraphStyle::Story,
        });
        let mut chapter = Section::new(SectionKind::Chapter, "Chapter 1: Intro");
        chapter.blocks.push(Block::Paragraph {
            text: "Hello world.".to_string(),
            style: ParagraphStyle::Story,
        });
        Document::new(vec![toc, chapter], BookMeta::default())
    }

    #[test]
    fn mimetype_is_first_and_stored() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("book.epub");
        EpubRenderer::new()
            .render(&sample(), dir.path(), &output)
            .unwrap();

        let mut archive =
            zip::ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
        let mut first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
        let mut body = String::new();
        first.read_to_string(&mut body).unwrap();
        assert_eq!(body, "application/epub+zip");
    }

    #[test]
    fn package_lists_chapters_in_spine_order() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("book.epub");
        EpubRenderer::new()
            .render(&sample(), dir.path(), &output)
            .unwrap();

        let mut archive =
            zip::ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
        let mut opf = String::new();
        archive
            .by_name("OEBPS/content.opf")
            .unwrap()
            .read_to_string(&mut opf)
            .unwrap();
        assert!(opf.contains("<itemref idref=\"toc-page\"/>"));
        assert!(opf.contains("<itemref idref=\"chapter_0\"/>"));
        assert!(opf.contains("properties=\"nav\""));

        let mut chapter = String::new();
        archive
            .by_name("OEBPS/chapter_0.xhtml")
            .unwrap()
            .read_to_string(&mut chapter)
            .unwrap();
        assert!(chapter.contains("Hello world."));
    }

    #[test]
    fn contents_page_links_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("book.epub");
        EpubRenderer::new()
            .render(&sample(), dir.path(), &output)
            .unwrap();

        let mut archive =
            zip::ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
        let mut toc = String::new();
        archive
            .by_name("OEBPS/toc-page.xhtml")
            .unwrap()
            .read_to_string(&mut toc)
            .unwrap();
        assert!(toc.contains("<a href=\"chapter_0.xhtml\">Chapter 1: Intro</a>"));
    }

    #[test]
    fn image_paths_are_rewritten_under_images() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("image_0.png"), b"notapng").unwrap();
        let output = dir.path().join("book.epub");
        let mut chapter = Section::new(SectionKind::Chapter, "Chapter 1");
        chapter.blocks.push(Block::ImageRef {
            filename: "image_0.png".to_string(),
            caption: "A fox".to_string(),
            layout: ImageLayout::FullPage,
        });
        let doc = Document::new(vec![chapter], BookMeta::default());
        EpubRenderer::new().render(&doc, dir.path(), &output).unwrap();

        let mut archive =
            zip::ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
        assert!(archive.by_name("OEBPS/images/image_0.png").is_ok());
        let mut body = String::new();
        archive
            .by_name("OEBPS/chapter_0.xhtml")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert!(body.contains("src=\"images/image_0.png\""));
    }

    #[test]
    fn empty_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document {
            sections: Vec::new(),
            meta: BookMeta::default(),
        };
        let result = EpubRenderer::new().render(&doc, dir.path(), &dir.path().join("x.epub"));
        assert!(result.is_err());
    }
}
