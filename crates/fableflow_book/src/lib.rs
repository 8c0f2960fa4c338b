//! Document assembly and pagination for FableFlow books.
//!
//! The path from edited story text to a finished book runs through a
//! single tagged [`Document`] model: chapter detection and HTML
//! formatting build it up, a bookmark pre-scan assigns stable
//! identifiers to every chapter and formal section, and two renderers
//! consume it. The fixed-page PDF renderer performs a two-pass build
//! so the table of contents can show real page numbers for sections
//! that are painted later; the reflowing EPUB renderer emits one
//! navigable part per section in a single pass.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bookmarks;
mod chapters;
mod epub;
mod formatter;
mod layout;
mod measure;
mod meta;
mod model;
mod parse;
mod pdf;
mod style;

pub use bookmarks::BookmarkRegistry;
pub use chapters::{detect_chapters, RawChapter};
pub use epub::EpubRenderer;
pub use formatter::StoryFormatter;
pub use layout::{LayoutEngine, Page, PaintOp};
pub use measure::{ApproxMeasurer, TextMeasurer};
pub use meta::BookMeta;
pub use model::{Block, Document, ImageLayout, ParagraphStyle, PoemKind, Section, SectionKind};
pub use parse::DocumentParser;
pub use pdf::PdfRenderer;
pub use style::{Font, PdfStyle};
