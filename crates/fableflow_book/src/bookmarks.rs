//! Bookmark ids and page numbers captured across layout passes.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{Document, SectionKind};

/// Stable anchor ids assigned before layout, with page numbers filled
/// in by each layout pass.
///
/// Chapters get `chapter_{i}` ids and formal sections get
/// `section_{j}` ids, both counted in document order. Duplicate
/// chapter titles keep the first id; ids are never reassigned between
/// passes, only the page map is refreshed.
#[derive(Debug, Clone, Default)]
pub struct BookmarkRegistry {
    by_title: HashMap<String, String>,
    ordered: Vec<(String, String)>,
    pages: HashMap<String, u32>,
}

impl BookmarkRegistry {
    /// Scans a document and assigns ids to chapters and tracked
    /// sections.
    pub fn prescan(document: &Document) -> Self {
        let mut registry = Self::default();
        let mut chapter_count = 0usize;
        let mut section_count = 0usize;
        for section in &document.sections {
            match section.kind {
                SectionKind::Chapter => {
                    if registry.by_title.contains_key(&section.title) {
                        debug!(title = %section.title, "duplicate chapter title, keeping first id");
                        continue;
                    }
                    let id = format!("chapter_{chapter_count}");
                    chapter_count += 1;
                    registry
                        .by_title
                        .insert(section.title.clone(), id.clone());
                    registry.ordered.push((id, section.title.clone()));
                }
                kind if kind.is_tracked_section() => {
                    let id = format!("section_{section_count}");
                    section_count += 1;
                    registry
                        .by_title
                        .insert(section.title.clone(), id.clone());
                    registry.ordered.push((id, section.title.clone()));
                }
                _ => {}
            }
        }
        registry
    }

    /// Id assigned to a title, if any.
    pub fn id_for(&self, title: &str) -> Option<&str> {
        self.by_title.get(title).map(String::as_str)
    }

    /// Records the page a bookmark landed on during layout.
    pub fn record_page(&mut self, id: &str, page: u32) {
        self.pages.insert(id.to_string(), page);
    }

    /// Page number for a bookmark id, once a layout pass has run.
    pub fn page_for(&self, id: &str) -> Option<u32> {
        self.pages.get(id).copied()
    }

    /// Page number for a title, resolved through its id.
    pub fn page_for_title(&self, title: &str) -> Option<u32> {
        self.id_for(title).and_then(|id| self.page_for(id))
    }

    /// Clears recorded pages before a fresh layout pass. Ids survive.
    pub fn reset_pages(&mut self) {
        self.pages.clear();
    }

    /// All bookmarks in document order as `(id, title)` pairs.
    pub fn entries(&self) -> &[(String, String)] {
        &self.ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, Section, SectionKind};
    use crate::BookMeta;

    fn doc() -> Document {
        Document::new(
            vec![
                Section::new(SectionKind::Preface, "Preface"),
                Section::new(SectionKind::Chapter, "Chapter 1: The Den"),
                Section::new(SectionKind::Chapter, "Chapter 2: The Meadow"),
                Section::new(SectionKind::Chapter, "Chapter 1: The Den"),
                Section::new(SectionKind::AboutAuthor, "About the Author"),
            ],
            BookMeta::default(),
        )
    }

    #[test]
    fn ids_count_chapters_and_sections_separately() {
        let registry = BookmarkRegistry::prescan(&doc());
        assert_eq!(registry.id_for("Chapter 1: The Den"), Some("chapter_0"));
        assert_eq!(registry.id_for("Chapter 2: The Meadow"), Some("chapter_1"));
        assert_eq!(registry.id_for("Preface"), Some("section_0"));
        assert_eq!(registry.id_for("About the Author"), Some("section_1"));
    }

    #[test]
    fn duplicate_titles_keep_first_id() {
        let registry = BookmarkRegistry::prescan(&doc());
        // Two chapters share a title, so only three bookmarks exist
        // beyond the two sections.
        assert_eq!(registry.entries().len(), 4);
    }

    #[test]
    fn page_reset_preserves_ids() {
        let mut registry = BookmarkRegistry::prescan(&doc());
        registry.record_page("chapter_0", 7);
        assert_eq!(registry.page_for_title("Chapter 1: The Den"), Some(7));
        registry.reset_pages();
        assert_eq!(registry.page_for("chapter_0"), None);
        assert_eq!(registry.id_for("Chapter 1: The Den"), Some("chapter_0"));
    }
}
