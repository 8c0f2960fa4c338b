//! Book-level metadata.

use serde::{Deserialize, Serialize};

/// Metadata carried through both renderers.
///
/// The subtitle is normalized at construction so a literal "None"
/// slipping through from upstream generation is never printed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookMeta {
    /// Book title.
    pub title: String,
    /// Optional subtitle; empty means none.
    pub subtitle: String,
    /// Story author, shown on the cover and title page.
    pub author: String,
    /// Publisher imprint.
    pub publisher: String,
    /// Publisher location line for the back cover.
    pub publisher_location: String,
    /// Back-cover description.
    pub description: String,
    /// Edition line for the publication-info page.
    pub edition: String,
    /// Publication year.
    pub publication_year: String,
    /// ISBN for the print edition.
    pub isbn_pdf: String,
    /// ISBN for the EPUB edition.
    pub isbn_epub: String,
}

impl Default for BookMeta {
    fn default() -> Self {
        Self {
            title: "Untitled Story".to_string(),
            subtitle: String::new(),
            author: "Anonymous".to_string(),
            publisher: "FableFlow Publishing".to_string(),
            publisher_location: String::new(),
            description: "An engaging educational children's book that combines storytelling \
                          with learning, designed to inspire curiosity and wonder in young readers."
                .to_string(),
            edition: "First Edition".to_string(),
            publication_year: "2024".to_string(),
            isbn_pdf: "978-0-XXXXX-XXX-X".to_string(),
            isbn_epub: "978-0-XXXXX-XXX-Y".to_string(),
        }
    }
}

impl BookMeta {
    /// Normalizes fields that upstream stages sometimes fill with
    /// placeholder junk. A subtitle of "None" (any case) becomes empty;
    /// blank required fields fall back to defaults.
    pub fn normalized(&self) -> Self {
        let mut meta = self.clone();
        if matches!(meta.subtitle.trim(), "None" | "none" | "NONE") {
            meta.subtitle = String::new();
        }
        let defaults = Self::default();
        if meta.title.trim().is_empty() {
            meta.title = defaults.title;
        }
        if meta.author.trim().is_empty() {
            meta.author = defaults.author;
        }
        if meta.publisher.trim().is_empty() {
            meta.publisher = defaults.publisher;
        }
        if meta.description.trim().is_empty() {
            meta.description = defaults.description;
        }
        meta
    }

    /// The ISBN appropriate to a given output format.
    pub fn isbn_for(&self, epub: bool) -> &str {
        if epub { &self.isbn_epub } else { &self.isbn_pdf }
    }
}
