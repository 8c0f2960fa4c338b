//! Book assembly and rendering error types.

/// Specific error conditions for document assembly and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum BookErrorKind {
    /// Failed to read a source file
    #[display("Failed to read file '{}': {}", path, message)]
    FileRead {
        /// Path that failed to read
        path: String,
        /// Underlying error message
        message: String,
    },
    /// Failed to write an artifact
    #[display("Failed to write artifact '{}': {}", path, message)]
    FileWrite {
        /// Path that failed to write
        path: String,
        /// Underlying error message
        message: String,
    },
    /// Document contains no sections
    #[display("Document contains no sections")]
    EmptyDocument,
    /// PDF object assembly failed
    #[display("PDF assembly failed: {}", _0)]
    PdfAssembly(String),
    /// EPUB archive assembly failed
    #[display("EPUB assembly failed: {}", _0)]
    EpubAssembly(String),
    /// Image decoding failed
    #[display("Failed to decode image '{}': {}", path, message)]
    ImageDecode {
        /// Image path
        path: String,
        /// Underlying error message
        message: String,
    },
}

/// Error type for book assembly operations.
///
/// # Examples
///
/// ```
/// use fableflow_error::{BookError, BookErrorKind};
///
/// let err = BookError::new(BookErrorKind::EmptyDocument);
/// assert!(format!("{}", err).contains("no sections"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Book Error: {} at line {} in {}", kind, line, file)]
pub struct BookError {
    /// The specific error condition
    pub kind: BookErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl BookError {
    /// Create a new BookError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: BookErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
