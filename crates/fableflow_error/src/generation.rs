//! Text-generation error types.

/// Specific error conditions for chat-completion backends and the
/// continuation loop that drives them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GenerationErrorKind {
    /// Backend request failed before any content was produced
    #[display("Backend request failed: {}", _0)]
    Request(String),
    /// Backend returned a non-success status
    #[display("Backend returned status {}: {}", status, message)]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
    /// Backend response could not be parsed
    #[display("Failed to parse backend response: {}", _0)]
    Parse(String),
    /// Response contained no choices
    #[display("Backend response contained no choices")]
    EmptyResponse,
    /// Generation was cancelled between continuation iterations
    #[display("Generation cancelled after {} continuation(s)", _0)]
    Cancelled(u32),
}

/// Error type for generation operations.
///
/// # Examples
///
/// ```
/// use fableflow_error::{GenerationError, GenerationErrorKind};
///
/// let err = GenerationError::new(GenerationErrorKind::EmptyResponse);
/// assert!(format!("{}", err).contains("no choices"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The specific error condition
    pub kind: GenerationErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
