//! Pipeline orchestration error types.

/// Specific error conditions for pipeline stage execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PipelineErrorKind {
    /// A required upstream artifact is missing
    #[display("Missing input '{}' — run the {} stage first", path, stage)]
    MissingInput {
        /// Path of the missing artifact
        path: String,
        /// Stage that produces it
        stage: String,
    },
    /// Stage execution failed
    #[display("Stage '{}' failed: {}", stage, message)]
    StageFailed {
        /// Stage name
        stage: String,
        /// Failure description
        message: String,
    },
    /// Output file could not be committed atomically
    #[display("Failed to commit output '{}': {}", path, message)]
    CommitFailed {
        /// Output path
        path: String,
        /// Underlying error message
        message: String,
    },
}

/// Error type for pipeline operations.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The specific error condition
    pub kind: PipelineErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new PipelineError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
