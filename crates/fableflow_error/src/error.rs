//! Top-level error wrapper types.

use crate::{
    BookError, BuilderError, ConfigError, GenerationError, HttpError, JsonError, PipelineError,
};

/// This is the foundation error enum. Every FableFlow crate folds its
/// domain error into one of these variants.
///
/// # Examples
///
/// ```
/// use fableflow_error::{FableFlowError, HttpError};
///
/// let http_err = HttpError::new("Connection failed");
/// let err: FableFlowError = http_err.into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum FableFlowErrorKind {
    /// HTTP error
    #[from(HttpError)]
    Http(HttpError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// Text-generation backend error
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Book assembly/rendering error
    #[from(BookError)]
    Book(BookError),
    /// Pipeline orchestration error
    #[from(PipelineError)]
    Pipeline(PipelineError),
}

/// FableFlow error with kind discrimination.
///
/// # Examples
///
/// ```
/// use fableflow_error::{FableFlowResult, ConfigError};
///
/// fn might_fail() -> FableFlowResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("FableFlow Error: {}", _0)]
pub struct FableFlowError(Box<FableFlowErrorKind>);

impl FableFlowError {
    /// Create a new error from a kind.
    pub fn new(kind: FableFlowErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &FableFlowErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to FableFlowErrorKind
impl<T> From<T> for FableFlowError
where
    T: Into<FableFlowErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for FableFlow operations.
///
/// # Examples
///
/// ```
/// use fableflow_error::{FableFlowResult, HttpError};
///
/// fn fetch_data() -> FableFlowResult<String> {
///     Err(HttpError::new("404 Not Found"))?
/// }
/// ```
pub type FableFlowResult<T> = std::result::Result<T, FableFlowError>;
