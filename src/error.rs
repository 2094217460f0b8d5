//! Custom error types and result handling for Tsunagi operations.
//!
//! All fallible operations return a [`Result<T>`], which is a type alias for
//! `std::result::Result<T, Error>`. Per-file and per-group problems met during a
//! batch are not raised through this type; they are recorded in the
//! [`BatchReport`](crate::types::BatchReport) instead.
//!
use std::path::PathBuf;

/// Type alias for Results with Tsunagi errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all Tsunagi operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O errors from the standard library
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Regular expression parsing errors
    #[error(transparent)]
    Regex(#[from] regex::Error),
    /// Image encoding errors
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// EPUB generation errors
    #[error(transparent)]
    Epub(#[from] epub_builder::Error),
    /// Async task join errors
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    TsunagiBuilder(#[from] crate::tsunagi::TsunagiConfigBuilderError),
    /// Error for invalid file or directory paths
    #[error("The given path '{0:?}' is invalid: {1}")]
    InvalidPath(PathBuf, String),
    /// A single image could not be opened or decoded
    #[error("Failed to decode image '{0:?}': {1}")]
    Decode(PathBuf, String),
    /// The compositor was handed no images
    #[error("Cannot stitch an empty group: canvas geometry is undefined")]
    EmptyGroup,
    /// Error for unsupported operations or formats
    #[error("Unsupported: {0}")]
    Unsupported(String),
    /// Error for resources that couldn't be found (e.g., source directory)
    #[error("Not found: {0}")]
    NotFound(String),
    /// Other errors that don't fit into specific categories
    #[error("Other error: {0}")]
    Other(String),
}

// Basic From<String> conversion for convenience
impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::Other(error)
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Error::Other(error.to_string())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
