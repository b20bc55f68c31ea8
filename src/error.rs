//! Error types for the export pipeline

use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing and exporting a document
#[derive(Error, Debug)]
pub enum Error {
    /// The named source element is not attached to the document
    #[error("Element not found: {0}")]
    NotFound(String),

    /// The rasterizer could not produce a bitmap
    #[error("Capture failed: {0}")]
    CaptureError(String),

    /// The PDF container could not be encoded or written
    #[error("PDF assembly failed: {0}")]
    AssemblyError(String),

    /// A temporary node could not be removed from the document
    #[error("Cleanup failed: {0}")]
    CleanupError(String),

    /// A document operation referenced a node that no longer exists
    #[error("Invalid node: {0}")]
    InvalidNode(String),

    /// Caller supplied input that cannot be processed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Network error (enhancement service)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Filesystem error while saving output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::AssemblyError(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::AssemblyError(err.to_string())
    }
}
