//! Unified error types for the damson library.
//!
//! One error enum covers the whole pipeline, from container handling to the
//! per-document recoloring pass, presenting a consistent API to users.
use thiserror::Error;

/// Main error type for damson operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration (fatal before any document is scheduled)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Malformed color literal
    #[error("Invalid color '{0}': expected six hex digits, optionally prefixed with '#'")]
    InvalidColor(String),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// Raster image decode/encode error
    #[error("Image error: {0}")]
    Image(String),

    /// File is not a presentation document
    #[error("Not a presentation document: {0}")]
    NotAPresentation(String),

    /// Package part not found
    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// Worker pool or worker protocol error
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Result type for damson operations.
pub type Result<T> = std::result::Result<T, Error>;
