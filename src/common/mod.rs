//! Common types shared across the pipeline.

// Submodule declarations
pub mod diagnostics;
pub mod error;

// Re-exports for convenience
pub use diagnostics::{Diagnostics, ProcessingResult};
pub use error::{Error, Result};
