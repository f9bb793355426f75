//! Damson - dark-mode conversion for PowerPoint presentations
//!
//! This library rewrites the colors of `.pptx` files in place: explicit
//! solid colors snap to a configured dark/light pair by polarity, embedded
//! raster images are remapped onto the same palette, and everything it
//! cannot safely rewrite is reported as a warning instead of being guessed
//! at. The slide XML is patched byte for byte, so untouched markup comes
//! out exactly as it went in.
//!
//! # Features
//!
//! - **Polarity-preserving recoloring**: dark colors map to the dark
//!   endpoint, light colors to the light one, for fills, outlines, text
//!   runs, and slide backgrounds
//! - **Image remapping**: embedded rasters are interpolated onto the same
//!   two-color palette; transparency decides between PNG and JPEG output
//! - **Batch processing**: many documents at once over a bounded worker
//!   pool, with zip containers expanded one level
//! - **Fault isolation**: a corrupt slide, image, or document never takes
//!   the rest of the batch with it
//!
//! # Example - Converting one presentation
//!
//! ```no_run
//! use damson::{InversionConfig, process_one};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("deck.pptx")?;
//! let config = InversionConfig::from_hex("1E1E1E", "FAFAFA")?;
//!
//! let result = process_one("deck.pptx", &bytes, &config)?;
//! for warning in &result.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! if let Some(output) = result.output {
//!     std::fs::write("deck-dark.pptx", output)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Converting a batch
//!
//! ```no_run
//! use damson::{BatchOptions, InputDocument, InversionConfig, process_batch};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let docs = vec![
//!     InputDocument::new("a.pptx", std::fs::read("a.pptx")?),
//!     InputDocument::new("decks.zip", std::fs::read("decks.zip")?),
//! ];
//! let config = InversionConfig::default();
//!
//! let outcome = process_batch(docs, &config, &BatchOptions::default())?;
//! for result in &outcome.results {
//!     let status = if result.succeeded { "ok" } else { "failed" };
//!     println!("{}: {status}", result.name);
//! }
//! # Ok(())
//! # }
//! ```

/// Batch orchestration: input expansion, scheduling, output archiving
pub mod batch;

/// Colors, WCAG luminance, and contrast validation
pub mod color;

/// Error type and processing diagnostics shared across the crate
pub mod common;

/// Inversion configuration and its wire form
pub mod config;

/// Raster image remapping
pub mod images;

/// Bounded worker pool with thread and child-process backends
pub mod pool;

/// The `.pptx` pipeline: package, slides, shapes, recoloring
pub mod pptx;

// Re-export the types most callers need
pub use batch::{
    BatchOptions, BatchOutcome, BatchStream, DEFAULT_MAX_WORKERS, InputDocument, process_batch,
    process_batch_streaming, process_one, validate_config,
};
pub use common::{Diagnostics, Error, ProcessingResult, Result};
pub use config::{InversionConfig, SerializedConfig};
pub use pool::{WorkerBackend, init_worker};
pub use pptx::process_document;
