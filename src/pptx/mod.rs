//! PowerPoint (`.pptx`) reading, recoloring, and writing.
//!
//! The layers, bottom up: [`package`] handles the OPC zip container and its
//! relationship plumbing, [`slide`] parses one slide part into the
//! [`shapes`] tree, [`recolor`] patches explicit colors in place, and
//! [`document`] runs the whole pipeline over a presentation.

pub mod document;
pub mod package;
pub mod recolor;
pub mod shapes;
pub mod slide;

#[cfg(test)]
pub(crate) mod fixtures;

pub use document::process_document;
