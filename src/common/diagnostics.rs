//! Per-document diagnostics collection.
//!
//! Non-fatal issues (unsupported fills, undecodable images, broken shapes)
//! are downgraded to warnings and accumulated in a [`Diagnostics`] collector
//! scoped to a single document. The collector is threaded explicitly through
//! the recolor call chain and merged into that document's
//! [`ProcessingResult`] at the end; there is no shared or global log.

/// Ordered warning collector for one document.
///
/// One instance per document, owned by whichever worker processes it.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Append warnings from a nested scope, prefixing each with `prefix`.
    ///
    /// Used to attribute slide-scoped warnings to their slide index.
    pub fn absorb_prefixed(&mut self, prefix: &str, nested: Diagnostics) {
        for w in nested.warnings {
            self.warnings.push(format!("{prefix}{w}"));
        }
    }

    /// Number of warnings collected so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// True if no warnings have been collected.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// View the collected warnings.
    #[inline]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Consume the collector, yielding the ordered warning list.
    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

/// Outcome of processing one document.
///
/// Exactly one result is produced per submitted document, success or not.
/// `output` is present only when `succeeded` is true; a failed document
/// yields no bytes (partial edits are discarded). The warning list is always
/// present and preserves the order issues were encountered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingResult {
    /// Display name of the document (disambiguated by the orchestrator).
    pub name: String,
    /// Whether the document was recolored end to end.
    pub succeeded: bool,
    /// Recolored document bytes, on success.
    pub output: Option<Vec<u8>>,
    /// Non-fatal issues encountered while processing this document.
    pub warnings: Vec<String>,
}

impl ProcessingResult {
    /// Build a successful result.
    pub fn success(name: impl Into<String>, output: Vec<u8>, diagnostics: Diagnostics) -> Self {
        Self {
            name: name.into(),
            succeeded: true,
            output: Some(output),
            warnings: diagnostics.into_warnings(),
        }
    }

    /// Build a failed result carrying the failure reason as its last warning.
    pub fn failure(
        name: impl Into<String>,
        mut diagnostics: Diagnostics,
        reason: impl Into<String>,
    ) -> Self {
        diagnostics.warn(reason);
        Self {
            name: name.into(),
            succeeded: false,
            output: None,
            warnings: diagnostics.into_warnings(),
        }
    }
}
