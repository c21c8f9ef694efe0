//! Holds the domain-state document between events.

use chatwire_core::{Diagnostic, DiagnosticsSink, Document};
use chatwire_patch::apply_patch;

/// The last applied domain-state document plus the one before it.
///
/// The previous version is kept for exactly one diff cycle: every update
/// moves the current document into `previous`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateStore {
    current: Document,
    previous: Document,
}

impl StateStore {
    pub fn new() -> Self {
        Self::with_document(Document::empty_map())
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            previous: document.clone(),
            current: document,
        }
    }

    pub fn current(&self) -> &Document {
        &self.current
    }

    pub fn previous(&self) -> &Document {
        &self.previous
    }

    /// Replace the document wholesale. A snapshot whose root is not a map is
    /// reported and ignored, though the diff window still advances.
    pub fn replace(&mut self, snapshot: Document, sink: &dyn DiagnosticsSink) {
        let next = if snapshot.is_map() {
            snapshot
        } else {
            sink.report(Diagnostic::new(format!(
                "Ignoring state snapshot with a {} root",
                snapshot.kind()
            )));
            self.current.clone()
        };
        self.previous = std::mem::replace(&mut self.current, next);
    }

    /// Patch the document in place of the current version.
    pub fn apply_delta(&mut self, delta: &[Document], sink: &dyn DiagnosticsSink) {
        let next = apply_patch(&self.current, delta, sink);
        self.previous = std::mem::replace(&mut self.current, next);
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
