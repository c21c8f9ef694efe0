//! Diagnostics sink: where the runtime reports problems it recovers from.
//!
//! The patch engine and the run coordinator never log through a global
//! handle. They receive a `&dyn DiagnosticsSink` and report to it, so tests
//! can capture exactly what was reported and hosts can route it anywhere.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A single diagnostic: what happened, the error behind it, and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Human-readable summary
    pub message: String,

    /// Rendered error, if one caused this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Where it happened: a pointer path, a schema record, a source chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
            stack: None,
        }
    }

    /// Attach the error that caused this diagnostic.
    pub fn with_error(mut self, error: &dyn std::error::Error) -> Self {
        self.error = Some(error.to_string());
        if self.stack.is_none() {
            self.stack = source_chain(error);
        }
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// Render `error.source()` links as `a <- b <- c`, or `None` if there are none.
fn source_chain(error: &dyn std::error::Error) -> Option<String> {
    let mut links = Vec::new();
    let mut current = error.source();
    while let Some(cause) = current {
        links.push(cause.to_string());
        current = cause.source();
    }
    (!links.is_empty()).then(|| links.join(" <- "))
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(error) = &self.error {
            write!(f, ": {error}")?;
        }
        if let Some(stack) = &self.stack {
            write!(f, " [at {stack}]")?;
        }
        Ok(())
    }
}

/// Receives diagnostics from the runtime.
pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

impl<F> DiagnosticsSink for F
where
    F: Fn(Diagnostic) + Send + Sync,
{
    fn report(&self, diagnostic: Diagnostic) {
        self(diagnostic)
    }
}

/// Forwards every diagnostic to `tracing` at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!(
            error = diagnostic.error.as_deref().unwrap_or(""),
            stack = diagnostic.stack.as_deref().unwrap_or(""),
            "{}",
            diagnostic.message
        );
    }
}

/// Collects diagnostics in memory. Useful for tests and for hosts that
/// batch diagnostics before shipping them.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(diagnostic);
        }
    }
}
