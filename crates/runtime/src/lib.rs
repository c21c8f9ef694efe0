//! Protocol runtime for chatwire.
//!
//! Turns an ordered stream of AG-UI events into conversation state:
//!
//! ```text
//!   transport ──▶ AgUiEvent ──▶ process_event ──▶ (Conversation, StreamingState)
//!                     │
//!                     └─ STATE_SNAPSHOT / STATE_DELTA
//!                             │
//!                             ▼
//!                        StateStore ──(previous, current)──▶ CitationExtractor
//! ```
//!
//! [`process_event`] is pure. [`RunCoordinator`] wraps it with the state
//! store and citation extraction for hosts that want one object per run.

pub mod coordinator;
pub mod processor;
pub mod store;
pub mod streaming;

pub use coordinator::{RunCoordinator, RunUpdate};
pub use processor::{fold_events, process_event};
pub use store::StateStore;
pub use streaming::StreamingState;

use chatwire_core::CitationError;

/// Errors surfaced by the run coordinator.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("citation extraction failed: {0}")]
    Citation(#[from] CitationError),
}
