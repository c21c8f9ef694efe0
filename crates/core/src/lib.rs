//! # chatwire Core
//!
//! Domain types, the diagnostics seam, and error definitions for the
//! chatwire streaming chat runtime. This crate performs **no I/O** and holds
//! no global state: it defines the values that every other crate transforms.
//!
//! ## Design Philosophy
//!
//! Every value here is immutable once built. State changes are expressed as
//! methods that return a new value, which lets the runtime stay a pure
//! function of `(state, event)` and lets callers keep earlier snapshots
//! around for diffing.

pub mod conversation;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use conversation::{ChatMessage, Conversation, ConversationId, Role, RunStatus, ToolCallInfo};
pub use diagnostics::{Diagnostic, DiagnosticsSink, RecordingSink, TracingSink};
pub use document::Document;
pub use error::{CitationError, PatchError};
pub use event::AgUiEvent;
