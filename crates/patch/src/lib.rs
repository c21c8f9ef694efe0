//! JSON Patch for chatwire documents.
//!
//! Follows RFC 6902 for `add`, `remove`, and `replace`, with a deliberately
//! forgiving edge:
//!
//! - malformed entries are reported and skipped;
//! - an operation whose path does not resolve changes nothing;
//! - a non-map value never replaces the document root;
//! - `move`, `copy`, and `test` are accepted and ignored.
//!
//! One bad entry never aborts the rest of a live state update.
//!
//! # Example
//!
//! ```
//! use chatwire_core::{Document, RecordingSink};
//! use chatwire_patch::{PatchOperation, apply_operations};
//!
//! let doc = Document::map([("count", Document::from(0i64))]);
//! let sink = RecordingSink::new();
//! let next = apply_operations(&doc, &[PatchOperation::replace("/count", Document::from(5i64))], &sink);
//! assert_eq!(next.get("count").and_then(Document::as_u64), Some(5));
//! ```

mod engine;
mod operation;
mod pointer;

pub use engine::{apply_operations, apply_patch};
pub use operation::{PatchOp, PatchOperation};
pub use pointer::Pointer;
