//! Error types for the chatwire domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// Why a single patch operation could not be applied.
///
/// The patch engine never returns these to its caller; they are reported to
/// the diagnostics sink and the operation is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("patch entry is not an object (got {0})")]
    NotAnObject(&'static str),

    #[error("patch entry has no string `{0}` field")]
    MissingField(&'static str),

    #[error("unsupported patch op '{0}'")]
    UnknownOp(String),

    #[error("path '{0}' is not a JSON pointer")]
    InvalidPointer(String),

    #[error("path '{path}' does not resolve: {reason}")]
    Unresolvable { path: String, reason: String },
}

/// A client/server contract break detected while reading citations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CitationError {
    #[error(
        "schema '{schema}' record {position} failed to parse: {reason} \
         (present keys: [{present}], null keys: [{nulls}])",
        present = .present_keys.join(", "),
        nulls = .null_keys.join(", ")
    )]
    SchemaMismatch {
        schema: String,
        position: usize,
        reason: String,
        present_keys: Vec<String>,
        null_keys: Vec<String>,
    },

    #[error("schema '{schema}' expects `{key}` to be a list, found {found}")]
    NotAList {
        schema: String,
        key: String,
        found: &'static str,
    },

    #[error("unknown citation schema '{0}'")]
    UnknownSchema(String),
}

impl CitationError {
    /// The schema id that produced this error, if any.
    pub fn schema(&self) -> Option<&str> {
        match self {
            Self::SchemaMismatch { schema, .. } | Self::NotAList { schema, .. } => Some(schema),
            Self::UnknownSchema(_) => None,
        }
    }
}
