//! Citation extraction for chatwire.
//!
//! The domain-state document carries a growing, schema-versioned history of
//! answered questions, each with its citations. This crate is the only place
//! that knows those record layouts: callers hand it two snapshots and get
//! back plain [`SourceReference`] values for whatever was appended between
//! them.
//!
//! Unlike the patch engine, extraction is strict. A history list that is
//! present but cannot be read is a broken client/server contract and is
//! returned as a [`CitationError`](chatwire_core::CitationError) carrying
//! which keys were present and which were null.

mod extractor;
mod model;
mod schema;

pub use extractor::CitationExtractor;
pub use model::SourceReference;
pub use schema::{
    BUILTIN_SCHEMA_IDS, CitationSchema, LegacyHistorySchema, QaHistorySchema, builtin_schema,
};
