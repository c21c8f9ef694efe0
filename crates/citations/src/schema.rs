//! Versioned domain-state schemas that carry citations.
//!
//! Everything that knows the concrete record layout of a schema lives in
//! this file. Adding a schema version means adding a [`CitationSchema`]
//! implementation here and listing it in [`builtin_schema`].

use chatwire_core::{CitationError, Document};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::model::SourceReference;

/// Ids of the built-in schemas, in default priority order.
pub const BUILTIN_SCHEMA_IDS: [&str; 2] = [QaHistorySchema::ID, LegacyHistorySchema::ID];

/// One versioned layout of the domain-state history list.
pub trait CitationSchema: Send + Sync {
    /// Stable id, used in configuration and diagnostics.
    fn id(&self) -> &'static str;

    /// Top-level key of the growing history list.
    fn history_key(&self) -> &'static str;

    /// Read the citations of one history record.
    ///
    /// `position` is the record's index in the history list and is only used
    /// for diagnostics.
    fn parse_record(
        &self,
        record: &Document,
        position: usize,
    ) -> Result<Vec<SourceReference>, CitationError>;
}

/// Look up a built-in schema by id.
pub fn builtin_schema(id: &str) -> Option<Box<dyn CitationSchema>> {
    match id {
        QaHistorySchema::ID => Some(Box::new(QaHistorySchema)),
        LegacyHistorySchema::ID => Some(Box::new(LegacyHistorySchema)),
        _ => None,
    }
}

// ── Current schema ──────────────────────────────────────────────────────

/// `qa_history`: one record per answered question.
///
/// ```json
/// {"qa_history": [{"question": "..", "answer": "..", "citations": [
///     {"document_id": "..", "document_uri": "..", "content": "..",
///      "chunk_id": "..", "document_title": "..", "headings": [".."],
///      "page_numbers": [1], "index": 1}]}]}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct QaHistorySchema;

impl QaHistorySchema {
    pub const ID: &'static str = "qa_history";
}

#[derive(Deserialize)]
struct QaRecord {
    citations: Vec<Document>,
}

#[derive(Deserialize)]
struct QaCitation {
    document_id: String,
    document_uri: String,
    content: String,
    chunk_id: String,
    #[serde(default)]
    document_title: Option<String>,
    #[serde(default)]
    headings: Option<Vec<String>>,
    #[serde(default)]
    page_numbers: Option<Vec<u32>>,
    index: usize,
}

impl CitationSchema for QaHistorySchema {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn history_key(&self) -> &'static str {
        "qa_history"
    }

    fn parse_record(
        &self,
        record: &Document,
        position: usize,
    ) -> Result<Vec<SourceReference>, CitationError> {
        let record: QaRecord = decode(Self::ID, record, position, "")?;
        record
            .citations
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let c: QaCitation =
                    decode(Self::ID, entry, position, &format!("citations[{i}]"))?;
                Ok(SourceReference {
                    document_id: c.document_id,
                    document_uri: c.document_uri,
                    content: c.content,
                    chunk_id: c.chunk_id,
                    document_title: c.document_title,
                    headings: c.headings.unwrap_or_default(),
                    page_numbers: c.page_numbers.unwrap_or_default(),
                    index: c.index,
                })
            })
            .collect()
    }
}

// ── Legacy schema ───────────────────────────────────────────────────────

/// `history`: the pre-`qa_history` layout. Sources carry no index; they
/// are numbered from 1 in record order.
///
/// ```json
/// {"history": [{"query": "..", "response": "..", "sources": [
///     {"document_id": "..", "uri": "..", "content": "..", "chunk_id": "..",
///      "title": "..", "headings": [".."], "page_numbers": [1]}]}]}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyHistorySchema;

impl LegacyHistorySchema {
    pub const ID: &'static str = "legacy";
}

#[derive(Deserialize)]
struct LegacyRecord {
    sources: Vec<Document>,
}

#[derive(Deserialize)]
struct LegacySource {
    document_id: String,
    uri: String,
    content: String,
    chunk_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    headings: Option<Vec<String>>,
    #[serde(default)]
    page_numbers: Option<Vec<u32>>,
}

impl CitationSchema for LegacyHistorySchema {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn history_key(&self) -> &'static str {
        "history"
    }

    fn parse_record(
        &self,
        record: &Document,
        position: usize,
    ) -> Result<Vec<SourceReference>, CitationError> {
        let record: LegacyRecord = decode(Self::ID, record, position, "")?;
        record
            .sources
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let s: LegacySource =
                    decode(Self::ID, entry, position, &format!("sources[{i}]"))?;
                Ok(SourceReference {
                    document_id: s.document_id,
                    document_uri: s.uri,
                    content: s.content,
                    chunk_id: s.chunk_id,
                    document_title: s.title,
                    headings: s.headings.unwrap_or_default(),
                    page_numbers: s.page_numbers.unwrap_or_default(),
                    index: i + 1,
                })
            })
            .collect()
    }
}

// ── Decoding ────────────────────────────────────────────────────────────

/// Deserialize `node`, turning failure into a diagnosable contract break.
///
/// `path` locates `node` inside its history record (empty for the record
/// itself) and prefixes every reported key and the failure reason.
fn decode<T: DeserializeOwned>(
    schema: &str,
    node: &Document,
    position: usize,
    path: &str,
) -> Result<T, CitationError> {
    serde_json::from_value(node.to_json()).map_err(|err| {
        let qualify = |key: &str| {
            if path.is_empty() {
                key.to_string()
            } else {
                format!("{path}.{key}")
            }
        };
        let mut present_keys = Vec::new();
        let mut null_keys = Vec::new();
        if let Some(fields) = node.as_map() {
            for (key, value) in fields.iter() {
                if value.is_null() {
                    null_keys.push(qualify(key.as_str()));
                } else {
                    present_keys.push(qualify(key.as_str()));
                }
            }
        }
        let reason = if path.is_empty() {
            err.to_string()
        } else {
            format!("{path}: {err}")
        };
        CitationError::SchemaMismatch {
            schema: schema.to_string(),
            position,
            reason,
            present_keys,
            null_keys,
        }
    })
}
