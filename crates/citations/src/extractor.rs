//! Diffing two domain-state snapshots for newly appended citations.

use chatwire_core::{CitationError, Document};
use tracing::{debug, trace};

use crate::model::SourceReference;
use crate::schema::{BUILTIN_SCHEMA_IDS, CitationSchema, builtin_schema};

/// Finds citations added between two snapshots.
///
/// Schemas are tried in priority order and the first one that yields any
/// citations wins. Results are never merged across schemas.
pub struct CitationExtractor {
    schemas: Vec<Box<dyn CitationSchema>>,
}

impl CitationExtractor {
    /// An extractor over the given schemas, highest priority first.
    pub fn new(schemas: Vec<Box<dyn CitationSchema>>) -> Self {
        Self { schemas }
    }

    /// An extractor over built-in schemas named by id, in the given order.
    pub fn from_ids<S: AsRef<str>>(ids: &[S]) -> Result<Self, CitationError> {
        let schemas = ids
            .iter()
            .map(|id| {
                builtin_schema(id.as_ref())
                    .ok_or_else(|| CitationError::UnknownSchema(id.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(schemas))
    }

    /// Schema ids in the order they are tried.
    pub fn schema_ids(&self) -> Vec<&'static str> {
        self.schemas.iter().map(|s| s.id()).collect()
    }

    /// Citations from history records present in `current` but not in
    /// `previous`.
    ///
    /// A list that did not grow yields nothing, which also covers a
    /// server-side ring buffer that dropped old records while adding new
    /// ones. A schema whose list is present but unreadable is an error.
    pub fn extract_new(
        &self,
        previous: &Document,
        current: &Document,
    ) -> Result<Vec<SourceReference>, CitationError> {
        for schema in &self.schemas {
            let found = extract_for_schema(schema.as_ref(), previous, current)?;
            if !found.is_empty() {
                debug!(schema = schema.id(), count = found.len(), "Extracted new citations");
                return Ok(found);
            }
        }
        Ok(Vec::new())
    }
}

impl Default for CitationExtractor {
    fn default() -> Self {
        Self::new(
            BUILTIN_SCHEMA_IDS
                .iter()
                .filter_map(|id| builtin_schema(id))
                .collect(),
        )
    }
}

impl std::fmt::Debug for CitationExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CitationExtractor")
            .field("schemas", &self.schema_ids())
            .finish()
    }
}

fn extract_for_schema(
    schema: &dyn CitationSchema,
    previous: &Document,
    current: &Document,
) -> Result<Vec<SourceReference>, CitationError> {
    let Some(current_records) = history(schema, current)? else {
        trace!(schema = schema.id(), "History list absent");
        return Ok(Vec::new());
    };
    let previous_len = history(schema, previous)?.map_or(0, <[Document]>::len);

    if current_records.len() <= previous_len {
        return Ok(Vec::new());
    }

    let mut sources = Vec::new();
    for (position, record) in current_records.iter().enumerate().skip(previous_len) {
        sources.extend(schema.parse_record(record, position)?);
    }
    Ok(sources)
}

/// The schema's history list, `None` if the key is absent or null.
fn history<'a>(
    schema: &dyn CitationSchema,
    doc: &'a Document,
) -> Result<Option<&'a [Document]>, CitationError> {
    match doc.get(schema.history_key()) {
        None | Some(Document::Null) => Ok(None),
        Some(Document::List(records)) => Ok(Some(records.as_slice())),
        Some(other) => Err(CitationError::NotAList {
            schema: schema.id().to_string(),
            key: schema.history_key().to_string(),
            found: other.kind(),
        }),
    }
}
