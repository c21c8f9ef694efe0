//! The schema-independent citation value.

use serde::{Deserialize, Serialize};

/// A source chunk that backs part of an assistant answer.
///
/// This is the only shape that leaves the citations crate; no caller ever
/// sees the versioned domain-state records it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReference {
    pub document_id: String,
    pub document_uri: String,
    pub content: String,
    pub chunk_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
    /// Section headings leading to the chunk, outermost first
    #[serde(default)]
    pub headings: Vec<String>,
    #[serde(default)]
    pub page_numbers: Vec<u32>,
    /// Citation number as shown in the answer text
    pub index: usize,
}

impl SourceReference {
    /// Title if known, else the URI.
    pub fn display_title(&self) -> &str {
        self.document_title.as_deref().unwrap_or(&self.document_uri)
    }
}
