//! The domain-state document: a small recursive JSON-like sum type.
//!
//! Lists and maps sit behind `Arc`, so cloning a document is cheap and
//! clones share every node. Mutation goes through [`Document::map_mut`] and
//! [`Document::list_mut`], which copy a node only when it is still shared.
//! Editing one path of a clone therefore copies the nodes on that path and
//! leaves every sibling shared with the original.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ordered map node of a [`Document`].
pub type DocumentMap = BTreeMap<String, Document>;

/// An immutable JSON-like value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Document {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Arc<Vec<Document>>),
    Map(Arc<DocumentMap>),
}

impl Document {
    /// An empty map, the shape every domain-state root must have.
    pub fn empty_map() -> Self {
        Self::Map(Arc::new(DocumentMap::new()))
    }

    /// Build a map from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Document)>,
    {
        Self::Map(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build a list from values.
    pub fn list<I: IntoIterator<Item = Document>>(items: I) -> Self {
        Self::List(Arc::new(items.into_iter().collect()))
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    pub fn as_map(&self) -> Option<&DocumentMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Document]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Look up a key when this is a map.
    pub fn get(&self, key: &str) -> Option<&Document> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Mutable access to a map node, copying it first if it is shared.
    pub fn map_mut(&mut self) -> Option<&mut DocumentMap> {
        match self {
            Self::Map(map) => Some(Arc::make_mut(map)),
            _ => None,
        }
    }

    /// Mutable access to a list node, copying it first if it is shared.
    pub fn list_mut(&mut self) -> Option<&mut Vec<Document>> {
        match self {
            Self::List(items) => Some(Arc::make_mut(items)),
            _ => None,
        }
    }

    /// True when both values are containers backed by the same allocation.
    pub fn shares_node_with(&self, other: &Document) -> bool {
        match (self, other) {
            (Self::Map(a), Self::Map(b)) => Arc::ptr_eq(a, b),
            (Self::List(a), Self::List(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Convert into a `serde_json::Value`, e.g. to hand a record to serde.
    pub fn to_json(&self) -> Value {
        Value::from(self.clone())
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::list(items.into_iter().map(Document::from)),
            Value::Object(map) => Self::map(map.into_iter().map(|(k, v)| (k, Document::from(v)))),
        }
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        match doc {
            Document::Null => Value::Null,
            Document::Bool(b) => Value::Bool(b),
            Document::Number(n) => Value::Number(n),
            Document::String(s) => Value::String(s),
            Document::List(items) => Value::Array(
                Arc::unwrap_or_clone(items)
                    .into_iter()
                    .map(Value::from)
                    .collect(),
            ),
            Document::Map(map) => Value::Object(
                Arc::unwrap_or_clone(map)
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Document {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Document {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Document {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Document {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for Document {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
