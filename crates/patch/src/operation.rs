//! Patch operations and their lenient parsing from raw delta entries.

use chatwire_core::{Document, PatchError};
use std::str::FromStr;

/// The six RFC 6902 operation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    /// Accepted, has no effect
    Move,
    /// Accepted, has no effect
    Copy,
    /// Accepted, has no effect
    Test,
}

impl PatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Replace => "replace",
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Test => "test",
        }
    }

    fn requires_value(&self) -> bool {
        matches!(self, Self::Add | Self::Replace | Self::Test)
    }
}

impl FromStr for PatchOp {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "replace" => Ok(Self::Replace),
            "move" => Ok(Self::Move),
            "copy" => Ok(Self::Copy),
            "test" => Ok(Self::Test),
            other => Err(PatchError::UnknownOp(other.to_string())),
        }
    }
}

impl std::fmt::Display for PatchOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validated patch operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOperation {
    pub op: PatchOp,

    /// JSON pointer to the target
    pub path: String,

    /// Required for add, replace, and test
    pub value: Option<Document>,

    /// Source pointer for move and copy
    pub from: Option<String>,
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: Document) -> Self {
        Self::with_value(PatchOp::Add, path, value)
    }

    pub fn replace(path: impl Into<String>, value: Document) -> Self {
        Self::with_value(PatchOp::Replace, path, value)
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            value: None,
            from: None,
        }
    }

    fn with_value(op: PatchOp, path: impl Into<String>, value: Document) -> Self {
        Self {
            op,
            path: path.into(),
            value: Some(value),
            from: None,
        }
    }

    /// Validate one raw delta entry.
    ///
    /// The entry must be a map with string `op` and `path` fields, and a
    /// `value` field when the op needs one.
    pub fn parse(entry: &Document) -> Result<Self, PatchError> {
        let fields = entry
            .as_map()
            .ok_or_else(|| PatchError::NotAnObject(entry.kind()))?;

        let op: PatchOp = fields
            .get("op")
            .and_then(Document::as_str)
            .ok_or(PatchError::MissingField("op"))?
            .parse()?;

        let path = fields
            .get("path")
            .and_then(Document::as_str)
            .ok_or(PatchError::MissingField("path"))?
            .to_string();

        let value = fields.get("value").cloned();
        if op.requires_value() && value.is_none() {
            return Err(PatchError::MissingField("value"));
        }

        let from = fields
            .get("from")
            .and_then(Document::as_str)
            .map(str::to_string);

        Ok(Self {
            op,
            path,
            value,
            from,
        })
    }
}
