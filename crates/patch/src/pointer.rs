//! JSON pointer paths (RFC 6901), with the root shorthands patches use.

use chatwire_core::PatchError;

/// A parsed pointer: the unescaped reference tokens in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    segments: Vec<String>,
}

/// How a segment addresses a list element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListIndex {
    /// `-`: one past the last element
    Append,
    At(usize),
}

impl Pointer {
    /// Parse a pointer. `""` and `"/"` both address the root.
    pub fn parse(path: &str) -> Result<Self, PatchError> {
        if path.is_empty() || path == "/" {
            return Ok(Self {
                segments: Vec::new(),
            });
        }
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| PatchError::InvalidPointer(path.to_string()))?;
        Ok(Self {
            segments: rest.split('/').map(unescape).collect(),
        })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Parent segments and the final segment, or `None` for the root.
    pub fn split_last(&self) -> Option<(&[String], &str)> {
        self.segments
            .split_last()
            .map(|(last, parents)| (parents, last.as_str()))
    }
}

fn unescape(token: &str) -> String {
    // `~1` first, so that `~01` becomes `~1` and not `/`.
    token.replace("~1", "/").replace("~0", "~")
}

pub(crate) fn parse_index(segment: &str) -> Result<ListIndex, String> {
    if segment == "-" {
        return Ok(ListIndex::Append);
    }
    segment
        .parse::<usize>()
        .map(ListIndex::At)
        .map_err(|_| format!("'{segment}' is not a list index"))
}
