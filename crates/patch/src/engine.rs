//! Applying patches to documents.
//!
//! Each operation runs against a cheap clone of the working document and is
//! committed only if it succeeds, so a failing operation leaves the document
//! exactly as it was and later operations still run. Only the nodes on an
//! edited path are copied; every other node stays shared with the input.

use chatwire_core::{Diagnostic, DiagnosticsSink, Document, PatchError};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::operation::{PatchOp, PatchOperation};
use crate::pointer::{ListIndex, Pointer, parse_index};

/// Apply raw delta entries in order. Malformed entries are reported to
/// `sink` and skipped.
pub fn apply_patch(doc: &Document, entries: &[Document], sink: &dyn DiagnosticsSink) -> Document {
    let mut working = doc.clone();
    for (position, entry) in entries.iter().enumerate() {
        match PatchOperation::parse(entry) {
            Ok(op) => apply_reporting(&mut working, &op, position, sink),
            Err(err) => sink.report(
                Diagnostic::new("Skipping malformed patch entry")
                    .with_error(&err)
                    .with_stack(format!("delta[{position}]")),
            ),
        }
    }
    working
}

/// Apply already-validated operations in order.
pub fn apply_operations(
    doc: &Document,
    ops: &[PatchOperation],
    sink: &dyn DiagnosticsSink,
) -> Document {
    let mut working = doc.clone();
    for (position, op) in ops.iter().enumerate() {
        apply_reporting(&mut working, op, position, sink);
    }
    working
}

fn apply_reporting(
    working: &mut Document,
    op: &PatchOperation,
    position: usize,
    sink: &dyn DiagnosticsSink,
) {
    let mut candidate = working.clone();
    match apply_one(&mut candidate, op) {
        Ok(()) => *working = candidate,
        Err(err) => sink.report(
            Diagnostic::new(format!("Patch op '{}' had no effect", op.op))
                .with_error(&err)
                .with_stack(format!("delta[{position}] {}", op.path)),
        ),
    }
}

fn apply_one(doc: &mut Document, op: &PatchOperation) -> Result<(), PatchError> {
    if matches!(op.op, PatchOp::Move | PatchOp::Copy | PatchOp::Test) {
        trace!(op = %op.op, path = %op.path, "Ignoring unsupported patch op");
        return Ok(());
    }

    let pointer = Pointer::parse(&op.path)?;
    let unresolvable = |reason: String| PatchError::Unresolvable {
        path: op.path.clone(),
        reason,
    };

    let Some((parents, last)) = pointer.split_last() else {
        return apply_to_root(doc, op);
    };

    let create_missing = op.op != PatchOp::Remove;
    let mut node = doc;
    for segment in parents {
        node = child_mut(node, segment, create_missing).map_err(unresolvable)?;
    }

    match op.op {
        PatchOp::Add => add_at(node, last, value_of(op)?),
        PatchOp::Replace => replace_at(node, last, value_of(op)?),
        PatchOp::Remove => remove_at(node, last),
        PatchOp::Move | PatchOp::Copy | PatchOp::Test => Ok(()),
    }
    .map_err(unresolvable)
}

fn value_of(op: &PatchOperation) -> Result<Document, PatchError> {
    op.value.clone().ok_or(PatchError::MissingField("value"))
}

fn apply_to_root(doc: &mut Document, op: &PatchOperation) -> Result<(), PatchError> {
    match op.op {
        PatchOp::Add | PatchOp::Replace => {
            let value = value_of(op)?;
            if value.is_map() {
                *doc = value;
            } else {
                debug!(kind = value.kind(), "Rejecting non-map document root");
            }
        }
        _ => debug!(op = %op.op, "Ignoring op on document root"),
    }
    Ok(())
}

/// Step into `segment` of `node`. With `create_missing`, absent map keys are
/// filled with empty maps; list elements are never created.
fn child_mut<'a>(
    node: &'a mut Document,
    segment: &str,
    create_missing: bool,
) -> Result<&'a mut Document, String> {
    match node {
        Document::Map(map) => {
            let map = Arc::make_mut(map);
            if create_missing {
                Ok(map
                    .entry(segment.to_string())
                    .or_insert_with(Document::empty_map))
            } else {
                map.get_mut(segment)
                    .ok_or_else(|| format!("no key '{segment}'"))
            }
        }
        Document::List(items) => {
            let items = Arc::make_mut(items);
            let len = items.len();
            match parse_index(segment)? {
                ListIndex::At(index) if index < len => Ok(&mut items[index]),
                _ => Err(format!("index '{segment}' is outside a list of length {len}")),
            }
        }
        other => Err(format!("cannot step into a {} at '{segment}'", other.kind())),
    }
}

fn add_at(node: &mut Document, last: &str, value: Document) -> Result<(), String> {
    match node {
        Document::Map(map) => {
            Arc::make_mut(map).insert(last.to_string(), value);
            Ok(())
        }
        Document::List(items) => {
            let items = Arc::make_mut(items);
            match parse_index(last)? {
                ListIndex::Append => items.push(value),
                ListIndex::At(index) if index <= items.len() => items.insert(index, value),
                ListIndex::At(index) => {
                    return Err(format!(
                        "cannot add at index {index} of a list of length {}",
                        items.len()
                    ));
                }
            }
            Ok(())
        }
        other => Err(format!("cannot add into a {}", other.kind())),
    }
}

fn replace_at(node: &mut Document, last: &str, value: Document) -> Result<(), String> {
    match node {
        Document::Map(map) => {
            Arc::make_mut(map).insert(last.to_string(), value);
            Ok(())
        }
        Document::List(items) => {
            let items = Arc::make_mut(items);
            let len = items.len();
            match parse_index(last)? {
                ListIndex::At(index) if index < len => items[index] = value,
                ListIndex::Append => items.push(value),
                ListIndex::At(index) if index == len => items.push(value),
                ListIndex::At(index) => {
                    return Err(format!(
                        "cannot replace index {index} of a list of length {len}"
                    ));
                }
            }
            Ok(())
        }
        other => Err(format!("cannot replace inside a {}", other.kind())),
    }
}

fn remove_at(node: &mut Document, last: &str) -> Result<(), String> {
    match node {
        Document::Map(map) => {
            if !map.contains_key(last) {
                return Err(format!("no key '{last}' to remove"));
            }
            Arc::make_mut(map).remove(last);
            Ok(())
        }
        Document::List(items) => {
            let len = items.len();
            match parse_index(last)? {
                ListIndex::At(index) if index < len => {
                    Arc::make_mut(items).remove(index);
                    Ok(())
                }
                _ => Err(format!("no element '{last}' in a list of length {len}")),
            }
        }
        other => Err(format!("cannot remove from a {}", other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::RecordingSink;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::from(value)
    }

    fn apply(target: serde_json::Value, delta: serde_json::Value) -> (Document, RecordingSink) {
        let sink = RecordingSink::new();
        let entries: Vec<Document> = match doc(delta) {
            Document::List(items) => items.to_vec(),
            other => vec![other],
        };
        let result = apply_patch(&doc(target), &entries, &sink);
        (result, sink)
    }

    #[test]
    fn replace_scalar_field() {
        let (result, sink) = apply(
            json!({"count": 0}),
            json!([{"op": "replace", "path": "/count", "value": 5}]),
        );
        assert_eq!(result, doc(json!({"count": 5})));
        assert!(sink.is_empty());
    }

    #[test]
    fn add_with_dash_appends() {
        let (result, _) = apply(
            json!({"items": ["a", "b"]}),
            json!([{"op": "add", "path": "/items/-", "value": "x"}]),
        );
        assert_eq!(result, doc(json!({"items": ["a", "b", "x"]})));
    }

    #[test]
    fn add_at_length_appends_and_inside_inserts() {
        let (result, _) = apply(
            json!({"items": ["a", "b"]}),
            json!([
                {"op": "add", "path": "/items/2", "value": "c"},
                {"op": "add", "path": "/items/0", "value": "z"}
            ]),
        );
        assert_eq!(result, doc(json!({"items": ["z", "a", "b", "c"]})));
    }

    #[test]
    fn add_then_remove_restores_original() {
        let original = doc(json!({"a": {"b": [1, 2]}, "c": "keep"}));
        let sink = RecordingSink::new();
        let added = apply_operations(
            &original,
            &[PatchOperation::add("/a/new", Document::from("v"))],
            &sink,
        );
        assert_ne!(added, original);
        let removed = apply_operations(&added, &[PatchOperation::remove("/a/new")], &sink);
        assert_eq!(removed, original);
        assert!(sink.is_empty());
    }

    #[test]
    fn creates_intermediate_maps() {
        let (result, sink) = apply(
            json!({}),
            json!([{"op": "add", "path": "/run/progress/step", "value": 2}]),
        );
        assert_eq!(result, doc(json!({"run": {"progress": {"step": 2}}})));
        assert!(sink.is_empty());
    }

    #[test]
    fn unresolvable_path_is_a_reported_no_op() {
        let (result, sink) = apply(
            json!({"items": ["a"], "name": "x"}),
            json!([
                {"op": "add", "path": "/items/5/title", "value": 1},
                {"op": "replace", "path": "/name/first", "value": 1},
                {"op": "remove", "path": "/missing/key"},
                {"op": "replace", "path": "/items/0", "value": "b"}
            ]),
        );
        assert_eq!(result, doc(json!({"items": ["b"], "name": "x"})));
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let (result, sink) = apply(
            json!({"count": 0}),
            json!([
                "not an op",
                {"path": "/count", "value": 1},
                {"op": "replace", "value": 1},
                {"op": "replace", "path": "/count", "value": 2}
            ]),
        );
        assert_eq!(result, doc(json!({"count": 2})));
        let entries = sink.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].stack.as_deref(), Some("delta[0]"));
        assert!(entries[1].error.as_deref().unwrap().contains("`op`"));
    }

    #[test]
    fn root_replace_requires_a_map() {
        let (result, sink) = apply(
            json!({"a": 1}),
            json!([{"op": "replace", "path": "", "value": [1, 2]}]),
        );
        assert_eq!(result, doc(json!({"a": 1})));
        assert!(sink.is_empty());

        let (result, _) = apply(
            json!({"a": 1}),
            json!([{"op": "replace", "path": "/", "value": {"b": 2}}]),
        );
        assert_eq!(result, doc(json!({"b": 2})));
    }

    #[test]
    fn root_remove_is_a_no_op() {
        for path in ["", "/"] {
            let (result, sink) = apply(json!({"a": 1}), json!([{"op": "remove", "path": path}]));
            assert_eq!(result, doc(json!({"a": 1})));
            assert!(sink.is_empty());
        }
    }

    #[test]
    fn dash_as_intermediate_is_a_reported_no_op() {
        let (result, sink) = apply(
            json!({"items": [{"n": 1}]}),
            json!([
                {"op": "add", "path": "/items/-/n", "value": 2},
                {"op": "replace", "path": "/items/-/n", "value": 3},
                {"op": "remove", "path": "/items/-/n"}
            ]),
        );
        assert_eq!(result, doc(json!({"items": [{"n": 1}]})));
        let entries = sink.entries();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].error.as_deref().unwrap().contains("'-'"));
    }

    #[test]
    fn move_copy_test_have_no_effect() {
        let (result, sink) = apply(
            json!({"a": 1}),
            json!([
                {"op": "move", "from": "/a", "path": "/b"},
                {"op": "copy", "from": "/a", "path": "/c"},
                {"op": "test", "path": "/a", "value": 2}
            ]),
        );
        assert_eq!(result, doc(json!({"a": 1})));
        assert!(sink.is_empty());
    }

    #[test]
    fn remove_list_element() {
        let (result, _) = apply(
            json!({"items": ["a", "b", "c"]}),
            json!([{"op": "remove", "path": "/items/1"}]),
        );
        assert_eq!(result, doc(json!({"items": ["a", "c"]})));
    }

    #[test]
    fn input_document_is_untouched_and_siblings_shared() {
        let original = doc(json!({"edited": {"n": 1}, "sibling": {"big": [1, 2, 3]}}));
        let sink = RecordingSink::new();
        let result = apply_operations(
            &original,
            &[PatchOperation::replace("/edited/n", Document::from(2i64))],
            &sink,
        );
        assert_eq!(original, doc(json!({"edited": {"n": 1}, "sibling": {"big": [1, 2, 3]}})));
        assert!(
            result
                .get("sibling")
                .unwrap()
                .shares_node_with(original.get("sibling").unwrap())
        );
        assert!(
            !result
                .get("edited")
                .unwrap()
                .shares_node_with(original.get("edited").unwrap())
        );
    }

    #[test]
    fn escaped_keys_are_addressable() {
        let (result, _) = apply(
            json!({}),
            json!([{"op": "add", "path": "/a~1b", "value": true}]),
        );
        assert_eq!(result, doc(json!({"a/b": true})));
    }
}
