//! End-to-end behaviour of the protocol runtime.
//!
//! Events are written in their wire form and decoded the way a transport
//! would, then driven through the processor, patch engine, and extractor.

use std::sync::Arc;

use chatwire_citations::CitationExtractor;
use chatwire_core::{AgUiEvent, ChatMessage, Conversation, Document, RecordingSink, Role, RunStatus};
use chatwire_patch::{PatchOperation, apply_operations, apply_patch};
use chatwire_runtime::{RunCoordinator, StreamingState, fold_events, process_event};
use serde_json::json;

fn events(values: serde_json::Value) -> Vec<AgUiEvent> {
    serde_json::from_value(values).unwrap()
}

fn doc(value: serde_json::Value) -> Document {
    Document::from(value)
}

// ── Event processor ──────────────────────────────────────────────────────

#[test]
fn full_run_produces_one_completed_message() {
    let events = events(json!([
        {"type": "RUN_STARTED", "threadId": "t1", "runId": "r1"},
        {"type": "TEXT_MESSAGE_START", "messageId": "m1", "role": "assistant"},
        {"type": "TEXT_MESSAGE_CONTENT", "messageId": "m1", "delta": "Hel"},
        {"type": "TEXT_MESSAGE_CONTENT", "messageId": "m1", "delta": "lo"},
        {"type": "TEXT_MESSAGE_END", "messageId": "m1"},
        {"type": "RUN_FINISHED", "threadId": "t1", "runId": "r1"}
    ]));

    let (conv, streaming) = fold_events(Conversation::new(), StreamingState::AwaitingText, &events);

    assert_eq!(conv.status(), &RunStatus::Completed);
    assert_eq!(conv.messages(), [ChatMessage::new("m1", Role::Assistant, "Hello")]);
    assert_eq!(streaming, StreamingState::AwaitingText);
}

#[test]
fn content_for_other_message_changes_nothing() {
    let conv = Conversation::new();
    let streaming = StreamingState::start("m1", Role::Assistant, None)
        .append("m1", "partial")
        .unwrap();
    let event = AgUiEvent::TextMessageContent {
        message_id: "m2".into(),
        delta: "x".into(),
    };

    let (next_conv, next_streaming) = process_event(&conv, &streaming, &event);

    assert_eq!(next_conv, conv);
    assert_eq!(next_streaming, streaming);
}

#[test]
fn processing_is_deterministic() {
    let conv = Conversation::new().with_status(RunStatus::Running { run_id: "r".into() });
    let streaming = StreamingState::start("m1", Role::Assistant, None);
    for event in events(json!([
        {"type": "TEXT_MESSAGE_CONTENT", "messageId": "m1", "delta": "a"},
        {"type": "TEXT_MESSAGE_END", "messageId": "m1", "timestamp": 5},
        {"type": "TOOL_CALL_START", "toolCallId": "t", "toolCallName": "n"},
        {"type": "RUN_ERROR", "message": "x"}
    ])) {
        assert_eq!(
            process_event(&conv, &streaming, &event),
            process_event(&conv, &streaming, &event)
        );
    }
}

#[test]
fn replayed_end_does_not_duplicate() {
    let events = events(json!([
        {"type": "TEXT_MESSAGE_START", "messageId": "m1"},
        {"type": "TEXT_MESSAGE_CONTENT", "messageId": "m1", "delta": "hi"},
        {"type": "TOOL_CALL_START", "toolCallId": "t1", "toolCallName": "lookup"},
        {"type": "TEXT_MESSAGE_END", "messageId": "m1"}
    ]));
    let (conv, streaming) = fold_events(Conversation::new(), StreamingState::AwaitingText, &events);

    let (replayed, replayed_streaming) = process_event(&conv, &streaming, &events[3]);

    assert_eq!(replayed.messages().len(), 1);
    assert_eq!(replayed, conv);
    assert_eq!(replayed.tool_calls().count(), 1);
    assert_eq!(replayed_streaming, streaming);
}

#[test]
fn replaying_a_whole_message_keeps_first_copy() {
    let one_message = events(json!([
        {"type": "TEXT_MESSAGE_START", "messageId": "m1"},
        {"type": "TEXT_MESSAGE_CONTENT", "messageId": "m1", "delta": "first"},
        {"type": "TEXT_MESSAGE_END", "messageId": "m1"}
    ]));
    let (conv, streaming) = fold_events(Conversation::new(), StreamingState::AwaitingText, &one_message);
    let (conv, _) = fold_events(conv, streaming, &one_message);

    assert_eq!(conv.messages().len(), 1);
    assert_eq!(conv.messages()[0].text, "first");
}

// ── Conversation aggregate ───────────────────────────────────────────────

#[test]
fn appended_duplicate_leaves_messages_unchanged() {
    let once = Conversation::new().with_appended_message(ChatMessage::new("m1", Role::User, "a"));
    let twice = once.with_appended_message(ChatMessage::new("m1", Role::User, "b"));
    assert_eq!(twice.messages(), once.messages());
}

// ── Patch engine ─────────────────────────────────────────────────────────

#[test]
fn replace_count() {
    let sink = RecordingSink::new();
    let result = apply_patch(
        &doc(json!({"count": 0})),
        &[doc(json!({"op": "replace", "path": "/count", "value": 5}))],
        &sink,
    );
    assert_eq!(result, doc(json!({"count": 5})));
}

#[test]
fn add_dash_appends_at_end() {
    let sink = RecordingSink::new();
    let original = doc(json!({"items": ["a", "b"]}));
    let result = apply_patch(
        &original,
        &[doc(json!({"op": "add", "path": "/items/-", "value": "x"}))],
        &sink,
    );
    assert_eq!(result, doc(json!({"items": ["a", "b", "x"]})));

    let items = result.get("items").and_then(Document::as_list).unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[2], Document::from("x"));
}

#[test]
fn add_then_remove_round_trips() {
    let sink = RecordingSink::new();
    let original = doc(json!({"run": {"steps": [1, 2]}, "title": "t"}));
    for path in ["/run/extra", "/run/steps/1", "/new"] {
        let added = apply_operations(&original, &[PatchOperation::add(path, doc(json!({"k": 1})))], &sink);
        let restored = apply_operations(&added, &[PatchOperation::remove(path)], &sink);
        assert_eq!(restored, original, "round trip through {path}");
    }
    assert!(sink.is_empty());
}

// ── Citation extractor ───────────────────────────────────────────────────

fn qa_record(citations: serde_json::Value) -> serde_json::Value {
    json!({"question": "What?", "answer": "This [1][2].", "citations": citations})
}

fn cite(doc_id: &str, index: usize) -> serde_json::Value {
    json!({
        "document_id": doc_id,
        "document_uri": format!("s3://corpus/{doc_id}"),
        "content": "chunk text",
        "chunk_id": format!("{doc_id}#0"),
        "document_title": doc_id.to_uppercase(),
        "headings": ["H1"],
        "page_numbers": [index],
        "index": index
    })
}

#[test]
fn appended_entry_yields_its_citations() {
    let e1 = qa_record(json!([cite("old", 1)]));
    let e2 = qa_record(json!([cite("alpha", 1), cite("beta", 2)]));
    let previous = doc(json!({"qa_history": [e1.clone()]}));
    let current = doc(json!({"qa_history": [e1, e2]}));

    let found = CitationExtractor::default()
        .extract_new(&previous, &current)
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(found[0].document_id, "alpha");
    assert_eq!(found[0].document_title.as_deref(), Some("ALPHA"));
    assert_eq!(found[1].document_id, "beta");
    assert_eq!(found[1].page_numbers, vec![2u32]);
    assert_eq!(found[1].index, 2);
}

#[test]
fn no_growth_never_yields_citations() {
    let extractor = CitationExtractor::default();
    let lists = [
        json!([]),
        json!([qa_record(json!([cite("a", 1)]))]),
        json!([qa_record(json!([cite("a", 1)])), qa_record(json!([cite("b", 1)]))]),
    ];
    for (i, previous) in lists.iter().enumerate() {
        for current in &lists[..=i] {
            let found = extractor
                .extract_new(
                    &doc(json!({"qa_history": previous})),
                    &doc(json!({"qa_history": current})),
                )
                .unwrap();
            assert!(found.is_empty());
        }
    }
}

#[test]
fn legacy_schema_used_when_primary_absent() {
    let previous = doc(json!({}));
    let current = doc(json!({"history": [{
        "query": "q",
        "response": "r",
        "sources": [{"document_id": "legacy-doc", "uri": "u", "content": "c", "chunk_id": "k"}]
    }]}));

    let found = CitationExtractor::default()
        .extract_new(&previous, &current)
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].document_id, "legacy-doc");
}

// ── Coordinator ──────────────────────────────────────────────────────────

#[test]
fn coordinator_runs_a_cited_answer() {
    let sink = Arc::new(RecordingSink::new());
    let mut coordinator = RunCoordinator::new(sink.clone());

    let stream = events(json!([
        {"type": "RUN_STARTED", "runId": "r1"},
        {"type": "STATE_SNAPSHOT", "snapshot": {"qa_history": []}},
        {"type": "TEXT_MESSAGE_START", "messageId": "m1"},
        {"type": "TEXT_MESSAGE_CONTENT", "messageId": "m1", "delta": "Answer [1]"},
        {"type": "TEXT_MESSAGE_END", "messageId": "m1"},
        {"type": "STATE_DELTA", "delta": [
            {"op": "add", "path": "/qa_history/-", "value": qa_record(json!([cite("a", 1)]))}
        ]},
        {"type": "SOMETHING_UNKNOWN"},
        {"type": "RUN_FINISHED", "runId": "r1"}
    ]));

    let citations = coordinator.handle_all(&stream).unwrap();

    assert_eq!(citations.len(), 1);
    assert_eq!(citations[0].document_id, "a");
    let conv = coordinator.conversation();
    assert_eq!(conv.status(), &RunStatus::Completed);
    assert_eq!(conv.messages()[0].text, "Answer [1]");
    assert_eq!(
        conv.domain_state()
            .get("qa_history")
            .and_then(Document::as_list)
            .map(<[Document]>::len),
        Some(1)
    );
    assert!(sink.is_empty());
}
