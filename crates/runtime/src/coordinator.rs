//! Run coordinator: drives one conversation through its event stream.
//!
//! For every event it runs the processor, and for state-changing events it
//! also updates the [`StateStore`], mirrors the new document into the
//! conversation, and diffs the previous and current documents for new
//! citations.
//!
//! The coordinator owns mutable state and must be fed the events of one
//! conversation in arrival order from a single source.

use std::sync::Arc;

use chatwire_citations::{CitationExtractor, SourceReference};
use chatwire_core::{AgUiEvent, Conversation, Diagnostic, DiagnosticsSink, Document};
use tracing::{debug, info};

use crate::RuntimeError;
use crate::processor::process_event;
use crate::store::StateStore;
use crate::streaming::StreamingState;

/// What one event produced beyond the state transition itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunUpdate {
    /// Citations appended to the domain state by this event
    pub citations: Vec<SourceReference>,

    /// The run just completed or failed; the conversation is ready to hand
    /// off for persistence
    pub run_ended: bool,
}

pub struct RunCoordinator {
    conversation: Conversation,
    streaming: StreamingState,
    store: StateStore,
    extractor: CitationExtractor,
    sink: Arc<dyn DiagnosticsSink>,
}

impl RunCoordinator {
    /// A coordinator for a fresh conversation using the default schemas.
    pub fn new(sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            conversation: Conversation::new(),
            streaming: StreamingState::AwaitingText,
            store: StateStore::new(),
            extractor: CitationExtractor::default(),
            sink,
        }
    }

    /// Set the citation extractor.
    pub fn with_extractor(mut self, extractor: CitationExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Continue an existing conversation. Its domain state seeds the store.
    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.store = StateStore::with_document(conversation.domain_state().clone());
        self.conversation = conversation;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn streaming(&self) -> &StreamingState {
        &self.streaming
    }

    pub fn state(&self) -> &StateStore {
        &self.store
    }

    /// Give up the coordinator and keep the conversation.
    pub fn into_conversation(self) -> Conversation {
        self.conversation
    }

    /// Process one event.
    ///
    /// Fails only when citation extraction detects a schema contract break.
    /// The conversation and domain state are already updated when that
    /// happens; only the citations of that update are lost.
    pub fn handle(&mut self, event: &AgUiEvent) -> Result<RunUpdate, RuntimeError> {
        let (conversation, streaming) = process_event(&self.conversation, &self.streaming, event);
        self.conversation = conversation;
        self.streaming = streaming;

        let citations = match event {
            AgUiEvent::StateSnapshot { snapshot } => {
                self.store.replace(snapshot.clone(), self.sink.as_ref());
                self.sync_domain_state()?
            }
            AgUiEvent::StateDelta { delta } => {
                self.store.apply_delta(delta, self.sink.as_ref());
                self.sync_domain_state()?
            }
            _ => Vec::new(),
        };

        let run_ended = matches!(event, AgUiEvent::RunFinished { .. } | AgUiEvent::RunError { .. });
        if run_ended {
            info!(
                conversation_id = %self.conversation.id(),
                messages = self.conversation.messages().len(),
                status = ?self.conversation.status(),
                "Run ended"
            );
        }

        Ok(RunUpdate {
            citations,
            run_ended,
        })
    }

    /// Process events in order, collecting every citation found.
    ///
    /// Stops at the first error.
    pub fn handle_all<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a AgUiEvent>,
    ) -> Result<Vec<SourceReference>, RuntimeError> {
        let mut citations = Vec::new();
        for event in events {
            citations.extend(self.handle(event)?.citations);
        }
        Ok(citations)
    }

    fn sync_domain_state(&mut self) -> Result<Vec<SourceReference>, RuntimeError> {
        let current: &Document = self.store.current();
        self.conversation = self.conversation.with_domain_state(current.clone());

        let found = self
            .extractor
            .extract_new(self.store.previous(), self.store.current())
            .map_err(|err| {
                self.sink
                    .report(Diagnostic::new("Citation extraction failed").with_error(&err));
                RuntimeError::Citation(err)
            })?;
        if !found.is_empty() {
            debug!(count = found.len(), "New citations in domain state");
        }
        Ok(found)
    }
}

impl std::fmt::Debug for RunCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunCoordinator")
            .field("conversation", &self.conversation.id())
            .field("streaming", &self.streaming)
            .field("extractor", &self.extractor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::{CitationError, RecordingSink, RunStatus};
    use serde_json::json;

    fn event(value: serde_json::Value) -> AgUiEvent {
        serde_json::from_value(value).unwrap()
    }

    fn coordinator() -> (RunCoordinator, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        (RunCoordinator::new(sink.clone()), sink)
    }

    fn qa_entry(doc_id: &str) -> serde_json::Value {
        json!({"question": "q", "answer": "a", "citations": [{
            "document_id": doc_id, "document_uri": "u", "content": "c",
            "chunk_id": "k", "index": 1
        }]})
    }

    #[test]
    fn snapshot_then_delta_surfaces_citations() {
        let (mut coord, sink) = coordinator();
        let update = coord
            .handle(&event(json!({"type": "STATE_SNAPSHOT", "snapshot": {"qa_history": []}})))
            .unwrap();
        assert!(update.citations.is_empty());

        let update = coord
            .handle(&event(json!({"type": "STATE_DELTA", "delta": [
                {"op": "add", "path": "/qa_history/-", "value": qa_entry("d1")}
            ]})))
            .unwrap();
        assert_eq!(update.citations.len(), 1);
        assert_eq!(update.citations[0].document_id, "d1");
        assert_eq!(coord.conversation().domain_state(), coord.state().current());
        assert!(sink.is_empty());
    }

    #[test]
    fn bad_patch_is_reported_not_raised() {
        let (mut coord, sink) = coordinator();
        let update = coord
            .handle(&event(json!({"type": "STATE_DELTA", "delta": [
                {"op": "remove", "path": "/nothing/here"},
                "garbage"
            ]})))
            .unwrap();
        assert!(update.citations.is_empty());
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn schema_break_is_raised_and_reported() {
        let (mut coord, sink) = coordinator();
        let result = coord.handle(&event(json!({
            "type": "STATE_SNAPSHOT",
            "snapshot": {"qa_history": [{"citations": [{"document_id": "d"}]}]}
        })));
        assert!(matches!(
            result,
            Err(RuntimeError::Citation(CitationError::SchemaMismatch { .. }))
        ));
        assert_eq!(sink.len(), 1);
        // State still advanced.
        assert!(coord.conversation().domain_state().get("qa_history").is_some());
    }

    #[test]
    fn run_end_is_flagged() {
        let (mut coord, _) = coordinator();
        coord
            .handle(&event(json!({"type": "RUN_STARTED", "runId": "r1"})))
            .unwrap();
        let update = coord
            .handle(&event(json!({"type": "RUN_FINISHED", "runId": "r1"})))
            .unwrap();
        assert!(update.run_ended);
        assert_eq!(coord.into_conversation().status(), &RunStatus::Completed);
    }

    #[test]
    fn continues_existing_conversation_state() {
        let sink = Arc::new(RecordingSink::new());
        let seeded = Conversation::new()
            .with_domain_state(Document::from(json!({"qa_history": [qa_entry("old")]})));
        let mut coord = RunCoordinator::new(sink).with_conversation(seeded);

        let found = coord
            .handle_all(&[event(json!({"type": "STATE_DELTA", "delta": [
                {"op": "add", "path": "/qa_history/-", "value": qa_entry("new")}
            ]}))])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].document_id, "new");
    }
}
