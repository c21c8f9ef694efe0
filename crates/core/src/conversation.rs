//! Conversation aggregate and its value objects.
//!
//! A [`Conversation`] is created when a run starts, changed once per
//! incoming event, and handed to the host for persistence when the run
//! ends. It is never mutated in place: every `with_*` method returns a new
//! value and leaves the receiver untouched, so earlier snapshots stay valid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::document::Document;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    #[serde(alias = "developer")]
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        };
        f.write_str(name)
    }
}

/// A completed chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique within its conversation
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The full text content
    pub text: String,

    /// Taken from the transport's event timestamps, if it sent any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn new(id: impl Into<String>, role: Role, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            text: text.into(),
            created_at: None,
        }
    }

    pub fn created_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.created_at = at;
        self
    }
}

/// A tool call that is currently in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallInfo {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool being invoked
    pub name: String,

    /// The assistant message this call belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<String>,

    /// Argument text streamed so far
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arguments: String,
}

impl ToolCallInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_message_id: None,
            arguments: String::new(),
        }
    }
}

/// Lifecycle of the current agent run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    Running {
        run_id: String,
    },
    Completed,
    Failed {
        error: String,
    },
}

impl RunStatus {
    /// Completed or failed: nothing more will happen in this run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }
}

/// Append-only chat state for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    id: ConversationId,
    messages: Vec<ChatMessage>,
    tool_calls: BTreeMap<String, ToolCallInfo>,
    status: RunStatus,
    domain_state: Document,
    created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        Self::with_id(ConversationId::new())
    }

    /// Create an empty conversation with a caller-chosen id.
    pub fn with_id(id: ConversationId) -> Self {
        Self {
            id,
            messages: Vec::new(),
            tool_calls: BTreeMap::new(),
            status: RunStatus::Idle,
            domain_state: Document::empty_map(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn message(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallInfo> {
        self.tool_calls.values()
    }

    pub fn tool_call(&self, id: &str) -> Option<&ToolCallInfo> {
        self.tool_calls.get(id)
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn domain_state(&self) -> &Document {
        &self.domain_state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn with_status(&self, status: RunStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Append a message. A message whose id is already present is ignored.
    pub fn with_appended_message(&self, message: ChatMessage) -> Self {
        if self.message(&message.id).is_some() {
            tracing::debug!(message_id = %message.id, "Ignoring duplicate message");
            return self.clone();
        }
        let mut next = self.clone();
        next.messages.push(message);
        next
    }

    /// Track an in-flight tool call, replacing any call with the same id.
    pub fn with_tool_call(&self, call: ToolCallInfo) -> Self {
        let mut next = self.clone();
        next.tool_calls.insert(call.id.clone(), call);
        next
    }

    /// Append streamed argument text to an in-flight call. Unknown ids are ignored.
    pub fn with_tool_call_args(&self, id: &str, delta: &str) -> Self {
        if !self.tool_calls.contains_key(id) {
            return self.clone();
        }
        let mut next = self.clone();
        if let Some(call) = next.tool_calls.get_mut(id) {
            call.arguments.push_str(delta);
        }
        next
    }

    /// Stop tracking a tool call. Unknown ids are ignored.
    pub fn without_tool_call(&self, id: &str) -> Self {
        if !self.tool_calls.contains_key(id) {
            return self.clone();
        }
        let mut next = self.clone();
        next.tool_calls.remove(id);
        next
    }

    pub fn with_domain_state(&self, domain_state: Document) -> Self {
        Self {
            domain_state,
            ..self.clone()
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_from_str() {
        let conv = Conversation::with_id(ConversationId::from("thread-7"));
        assert_eq!(conv.id().to_string(), "thread-7");
        assert_ne!(ConversationId::new(), ConversationId::new());
    }

    #[test]
    fn new_conversation_is_idle_and_empty() {
        let conv = Conversation::new();
        assert_eq!(conv.status(), &RunStatus::Idle);
        assert!(conv.messages().is_empty());
        assert_eq!(conv.tool_calls().count(), 0);
        assert!(conv.domain_state().is_map());
    }

    #[test]
    fn mutators_leave_receiver_untouched() {
        let before = Conversation::new();
        let after = before
            .with_status(RunStatus::Running { run_id: "r1".into() })
            .with_appended_message(ChatMessage::new("m1", Role::User, "hi"));

        assert_eq!(before.status(), &RunStatus::Idle);
        assert!(before.messages().is_empty());
        assert_eq!(after.messages().len(), 1);
        assert_eq!(after.id(), before.id());
    }

    #[test]
    fn appending_same_id_twice_is_ignored() {
        let conv = Conversation::new()
            .with_appended_message(ChatMessage::new("m1", Role::Assistant, "first"));
        let again = conv.with_appended_message(ChatMessage::new("m1", Role::Assistant, "second"));

        assert_eq!(again.messages(), conv.messages());
        assert_eq!(again.message("m1").unwrap().text, "first");
    }

    #[test]
    fn tool_calls_are_keyed_by_id() {
        let conv = Conversation::new()
            .with_tool_call(ToolCallInfo::new("t1", "search"))
            .with_tool_call(ToolCallInfo::new("t2", "fetch"))
            .with_tool_call_args("t1", "{\"q\":")
            .with_tool_call_args("t1", "\"rust\"}");

        assert_eq!(conv.tool_calls().count(), 2);
        assert_eq!(conv.tool_call("t1").unwrap().arguments, "{\"q\":\"rust\"}");

        let conv = conv.without_tool_call("t1").without_tool_call("missing");
        assert_eq!(conv.tool_calls().count(), 1);
        assert!(conv.tool_call("t2").is_some());
    }

    #[test]
    fn args_for_unknown_call_are_dropped() {
        let conv = Conversation::new().with_tool_call_args("ghost", "{}");
        assert_eq!(conv.tool_calls().count(), 0);
    }

    #[test]
    fn terminal_statuses() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed { error: "x".into() }.is_terminal());
        assert!(!RunStatus::Running { run_id: "r".into() }.is_terminal());
        assert!(!RunStatus::Idle.is_terminal());
    }

    #[test]
    fn role_accepts_developer_alias() {
        let role: Role = serde_json::from_str("\"developer\"").unwrap();
        assert_eq!(role, Role::System);
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn conversation_serializes_status_tag() {
        let conv = Conversation::new().with_status(RunStatus::Failed { error: "boom".into() });
        let json = serde_json::to_value(&conv).unwrap();
        assert_eq!(json["status"]["state"], "failed");
        assert_eq!(json["status"]["error"], "boom");
    }
}
