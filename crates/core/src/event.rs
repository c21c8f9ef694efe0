//! AG-UI protocol events, as decoded by the transport.
//!
//! The wire form is a JSON object tagged by `type` with SCREAMING_SNAKE_CASE
//! names and camelCase fields:
//!
//! ```json
//! {"type":"TEXT_MESSAGE_CONTENT","messageId":"m1","delta":"Hel"}
//! ```
//!
//! Any `type` this client does not know decodes to [`AgUiEvent::Unknown`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::Role;
use crate::document::Document;

/// Every protocol event the runtime understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgUiEvent {
    #[serde(rename_all = "camelCase")]
    RunStarted {
        #[serde(default)]
        thread_id: Option<String>,
        run_id: String,
    },

    #[serde(rename_all = "camelCase")]
    RunFinished {
        #[serde(default)]
        thread_id: Option<String>,
        #[serde(default)]
        run_id: Option<String>,
    },

    RunError {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    StepStarted { step_name: String },

    #[serde(rename_all = "camelCase")]
    StepFinished { step_name: String },

    #[serde(rename_all = "camelCase")]
    TextMessageStart {
        message_id: String,
        #[serde(default = "default_role")]
        role: Role,
        /// Milliseconds since the Unix epoch
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    #[serde(rename_all = "camelCase")]
    TextMessageContent { message_id: String, delta: String },

    #[serde(rename_all = "camelCase")]
    TextMessageEnd {
        message_id: String,
        /// Milliseconds since the Unix epoch
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    #[serde(rename_all = "camelCase")]
    ToolCallStart {
        tool_call_id: String,
        tool_call_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    ToolCallArgs { tool_call_id: String, delta: String },

    #[serde(rename_all = "camelCase")]
    ToolCallEnd { tool_call_id: String },

    /// Replace the domain-state document wholesale.
    StateSnapshot { snapshot: Document },

    /// Patch the domain-state document. Entries are kept raw so that one
    /// malformed entry does not make the whole event undecodable.
    StateDelta { delta: Vec<Document> },

    MessagesSnapshot { messages: Vec<Document> },

    #[serde(rename_all = "camelCase")]
    ActivitySnapshot {
        message_id: String,
        activity_type: String,
        content: Document,
    },

    #[serde(rename_all = "camelCase")]
    ActivityDelta {
        message_id: String,
        activity_type: String,
        patch: Vec<Document>,
    },

    Custom {
        name: String,
        #[serde(default)]
        value: Document,
    },

    Raw {
        event: Document,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },

    #[serde(other)]
    Unknown,
}

fn default_role() -> Role {
    Role::Assistant
}

impl AgUiEvent {
    /// Wire name of this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "RUN_STARTED",
            Self::RunFinished { .. } => "RUN_FINISHED",
            Self::RunError { .. } => "RUN_ERROR",
            Self::StepStarted { .. } => "STEP_STARTED",
            Self::StepFinished { .. } => "STEP_FINISHED",
            Self::TextMessageStart { .. } => "TEXT_MESSAGE_START",
            Self::TextMessageContent { .. } => "TEXT_MESSAGE_CONTENT",
            Self::TextMessageEnd { .. } => "TEXT_MESSAGE_END",
            Self::ToolCallStart { .. } => "TOOL_CALL_START",
            Self::ToolCallArgs { .. } => "TOOL_CALL_ARGS",
            Self::ToolCallEnd { .. } => "TOOL_CALL_END",
            Self::StateSnapshot { .. } => "STATE_SNAPSHOT",
            Self::StateDelta { .. } => "STATE_DELTA",
            Self::MessagesSnapshot { .. } => "MESSAGES_SNAPSHOT",
            Self::ActivitySnapshot { .. } => "ACTIVITY_SNAPSHOT",
            Self::ActivityDelta { .. } => "ACTIVITY_DELTA",
            Self::Custom { .. } => "CUSTOM",
            Self::Raw { .. } => "RAW",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// True for events that change the domain-state document.
    pub fn changes_domain_state(&self) -> bool {
        matches!(self, Self::StateSnapshot { .. } | Self::StateDelta { .. })
    }
}

/// Convert a wire timestamp (ms since epoch) to a UTC time.
pub fn timestamp_to_utc(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(DateTime::<Utc>::from_timestamp_millis)
}
