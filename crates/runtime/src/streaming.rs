//! Text streaming state: the message currently being received, if any.
//!
//! Lives outside [`Conversation`](chatwire_core::Conversation) because it is
//! ephemeral: it exists from `TEXT_MESSAGE_START` until the matching end, an
//! error, or the end of the run.

use chatwire_core::{ChatMessage, Role};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamingState {
    /// No message is being streamed.
    #[default]
    AwaitingText,
    /// Deltas for `message_id` are being accumulated.
    TextStreaming {
        message_id: String,
        role: Role,
        text: String,
        started_at: Option<DateTime<Utc>>,
    },
}

impl StreamingState {
    /// Begin a new message. Whatever was streaming before is discarded.
    pub fn start(message_id: impl Into<String>, role: Role, started_at: Option<DateTime<Utc>>) -> Self {
        Self::TextStreaming {
            message_id: message_id.into(),
            role,
            text: String::new(),
            started_at,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::TextStreaming { .. })
    }

    pub fn streaming_message_id(&self) -> Option<&str> {
        match self {
            Self::TextStreaming { message_id, .. } => Some(message_id),
            Self::AwaitingText => None,
        }
    }

    /// Text received so far for the streaming message.
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            Self::TextStreaming { text, .. } => Some(text),
            Self::AwaitingText => None,
        }
    }

    /// Append a delta if `id` is the message being streamed.
    ///
    /// Returns `None` when the delta does not belong to the current stream.
    pub fn append(&self, id: &str, delta: &str) -> Option<Self> {
        match self {
            Self::TextStreaming {
                message_id,
                role,
                text,
                started_at,
            } if message_id == id => Some(Self::TextStreaming {
                message_id: message_id.clone(),
                role: *role,
                text: format!("{text}{delta}"),
                started_at: *started_at,
            }),
            _ => None,
        }
    }

    /// Turn the accumulated text into a finished message if `id` matches.
    ///
    /// `ended_at` wins over the start time as the message timestamp.
    pub fn finish(&self, id: &str, ended_at: Option<DateTime<Utc>>) -> Option<ChatMessage> {
        match self {
            Self::TextStreaming {
                message_id,
                role,
                text,
                started_at,
            } if message_id == id => Some(
                ChatMessage::new(message_id.clone(), *role, text.clone())
                    .created_at(ended_at.or(*started_at)),
            ),
            _ => None,
        }
    }
}
