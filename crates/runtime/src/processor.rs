//! The event processor: one pure transition per incoming event.
//!
//! `(Conversation, StreamingState, AgUiEvent) -> (Conversation, StreamingState)`
//!
//! The function is total and never fails. Deltas or ends that do not belong
//! to the message being streamed are dropped, which turns an out-of-order or
//! replayed delivery into lost text instead of corrupted state.

use chatwire_core::event::timestamp_to_utc;
use chatwire_core::{AgUiEvent, Conversation, RunStatus, ToolCallInfo};
use tracing::{debug, trace};

use crate::streaming::StreamingState;

/// Apply one event.
pub fn process_event(
    conversation: &Conversation,
    streaming: &StreamingState,
    event: &AgUiEvent,
) -> (Conversation, StreamingState) {
    match event {
        AgUiEvent::RunStarted { run_id, .. } => (
            conversation.with_status(RunStatus::Running {
                run_id: run_id.clone(),
            }),
            streaming.clone(),
        ),

        AgUiEvent::RunFinished { .. } => (
            conversation.with_status(RunStatus::Completed),
            StreamingState::AwaitingText,
        ),

        AgUiEvent::RunError { message, .. } => (
            conversation.with_status(RunStatus::Failed {
                error: message.clone(),
            }),
            StreamingState::AwaitingText,
        ),

        AgUiEvent::TextMessageStart {
            message_id,
            role,
            timestamp,
        } => {
            if let Some(abandoned) = streaming.streaming_message_id() {
                debug!(abandoned, started = %message_id, "New message started before previous ended");
            }
            (
                conversation.clone(),
                StreamingState::start(message_id.clone(), *role, timestamp_to_utc(*timestamp)),
            )
        }

        AgUiEvent::TextMessageContent { message_id, delta } => {
            match streaming.append(message_id, delta) {
                Some(next) => (conversation.clone(), next),
                None => {
                    trace!(%message_id, "Dropping delta for message that is not streaming");
                    (conversation.clone(), streaming.clone())
                }
            }
        }

        AgUiEvent::TextMessageEnd {
            message_id,
            timestamp,
        } => match streaming.finish(message_id, timestamp_to_utc(*timestamp)) {
            Some(message) => (
                conversation.with_appended_message(message),
                StreamingState::AwaitingText,
            ),
            None => {
                trace!(%message_id, "Ignoring end for message that is not streaming");
                (conversation.clone(), streaming.clone())
            }
        },

        AgUiEvent::ToolCallStart {
            tool_call_id,
            tool_call_name,
            parent_message_id,
        } => {
            let call = ToolCallInfo {
                parent_message_id: parent_message_id.clone(),
                ..ToolCallInfo::new(tool_call_id.clone(), tool_call_name.clone())
            };
            (conversation.with_tool_call(call), streaming.clone())
        }

        AgUiEvent::ToolCallArgs {
            tool_call_id,
            delta,
        } => (
            conversation.with_tool_call_args(tool_call_id, delta),
            streaming.clone(),
        ),

        AgUiEvent::ToolCallEnd { tool_call_id } => (
            conversation.without_tool_call(tool_call_id),
            streaming.clone(),
        ),

        AgUiEvent::StepStarted { .. }
        | AgUiEvent::StepFinished { .. }
        | AgUiEvent::StateSnapshot { .. }
        | AgUiEvent::StateDelta { .. }
        | AgUiEvent::MessagesSnapshot { .. }
        | AgUiEvent::ActivitySnapshot { .. }
        | AgUiEvent::ActivityDelta { .. }
        | AgUiEvent::Custom { .. }
        | AgUiEvent::Raw { .. }
        | AgUiEvent::Unknown => (conversation.clone(), streaming.clone()),
    }
}

/// Apply events in order, starting from the given pair.
pub fn fold_events<'a>(
    conversation: Conversation,
    streaming: StreamingState,
    events: impl IntoIterator<Item = &'a AgUiEvent>,
) -> (Conversation, StreamingState) {
    events
        .into_iter()
        .fold((conversation, streaming), |(conv, stream), event| {
            process_event(&conv, &stream, event)
        })
}
