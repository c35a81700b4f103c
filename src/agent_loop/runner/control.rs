use std::sync::atomic::{AtomicU64, Ordering};

use super::super::events::{RunItemEvent, RunItemEventName, StreamEvent, StreamEventPayload};
use super::super::types::RunId;
use super::StreamSink;
use crate::agent::Agent;
use crate::types::ConversationItem;

pub(super) struct RunEventEmitter {
    run_id: RunId,
    seq: AtomicU64,
    sink: Option<StreamSink>,
}

impl RunEventEmitter {
    pub(super) fn new(run_id: RunId, sink: Option<StreamSink>) -> Self {
        Self {
            run_id,
            seq: AtomicU64::new(1),
            sink,
        }
    }

    pub(super) fn emit(&self, payload: StreamEventPayload) {
        let Some(sink) = &self.sink else {
            return;
        };
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        (sink)(StreamEvent {
            run_id: self.run_id,
            seq,
            timestamp: chrono::Utc::now(),
            payload,
        });
    }

    pub(super) fn emit_item(
        &self,
        name: RunItemEventName,
        turn: usize,
        agent: &str,
        item: &ConversationItem,
    ) {
        if self.sink.is_none() {
            return;
        }
        self.emit(StreamEventPayload::RunItem(RunItemEvent {
            name,
            turn,
            agent: agent.to_string(),
            item: item.clone(),
        }));
    }

    pub(super) fn emit_agent_updated(&self, agent: &str, turn: usize) {
        self.emit(StreamEventPayload::AgentUpdated {
            agent: agent.to_string(),
            turn,
        });
    }
}

/// Event name for an item produced while `agent` was active.
///
/// Input messages and handoff records are not streamed as items of their own
/// kind: inputs are never emitted, records share `handoff_output`.
pub(super) fn item_event_name(agent: &Agent, item: &ConversationItem) -> Option<RunItemEventName> {
    match item {
        ConversationItem::MessageInput(_) => None,
        ConversationItem::MessageOutput(_) => Some(RunItemEventName::MessageOutputCreated),
        ConversationItem::ToolCallRequest(call) => Some(if agent.handoff_for_tool(&call.tool_name).is_some() {
            RunItemEventName::HandoffCalled
        } else {
            RunItemEventName::ToolCalled
        }),
        ConversationItem::ToolCallResult(result) => Some(if agent.handoff_for_tool(&result.tool_name).is_some() {
            RunItemEventName::HandoffOutput
        } else {
            RunItemEventName::ToolOutput
        }),
        ConversationItem::HandoffRecord(_) => Some(RunItemEventName::HandoffOutput),
        ConversationItem::ApprovalRequest(_) => Some(RunItemEventName::ToolApprovalRequested),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Handoff;
    use crate::types::ToolCallResult;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[test]
    fn sequence_numbers_are_monotonic() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink: StreamSink = Arc::new(move |event: StreamEvent| {
            sink_seen.lock().unwrap().push(event.seq);
        });
        let emitter = RunEventEmitter::new(uuid::Uuid::nil(), Some(sink));

        emitter.emit_agent_updated("a", 1);
        emitter.emit_item(
            RunItemEventName::MessageOutputCreated,
            1,
            "a",
            &ConversationItem::assistant("hi"),
        );

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn handoff_items_are_named_as_handoffs() {
        let agent = Agent::new("triage", "m").with_handoff(Handoff::to("billing"));
        let call = ConversationItem::tool_call("c1", "transfer_to_billing", serde_json::json!({}));
        let result = ConversationItem::from(ToolCallResult::success(
            "c2",
            "lookup",
            serde_json::json!(1),
        ));

        assert_eq!(item_event_name(&agent, &call), Some(RunItemEventName::HandoffCalled));
        assert_eq!(item_event_name(&agent, &result), Some(RunItemEventName::ToolOutput));
        assert_eq!(item_event_name(&agent, &ConversationItem::user("x")), None);
    }
}
