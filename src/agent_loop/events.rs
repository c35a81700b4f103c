//! Run event stream types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::types::RunId;
use crate::types::ConversationItem;

/// Discriminator attached to every item pushed onto the event stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunItemEventName {
    MessageOutputCreated,
    ToolCalled,
    ToolOutput,
    HandoffCalled,
    HandoffOutput,
    ToolApprovalRequested,
}

/// An item appended to the run's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunItemEvent {
    pub name: RunItemEventName,
    /// 1-based turn in which the item was appended.
    pub turn: usize,
    pub agent: String,
    pub item: ConversationItem,
}

/// Concrete event payloads emitted by the agent loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEventPayload {
    RunItem(RunItemEvent),
    /// The active agent changed after a handoff.
    AgentUpdated { agent: String, turn: usize },
}

/// Envelope for streamed run events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamEvent {
    pub run_id: RunId,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: StreamEventPayload,
}

impl StreamEvent {
    pub fn as_item(&self) -> Option<&RunItemEvent> {
        match &self.payload {
            StreamEventPayload::RunItem(event) => Some(event),
            StreamEventPayload::AgentUpdated { .. } => None,
        }
    }

    /// Text of an output message event.
    pub fn output_text(&self) -> Option<String> {
        let event = self.as_item()?;
        if event.name != RunItemEventName::MessageOutputCreated {
            return None;
        }
        event.item.output_content().map(|content| content.as_text())
    }
}
