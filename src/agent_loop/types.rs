//! Core run types for the agent loop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::runner::StreamSink;
use crate::error::BatonError;
use crate::guardrail::GuardrailResult;
use crate::provider::ModelResponse;
use crate::session::Session;
use crate::types::{ApprovalRequest, ConversationItem, MessageContent, Usage};

/// Unique run identifier.
pub type RunId = Uuid;

/// How a run ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Paused on tool calls awaiting approval; resume with the carried state.
    Interrupted,
}

/// Serializable snapshot of a paused run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunState {
    pub run_id: RunId,
    /// Agent whose tool calls are pending.
    pub current_agent: String,
    /// Handoff target taken in the paused turn, applied once the pending
    /// calls resolve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_agent: Option<String>,
    pub turn: usize,
    pub max_turns: usize,
    /// Full accumulated history, session history included.
    pub items: Vec<ConversationItem>,
    /// Prefix of `items` already written to the session.
    pub session_saved: usize,
    pub raw_responses: Vec<ModelResponse>,
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_response_id: Option<String>,
    #[serde(default)]
    pub input_guardrail_results: Vec<GuardrailResult>,
}

impl RunState {
    /// Calls still waiting on an approval decision.
    pub fn pending_approvals(&self) -> Vec<&ApprovalRequest> {
        let resolved: std::collections::HashSet<&str> = self
            .items
            .iter()
            .filter_map(|item| item.as_tool_result().map(|r| r.tool_call_id.as_str()))
            .collect();
        self.items
            .iter()
            .filter_map(|item| match item {
                ConversationItem::ApprovalRequest(req) if !resolved.contains(req.tool_call_id.as_str()) => {
                    Some(req)
                }
                _ => None,
            })
            .collect()
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: RunId,
    pub status: RunStatus,
    /// `None` when interrupted.
    pub final_output: Option<MessageContent>,
    /// Full accumulated item sequence.
    pub items: Vec<ConversationItem>,
    pub raw_responses: Vec<ModelResponse>,
    /// Usage of this run (including earlier legs of a resumed run).
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_response_id: Option<String>,
    pub last_agent: String,
    pub turns: usize,
    #[serde(default)]
    pub input_guardrail_results: Vec<GuardrailResult>,
    #[serde(default)]
    pub output_guardrail_results: Vec<GuardrailResult>,
    #[serde(default)]
    pub interruptions: Vec<ApprovalRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RunState>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn is_interrupted(&self) -> bool {
        self.status == RunStatus::Interrupted
    }

    /// Final output as text (structured output rendered as JSON).
    pub fn final_text(&self) -> Option<String> {
        self.final_output.as_ref().map(MessageContent::as_text)
    }

    /// Take the paused state for [`Runner::resume`](super::Runner::resume).
    pub fn into_state(self) -> Result<RunState, BatonError> {
        self.state.ok_or_else(|| {
            BatonError::InvalidState(format!("run {} is not interrupted", self.run_id))
        })
    }
}

/// Per-run options.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Overrides [`RunnerConfig::max_turns`](crate::config::RunnerConfig).
    pub max_turns: Option<usize>,
    pub session: Option<Arc<dyn Session>>,
    /// How many history items to read from the session (all when `None`).
    pub session_limit: Option<usize>,
    /// Forwarded on the first model request only.
    pub previous_response_id: Option<String>,
    pub event_sink: Option<StreamSink>,
    /// Cancelling this token ends the run and cancels its in-flight tool calls.
    pub cancel_token: Option<CancellationToken>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn with_session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_session_limit(mut self, limit: usize) -> Self {
        self.session_limit = Some(limit);
        self
    }

    pub fn with_previous_response_id(mut self, id: impl Into<String>) -> Self {
        self.previous_response_id = Some(id.into());
        self
    }

    pub fn with_event_sink(mut self, sink: StreamSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("max_turns", &self.max_turns)
            .field("session", &self.session.as_ref().map(|s| s.session_id().to_string()))
            .field("session_limit", &self.session_limit)
            .field("previous_response_id", &self.previous_response_id)
            .field("event_sink", &self.event_sink.is_some())
            .field("cancel_token", &self.cancel_token)
            .finish()
    }
}
