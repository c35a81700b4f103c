//! Handoffs: transferring control of a run to another agent.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::agent::Agent;
use super::graph::AgentGraph;
use crate::provider::ToolDefinition;
use crate::tools::ToolParameters;
use crate::types::{HandoffRecord, ToolCallRequest, ToolCallResult};

/// Error result given to every handoff call after the first in one turn.
pub const MULTIPLE_HANDOFFS_MESSAGE: &str = "Multiple handoffs detected, ignoring this one.";

/// A declared transfer target, rendered to the model as a synthetic tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handoff {
    target: String,
    tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_description: Option<String>,
}

impl Handoff {
    pub fn to(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            tool_name: default_tool_name(&target),
            target,
            tool_description: None,
        }
    }

    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = name.into();
        self
    }

    pub fn with_tool_description(mut self, description: impl Into<String>) -> Self {
        self.tool_description = Some(description.into());
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn definition(&self, target: &Agent) -> ToolDefinition {
        let description = self.tool_description.clone().unwrap_or_else(|| {
            let mut text = format!(
                "Handoff to the {} agent to handle the request.",
                target.name()
            );
            if let Some(extra) = target.handoff_description() {
                text.push(' ');
                text.push_str(extra);
            }
            text
        });
        ToolDefinition {
            name: self.tool_name.clone(),
            description,
            parameters: ToolParameters::empty().schema,
        }
    }
}

impl From<&str> for Handoff {
    fn from(target: &str) -> Self {
        Self::to(target)
    }
}

impl From<String> for Handoff {
    fn from(target: String) -> Self {
        Self::to(target)
    }
}

impl From<&Agent> for Handoff {
    fn from(agent: &Agent) -> Self {
        Self::to(agent.name())
    }
}

/// `transfer_to_<snake_case name>`.
pub fn default_tool_name(agent_name: &str) -> String {
    let mut out = String::from("transfer_to_");
    let mut last_underscore = true;
    for ch in agent_name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    while out.ends_with('_') && out.len() > "transfer_to_".len() {
        out.pop();
    }
    out
}

/// Handoff tool definitions offered by `agent`.
pub fn handoff_definitions(agent: &Agent, graph: &AgentGraph) -> Vec<ToolDefinition> {
    agent
        .handoffs()
        .iter()
        .filter_map(|h| graph.get(h.target()).map(|target| h.definition(target)))
        .collect()
}

/// Outcome of resolving one handoff call.
#[derive(Debug, Clone)]
pub struct ResolvedHandoff {
    /// New active agent, or `None` if the transfer failed.
    pub target: Option<Arc<Agent>>,
    pub result: ToolCallResult,
    pub record: HandoffRecord,
}

/// Resolve a call to one of `current`'s handoff tools.
///
/// Returns `None` when the call is not a handoff of this agent; the caller
/// then treats it as an ordinary tool call (and reports it as not found).
pub fn resolve_handoff(
    graph: &AgentGraph,
    current: &Agent,
    call: &ToolCallRequest,
) -> Option<ResolvedHandoff> {
    let handoff = current.handoff_for_tool(&call.tool_name)?;
    let resolved = match graph.get(handoff.target()) {
        Some(target) => {
            debug!(from = current.name(), to = target.name(), "handoff");
            ResolvedHandoff {
                result: ToolCallResult::success(
                    call.id.clone(),
                    call.tool_name.clone(),
                    serde_json::json!({ "assistant": target.name() }),
                ),
                record: HandoffRecord {
                    from_agent: current.name().to_string(),
                    to_agent: target.name().to_string(),
                    error: None,
                },
                target: Some(Arc::clone(target)),
            }
        }
        None => {
            let message = format!("Handoff target '{}' is not registered", handoff.target());
            warn!(from = current.name(), to = handoff.target(), "handoff target missing");
            ResolvedHandoff {
                result: ToolCallResult::error(call.id.clone(), call.tool_name.clone(), &message),
                record: HandoffRecord {
                    from_agent: current.name().to_string(),
                    to_agent: handoff.target().to_string(),
                    error: Some(message),
                },
                target: None,
            }
        }
    };
    Some(resolved)
}

/// Error result for a handoff call that lost to an earlier one in the same turn.
pub fn ignored_handoff_result(call: &ToolCallRequest) -> ToolCallResult {
    ToolCallResult::error(
        call.id.clone(),
        call.tool_name.clone(),
        MULTIPLE_HANDOFFS_MESSAGE,
    )
}
