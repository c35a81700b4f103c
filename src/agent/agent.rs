//! Agent configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::handoff::Handoff;
use crate::error::BatonError;
use crate::guardrail::{InputGuardrail, OutputGuardrail, ToolGuardrail};
use crate::tools::{Tool, ToolRegistry};
use crate::types::{ModelSettings, OutputSchema};

/// What happens after a turn in which function tools ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "tools", rename_all = "snake_case")]
pub enum ToolUseBehavior {
    /// Send tool results back to the model for another turn.
    #[default]
    RunLlmAgain,
    /// The first tool result of the turn becomes the final output.
    StopOnFirstTool,
    /// Stop when any of the named tools produced a result.
    StopAtTools(Vec<String>),
}

/// Immutable description of one agent: its prompt, model, tools, handoff
/// targets and guardrails.
///
/// Built with `with_*` methods; problems such as duplicate tool names are
/// collected and reported by [`Agent::validate`], which
/// [`AgentGraph::new`](super::AgentGraph::new) calls for every agent.
#[derive(Clone)]
pub struct Agent {
    name: String,
    model: String,
    instructions: Option<String>,
    handoff_description: Option<String>,
    settings: ModelSettings,
    tools: ToolRegistry,
    handoffs: Vec<Handoff>,
    input_guardrails: Vec<Arc<dyn InputGuardrail>>,
    output_guardrails: Vec<Arc<dyn OutputGuardrail>>,
    tool_guardrails: Vec<Arc<dyn ToolGuardrail>>,
    output_schema: Option<OutputSchema>,
    tool_use_behavior: ToolUseBehavior,
    config_errors: Vec<String>,
}

impl Agent {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instructions: None,
            handoff_description: None,
            settings: ModelSettings::default(),
            tools: ToolRegistry::new(),
            handoffs: Vec::new(),
            input_guardrails: Vec::new(),
            output_guardrails: Vec::new(),
            tool_guardrails: Vec::new(),
            output_schema: None,
            tool_use_behavior: ToolUseBehavior::default(),
            config_errors: Vec::new(),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Shown to other agents' models when this agent is a handoff target.
    pub fn with_handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = Some(description.into());
        self
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        if let Err(err) = self.tools.register(tool) {
            self.config_errors.push(err.to_string());
        }
        self
    }

    pub fn with_tools(self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        tools.into_iter().fold(self, Agent::with_tool)
    }

    pub fn with_handoff(mut self, handoff: impl Into<Handoff>) -> Self {
        self.handoffs.push(handoff.into());
        self
    }

    pub fn with_input_guardrail(mut self, guardrail: Arc<dyn InputGuardrail>) -> Self {
        self.input_guardrails.push(guardrail);
        self
    }

    pub fn with_output_guardrail(mut self, guardrail: Arc<dyn OutputGuardrail>) -> Self {
        self.output_guardrails.push(guardrail);
        self
    }

    pub fn with_tool_guardrail(mut self, guardrail: Arc<dyn ToolGuardrail>) -> Self {
        self.tool_guardrails.push(guardrail);
        self
    }

    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_tool_use_behavior(mut self, behavior: ToolUseBehavior) -> Self {
        self.tool_use_behavior = behavior;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn handoff_description(&self) -> Option<&str> {
        self.handoff_description.as_deref()
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn handoffs(&self) -> &[Handoff] {
        &self.handoffs
    }

    pub fn input_guardrails(&self) -> &[Arc<dyn InputGuardrail>] {
        &self.input_guardrails
    }

    pub fn output_guardrails(&self) -> &[Arc<dyn OutputGuardrail>] {
        &self.output_guardrails
    }

    pub fn tool_guardrails(&self) -> &[Arc<dyn ToolGuardrail>] {
        &self.tool_guardrails
    }

    pub fn output_schema(&self) -> Option<&OutputSchema> {
        self.output_schema.as_ref()
    }

    pub fn tool_use_behavior(&self) -> &ToolUseBehavior {
        &self.tool_use_behavior
    }

    /// The handoff whose synthetic tool has this name.
    pub fn handoff_for_tool(&self, tool_name: &str) -> Option<&Handoff> {
        self.handoffs.iter().find(|h| h.tool_name() == tool_name)
    }

    /// Check this agent in isolation. Handoff targets are checked by the graph.
    pub fn validate(&self) -> Result<(), BatonError> {
        let mut problems = self.config_errors.clone();
        if self.name.trim().is_empty() {
            problems.push("agent name must not be empty".into());
        }
        if self.model.trim().is_empty() {
            problems.push(format!("agent '{}' has no model", self.name));
        }
        for (i, handoff) in self.handoffs.iter().enumerate() {
            if self.tools.get(handoff.tool_name()).is_some() {
                problems.push(format!(
                    "handoff tool '{}' collides with a tool of the same name",
                    handoff.tool_name()
                ));
            }
            if self.handoffs[..i]
                .iter()
                .any(|other| other.tool_name() == handoff.tool_name())
            {
                problems.push(format!("duplicate handoff tool '{}'", handoff.tool_name()));
            }
        }
        if let ToolUseBehavior::StopAtTools(names) = &self.tool_use_behavior {
            if names.is_empty() {
                problems.push("stop_at_tools needs at least one tool name".into());
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(BatonError::Configuration(format!(
                "agent '{}': {}",
                self.name,
                problems.join("; ")
            )))
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("tools", &self.tools)
            .field("handoffs", &self.handoffs)
            .field("input_guardrails", &self.input_guardrails.len())
            .field("output_guardrails", &self.output_guardrails.len())
            .field("tool_guardrails", &self.tool_guardrails.len())
            .finish()
    }
}
