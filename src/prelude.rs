//! Convenience re-exports for common use.

pub use crate::agent::{Agent, AgentGraph, Handoff, ToolUseBehavior};
pub use crate::agent_loop::{
    RunItemEventName, RunOptions, RunResult, RunState, RunStatus, RunStream, Runner, StreamEvent,
    StreamEventPayload,
};
pub use crate::config::RunnerConfig;
pub use crate::context::{ApprovalDecision, RunContext};
pub use crate::error::{BatonError, Result};
pub use crate::guardrail::{GuardrailOutput, InputGuardrail, OutputGuardrail, ToolGuardrail};
pub use crate::provider::ModelProvider;
pub use crate::session::{InMemorySession, Session};
pub use crate::tools::{FunctionTool, Tool, ToolArguments, ToolParameters};
pub use crate::types::{ConversationItem, MessageContent, ModelSettings, RunInput, Usage};
