//! Agents, the graph connecting them, and handoff resolution.

pub mod agent;
pub mod graph;
pub mod handoff;

pub use agent::{Agent, ToolUseBehavior};
pub use graph::AgentGraph;
pub use handoff::{default_tool_name, Handoff};
