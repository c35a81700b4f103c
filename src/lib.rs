//! Baton: a multi-agent execution engine.
//!
//! A [`Runner`] drives an [`Agent`](agent::Agent) through repeated model
//! turns: it sends the accumulated conversation to a
//! [`ModelProvider`](provider::ModelProvider), executes the function tools
//! the model asks for, follows handoffs to other agents, applies guardrails,
//! and stops once the model produces a final output.
//!
//! # Quick Start
//!
//! ```no_run
//! use baton::prelude::*;
//!
//! # async fn example() -> baton::error::Result<()> {
//! let agent = Agent::new("assistant", "gpt-4o").with_instructions("Be brief.");
//! let runner = Runner::from_env(AgentGraph::single(agent)?)?;
//! let result = runner.run("assistant", "Hello!", &RunContext::new()).await?;
//! println!("{}", result.final_text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agent_loop;
pub mod config;
pub mod context;
pub mod error;
pub mod guardrail;
pub mod prelude;
pub mod provider;
pub mod session;
pub mod tools;
pub mod types;
pub mod util;

pub use agent_loop::{RunResult, RunStream, Runner};
