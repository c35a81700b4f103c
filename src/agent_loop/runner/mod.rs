//! Runner: drives an agent graph through the turn loop.

mod control;
mod engine;
mod tooling;

pub use tooling::REJECTED_MESSAGE;

use std::sync::Arc;

use super::events::StreamEvent;
use super::stream::RunStream;
use super::types::{RunOptions, RunResult, RunState};
use crate::agent::AgentGraph;
use crate::config::RunnerConfig;
use crate::context::RunContext;
use crate::error::BatonError;
use crate::provider::ModelProvider;
use crate::types::RunInput;

/// Callback receiving every run event in order.
pub type StreamSink = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Executes runs against a fixed agent graph and model backend.
///
/// Cheap to clone. Any number of runs may execute concurrently on one
/// runner; runs share nothing but the caller-supplied [`RunContext`].
#[derive(Clone)]
pub struct Runner {
    provider: Arc<dyn ModelProvider>,
    graph: Arc<AgentGraph>,
    config: RunnerConfig,
}

impl Runner {
    pub fn new(provider: Arc<dyn ModelProvider>, graph: AgentGraph) -> Self {
        Self {
            provider,
            graph: Arc::new(graph),
            config: RunnerConfig::default(),
        }
    }

    /// Runner over the HTTP backend, configured from the config file and
    /// environment.
    #[cfg(feature = "http")]
    pub fn from_env(graph: AgentGraph) -> Result<Self, BatonError> {
        let provider = crate::provider::http::HttpModelProvider::from_env()?;
        let config = RunnerConfig::load()?;
        config.validate()?;
        Ok(Self::new(Arc::new(provider), graph).with_config(config))
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn graph(&self) -> &AgentGraph {
        &self.graph
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Run `agent` on `input` until it produces a final output.
    pub async fn run(
        &self,
        agent: &str,
        input: impl Into<RunInput>,
        ctx: &RunContext,
    ) -> Result<RunResult, BatonError> {
        self.run_with_options(agent, input, ctx, RunOptions::default())
            .await
    }

    pub async fn run_with_options(
        &self,
        agent: &str,
        input: impl Into<RunInput>,
        ctx: &RunContext,
        options: RunOptions,
    ) -> Result<RunResult, BatonError> {
        engine::start_run(self, agent, input.into(), ctx.clone(), options).await
    }

    /// Continue a run that paused on approvals.
    ///
    /// Decisions recorded on `ctx` since the pause are applied to the pending
    /// calls; calls still undecided pause the run again.
    pub async fn resume(&self, state: RunState, ctx: &RunContext) -> Result<RunResult, BatonError> {
        self.resume_with_options(state, ctx, RunOptions::default())
            .await
    }

    pub async fn resume_with_options(
        &self,
        state: RunState,
        ctx: &RunContext,
        options: RunOptions,
    ) -> Result<RunResult, BatonError> {
        engine::resume_run(self, state, ctx.clone(), options).await
    }

    /// Start a run on a background task and stream its events.
    pub fn run_streamed(
        &self,
        agent: &str,
        input: impl Into<RunInput>,
        ctx: &RunContext,
        options: RunOptions,
    ) -> RunStream {
        let runner = self.clone();
        let agent = agent.to_string();
        let input = input.into();
        let ctx = ctx.clone();
        RunStream::spawn(options, move |options| async move {
            engine::start_run(&runner, &agent, input, ctx, options).await
        })
    }

    pub fn resume_streamed(&self, state: RunState, ctx: &RunContext, options: RunOptions) -> RunStream {
        let runner = self.clone();
        let ctx = ctx.clone();
        RunStream::spawn(options, move |options| async move {
            engine::resume_run(&runner, state, ctx, options).await
        })
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("provider", &self.provider.provider_name())
            .field("agents", &self.graph.names().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}
