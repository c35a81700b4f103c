//! The turn loop.

mod model_phase;
mod tool_phase;

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{field, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use super::super::interpreter::parse_structured_output;
use super::super::types::{RunId, RunOptions, RunResult, RunState, RunStatus};
use super::control::{item_event_name, RunEventEmitter};
use super::Runner;
use crate::agent::{Agent, AgentGraph};
use crate::config::RunnerConfig;
use crate::context::RunContext;
use crate::error::BatonError;
use crate::guardrail::{run_input_guardrails, run_output_guardrails, GuardrailResult};
use crate::provider::{ModelProvider, ModelResponse};
use crate::session::Session;
use crate::types::{ApprovalRequest, ConversationItem, MessageContent, RunInput, ToolCallRequest, Usage};

/// What a turn (or a resumed batch of calls) decided.
enum NextStep {
    RunAgain,
    Final(MessageContent),
    Interrupted(Vec<ApprovalRequest>),
}

struct RunLoop {
    provider: Arc<dyn ModelProvider>,
    graph: Arc<AgentGraph>,
    config: RunnerConfig,
    ctx: RunContext,
    session: Option<Arc<dyn Session>>,
    emitter: RunEventEmitter,
    run_id: RunId,
    agent: Arc<Agent>,
    pending_handoff: Option<Arc<Agent>>,
    turn: usize,
    max_turns: usize,
    items: Vec<ConversationItem>,
    session_saved: usize,
    raw_responses: Vec<ModelResponse>,
    usage: Usage,
    last_response_id: Option<String>,
    /// Sent with the next model request only.
    previous_response_id: Option<String>,
    input_guardrail_results: Vec<GuardrailResult>,
    /// Parent of every tool call's token.
    cancel: CancellationToken,
    /// Cancels `cancel` when the loop is dropped mid-run.
    _cancel_guard: DropGuard,
}

fn resolve_max_turns(requested: Option<usize>, fallback: usize) -> Result<usize, BatonError> {
    match requested.unwrap_or(fallback) {
        0 => Err(BatonError::Configuration("max_turns must be at least 1".into())),
        n => Ok(n),
    }
}

fn run_span(config: &RunnerConfig, run_id: RunId, agent: &str) -> Span {
    if config.tracing_disabled {
        return Span::none();
    }
    info_span!("agent_run", run_id = %run_id, agent = agent, turns = field::Empty)
}

/// The run's own token, a child of the caller's when one is given.
fn run_token(options: &RunOptions) -> CancellationToken {
    options
        .cancel_token
        .as_ref()
        .map_or_else(CancellationToken::new, CancellationToken::child_token)
}

fn cancelled() -> BatonError {
    BatonError::InvalidState("run was cancelled".into())
}

/// Trim the front of a truncated history until every tool result still has
/// its request. A suffix never keeps a request while losing its result.
fn drop_orphaned_results(mut items: Vec<ConversationItem>) -> Vec<ConversationItem> {
    loop {
        let requested: HashSet<&str> = items
            .iter()
            .filter_map(|item| item.as_tool_call().map(|call| call.id.as_str()))
            .collect();
        let orphan = items.iter().rposition(|item| {
            item.as_tool_result()
                .is_some_and(|result| !requested.contains(result.tool_call_id.as_str()))
        });
        match orphan {
            Some(index) => {
                items.drain(..=index);
            }
            None => return items,
        }
    }
}

/// Tool calls in `items` with no result yet, in request order.
fn unresolved_calls(items: &[ConversationItem]) -> Vec<ToolCallRequest> {
    let resolved: HashSet<&str> = items
        .iter()
        .filter_map(|item| item.as_tool_result().map(|r| r.tool_call_id.as_str()))
        .collect();
    items
        .iter()
        .filter_map(ConversationItem::as_tool_call)
        .filter(|call| !resolved.contains(call.id.as_str()))
        .cloned()
        .collect()
}

pub(super) async fn start_run(
    runner: &Runner,
    agent_name: &str,
    input: RunInput,
    ctx: RunContext,
    options: RunOptions,
) -> Result<RunResult, BatonError> {
    let run_id = Uuid::new_v4();
    let span = run_span(&runner.config, run_id, agent_name);
    async move {
        runner.config.validate()?;
        let agent = runner.graph.require(agent_name)?;
        let max_turns = resolve_max_turns(options.max_turns, runner.config.max_turns)?;
        info!(max_turns, "run started");

        let (input, input_guardrail_results) =
            run_input_guardrails(agent.input_guardrails(), &ctx, agent.name(), input).await?;

        let mut items = match &options.session {
            Some(session) => {
                let history = session.get_items(options.session_limit).await?;
                match options.session_limit {
                    Some(_) => drop_orphaned_results(history),
                    None => history,
                }
            }
            None => Vec::new(),
        };
        let session_saved = items.len();
        items.extend(input.into_items());

        let cancel = run_token(&options);
        let mut run = RunLoop {
            provider: Arc::clone(&runner.provider),
            graph: Arc::clone(&runner.graph),
            config: runner.config.clone(),
            ctx,
            session: options.session,
            emitter: RunEventEmitter::new(run_id, options.event_sink),
            run_id,
            agent,
            pending_handoff: None,
            turn: 0,
            max_turns,
            items,
            session_saved,
            raw_responses: Vec::new(),
            usage: Usage::default(),
            last_response_id: None,
            previous_response_id: options.previous_response_id,
            input_guardrail_results,
            _cancel_guard: cancel.clone().drop_guard(),
            cancel,
        };
        let cancel = run.cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(cancelled()),
            result = run.drive() => result,
        }
    }
    .instrument(span)
    .await
}

pub(super) async fn resume_run(
    runner: &Runner,
    state: RunState,
    ctx: RunContext,
    options: RunOptions,
) -> Result<RunResult, BatonError> {
    let span = run_span(&runner.config, state.run_id, &state.current_agent);
    async move {
        runner.config.validate()?;
        let agent = runner.graph.require(&state.current_agent)?;
        let pending_handoff = state
            .next_agent
            .as_deref()
            .map(|name| runner.graph.require(name))
            .transpose()?;
        let max_turns = resolve_max_turns(options.max_turns, state.max_turns)?;
        info!(turn = state.turn, "run resumed");

        let cancel = run_token(&options);
        let mut run = RunLoop {
            provider: Arc::clone(&runner.provider),
            graph: Arc::clone(&runner.graph),
            config: runner.config.clone(),
            ctx,
            session: options.session,
            emitter: RunEventEmitter::new(state.run_id, options.event_sink),
            run_id: state.run_id,
            agent,
            pending_handoff,
            turn: state.turn,
            max_turns,
            items: state.items,
            session_saved: state.session_saved,
            raw_responses: state.raw_responses,
            usage: state.usage,
            last_response_id: state.last_response_id,
            previous_response_id: options.previous_response_id,
            input_guardrail_results: state.input_guardrail_results,
            _cancel_guard: cancel.clone().drop_guard(),
            cancel,
        };
        let cancel = run.cancel.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(cancelled()),
            result = run.resume() => result,
        }
    }
    .instrument(span)
    .await
}

impl RunLoop {
    async fn drive(&mut self) -> Result<RunResult, BatonError> {
        loop {
            if self.turn >= self.max_turns {
                warn!(max_turns = self.max_turns, "turn limit exceeded");
                return Err(BatonError::MaxTurnsExceeded {
                    max_turns: self.max_turns,
                    turns: self.turn,
                });
            }
            self.turn += 1;
            let step = self.run_turn().await?;
            if let Some(result) = self.settle(step).await? {
                return Ok(result);
            }
        }
    }

    async fn resume(&mut self) -> Result<RunResult, BatonError> {
        let pending = unresolved_calls(&self.items);
        if !pending.is_empty() || self.pending_handoff.is_some() {
            let step = self.resolve_calls(pending).await?;
            if let Some(result) = self.settle(step).await? {
                return Ok(result);
            }
        }
        self.drive().await
    }

    async fn settle(&mut self, step: NextStep) -> Result<Option<RunResult>, BatonError> {
        match step {
            NextStep::RunAgain => Ok(None),
            NextStep::Final(content) => self.finish(content).await.map(Some),
            NextStep::Interrupted(requests) => self.interrupt(requests).await.map(Some),
        }
    }

    fn append(&mut self, item: ConversationItem) {
        if let Some(name) = item_event_name(&self.agent, &item) {
            self.emitter.emit_item(name, self.turn, self.agent.name(), &item);
        }
        self.items.push(item);
    }

    fn switch_agent(&mut self, target: Arc<Agent>) {
        info!(from = self.agent.name(), to = target.name(), "agent switched");
        self.agent = target;
        self.emitter.emit_agent_updated(self.agent.name(), self.turn);
    }

    async fn save_session(&mut self) -> Result<(), BatonError> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        let fresh = &self.items[self.session_saved.min(self.items.len())..];
        if !fresh.is_empty() {
            session.add_items(fresh).await?;
        }
        self.session_saved = self.items.len();
        Ok(())
    }

    async fn finish(&mut self, content: MessageContent) -> Result<RunResult, BatonError> {
        let agent = Arc::clone(&self.agent);
        let content = match agent.output_schema() {
            Some(schema) => parse_structured_output(content, schema)?,
            None => content,
        };
        let (content, output_results) = run_output_guardrails(
            agent.output_guardrails(),
            &self.ctx,
            agent.name(),
            content,
            self.usage,
        )
        .await?;
        self.save_session().await?;

        Span::current().record("turns", self.turn);
        info!(
            turns = self.turn,
            input_tokens = self.usage.input_tokens,
            output_tokens = self.usage.output_tokens,
            "run completed"
        );
        Ok(self.result(RunStatus::Completed, Some(content), output_results, Vec::new()))
    }

    async fn interrupt(&mut self, requests: Vec<ApprovalRequest>) -> Result<RunResult, BatonError> {
        self.save_session().await?;
        Span::current().record("turns", self.turn);
        info!(turns = self.turn, pending = requests.len(), "run interrupted");
        Ok(self.result(RunStatus::Interrupted, None, Vec::new(), requests))
    }

    fn snapshot(&self) -> RunState {
        RunState {
            run_id: self.run_id,
            current_agent: self.agent.name().to_string(),
            next_agent: self.pending_handoff.as_ref().map(|a| a.name().to_string()),
            turn: self.turn,
            max_turns: self.max_turns,
            items: self.items.clone(),
            session_saved: self.session_saved,
            raw_responses: self.raw_responses.clone(),
            usage: self.usage,
            last_response_id: self.last_response_id.clone(),
            input_guardrail_results: self.input_guardrail_results.clone(),
        }
    }

    fn result(
        &self,
        status: RunStatus,
        final_output: Option<MessageContent>,
        output_guardrail_results: Vec<GuardrailResult>,
        interruptions: Vec<ApprovalRequest>,
    ) -> RunResult {
        RunResult {
            run_id: self.run_id,
            status,
            final_output,
            items: self.items.clone(),
            raw_responses: self.raw_responses.clone(),
            usage: self.usage,
            last_response_id: self.last_response_id.clone(),
            last_agent: self.agent.name().to_string(),
            turns: self.turn,
            input_guardrail_results: self.input_guardrail_results.clone(),
            output_guardrail_results,
            interruptions,
            state: (status == RunStatus::Interrupted).then(|| self.snapshot()),
            finished_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCallResult;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn unresolved_calls_skip_answered_requests() {
        let items = vec![
            ConversationItem::tool_call("c1", "a", json!({})),
            ConversationItem::tool_call("c2", "b", json!({})),
            ToolCallResult::success("c1", "a", json!(1)).into(),
        ];
        let pending: Vec<_> = unresolved_calls(&items).into_iter().map(|c| c.id).collect();
        assert_eq!(pending, vec!["c2".to_string()]);
    }

    #[test]
    fn truncated_history_never_splits_a_call() {
        // The window starts between two parallel requests.
        let items = vec![
            ConversationItem::tool_call("b", "lookup", json!({})),
            ToolCallResult::success("a", "lookup", json!(1)).into(),
            ToolCallResult::success("b", "lookup", json!(2)).into(),
            ConversationItem::assistant("both found"),
            ConversationItem::user("thanks"),
        ];

        assert_eq!(
            drop_orphaned_results(items),
            vec![
                ConversationItem::assistant("both found"),
                ConversationItem::user("thanks"),
            ]
        );

        let whole = vec![
            ConversationItem::user("find it"),
            ConversationItem::tool_call("c", "lookup", json!({})),
            ToolCallResult::success("c", "lookup", json!(3)).into(),
        ];
        assert_eq!(drop_orphaned_results(whole.clone()), whole);
    }

    #[test]
    fn zero_turn_limit_is_rejected() {
        assert!(matches!(
            resolve_max_turns(Some(0), 10),
            Err(BatonError::Configuration(_))
        ));
        assert_eq!(resolve_max_turns(None, 4).unwrap(), 4);
    }
}
