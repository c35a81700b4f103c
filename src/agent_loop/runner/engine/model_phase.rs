use std::sync::Arc;

use tracing::debug;

use super::super::super::interpreter::{extract_final_output, parse_response_items};
use super::{unresolved_calls, NextStep, RunLoop};
use crate::agent::handoff::handoff_definitions;
use crate::agent::Agent;
use crate::error::BatonError;
use crate::provider::ModelRequest;
use crate::util::timeout::maybe_timeout;

impl RunLoop {
    /// Everything the model sees this turn: the active agent's
    /// configuration and the replayable history.
    fn build_request(&self, agent: &Agent) -> ModelRequest {
        let mut tools = agent.tools().definitions(&self.ctx);
        tools.extend(handoff_definitions(agent, &self.graph));
        ModelRequest {
            model: agent.model().to_string(),
            instructions: agent.instructions().map(str::to_string),
            input: self
                .items
                .iter()
                .filter(|item| item.is_model_input())
                .cloned()
                .collect(),
            tools,
            settings: agent.settings().clone(),
            output_schema: agent.output_schema().cloned(),
            previous_response_id: self.previous_response_id.clone(),
        }
    }

    /// Request, record and resolve one model turn.
    ///
    /// The turn is final only when it requested no tool calls and produced a
    /// message. A message that arrives alongside tool calls is kept in the
    /// history, but the calls are resolved and the model runs again.
    pub(super) async fn run_turn(&mut self) -> Result<NextStep, BatonError> {
        let agent = Arc::clone(&self.agent);
        let turn = self.turn;
        let request = self.build_request(&agent);
        debug!(
            turn,
            agent = agent.name(),
            items = request.input.len(),
            tools = request.tools.len(),
            "model request"
        );

        let response =
            maybe_timeout(self.config.model_timeout(), self.provider.respond(&request)).await?;
        let usage = response.usage.normalized();
        self.ctx.add_usage(&usage);
        self.usage += usage;
        self.previous_response_id = None;
        if response.response_id.is_some() {
            self.last_response_id = response.response_id.clone();
        }

        let produced = parse_response_items(&response.output);
        self.raw_responses.push(response);
        if produced.is_empty() {
            return Err(BatonError::ModelBehavior(format!(
                "model returned no output on turn {turn}"
            )));
        }
        for item in &produced {
            self.append(item.clone());
        }

        let pending = unresolved_calls(&produced);
        if pending.is_empty() {
            return Ok(match extract_final_output(&produced) {
                Some(content) => NextStep::Final(content),
                None => NextStep::RunAgain,
            });
        }
        self.resolve_calls(pending).await
    }
}
