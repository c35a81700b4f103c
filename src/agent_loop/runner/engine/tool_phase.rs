use std::sync::Arc;

use tracing::debug;

use super::super::tooling::{execute_tool_calls, InvocationOutcome};
use super::{NextStep, RunLoop};
use crate::agent::handoff::{ignored_handoff_result, resolve_handoff};
use crate::agent::{Agent, ToolUseBehavior};
use crate::error::BatonError;
use crate::types::{ConversationItem, MessageContent, ToolCallRequest, ToolCallResult, ToolOutcome};

/// Final output chosen by the agent's tool-use behavior, if any.
fn stop_output(agent: &Agent, completed: &[ToolCallResult]) -> Option<MessageContent> {
    let chosen = match agent.tool_use_behavior() {
        ToolUseBehavior::RunLlmAgain => None,
        ToolUseBehavior::StopOnFirstTool => completed.first(),
        ToolUseBehavior::StopAtTools(names) => completed
            .iter()
            .find(|result| names.iter().any(|n| *n == result.tool_name)),
    }?;
    Some(match &chosen.outcome {
        ToolOutcome::Result(value) => MessageContent::from(value.clone()),
        ToolOutcome::Error(message) => MessageContent::Text(message.clone()),
    })
}

impl RunLoop {
    fn has_approval_request(&self, tool_call_id: &str) -> bool {
        self.items.iter().any(|item| {
            matches!(item, ConversationItem::ApprovalRequest(req) if req.tool_call_id == tool_call_id)
        })
    }

    /// Resolve a batch of unanswered calls: function tools concurrently,
    /// handoffs first-wins, results appended in request order.
    pub(super) async fn resolve_calls(
        &mut self,
        pending: Vec<ToolCallRequest>,
    ) -> Result<NextStep, BatonError> {
        let agent = Arc::clone(&self.agent);

        if let Some(hosted) = pending.iter().find(|call| call.hosted.is_some()) {
            return Err(BatonError::NotImplemented(format!(
                "hosted tool '{}' returned no result and cannot run locally",
                hosted.tool_name
            )));
        }

        let function_calls: Vec<ToolCallRequest> = pending
            .iter()
            .filter(|call| agent.handoff_for_tool(&call.tool_name).is_none())
            .cloned()
            .collect();
        debug!(
            turn = self.turn,
            tools = function_calls.len(),
            handoffs = pending.len() - function_calls.len(),
            "resolving tool calls"
        );
        let mut outcomes =
            execute_tool_calls(&agent, &function_calls, &self.ctx, &self.config, &self.cancel)
                .await
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?
                .into_iter();

        let mut target = self.pending_handoff.take();
        let mut handoff_taken = target.is_some();
        let mut completed = Vec::new();
        let mut paused = Vec::new();

        for call in &pending {
            if agent.handoff_for_tool(&call.tool_name).is_some() {
                if handoff_taken {
                    self.append(ignored_handoff_result(call).into());
                    continue;
                }
                handoff_taken = true;
                if let Some(resolved) = resolve_handoff(&self.graph, &agent, call) {
                    target = resolved.target;
                    self.append(resolved.result.into());
                    self.append(resolved.record.into());
                }
                continue;
            }
            match outcomes.next() {
                Some(InvocationOutcome::Completed(result)) => {
                    completed.push(result.clone());
                    self.append(result.into());
                }
                Some(InvocationOutcome::Paused(request)) => {
                    if !self.has_approval_request(&request.tool_call_id) {
                        self.append(request.clone().into());
                    }
                    paused.push(request);
                }
                None => {}
            }
        }

        if !paused.is_empty() {
            self.pending_handoff = target;
            return Ok(NextStep::Interrupted(paused));
        }
        if let Some(target) = target {
            self.switch_agent(target);
            return Ok(NextStep::RunAgain);
        }
        Ok(stop_output(&agent, &completed).map_or(NextStep::RunAgain, NextStep::Final))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn stop_at_tools_picks_the_first_listed_result() {
        let agent = Agent::new("a", "m")
            .with_tool_use_behavior(ToolUseBehavior::StopAtTools(vec!["final".into()]));
        let completed = vec![
            ToolCallResult::success("c1", "lookup", json!(1)),
            ToolCallResult::success("c2", "final", json!({"done": true})),
        ];
        assert_eq!(
            stop_output(&agent, &completed),
            Some(MessageContent::Structured(json!({"done": true})))
        );
        assert_eq!(stop_output(&Agent::new("a", "m"), &completed), None);
    }
}
