use std::sync::Arc;

use futures::future;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, field, info_span, warn, Instrument, Span};

use crate::agent::Agent;
use crate::config::RunnerConfig;
use crate::context::{ApprovalStatus, RunContext};
use crate::error::BatonError;
use crate::guardrail::run_tool_guardrails;
use crate::tools::validation::validate_arguments;
use crate::tools::{Tool, ToolArguments, ToolContext};
use crate::types::{ApprovalRequest, ToolCallRequest, ToolCallResult};
use crate::util::timeout::maybe_timeout;

/// Result returned to the model when the caller rejected a call.
pub const REJECTED_MESSAGE: &str = "Tool execution was not approved.";

#[derive(Debug, Clone, PartialEq)]
pub(super) enum InvocationOutcome {
    Completed(ToolCallResult),
    /// Waiting on a caller decision; the call has not run.
    Paused(ApprovalRequest),
}

pub(super) fn not_found_result(call: &ToolCallRequest) -> ToolCallResult {
    ToolCallResult::error(
        call.id.clone(),
        call.tool_name.clone(),
        format!("Tool '{}' not found", call.tool_name),
    )
}

fn cancelled_result(call: &ToolCallRequest) -> ToolCallResult {
    ToolCallResult::error(
        call.id.clone(),
        call.tool_name.clone(),
        format!("Tool '{}' was cancelled", call.tool_name),
    )
}

fn error_message(tool: &dyn Tool, ctx: &RunContext, error: &BatonError) -> String {
    if let Some(message) = tool.format_error(ctx, error) {
        return message;
    }
    let message = match error {
        BatonError::ToolExecution { message, .. } => message.clone(),
        BatonError::Timeout(ms) => format!("Tool '{}' timed out after {ms}ms", tool.name()),
        other => other.to_string(),
    };
    if message.trim().is_empty() {
        error.kind().to_string()
    } else {
        message
    }
}

/// Run one function tool call through lookup, approval, validation,
/// execution and tool guardrails.
///
/// Every failure except a tool guardrail abort becomes an error result.
///
/// `cancel` is the run's token; the call gets a child of it, also cancelled on
/// timeout.
pub(super) async fn invoke_tool(
    agent: &Agent,
    call: &ToolCallRequest,
    ctx: &RunContext,
    config: &RunnerConfig,
    cancel: &CancellationToken,
) -> Result<InvocationOutcome, BatonError> {
    let Some(tool) = agent.tools().resolve(&call.tool_name, ctx) else {
        warn!(tool = call.tool_name.as_str(), agent = agent.name(), "tool not found");
        return Ok(InvocationOutcome::Completed(not_found_result(call)));
    };
    let args = ToolArguments::new(call.parameters.clone());

    if tool.needs_approval(ctx, &args).await {
        match ctx.approval_status(&call.tool_name, &call.id) {
            ApprovalStatus::Unknown => {
                debug!(tool = call.tool_name.as_str(), call_id = call.id.as_str(), "approval required");
                return Ok(InvocationOutcome::Paused(ApprovalRequest {
                    tool_name: call.tool_name.clone(),
                    tool_call_id: call.id.clone(),
                    parameters: call.parameters.clone(),
                }));
            }
            ApprovalStatus::Rejected => {
                return Ok(InvocationOutcome::Completed(ToolCallResult::error(
                    call.id.clone(),
                    call.tool_name.clone(),
                    REJECTED_MESSAGE,
                )));
            }
            ApprovalStatus::Approved => {}
        }
    }

    if let Err(validation_error) = validate_arguments(args.raw(), &tool.parameters().schema) {
        return Ok(InvocationOutcome::Completed(ToolCallResult::error(
            call.id.clone(),
            call.tool_name.clone(),
            format!("Argument validation failed: {validation_error}"),
        )));
    }

    let cancel = cancel.child_token();
    if cancel.is_cancelled() {
        return Ok(InvocationOutcome::Completed(cancelled_result(call)));
    }
    let tool_ctx = ToolContext {
        run: ctx.clone(),
        tool_call_id: call.id.clone(),
        tool_name: call.tool_name.clone(),
        agent_name: agent.name().to_string(),
        cancel: cancel.clone(),
    };
    // The tool is polled first so it can observe its own token.
    let executed = tokio::select! {
        biased;
        executed = maybe_timeout(config.tool_timeout(), tool.execute(&args, &tool_ctx)) => executed,
        _ = cancel.cancelled() => {
            debug!(tool = call.tool_name.as_str(), call_id = call.id.as_str(), "tool call cancelled");
            return Ok(InvocationOutcome::Completed(cancelled_result(call)));
        }
    };

    let result = match executed {
        Ok(value) => {
            let value = run_tool_guardrails(agent.tool_guardrails(), ctx, call, value).await?;
            if config.trace_sensitive_data {
                Span::current().record("output", field::display(&value));
            }
            ToolCallResult::success(call.id.clone(), call.tool_name.clone(), value)
        }
        Err(error) => {
            if matches!(error, BatonError::Timeout(_)) {
                cancel.cancel();
            }
            warn!(tool = call.tool_name.as_str(), error = %error, "tool failed");
            ToolCallResult::error(
                call.id.clone(),
                call.tool_name.clone(),
                error_message(tool.as_ref(), ctx, &error),
            )
        }
    };
    Ok(InvocationOutcome::Completed(result))
}

fn tool_span(config: &RunnerConfig, call: &ToolCallRequest) -> Span {
    if config.tracing_disabled {
        return Span::none();
    }
    let span = info_span!(
        "tool",
        tool = call.tool_name.as_str(),
        call_id = call.id.as_str(),
        arguments = field::Empty,
        output = field::Empty,
    );
    if config.trace_sensitive_data {
        span.record("arguments", field::display(&call.parameters));
    }
    span
}

/// Execute a turn's function calls concurrently.
///
/// Outcomes come back in request order regardless of completion order. A
/// panicking tool yields an error result for its call only. At most
/// `max_tool_concurrency` calls execute at once.
pub(super) async fn execute_tool_calls(
    agent: &Arc<Agent>,
    calls: &[ToolCallRequest],
    ctx: &RunContext,
    config: &RunnerConfig,
    cancel: &CancellationToken,
) -> Vec<Result<InvocationOutcome, BatonError>> {
    let limiter = config
        .max_tool_concurrency
        .filter(|limit| *limit > 0)
        .map(|limit| Arc::new(Semaphore::new(limit)));

    let handles = calls.iter().cloned().map(|call| {
        let agent = Arc::clone(agent);
        let ctx = ctx.clone();
        let config = config.clone();
        let limiter = limiter.clone();
        let cancel = cancel.clone();
        let span = tool_span(&config, &call);
        tokio::spawn(
            async move {
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                invoke_tool(&agent, &call, &ctx, &config, &cancel).await
            }
            .instrument(span),
        )
    });

    future::join_all(handles)
        .await
        .into_iter()
        .zip(calls)
        .map(|(joined, call)| match joined {
            Ok(outcome) => outcome,
            Err(join_error) => {
                warn!(tool = call.tool_name.as_str(), error = %join_error, "tool task failed");
                Ok(InvocationOutcome::Completed(ToolCallResult::error(
                    call.id.clone(),
                    call.tool_name.clone(),
                    format!("Tool '{}' panicked during execution", call.tool_name),
                )))
            }
        })
        .collect()
}
