//! Sequential evaluation of guardrail chains.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    GuardrailResult, InputGuardrail, OutputGuardrail, ToolGuardrail, ToolGuardrailAction,
};
use crate::context::RunContext;
use crate::error::BatonError;
use crate::types::{MessageContent, RunInput, ToolCallRequest, Usage};

/// Run input guardrails once, before any model call.
///
/// Returns the (possibly rewritten) input. The first tripwire stops the chain.
pub async fn run_input_guardrails(
    guardrails: &[Arc<dyn InputGuardrail>],
    ctx: &RunContext,
    agent_name: &str,
    input: RunInput,
) -> Result<(RunInput, Vec<GuardrailResult>), BatonError> {
    let mut current = input;
    let mut results = Vec::with_capacity(guardrails.len());
    for guardrail in guardrails {
        let output = guardrail.check(ctx, agent_name, &current).await?;
        results.push(GuardrailResult::from_output(guardrail.name(), &output));
        if output.tripwire_triggered {
            warn!(guardrail = guardrail.name(), agent = agent_name, "input guardrail tripwire");
            return Err(BatonError::InputGuardrailTripwire {
                guardrail: guardrail.name().to_string(),
                message: output.message,
            });
        }
        if let Some(rewritten) = output.rewritten {
            debug!(guardrail = guardrail.name(), "input rewritten");
            current = rewritten;
        }
    }
    Ok((current, results))
}

/// Run output guardrails on the final output.
///
/// `usage` is the run's accumulated usage, reported on a tripwire.
pub async fn run_output_guardrails(
    guardrails: &[Arc<dyn OutputGuardrail>],
    ctx: &RunContext,
    agent_name: &str,
    output: MessageContent,
    usage: Usage,
) -> Result<(MessageContent, Vec<GuardrailResult>), BatonError> {
    let mut current = output;
    let mut results = Vec::with_capacity(guardrails.len());
    for guardrail in guardrails {
        let verdict = guardrail.check(ctx, agent_name, &current).await?;
        results.push(GuardrailResult::from_output(guardrail.name(), &verdict));
        if verdict.tripwire_triggered {
            warn!(guardrail = guardrail.name(), agent = agent_name, "output guardrail tripwire");
            return Err(BatonError::OutputGuardrailTripwire {
                guardrail: guardrail.name().to_string(),
                message: verdict.message,
                usage,
            });
        }
        if let Some(rewritten) = verdict.rewritten {
            debug!(guardrail = guardrail.name(), "output rewritten");
            current = rewritten;
        }
    }
    Ok((current, results))
}

/// Run tool guardrails on one successful tool output before it is recorded.
pub async fn run_tool_guardrails(
    guardrails: &[Arc<dyn ToolGuardrail>],
    ctx: &RunContext,
    call: &ToolCallRequest,
    output: serde_json::Value,
) -> Result<serde_json::Value, BatonError> {
    let mut current = output;
    for guardrail in guardrails {
        match guardrail.check(ctx, call, &current).await? {
            ToolGuardrailAction::Allow => {}
            ToolGuardrailAction::Replace(value) => {
                debug!(guardrail = guardrail.name(), tool = call.tool_name.as_str(), "tool output replaced");
                current = value;
            }
            ToolGuardrailAction::Abort { message } => {
                warn!(guardrail = guardrail.name(), tool = call.tool_name.as_str(), "tool guardrail abort");
                return Err(BatonError::ToolGuardrailTripwire {
                    guardrail: guardrail.name().to_string(),
                    tool_name: call.tool_name.clone(),
                    message,
                });
            }
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrail::{input_guardrail, output_guardrail, tool_guardrail, GuardrailOutput};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn rewrite_is_visible_to_later_checks() {
        let guards = vec![
            input_guardrail("upper", |_, input: RunInput| async move {
                Ok(GuardrailOutput::rewrite(RunInput::Text(input.text().to_uppercase())))
            }),
            input_guardrail("needs-upper", |_, input: RunInput| async move {
                if input.text() == "HELLO" {
                    Ok(GuardrailOutput::safe())
                } else {
                    Ok(GuardrailOutput::tripwire("not rewritten"))
                }
            }),
        ];

        let (input, results) =
            run_input_guardrails(&guards, &RunContext::new(), "a", RunInput::from("hello"))
                .await
                .unwrap();

        assert_eq!(input, RunInput::from("HELLO"));
        assert_eq!(results.len(), 2);
        assert!(results[0].rewritten);
    }

    #[tokio::test]
    async fn first_tripwire_stops_the_chain() {
        let guards = vec![
            input_guardrail("block", |_, _| async { Ok(GuardrailOutput::tripwire("nope")) }),
            input_guardrail("never", |_, _| async {
                Err(BatonError::InvalidState("second guardrail ran".into()))
            }),
        ];

        let err = run_input_guardrails(&guards, &RunContext::new(), "a", RunInput::from("x"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BatonError::InputGuardrailTripwire { ref guardrail, .. } if guardrail == "block"
        ));
    }

    #[tokio::test]
    async fn output_tripwire_carries_usage() {
        let guards = vec![output_guardrail("pii", |_, _| async {
            Ok(GuardrailOutput::tripwire("leak"))
        })];

        let err = run_output_guardrails(
            &guards,
            &RunContext::new(),
            "a",
            MessageContent::from("ssn"),
            Usage::new(3, 4),
        )
        .await
        .unwrap_err();

        match err {
            BatonError::OutputGuardrailTripwire { usage, message, .. } => {
                assert_eq!(usage, Usage::new(3, 4));
                assert_eq!(message.as_deref(), Some("leak"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn tool_replace_then_abort() {
        let call = ToolCallRequest {
            id: "c1".into(),
            tool_name: "lookup".into(),
            parameters: json!({}),
            hosted: None,
        };
        let replace = vec![tool_guardrail("mask", |_, _, _| async {
            Ok(ToolGuardrailAction::Replace(json!("***")))
        })];
        let out = run_tool_guardrails(&replace, &RunContext::new(), &call, json!("secret"))
            .await
            .unwrap();
        assert_eq!(out, json!("***"));

        let abort = vec![tool_guardrail("stop", |_, _, _| async {
            Ok(ToolGuardrailAction::Abort { message: None })
        })];
        let err = run_tool_guardrails(&abort, &RunContext::new(), &call, json!(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BatonError::ToolGuardrailTripwire { ref tool_name, .. } if tool_name == "lookup"
        ));
    }
}
