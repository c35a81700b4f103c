//! Guardrails: checks on run input, final output and individual tool outputs.
//!
//! Each chain runs sequentially in registration order. A rewrite produced by
//! one check is what the next check sees.

pub mod pipeline;
pub mod redact;

pub use pipeline::{run_input_guardrails, run_output_guardrails, run_tool_guardrails};
pub use redact::{PatternTripwire, RegexRedactor};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::RunContext;
use crate::error::BatonError;
use crate::types::{MessageContent, RunInput, ToolCallRequest};

/// Verdict of an input or output guardrail.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardrailOutput<T> {
    pub tripwire_triggered: bool,
    /// Replacement content for the rest of the chain and the run.
    pub rewritten: Option<T>,
    pub message: Option<String>,
}

impl<T> GuardrailOutput<T> {
    pub fn safe() -> Self {
        Self {
            tripwire_triggered: false,
            rewritten: None,
            message: None,
        }
    }

    pub fn rewrite(content: T) -> Self {
        Self {
            tripwire_triggered: false,
            rewritten: Some(content),
            message: None,
        }
    }

    pub fn tripwire(message: impl Into<String>) -> Self {
        Self {
            tripwire_triggered: true,
            rewritten: None,
            message: Some(message.into()),
        }
    }
}

/// What a tool guardrail decides about one tool output.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolGuardrailAction {
    Allow,
    /// Substitute the output, e.g. with a redacted copy.
    Replace(serde_json::Value),
    /// Stop the whole run.
    Abort { message: Option<String> },
}

/// Record of one guardrail evaluation, kept on the run result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub guardrail: String,
    pub tripwire_triggered: bool,
    pub rewritten: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GuardrailResult {
    fn from_output<T>(guardrail: &str, output: &GuardrailOutput<T>) -> Self {
        Self {
            guardrail: guardrail.to_string(),
            tripwire_triggered: output.tripwire_triggered,
            rewritten: output.rewritten.is_some(),
            message: output.message.clone(),
        }
    }
}

#[async_trait]
pub trait InputGuardrail: Send + Sync {
    fn name(&self) -> &str;

    async fn check(
        &self,
        ctx: &RunContext,
        agent_name: &str,
        input: &RunInput,
    ) -> Result<GuardrailOutput<RunInput>, BatonError>;
}

#[async_trait]
pub trait OutputGuardrail: Send + Sync {
    fn name(&self) -> &str;

    async fn check(
        &self,
        ctx: &RunContext,
        agent_name: &str,
        output: &MessageContent,
    ) -> Result<GuardrailOutput<MessageContent>, BatonError>;
}

#[async_trait]
pub trait ToolGuardrail: Send + Sync {
    fn name(&self) -> &str;

    async fn check(
        &self,
        ctx: &RunContext,
        call: &ToolCallRequest,
        output: &serde_json::Value,
    ) -> Result<ToolGuardrailAction, BatonError>;
}

type BoxFut<T> = Pin<Box<dyn Future<Output = Result<T, BatonError>> + Send>>;

type InputCheck = dyn Fn(RunContext, RunInput) -> BoxFut<GuardrailOutput<RunInput>> + Send + Sync;
type OutputCheck =
    dyn Fn(RunContext, MessageContent) -> BoxFut<GuardrailOutput<MessageContent>> + Send + Sync;
type ToolCheck = dyn Fn(RunContext, ToolCallRequest, serde_json::Value) -> BoxFut<ToolGuardrailAction>
    + Send
    + Sync;

/// Input guardrail from an async closure over owned copies of the input.
pub fn input_guardrail<F, Fut>(name: impl Into<String>, check: F) -> Arc<dyn InputGuardrail>
where
    F: Fn(RunContext, RunInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<GuardrailOutput<RunInput>, BatonError>> + Send + 'static,
{
    Arc::new(FnInputGuardrail {
        name: name.into(),
        check: Box::new(move |ctx: RunContext, input: RunInput| -> BoxFut<_> {
            Box::pin(check(ctx, input))
        }),
    })
}

/// Output guardrail from an async closure.
pub fn output_guardrail<F, Fut>(name: impl Into<String>, check: F) -> Arc<dyn OutputGuardrail>
where
    F: Fn(RunContext, MessageContent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<GuardrailOutput<MessageContent>, BatonError>> + Send + 'static,
{
    Arc::new(FnOutputGuardrail {
        name: name.into(),
        check: Box::new(move |ctx: RunContext, output: MessageContent| -> BoxFut<_> {
            Box::pin(check(ctx, output))
        }),
    })
}

/// Tool guardrail from an async closure.
pub fn tool_guardrail<F, Fut>(name: impl Into<String>, check: F) -> Arc<dyn ToolGuardrail>
where
    F: Fn(RunContext, ToolCallRequest, serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolGuardrailAction, BatonError>> + Send + 'static,
{
    Arc::new(FnToolGuardrail {
        name: name.into(),
        check: Box::new(
            move |ctx: RunContext, call: ToolCallRequest, output: serde_json::Value| -> BoxFut<_> {
                Box::pin(check(ctx, call, output))
            },
        ),
    })
}

struct FnInputGuardrail {
    name: String,
    check: Box<InputCheck>,
}

struct FnOutputGuardrail {
    name: String,
    check: Box<OutputCheck>,
}

struct FnToolGuardrail {
    name: String,
    check: Box<ToolCheck>,
}

#[async_trait]
impl InputGuardrail for FnInputGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(
        &self,
        ctx: &RunContext,
        _agent_name: &str,
        input: &RunInput,
    ) -> Result<GuardrailOutput<RunInput>, BatonError> {
        (self.check)(ctx.clone(), input.clone()).await
    }
}

#[async_trait]
impl OutputGuardrail for FnOutputGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(
        &self,
        ctx: &RunContext,
        _agent_name: &str,
        output: &MessageContent,
    ) -> Result<GuardrailOutput<MessageContent>, BatonError> {
        (self.check)(ctx.clone(), output.clone()).await
    }
}

#[async_trait]
impl ToolGuardrail for FnToolGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(
        &self,
        ctx: &RunContext,
        call: &ToolCallRequest,
        output: &serde_json::Value,
    ) -> Result<ToolGuardrailAction, BatonError> {
        (self.check)(ctx.clone(), call.clone(), output.clone()).await
    }
}
