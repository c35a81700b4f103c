//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::arguments::ToolArguments;
use super::types::ToolParameters;
use crate::context::RunContext;
use crate::error::BatonError;
use crate::provider::ToolDefinition;

/// Context available during tool execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub run: RunContext,
    pub tool_call_id: String,
    pub tool_name: String,
    pub agent_name: String,
    /// Cancelled when the call times out or the run is abandoned.
    pub cancel: CancellationToken,
}

/// Core tool trait. Implement to expose a capability to agents.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema parameters.
    fn parameters(&self) -> &ToolParameters;

    /// Disabled tools are neither advertised nor invocable.
    fn is_enabled(&self, _ctx: &RunContext) -> bool {
        true
    }

    /// Whether this call must be approved by the caller before it runs.
    async fn needs_approval(&self, _ctx: &RunContext, _args: &ToolArguments) -> bool {
        false
    }

    /// Execute the tool with validated arguments.
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, BatonError>;

    /// Message shown to the model when `execute` fails. `None` falls back to
    /// the error's own message.
    fn format_error(&self, _ctx: &RunContext, _error: &BatonError) -> Option<String> {
        None
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().schema.clone(),
        }
    }
}

type ToolHandler = dyn Fn(
        ToolArguments,
        ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, BatonError>> + Send>>
    + Send
    + Sync;

type ApprovalPredicate = dyn Fn(&RunContext, &ToolArguments) -> bool + Send + Sync;
type EnabledPredicate = dyn Fn(&RunContext) -> bool + Send + Sync;
type ErrorFormatter = dyn Fn(&RunContext, &BatonError) -> String + Send + Sync;

/// Closure-based tool for quick tool creation.
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Arc<ToolHandler>,
    needs_approval: Option<Arc<ApprovalPredicate>>,
    enabled: Option<Arc<EnabledPredicate>>,
    error_formatter: Option<Arc<ErrorFormatter>>,
}

impl FunctionTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, BatonError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
            needs_approval: None,
            enabled: None,
            error_formatter: None,
        }
    }

    /// Require approval for every call.
    pub fn with_approval(self) -> Self {
        self.with_approval_predicate(|_, _| true)
    }

    pub fn with_approval_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RunContext, &ToolArguments) -> bool + Send + Sync + 'static,
    {
        self.needs_approval = Some(Arc::new(predicate));
        self
    }

    pub fn with_enabled(self, enabled: bool) -> Self {
        self.with_enabled_predicate(move |_| enabled)
    }

    pub fn with_enabled_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RunContext) -> bool + Send + Sync + 'static,
    {
        self.enabled = Some(Arc::new(predicate));
        self
    }

    pub fn with_error_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&RunContext, &BatonError) -> String + Send + Sync + 'static,
    {
        self.error_formatter = Some(Arc::new(formatter));
        self
    }

    pub fn into_arc(self) -> Arc<dyn Tool> {
        Arc::new(self)
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    fn is_enabled(&self, ctx: &RunContext) -> bool {
        self.enabled.as_ref().map_or(true, |f| f(ctx))
    }

    async fn needs_approval(&self, ctx: &RunContext, args: &ToolArguments) -> bool {
        self.needs_approval.as_ref().is_some_and(|f| f(ctx, args))
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<serde_json::Value, BatonError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }

    fn format_error(&self, ctx: &RunContext, error: &BatonError) -> Option<String> {
        self.error_formatter.as_ref().map(|f| f(ctx, error))
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("needs_approval", &self.needs_approval.is_some())
            .finish()
    }
}
