//! Model backend contract and implementations.

#[cfg(feature = "http")]
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BatonError;
use crate::types::{ConversationItem, HostedTool, MessageItem, ModelSettings, OutputSchema, Usage};

/// Tool definition sent to the backend. Handoffs are rendered the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A request sent to a model backend for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub input: Vec<ConversationItem>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub settings: ModelSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<OutputSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
}

impl ModelRequest {
    /// Names of all tools offered to the model this turn.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

/// One raw output element of a model response.
///
/// The set of shapes is closed; anything the engine does not recognize is
/// kept verbatim in [`RawOutput::Unknown`] and degrades to a text message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawOutput {
    Text {
        text: String,
    },
    Message(MessageItem),
    FunctionCall {
        call_id: String,
        name: String,
        /// Either a JSON value or a serialized-text blob.
        #[serde(default)]
        arguments: serde_json::Value,
    },
    HostedToolCall {
        call_id: String,
        tool: HostedTool,
        #[serde(default)]
        arguments: serde_json::Value,
        /// Present when the vendor already executed the call.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<serde_json::Value>,
    },
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

impl RawOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn function_call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<serde_json::Value>,
    ) -> Self {
        Self::FunctionCall {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Response from a model backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default)]
    pub usage: Usage,
    #[serde(default)]
    pub output: Vec<RawOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

impl ModelResponse {
    pub fn new(output: Vec<RawOutput>, usage: Usage) -> Self {
        Self {
            usage,
            output,
            response_id: None,
        }
    }

    pub fn with_response_id(mut self, id: impl Into<String>) -> Self {
        self.response_id = Some(id.into());
        self
    }
}

/// Core trait implemented by all model backends.
///
/// Errors returned here are fatal to the run; the engine does not retry.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Backend name used in logs (e.g. "http").
    fn provider_name(&self) -> &str;

    /// Produce one response for one turn.
    async fn respond(&self, request: &ModelRequest) -> Result<ModelResponse, BatonError>;
}
