//! Conversation items: the closed set of entities a run accumulates.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Message content: plain text, or structured output when the agent declares
/// an output schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(serde_json::Value),
}

impl MessageContent {
    /// Text view of the content; structured values are rendered as JSON.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => value.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }

    pub fn into_value(self) -> serde_json::Value {
        match self {
            Self::Text(text) => serde_json::Value::String(text),
            Self::Structured(value) => value,
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for MessageContent {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Self::Text(text),
            other => Self::Structured(other),
        }
    }
}

/// Body shared by input and output messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageItem {
    pub role: Role,
    pub content: MessageContent,
}

/// Capabilities executed on the model vendor's side. Each maps to a fixed
/// tool name in the conversation.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HostedTool {
    WebSearch,
    FileSearch,
    CodeInterpreter,
    ComputerUse,
    ImageGeneration,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    /// Unique within a run; correlates to exactly one result.
    pub id: String,
    pub tool_name: String,
    /// Parsed arguments. `Null` when the model sent unparseable text.
    pub parameters: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted: Option<HostedTool>,
}

/// Outcome of a tool call. Exactly one of result or error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Result(serde_json::Value),
    Error(String),
}

/// The result of one tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResult {
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
}

impl ToolCallResult {
    pub fn success(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: serde_json::Value,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Result(result),
        }
    }

    pub fn error(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Error(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Error(_))
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            ToolOutcome::Result(value) => Some(value),
            ToolOutcome::Error(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Result(_) => None,
            ToolOutcome::Error(message) => Some(message),
        }
    }
}

/// Records a transfer of control between agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HandoffRecord {
    pub from_agent: String,
    pub to_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A tool call that cannot run until the caller approves or rejects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApprovalRequest {
    pub tool_name: String,
    pub tool_call_id: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// A single entry in a run's append-only history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationItem {
    MessageInput(MessageItem),
    MessageOutput(MessageItem),
    ToolCallRequest(ToolCallRequest),
    ToolCallResult(ToolCallResult),
    HandoffRecord(HandoffRecord),
    ApprovalRequest(ApprovalRequest),
}

/// Discriminator of a [`ConversationItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ItemKind {
    MessageInput,
    MessageOutput,
    ToolCallRequest,
    ToolCallResult,
    HandoffRecord,
    ApprovalRequest,
}

impl ConversationItem {
    pub fn user(text: impl Into<String>) -> Self {
        Self::MessageInput(MessageItem {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        })
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::MessageInput(MessageItem {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        })
    }

    /// Assistant output message.
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::MessageOutput(MessageItem {
            role: Role::Assistant,
            content: content.into(),
        })
    }

    pub fn tool_call(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self::ToolCallRequest(ToolCallRequest {
            id: id.into(),
            tool_name: tool_name.into(),
            parameters,
            hosted: None,
        })
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Self::MessageInput(_) => ItemKind::MessageInput,
            Self::MessageOutput(_) => ItemKind::MessageOutput,
            Self::ToolCallRequest(_) => ItemKind::ToolCallRequest,
            Self::ToolCallResult(_) => ItemKind::ToolCallResult,
            Self::HandoffRecord(_) => ItemKind::HandoffRecord,
            Self::ApprovalRequest(_) => ItemKind::ApprovalRequest,
        }
    }

    /// Content of an output message.
    pub fn output_content(&self) -> Option<&MessageContent> {
        match self {
            Self::MessageOutput(message) => Some(&message.content),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCallRequest> {
        match self {
            Self::ToolCallRequest(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolCallResult> {
        match self {
            Self::ToolCallResult(result) => Some(result),
            _ => None,
        }
    }

    /// Whether the item is part of what the model is sent on later turns.
    pub(crate) fn is_model_input(&self) -> bool {
        !matches!(self, Self::MessageOutput(_) | Self::ApprovalRequest(_))
    }
}

impl From<ToolCallResult> for ConversationItem {
    fn from(result: ToolCallResult) -> Self {
        Self::ToolCallResult(result)
    }
}

impl From<ToolCallRequest> for ConversationItem {
    fn from(call: ToolCallRequest) -> Self {
        Self::ToolCallRequest(call)
    }
}

impl From<HandoffRecord> for ConversationItem {
    fn from(record: HandoffRecord) -> Self {
        Self::HandoffRecord(record)
    }
}

impl From<ApprovalRequest> for ConversationItem {
    fn from(request: ApprovalRequest) -> Self {
        Self::ApprovalRequest(request)
    }
}

/// What the caller hands to a run: a single user message or prepared items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RunInput {
    Text(String),
    Items(Vec<ConversationItem>),
}

impl RunInput {
    pub fn into_items(self) -> Vec<ConversationItem> {
        match self {
            Self::Text(text) => vec![ConversationItem::user(text)],
            Self::Items(items) => items,
        }
    }

    /// Concatenated text of all input messages.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Items(items) => items
                .iter()
                .filter_map(|item| match item {
                    ConversationItem::MessageInput(message) => Some(message.content.as_text()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<&str> for RunInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RunInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<ConversationItem>> for RunInput {
    fn from(items: Vec<ConversationItem>) -> Self {
        Self::Items(items)
    }
}
