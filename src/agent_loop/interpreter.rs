//! Turning raw model output into conversation items.

use uuid::Uuid;

use crate::error::BatonError;
use crate::provider::RawOutput;
use crate::tools::arguments::parse_raw_arguments;
use crate::tools::validation::validate_arguments;
use crate::types::{
    ConversationItem, MessageContent, MessageItem, OutputSchema, Role, ToolCallRequest,
    ToolCallResult,
};

/// Convert one response's raw output into items, in source order.
///
/// Never fails: unparseable arguments become `Null` parameters and
/// unrecognized shapes become output messages holding the raw value.
pub fn parse_response_items(output: &[RawOutput]) -> Vec<ConversationItem> {
    let mut items = Vec::with_capacity(output.len());
    for raw in output {
        match raw {
            RawOutput::Text { text } => items.push(ConversationItem::assistant(text.as_str())),
            RawOutput::Message(message) => {
                items.push(ConversationItem::MessageOutput(message.clone()))
            }
            RawOutput::FunctionCall {
                call_id,
                name,
                arguments,
            } => items.push(ConversationItem::ToolCallRequest(ToolCallRequest {
                id: call_id_or_new(call_id),
                tool_name: name.clone(),
                parameters: parse_raw_arguments(arguments.clone()),
                hosted: None,
            })),
            RawOutput::HostedToolCall {
                call_id,
                tool,
                arguments,
                output,
            } => {
                let request = ToolCallRequest {
                    id: call_id_or_new(call_id),
                    tool_name: tool.to_string(),
                    parameters: parse_raw_arguments(arguments.clone()),
                    hosted: Some(*tool),
                };
                let result = output.as_ref().map(|value| {
                    ToolCallResult::success(request.id.clone(), request.tool_name.clone(), value.clone())
                });
                items.push(ConversationItem::ToolCallRequest(request));
                if let Some(result) = result {
                    items.push(ConversationItem::ToolCallResult(result));
                }
            }
            RawOutput::Unknown(value) => {
                let content = match value {
                    serde_json::Value::String(text) => MessageContent::Text(text.clone()),
                    other => MessageContent::Structured(other.clone()),
                };
                items.push(ConversationItem::MessageOutput(MessageItem {
                    role: Role::Assistant,
                    content,
                }));
            }
        }
    }
    items
}

fn call_id_or_new(call_id: &str) -> String {
    if call_id.trim().is_empty() {
        format!("call_{}", Uuid::new_v4().simple())
    } else {
        call_id.to_string()
    }
}

/// Content of the last output message, scanning from the end.
pub fn extract_final_output(items: &[ConversationItem]) -> Option<MessageContent> {
    items
        .iter()
        .rev()
        .find_map(ConversationItem::output_content)
        .cloned()
}

/// Parse final text as JSON and check it against the declared schema.
pub fn parse_structured_output(
    content: MessageContent,
    schema: &OutputSchema,
) -> Result<MessageContent, BatonError> {
    let value = match content {
        MessageContent::Text(text) => serde_json::from_str(text.trim()).map_err(|e| {
            BatonError::ModelBehavior(format!(
                "invalid JSON for output schema '{}': {e}",
                schema.name
            ))
        })?,
        MessageContent::Structured(value) => value,
    };
    if schema.strict {
        validate_arguments(&value, &schema.schema).map_err(|e| {
            BatonError::ModelBehavior(format!(
                "output does not match schema '{}': {e}",
                schema.name
            ))
        })?;
    }
    Ok(MessageContent::Structured(value))
}
