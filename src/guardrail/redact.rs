//! Regex-based guardrails.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::{GuardrailOutput, InputGuardrail, OutputGuardrail, ToolGuardrail, ToolGuardrailAction};
use crate::context::RunContext;
use crate::error::BatonError;
use crate::types::{MessageContent, RunInput, ToolCallRequest};

/// Replaces every match in the string leaves of a tool output.
#[derive(Debug, Clone)]
pub struct RegexRedactor {
    name: String,
    pattern: Regex,
    replacement: String,
}

impl RegexRedactor {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, BatonError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| BatonError::Configuration(format!("invalid redaction pattern: {e}")))?;
        Ok(Self {
            name: name.into(),
            pattern,
            replacement: "[REDACTED]".to_string(),
        })
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = replacement.into();
        self
    }

    /// Returns `None` when nothing matched.
    pub fn redact(&self, value: &Value) -> Option<Value> {
        match value {
            Value::String(text) if self.pattern.is_match(text) => Some(Value::String(
                self.pattern
                    .replace_all(text, self.replacement.as_str())
                    .into_owned(),
            )),
            Value::Array(items) => {
                let redacted: Vec<Option<Value>> = items.iter().map(|v| self.redact(v)).collect();
                if redacted.iter().all(Option::is_none) {
                    return None;
                }
                Some(Value::Array(
                    redacted
                        .into_iter()
                        .zip(items)
                        .map(|(new, old)| new.unwrap_or_else(|| old.clone()))
                        .collect(),
                ))
            }
            Value::Object(map) => {
                let mut changed = false;
                let out = map
                    .iter()
                    .map(|(k, v)| {
                        let next = match self.redact(v) {
                            Some(new) => {
                                changed = true;
                                new
                            }
                            None => v.clone(),
                        };
                        (k.clone(), next)
                    })
                    .collect();
                changed.then_some(Value::Object(out))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl ToolGuardrail for RegexRedactor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(
        &self,
        _ctx: &RunContext,
        _call: &ToolCallRequest,
        output: &Value,
    ) -> Result<ToolGuardrailAction, BatonError> {
        Ok(match self.redact(output) {
            Some(redacted) => ToolGuardrailAction::Replace(redacted),
            None => ToolGuardrailAction::Allow,
        })
    }
}

/// Trips when the checked text matches a pattern.
#[derive(Debug, Clone)]
pub struct PatternTripwire {
    name: String,
    pattern: Regex,
}

impl PatternTripwire {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, BatonError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| BatonError::Configuration(format!("invalid tripwire pattern: {e}")))?;
        Ok(Self {
            name: name.into(),
            pattern,
        })
    }

    fn verdict<T>(&self, text: &str) -> GuardrailOutput<T> {
        match self.pattern.find(text) {
            Some(m) => GuardrailOutput::tripwire(format!("matched '{}'", m.as_str())),
            None => GuardrailOutput::safe(),
        }
    }
}

#[async_trait]
impl InputGuardrail for PatternTripwire {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(
        &self,
        _ctx: &RunContext,
        _agent_name: &str,
        input: &RunInput,
    ) -> Result<GuardrailOutput<RunInput>, BatonError> {
        Ok(self.verdict(&input.text()))
    }
}

#[async_trait]
impl OutputGuardrail for PatternTripwire {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(
        &self,
        _ctx: &RunContext,
        _agent_name: &str,
        output: &MessageContent,
    ) -> Result<GuardrailOutput<MessageContent>, BatonError> {
        Ok(self.verdict(&output.as_text()))
    }
}
