//! Typed access to tool call arguments.

use crate::error::BatonError;

/// Wrapper around tool call arguments providing typed extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Get the raw JSON value. `Null` when the model's arguments did not parse.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.value
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, BatonError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| missing("string", key))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, BatonError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| missing("integer", key))
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, BatonError> {
        self.value
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| missing("number", key))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, BatonError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| missing("boolean", key))
    }

    pub fn get_array(&self, key: &str) -> Result<&Vec<serde_json::Value>, BatonError> {
        self.value
            .get(key)
            .and_then(|v| v.as_array())
            .ok_or_else(|| missing("array", key))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, BatonError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            BatonError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}

impl From<serde_json::Value> for ToolArguments {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}

fn missing(kind: &str, key: &str) -> BatonError {
    BatonError::InvalidArgument(format!("Missing {kind} argument: {key}"))
}

/// Decode model-supplied arguments.
///
/// A JSON string is treated as a serialized blob and parsed; an empty blob
/// means "no arguments". Anything unparseable becomes `Null` rather than an
/// error so the invoker can report it to the model.
pub fn parse_raw_arguments(raw: serde_json::Value) -> serde_json::Value {
    match raw {
        serde_json::Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(trimmed).unwrap_or(serde_json::Value::Null)
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn serialized_blob_is_parsed() {
        assert_eq!(
            parse_raw_arguments(json!(r#"{"city": "Oslo"}"#)),
            json!({"city": "Oslo"})
        );
        assert_eq!(parse_raw_arguments(json!("  ")), json!({}));
    }

    #[test]
    fn malformed_blob_becomes_null() {
        assert_eq!(parse_raw_arguments(json!("{city: Oslo")), serde_json::Value::Null);
    }

    #[test]
    fn typed_accessors() {
        #[derive(Deserialize)]
        struct Args {
            a: i64,
            b: i64,
        }

        let args = ToolArguments::new(json!({"a": 2, "b": 3, "name": "x"}));
        assert_eq!(args.get_i64("a").unwrap(), 2);
        assert_eq!(args.get_str("name").unwrap(), "x");
        assert!(args.get_bool("a").is_err());
        let typed: Args = args.deserialize().unwrap();
        assert_eq!(typed.a + typed.b, 5);
    }
}
