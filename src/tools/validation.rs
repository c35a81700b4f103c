//! Validate JSON values against the subset of JSON Schema the engine uses.
//!
//! Covers `type`, `required`, `properties`, `additionalProperties: false`,
//! `enum` and array `items`, recursively. Used for tool arguments before
//! invocation and for structured final output.

use serde_json::Value;

/// Validate tool arguments against a JSON Schema.
///
/// Returns `Err(message)` describing the first violation found.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), String> {
    validate_at(&Path::Root, args, schema)
}

enum Path<'a> {
    Root,
    Field(&'a Path<'a>, &'a str),
    Index(&'a Path<'a>, usize),
}

impl Path<'_> {
    fn render(&self) -> String {
        match self {
            Path::Root => String::new(),
            Path::Field(parent, name) => match parent.render() {
                p if p.is_empty() => name.to_string(),
                p => format!("{p}.{name}"),
            },
            Path::Index(parent, i) => format!("{}[{i}]", parent.render()),
        }
    }

    fn describe(&self) -> String {
        match self {
            Path::Root => "arguments".to_string(),
            other => format!("field '{}'", other.render()),
        }
    }
}

fn validate_at(path: &Path<'_>, value: &Value, schema: &Value) -> Result<(), String> {
    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !value_matches_type(value, expected) {
            return Err(format!(
                "{}: expected type '{}', got {}",
                path.describe(),
                expected,
                json_type_name(value)
            ));
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return Err(format!("{}: value {} is not allowed", path.describe(), value));
        }
    }

    if let Some(obj) = value.as_object() {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if !obj.contains_key(name) {
                    return Err(format!(
                        "missing required field '{}'",
                        Path::Field(path, name).render()
                    ));
                }
            }
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));
        for (key, field) in obj {
            match properties.and_then(|p| p.get(key)) {
                Some(field_schema) => validate_at(&Path::Field(path, key), field, field_schema)?,
                None if closed => {
                    return Err(format!(
                        "unexpected field '{}'",
                        Path::Field(path, key).render()
                    ));
                }
                None => {}
            }
        }
    }

    if let (Some(items), Some(elements)) = (schema.get("items"), value.as_array()) {
        for (i, element) in elements.iter().enumerate() {
            validate_at(&Path::Index(path, i), element, items)?;
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
