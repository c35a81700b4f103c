//! Parameter schemas advertised to the model.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON Schema describing a tool's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    pub schema: Value,
}

impl ToolParameters {
    pub fn from_schema(schema: Value) -> Self {
        Self { schema }
    }

    /// Object schema with no properties.
    pub fn empty() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
        }
    }

    /// Start an object schema.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder::default()
    }
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builder for object parameter schemas.
#[derive(Debug, Default)]
pub struct ParameterBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    pub fn string(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.typed(name, "string", description, required)
    }

    pub fn number(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.typed(name, "number", description, required)
    }

    pub fn integer(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.typed(name, "integer", description, required)
    }

    pub fn boolean(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.typed(name, "boolean", description, required)
    }

    pub fn string_enum(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
        required: bool,
    ) -> Self {
        let schema = json!({
            "type": "string",
            "description": description.into(),
            "enum": values,
        });
        self.property(name, schema, required)
    }

    /// Array whose elements have the given JSON type.
    pub fn array(
        self,
        name: impl Into<String>,
        item_type: &str,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let schema = json!({
            "type": "array",
            "description": description.into(),
            "items": { "type": item_type },
        });
        self.property(name, schema, required)
    }

    /// Add a property with an arbitrary sub-schema.
    pub fn property(mut self, name: impl Into<String>, schema: Value, required: bool) -> Self {
        let name = name.into();
        if required && !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    fn typed(
        self,
        name: impl Into<String>,
        json_type: &str,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let schema = json!({
            "type": json_type,
            "description": description.into(),
        });
        self.property(name, schema, required)
    }

    pub fn build(self) -> ToolParameters {
        ToolParameters {
            schema: json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_collects_required_fields_once() {
        let params = ToolParameters::object()
            .string("city", "City name", true)
            .integer("days", "Forecast days", false)
            .array("tags", "string", "Labels", false)
            .property("city", json!({"type": "string"}), true)
            .build();

        assert_eq!(params.schema["required"], json!(["city"]));
        assert_eq!(params.schema["properties"]["days"]["type"], "integer");
        assert_eq!(params.schema["properties"]["tags"]["items"], json!({"type": "string"}));
    }
}
