//! Response schemas sent to the remote service.
//!
//! A [`SchemaSpec`] constrains the JSON the model is allowed to return. It
//! serializes directly into the `responseSchema` wire shape:
//! `{type, properties, items, required, description}` with upper-case type
//! names.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from schema validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("required field '{field}' is not declared in properties at {path}")]
    UndeclaredRequired { path: String, field: String },

    #[error("required field '{field}' is listed twice at {path}")]
    DuplicateRequired { path: String, field: String },
}

/// Typed description of a structured response.
///
/// Properties live in a `BTreeMap` so the serialized schema is identical
/// across runs. `required` keeps declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum SchemaSpec {
    Object {
        #[serde(default)]
        properties: BTreeMap<String, SchemaSpec>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        required: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Array {
        items: Box<SchemaSpec>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Boolean {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl SchemaSpec {
    /// An object with no properties yet.
    pub fn object() -> Self {
        SchemaSpec::Object {
            properties: BTreeMap::new(),
            required: Vec::new(),
            description: None,
        }
    }

    /// A string leaf.
    pub fn string(description: impl Into<String>) -> Self {
        SchemaSpec::String {
            description: Some(description.into()),
        }
    }

    /// An array whose elements follow `items`.
    pub fn array(items: SchemaSpec) -> Self {
        SchemaSpec::Array {
            items: Box::new(items),
            description: None,
        }
    }

    /// Attach or replace the description.
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        match &mut self {
            SchemaSpec::Object { description, .. }
            | SchemaSpec::Array { description, .. }
            | SchemaSpec::String { description }
            | SchemaSpec::Number { description }
            | SchemaSpec::Integer { description }
            | SchemaSpec::Boolean { description } => *description = text,
        }
        self
    }

    /// Declare a mandatory property. Has no effect on non-object schemas.
    pub fn field(self, name: impl Into<String>, spec: SchemaSpec) -> Self {
        self.insert_property(name.into(), spec, true)
    }

    /// Declare an optional property. Has no effect on non-object schemas.
    pub fn optional_field(self, name: impl Into<String>, spec: SchemaSpec) -> Self {
        self.insert_property(name.into(), spec, false)
    }

    fn insert_property(mut self, name: String, spec: SchemaSpec, mandatory: bool) -> Self {
        if let SchemaSpec::Object {
            properties,
            required,
            ..
        } = &mut self
        {
            if mandatory && !required.contains(&name) {
                required.push(name.clone());
            }
            properties.insert(name, spec);
        }
        self
    }

    /// Wire name of this node's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            SchemaSpec::Object { .. } => "OBJECT",
            SchemaSpec::Array { .. } => "ARRAY",
            SchemaSpec::String { .. } => "STRING",
            SchemaSpec::Number { .. } => "NUMBER",
            SchemaSpec::Integer { .. } => "INTEGER",
            SchemaSpec::Boolean { .. } => "BOOLEAN",
        }
    }

    /// Names of mandatory properties (empty for non-objects).
    pub fn required_fields(&self) -> &[String] {
        match self {
            SchemaSpec::Object { required, .. } => required,
            _ => &[],
        }
    }

    /// Check that every `required` name is a declared property, recursively.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.validate_at("$")
    }

    fn validate_at(&self, path: &str) -> Result<(), SchemaError> {
        match self {
            SchemaSpec::Object {
                properties,
                required,
                ..
            } => {
                for (index, field) in required.iter().enumerate() {
                    if !properties.contains_key(field) {
                        return Err(SchemaError::UndeclaredRequired {
                            path: path.to_string(),
                            field: field.clone(),
                        });
                    }
                    if required[..index].contains(field) {
                        return Err(SchemaError::DuplicateRequired {
                            path: path.to_string(),
                            field: field.clone(),
                        });
                    }
                }
                for (name, child) in properties {
                    child.validate_at(&format!("{}.{}", path, name))?;
                }
                Ok(())
            }
            SchemaSpec::Array { items, .. } => items.validate_at(&format!("{}[]", path)),
            _ => Ok(()),
        }
    }

    /// The schema-shaped empty record.
    ///
    /// Objects carry every declared property at its empty value, arrays are
    /// `[]`, strings `""`, numbers `0` and booleans `false`.
    pub fn empty_instance(&self) -> Value {
        match self {
            SchemaSpec::Object { properties, .. } => {
                let map: Map<String, Value> = properties
                    .iter()
                    .map(|(name, spec)| (name.clone(), spec.empty_instance()))
                    .collect();
                Value::Object(map)
            }
            SchemaSpec::Array { .. } => Value::Array(Vec::new()),
            SchemaSpec::String { .. } => Value::String(String::new()),
            SchemaSpec::Number { .. } | SchemaSpec::Integer { .. } => Value::from(0),
            SchemaSpec::Boolean { .. } => Value::Bool(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy_schema() -> SchemaSpec {
        SchemaSpec::object()
            .field("policy_summary", SchemaSpec::string("One sentence"))
            .field("hardened_kubernetes_yaml", SchemaSpec::string("Deployment YAML"))
    }

    #[test]
    fn test_object_serializes_to_wire_shape() {
        let value = serde_json::to_value(policy_schema()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "OBJECT",
                "properties": {
                    "hardened_kubernetes_yaml": {"type": "STRING", "description": "Deployment YAML"},
                    "policy_summary": {"type": "STRING", "description": "One sentence"}
                },
                "required": ["policy_summary", "hardened_kubernetes_yaml"]
            })
        );
    }

    #[test]
    fn test_array_serializes_items() {
        let schema = SchemaSpec::array(SchemaSpec::string("finding")).with_description("all findings");
        let value = serde_json::to_value(schema).unwrap();
        assert_eq!(value["type"], "ARRAY");
        assert_eq!(value["items"]["type"], "STRING");
        assert_eq!(value["description"], "all findings");
    }

    #[test]
    fn test_wire_shape_deserializes_back() {
        let raw = json!({
            "type": "OBJECT",
            "properties": {"n": {"type": "INTEGER"}},
            "required": ["n"]
        });
        let schema: SchemaSpec = serde_json::from_value(raw).unwrap();
        assert_eq!(schema.required_fields(), ["n".to_string()]);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_undeclared_required() {
        let schema = SchemaSpec::Object {
            properties: BTreeMap::new(),
            required: vec!["summary".to_string()],
            description: None,
        };
        assert_eq!(
            schema.validate(),
            Err(SchemaError::UndeclaredRequired {
                path: "$".to_string(),
                field: "summary".to_string()
            })
        );
    }

    #[test]
    fn test_validate_reports_nested_path() {
        let inner = SchemaSpec::Object {
            properties: BTreeMap::new(),
            required: vec!["severity".to_string()],
            description: None,
        };
        let schema = SchemaSpec::object().field("findings", SchemaSpec::array(inner));
        match schema.validate() {
            Err(SchemaError::UndeclaredRequired { path, field }) => {
                assert_eq!(path, "$.findings[]");
                assert_eq!(field, "severity");
            }
            other => panic!("Expected UndeclaredRequired, got {:?}", other),
        }
    }

    #[test]
    fn test_field_does_not_duplicate_required() {
        let schema = SchemaSpec::object()
            .field("a", SchemaSpec::string("first"))
            .field("a", SchemaSpec::string("second"));
        assert_eq!(schema.required_fields().len(), 1);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_optional_field_not_required() {
        let schema = SchemaSpec::object()
            .field("a", SchemaSpec::string("a"))
            .optional_field("b", SchemaSpec::Boolean { description: None });
        assert_eq!(schema.required_fields(), ["a".to_string()]);
    }

    #[test]
    fn test_empty_instance_is_schema_shaped() {
        let schema = SchemaSpec::object()
            .field("summary", SchemaSpec::string("s"))
            .field("count", SchemaSpec::Integer { description: None })
            .field("ratio", SchemaSpec::Number { description: None })
            .field("ok", SchemaSpec::Boolean { description: None })
            .field("items", SchemaSpec::array(SchemaSpec::string("i")));
        assert_eq!(
            schema.empty_instance(),
            json!({"summary": "", "count": 0, "ratio": 0, "ok": false, "items": []})
        );
    }
}
