//! Structural input contracts for capabilities
//!
//! A [`Schema`] validates raw JSON parameters (applying defaults and stripping
//! unknown keys) and describes itself as JSON Schema for `tools/list`.

use serde_json::{json, Map, Value};

use crate::envelope::FieldIssue;

/// Closed set of schema node kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Object(Vec<(String, Schema)>),
    String,
    Number { max: Option<f64> },
    /// Whole number, emitted as JSON Schema `integer`
    Integer { min: Option<i64>, max: Option<u64> },
    Boolean,
    Array(Box<Schema>),
    Enum(Vec<String>),
    Optional(Box<Schema>),
    Default(Box<Schema>, Value),
    Literal(Value),
    Described(Box<Schema>, String),
    /// Accepts any value; introspected as an opaque `object`
    Opaque,
}

impl Schema {
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Schema)>) -> Self {
        Schema::Object(fields.into_iter().map(|(k, s)| (k.into(), s)).collect())
    }

    pub fn string() -> Self {
        Schema::String
    }

    pub fn number() -> Self {
        Schema::Number { max: None }
    }

    pub fn number_max(max: f64) -> Self {
        Schema::Number { max: Some(max) }
    }

    pub fn integer() -> Self {
        Schema::Integer { min: None, max: None }
    }

    pub fn integer_range(min: i64, max: u64) -> Self {
        Schema::Integer {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Non-negative integer no larger than `max`
    pub fn uint(max: u64) -> Self {
        Self::integer_range(0, max)
    }

    pub fn boolean() -> Self {
        Schema::Boolean
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    pub fn enumeration(options: &[&str]) -> Self {
        Schema::Enum(options.iter().map(|o| o.to_string()).collect())
    }

    pub fn literal(value: Value) -> Self {
        Schema::Literal(value)
    }

    pub fn opaque() -> Self {
        Schema::Opaque
    }

    pub fn optional(self) -> Self {
        Schema::Optional(Box::new(self))
    }

    pub fn default_value(self, value: Value) -> Self {
        Schema::Default(Box::new(self), value)
    }

    pub fn describe(self, description: impl Into<String>) -> Self {
        Schema::Described(Box::new(self), description.into())
    }

    /// Whether a missing value is acceptable for this node
    pub fn is_optional(&self) -> bool {
        match self {
            Schema::Optional(_) | Schema::Default(_, _) => true,
            Schema::Described(inner, _) => inner.is_optional(),
            _ => false,
        }
    }

    /// Validate `value`, returning the normalized value or one issue per failed field
    pub fn validate(&self, value: &Value) -> Result<Value, Vec<FieldIssue>> {
        let mut issues = Vec::new();
        let mut path = Vec::new();
        let normalized = self.check(Some(value), &mut path, &mut issues);
        if issues.is_empty() {
            Ok(normalized.unwrap_or(Value::Null))
        } else {
            Err(issues)
        }
    }

    fn check(&self, value: Option<&Value>, path: &mut Vec<String>, issues: &mut Vec<FieldIssue>) -> Option<Value> {
        let value = match value {
            Some(Value::Null) | None => match self {
                Schema::Optional(_) => return None,
                Schema::Default(_, default) => return Some(default.clone()),
                Schema::Described(inner, _) => return inner.check(value, path, issues),
                Schema::Opaque if value.is_some() => return Some(Value::Null),
                _ => {
                    issues.push(FieldIssue::new(path.join("."), "Required"));
                    return None;
                }
            },
            Some(v) => v,
        };

        match self {
            Schema::Optional(inner) | Schema::Default(inner, _) | Schema::Described(inner, _) => {
                inner.check(Some(value), path, issues)
            }
            Schema::String => match value {
                Value::String(_) => Some(value.clone()),
                other => mismatch("string", other, path, issues),
            },
            Schema::Number { max } => match value.as_f64() {
                Some(n) => {
                    if let Some(max) = max {
                        if n > *max {
                            issues.push(FieldIssue::new(
                                path.join("."),
                                format!("Number must be less than or equal to {}", max),
                            ));
                            return None;
                        }
                    }
                    Some(value.clone())
                }
                None => mismatch("number", value, path, issues),
            },
            Schema::Integer { min, max } => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => {
                    if let (Some(min), Some(n)) = (min, n.as_i64()) {
                        if n < *min {
                            issues.push(FieldIssue::new(
                                path.join("."),
                                format!("Number must be greater than or equal to {}", min),
                            ));
                            return None;
                        }
                    }
                    if let (Some(max), Some(n)) = (max, n.as_u64()) {
                        if n > *max {
                            issues.push(FieldIssue::new(
                                path.join("."),
                                format!("Number must be less than or equal to {}", max),
                            ));
                            return None;
                        }
                    }
                    Some(value.clone())
                }
                Value::Number(_) => {
                    issues.push(FieldIssue::new(path.join("."), "Expected integer, received float"));
                    None
                }
                other => mismatch("integer", other, path, issues),
            },
            Schema::Boolean => match value {
                Value::Bool(_) => Some(value.clone()),
                other => mismatch("boolean", other, path, issues),
            },
            Schema::Array(items) => match value {
                Value::Array(elements) => {
                    let mut out = Vec::with_capacity(elements.len());
                    for (i, element) in elements.iter().enumerate() {
                        path.push(i.to_string());
                        if let Some(v) = items.check(Some(element), path, issues) {
                            out.push(v);
                        }
                        path.pop();
                    }
                    Some(Value::Array(out))
                }
                other => mismatch("array", other, path, issues),
            },
            Schema::Enum(options) => match value.as_str() {
                Some(s) if options.iter().any(|o| o == s) => Some(value.clone()),
                _ => {
                    let expected = options
                        .iter()
                        .map(|o| format!("'{}'", o))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    issues.push(FieldIssue::new(
                        path.join("."),
                        format!("Invalid enum value. Expected {}, received {}", expected, value),
                    ));
                    None
                }
            },
            Schema::Literal(expected) => {
                if value == expected {
                    Some(value.clone())
                } else {
                    issues.push(FieldIssue::new(
                        path.join("."),
                        format!("Invalid literal value, expected {}", expected),
                    ));
                    None
                }
            }
            Schema::Object(fields) => match value {
                Value::Object(map) => {
                    let mut out = Map::new();
                    for (name, field) in fields {
                        path.push(name.clone());
                        if let Some(v) = field.check(map.get(name), path, issues) {
                            out.insert(name.clone(), v);
                        }
                        path.pop();
                    }
                    Some(Value::Object(out))
                }
                other => mismatch("object", other, path, issues),
            },
            Schema::Opaque => Some(value.clone()),
        }
    }

    /// JSON-Schema-like description used for capability discovery
    pub fn to_json_schema(&self) -> Map<String, Value> {
        let value = match self {
            Schema::Object(fields) => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for (name, field) in fields {
                    properties.insert(name.clone(), Value::Object(field.to_json_schema()));
                    if !field.is_optional() {
                        required.push(Value::String(name.clone()));
                    }
                }
                let mut out = Map::new();
                out.insert("type".to_string(), json!("object"));
                out.insert("properties".to_string(), Value::Object(properties));
                if !required.is_empty() {
                    out.insert("required".to_string(), Value::Array(required));
                }
                return out;
            }
            Schema::String => json!({ "type": "string" }),
            Schema::Number { max: None } => json!({ "type": "number" }),
            Schema::Number { max: Some(max) } => json!({ "type": "number", "maximum": max }),
            Schema::Integer { min, max } => {
                let mut out = Map::new();
                out.insert("type".to_string(), json!("integer"));
                if let Some(min) = min {
                    out.insert("minimum".to_string(), json!(min));
                }
                if let Some(max) = max {
                    out.insert("maximum".to_string(), json!(max));
                }
                return out;
            }
            Schema::Boolean => json!({ "type": "boolean" }),
            Schema::Array(items) => json!({ "type": "array", "items": items.to_json_schema() }),
            Schema::Enum(options) => json!({ "type": "string", "enum": options }),
            Schema::Optional(inner) => return inner.to_json_schema(),
            Schema::Default(inner, default) => {
                let mut out = inner.to_json_schema();
                out.insert("default".to_string(), default.clone());
                return out;
            }
            Schema::Literal(value) => json!({ "type": json_type_name(value), "const": value }),
            Schema::Described(inner, description) => {
                let mut out = inner.to_json_schema();
                out.insert("description".to_string(), json!(description));
                return out;
            }
            Schema::Opaque => json!({ "type": "object" }),
        };

        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

fn mismatch(expected: &str, value: &Value, path: &[String], issues: &mut Vec<FieldIssue>) -> Option<Value> {
    issues.push(FieldIssue::new(
        path.join("."),
        format!("Expected {}, received {}", expected, json_type_name(value)),
    ));
    None
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
