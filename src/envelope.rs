//! Result envelope: the `{ success, data | error }` contract every response collapses into

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{codes, CapabilityError, ErrorCategory};

/// One failed input field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// Dotted path to the field (e.g. "pllConfig.m")
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Structured error body of a failed envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub category: ErrorCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldIssue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>, category: ErrorCategory) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            category,
            details: None,
            suggestions: None,
        }
    }

    pub fn with_details(mut self, details: Vec<FieldIssue>) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = Some(suggestions);
        self
    }
}

impl From<&CapabilityError> for ErrorBody {
    fn from(err: &CapabilityError) -> Self {
        match err {
            CapabilityError::InvalidInput(issues) => {
                ErrorBody::new(err.code(), err.to_string(), err.category()).with_details(issues.clone())
            }
            _ => ErrorBody::new(err.code(), err.to_string(), err.category()),
        }
    }
}

/// Uniform response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ResultEnvelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Domain-level soft failure: the payload is passed through but the call is marked failed
    pub fn soft_failure(data: Value) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: ErrorBody) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn invalid_input(details: Vec<FieldIssue>) -> Self {
        Self::failure(
            ErrorBody::new(codes::INVALID_INPUT, "Invalid input parameters", ErrorCategory::Validation)
                .with_details(details),
        )
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            json!({
                "success": false,
                "error": {
                    "code": codes::INTERNAL_ERROR,
                    "message": format!("Serialization error: {}", e),
                    "category": "internal",
                }
            })
        })
    }
}

impl From<CapabilityError> for ResultEnvelope {
    fn from(err: CapabilityError) -> Self {
        ResultEnvelope::failure(ErrorBody::from(&err))
    }
}

/// True when a JSON value structurally carries `success: false`
pub fn is_soft_failure(value: &Value) -> bool {
    matches!(value.get("success"), Some(Value::Bool(false)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_wire_shape() {
        let envelope = ResultEnvelope::failure(
            ErrorBody::new("unknown-capability", "Unknown tool: x", ErrorCategory::Validation)
                .with_suggestions(vec!["a".to_string()]),
        );
        let value = envelope.to_value();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "unknown-capability");
        assert_eq!(value["error"]["category"], "validation");
        assert_eq!(value["error"]["suggestions"][0], "a");
        assert!(value["error"].get("details").is_none());
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_invalid_input_envelope_has_details() {
        let value = ResultEnvelope::invalid_input(vec![FieldIssue::new("message", "Required")]).to_value();
        assert_eq!(value["error"]["code"], "invalid-input");
        assert_eq!(value["error"]["details"][0]["path"], "message");
    }

    #[test]
    fn test_is_soft_failure() {
        assert!(is_soft_failure(&json!({"success": false, "output": ""})));
        assert!(!is_soft_failure(&json!({"success": true})));
        assert!(!is_soft_failure(&json!({"success": "false"})));
        assert!(!is_soft_failure(&json!("text")));
    }

    #[test]
    fn test_envelope_round_trips_through_json() {
        let envelope = ResultEnvelope::ok(json!({"message": "hi"}));
        let text = serde_json::to_string(&envelope).unwrap();
        let parsed: ResultEnvelope = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, envelope);
    }
}
