//! Capability contract shared by tools and agents
//!
//! Concrete capabilities only supply static metadata and `execute`; the
//! validate → execute → format sequence lives once in [`handle`].

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use serde_path_to_error::Segment;
use tracing::{debug, warn};

use crate::context::ExecutionContext;
use crate::envelope::{is_soft_failure, FieldIssue, ResultEnvelope};
use crate::error::CapabilityError;
use crate::schema::Schema;

/// Grouping tag for capabilities. Not used for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Build,
    Deploy,
    Codegen,
    AiMl,
    Analysis,
    Debug,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Build,
        Category::Deploy,
        Category::Codegen,
        Category::AiMl,
        Category::Analysis,
        Category::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Build => "build",
            Category::Deploy => "deploy",
            Category::Codegen => "codegen",
            Category::AiMl => "ai-ml",
            Category::Analysis => "analysis",
            Category::Debug => "debug",
        }
    }
}

/// A named, independently invocable unit of work
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn category(&self) -> Category;

    /// Structural contract for accepted parameters
    fn input_schema(&self) -> Schema;

    /// Run with parameters that already passed `input_schema` validation
    async fn execute(&self, params: Value, ctx: &ExecutionContext) -> Result<Value, CapabilityError>;

    /// JSON-Schema-like description of the input contract
    fn json_schema(&self) -> Map<String, Value> {
        self.input_schema().to_json_schema()
    }
}

/// Validate, execute and wrap a capability call into a result envelope.
/// Never fails: every outcome becomes exactly one envelope.
pub async fn invoke<C: Capability + ?Sized>(
    capability: &C,
    raw_params: Value,
    ctx: &ExecutionContext,
) -> ResultEnvelope {
    let params = match capability.input_schema().validate(&raw_params) {
        Ok(params) => params,
        Err(issues) => {
            debug!("Input validation failed for '{}': {} issue(s)", capability.name(), issues.len());
            return ResultEnvelope::invalid_input(issues);
        }
    };

    match capability.execute(params, ctx).await {
        Ok(result) if is_soft_failure(&result) => ResultEnvelope::soft_failure(result),
        Ok(result) => ResultEnvelope::ok(result),
        Err(err) => {
            warn!("Capability '{}' failed: {}", capability.name(), err);
            ResultEnvelope::from(err)
        }
    }
}

/// Run a capability and format its envelope as a single text content item
pub async fn handle<C: Capability + ?Sized>(
    capability: &C,
    raw_params: Value,
    ctx: &ExecutionContext,
) -> CallToolResult {
    format_envelope(&invoke(capability, raw_params, ctx).await)
}

/// Envelope as MCP tool output, flagged as an error when `success` is false
pub fn format_envelope(envelope: &ResultEnvelope) -> CallToolResult {
    format_value(&envelope.to_value())
}

pub fn format_value(value: &Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    if is_soft_failure(value) {
        CallToolResult::error(vec![Content::text(text)])
    } else {
        CallToolResult::success(vec![Content::text(text)])
    }
}

/// Recover a plain value from formatted tool output: parsed JSON when possible,
/// raw text otherwise, `{ "success": true }` when there is no content
pub fn unwrap_content(result: &CallToolResult) -> Value {
    match result.content.first().and_then(|c| c.as_text()) {
        Some(text) => serde_json::from_str(&text.text).unwrap_or_else(|_| Value::String(text.text.clone())),
        None => json!({ "success": true }),
    }
}

/// Deserialize validated parameters into a typed argument struct.
/// Failures keep the dotted path of the offending field.
pub fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, CapabilityError> {
    serde_path_to_error::deserialize(params).map_err(|e| {
        let path = e
            .path()
            .iter()
            .map(|segment| match segment {
                Segment::Map { key } => key.clone(),
                Segment::Seq { index } => index.to_string(),
                Segment::Enum { variant } => variant.clone(),
                _ => "?".to_string(),
            })
            .collect::<Vec<_>>()
            .join(".");
        CapabilityError::InvalidInput(vec![FieldIssue::new(path, e.inner().to_string())])
    })
}

/// Serialize a typed domain result
pub fn to_result<T: Serialize>(result: &T) -> Result<Value, CapabilityError> {
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Echo capability with a probe flag recording whether `execute` ran
    pub struct EchoCapability {
        pub name: String,
        pub category: Category,
        pub executed: Arc<AtomicBool>,
    }

    impl EchoCapability {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                category: Category::Analysis,
                executed: Arc::new(AtomicBool::new(false)),
            }
        }

        pub fn ran(&self) -> bool {
            self.executed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Capability for EchoCapability {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            "Echo the message back"
        }

        fn category(&self) -> Category {
            self.category
        }

        fn input_schema(&self) -> Schema {
            Schema::object([("message", Schema::string())])
        }

        async fn execute(&self, params: Value, _ctx: &ExecutionContext) -> Result<Value, CapabilityError> {
            self.executed.store(true, Ordering::SeqCst);
            match params["message"].as_str() {
                Some("fail") => Ok(json!({ "success": false, "reason": "asked to fail" })),
                Some("boom") => Err(CapabilityError::InternalError("exploded".to_string())),
                Some("bad") => Err(CapabilityError::InvalidArgument("message may not be 'bad'".to_string())),
                Some(message) => Ok(json!({ "success": true, "echo": message })),
                None => Ok(json!({ "success": true })),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::EchoCapability;
    use super::*;
    use crate::context::ServerContext;

    fn extract_json(result: &CallToolResult) -> Value {
        let text = &result.content[0].as_text().expect("expected text content").text;
        serde_json::from_str(text).expect("expected valid JSON")
    }

    #[derive(Debug, Deserialize)]
    struct Divider {
        #[allow(dead_code)]
        ratio: u8,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Plan {
        #[allow(dead_code)]
        bus_dividers: Vec<Divider>,
    }

    #[test]
    fn test_parse_params_reports_field_path() {
        let err = parse_params::<Plan>(json!({"busDividers": [{"ratio": 2}, {"ratio": 300}]})).unwrap_err();
        match err {
            CapabilityError::InvalidInput(issues) => {
                assert_eq!(issues[0].path, "busDividers.1.ratio");
                assert!(issues[0].message.contains("300"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_handle_success() {
        let ctx = ServerContext::for_tests().execution_context();
        let echo = EchoCapability::new("echo");
        let result = handle(&echo, json!({"message": "hi"}), &ctx).await;

        assert_ne!(result.is_error, Some(true));
        let parsed = extract_json(&result);
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["data"]["echo"], "hi");
    }

    #[tokio::test]
    async fn test_handle_missing_field() {
        let ctx = ServerContext::for_tests().execution_context();
        let echo = EchoCapability::new("echo");
        let result = handle(&echo, json!({}), &ctx).await;

        assert_eq!(result.is_error, Some(true));
        let parsed = extract_json(&result);
        assert_eq!(parsed["success"], false);
        assert_eq!(parsed["error"]["code"], "invalid-input");
        assert_eq!(parsed["error"]["category"], "validation");
        assert_eq!(parsed["error"]["details"].as_array().unwrap().len(), 1);
        assert_eq!(parsed["error"]["details"][0]["path"], "message");
        assert!(!echo.ran());
    }

    #[tokio::test]
    async fn test_handle_soft_failure_passes_payload() {
        let ctx = ServerContext::for_tests().execution_context();
        let echo = EchoCapability::new("echo");
        let result = handle(&echo, json!({"message": "fail"}), &ctx).await;

        assert_eq!(result.is_error, Some(true));
        let parsed = extract_json(&result);
        assert_eq!(parsed["success"], false);
        assert_eq!(parsed["data"]["reason"], "asked to fail");
        assert!(parsed.get("error").is_none());
    }

    #[tokio::test]
    async fn test_handle_execution_errors_are_classified() {
        let ctx = ServerContext::for_tests().execution_context();
        let echo = EchoCapability::new("echo");

        let parsed = extract_json(&handle(&echo, json!({"message": "boom"}), &ctx).await);
        assert_eq!(parsed["error"]["code"], "internal-error");
        assert_eq!(parsed["error"]["category"], "internal");
        assert_eq!(parsed["error"]["message"], "Internal error: exploded");

        let parsed = extract_json(&handle(&echo, json!({"message": "bad"}), &ctx).await);
        assert_eq!(parsed["error"]["category"], "validation");
    }

    #[test]
    fn test_unwrap_content() {
        let parsed = unwrap_content(&CallToolResult::success(vec![Content::text("{\"a\": 1}")]));
        assert_eq!(parsed, json!({"a": 1}));

        let raw = unwrap_content(&CallToolResult::success(vec![Content::text("plain text")]));
        assert_eq!(raw, json!("plain text"));

        let empty = unwrap_content(&CallToolResult::success(vec![]));
        assert_eq!(empty, json!({"success": true}));
    }

    #[test]
    fn test_category_wire_names() {
        assert_eq!(serde_json::to_value(Category::AiMl).unwrap(), json!("ai-ml"));
        assert_eq!(Category::Codegen.as_str(), "codegen");
        assert_eq!(Category::ALL.len(), 6);
    }

    #[test]
    fn test_parse_params_maps_to_invalid_input() {
        #[derive(Debug, Deserialize)]
        struct Args {
            #[allow(dead_code)]
            count: u32,
        }
        let err = parse_params::<Args>(json!({"count": -1})).unwrap_err();
        assert!(err.is_validation());
    }
}
