//! Keyword-routed specialist agents

pub mod registry;
pub mod specialists;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::capability::Capability;
use crate::error::Result;
use crate::schema::Schema;
use crate::tools::types::GeneratedFile;

pub use registry::AgentRegistry;
pub use specialists::Specialist;

/// An agent is a capability that also advertises the keywords it answers to
pub trait Agent: Capability {
    fn capabilities(&self) -> &[&'static str];

    fn expertise(&self) -> &[&'static str];

    fn definition(&self) -> AgentDefinition {
        AgentDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            capabilities: self.capabilities().iter().map(|s| s.to_string()).collect(),
            expertise: self.expertise().iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Case-insensitive: does the task mention any capability or expertise keyword
    fn matches_task(&self, task: &str) -> bool {
        let task = task.to_lowercase();
        self.capabilities()
            .iter()
            .chain(self.expertise())
            .any(|keyword| task.contains(&keyword.to_lowercase()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentDefinition {
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub expertise: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConstraints {
    pub timeout: Option<f64>,
    pub max_output_size: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentInput {
    pub task: String,
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
    #[serde(default)]
    pub constraints: Option<AgentConstraints>,
}

impl AgentInput {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            parameters: None,
            constraints: None,
        }
    }

    pub fn mentions(&self, keyword: &str) -> bool {
        self.task.to_lowercase().contains(keyword)
    }
}

/// Shared input contract of every agent
pub fn agent_input_schema() -> Schema {
    Schema::object([
        ("task", Schema::string().describe("Task description for the agent")),
        ("parameters", Schema::opaque().optional().describe("Task-specific parameters")),
        (
            "constraints",
            Schema::object([
                ("timeout", Schema::number().optional()),
                ("maxOutputSize", Schema::number().optional()),
            ])
            .optional(),
        ),
    ])
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<GeneratedFile>>,
}

impl AgentResult {
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            recommendations: None,
            next_steps: None,
            files: None,
        }
    }

    pub fn with_recommendations(mut self, recommendations: &[&str]) -> Self {
        self.recommendations = Some(recommendations.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_next_steps(mut self, steps: Vec<String>) -> Self {
        self.next_steps = Some(steps);
        self
    }
}

/// Register the seven built-in specialists
pub fn register_builtin_agents(registry: &mut AgentRegistry) -> Result<()> {
    for agent in specialists::builtin_agents() {
        registry.register(agent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_input_schema_defaults() {
        let schema = agent_input_schema();
        assert!(schema.validate(&json!({"task": "configure clocks"})).is_ok());

        let issues = schema.validate(&json!({"parameters": {}})).unwrap_err();
        assert_eq!(issues[0].path, "task");

        let issues = schema
            .validate(&json!({"task": "x", "constraints": {"timeout": "soon"}}))
            .unwrap_err();
        assert_eq!(issues[0].path, "constraints.timeout");
    }

    #[test]
    fn test_agent_input_deserializes_constraints() {
        let input: AgentInput =
            serde_json::from_value(json!({"task": "t", "constraints": {"maxOutputSize": 100}})).unwrap();
        assert_eq!(input.constraints.unwrap().max_output_size, Some(100.0));
    }

    #[test]
    fn test_agent_result_wire_shape() {
        let value = serde_json::to_value(
            AgentResult::success("ok", json!({"a": 1})).with_next_steps(vec!["run stm32_build".to_string()]),
        )
        .unwrap();
        assert_eq!(value["nextSteps"][0], "run stm32_build");
        assert!(value.get("recommendations").is_none());
        assert!(value.get("files").is_none());
    }
}
