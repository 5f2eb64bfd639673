//! Agent registry: registration, lookup and keyword selection.
//! Agents are always available; there is no enable flag.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{Agent, AgentDefinition};
use crate::capability::{handle, unwrap_content, Category};
use crate::context::ServerContext;
use crate::envelope::{ErrorBody, ResultEnvelope};
use crate::error::{codes, ErrorCategory, Result, ServerError};

#[derive(Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent: Arc<dyn Agent>) -> Result<()> {
        let name = agent.name().to_string();
        if self.agents.contains_key(&name) {
            return Err(ServerError::DuplicateAgent(name));
        }
        debug!("Registered agent: {}", name);
        self.agents.insert(name, agent);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.agents.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn list_all(&self) -> Vec<AgentDefinition> {
        self.agents.values().map(|a| a.definition()).collect()
    }

    pub fn list_by_category(&self, category: Category) -> Vec<Arc<dyn Agent>> {
        self.agents
            .values()
            .filter(|a| a.category() == category)
            .cloned()
            .collect()
    }

    /// Agents grouped by category; every category is present
    pub fn get_by_category(&self) -> BTreeMap<Category, Vec<Arc<dyn Agent>>> {
        let mut grouped: BTreeMap<Category, Vec<Arc<dyn Agent>>> =
            Category::ALL.iter().map(|c| (*c, Vec::new())).collect();
        for agent in self.agents.values() {
            grouped.entry(agent.category()).or_default().push(Arc::clone(agent));
        }
        grouped
    }

    pub fn count(&self) -> usize {
        self.agents.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    /// Agents whose capability or expertise keywords appear in the task. Unranked.
    pub fn select_agents_for_task(&self, task: &str) -> Vec<Arc<dyn Agent>> {
        self.agents
            .values()
            .filter(|a| a.matches_task(task))
            .cloned()
            .collect()
    }

    /// Execute an agent by name and return its envelope as a plain value
    pub async fn execute(&self, name: &str, params: Value, server: &Arc<ServerContext>) -> Value {
        let Some(agent) = self.agents.get(name) else {
            return ResultEnvelope::failure(
                ErrorBody::new(codes::UNKNOWN_CAPABILITY, format!("Unknown agent: {}", name), ErrorCategory::Validation)
                    .with_suggestions(self.names()),
            )
            .to_value();
        };

        let ctx = server.execution_context();
        debug!("Executing agent '{}'", name);
        unwrap_content(&handle(agent.as_ref(), params, &ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::register_builtin_agents;
    use crate::agents::specialists::{ai_engineer, debug_engineer};
    use crate::config::Config;
    use serde_json::json;
    use std::collections::HashMap;

    fn server() -> Arc<ServerContext> {
        let mut context = ServerContext::new(Config::default(), HashMap::new(), std::env::temp_dir());
        register_builtin_agents(&mut context.agents).unwrap();
        Arc::new(context)
    }

    #[test]
    fn test_duplicate_agent_fails() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(ai_engineer())).unwrap();
        let err = registry.register(Arc::new(ai_engineer())).unwrap_err();
        assert!(matches!(err, ServerError::DuplicateAgent(_)));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_select_agents_for_task() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(ai_engineer())).unwrap();
        registry.register(Arc::new(debug_engineer())).unwrap();

        let selected = registry.select_agents_for_task("Quantize with INT8-QUANTIZATION then use GDB");
        let names: Vec<&str> = selected.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["ai-engineer", "debug-engineer"]);

        assert!(registry.select_agents_for_task("bake a cake").is_empty());
    }

    #[test]
    fn test_list_all_definitions() {
        let server = server();
        let definitions = server.agents.list_all();
        assert_eq!(definitions.len(), 7);
        let architect = definitions.iter().find(|d| d.name == "stm32-architect").unwrap();
        assert!(architect.capabilities.contains(&"clock-configuration".to_string()));
    }

    #[test]
    fn test_get_by_category_lists_every_key() {
        let server = server();
        let grouped = server.agents.get_by_category();
        assert_eq!(grouped.len(), 6);
        assert_eq!(grouped[&Category::AiMl].len(), 1);
        assert_eq!(server.agents.list_by_category(Category::Codegen).len(), 3);
    }

    #[tokio::test]
    async fn test_execute_unknown_agent() {
        let server = server();
        let result = server.agents.execute("wizard", json!({"task": "x"}), &server).await;
        assert_eq!(result["error"]["code"], "unknown-capability");
        assert_eq!(result["error"]["suggestions"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_execute_validates_agent_input() {
        let server = server();
        let result = server.agents.execute("ai-engineer", json!({}), &server).await;
        assert_eq!(result["error"]["code"], "invalid-input");
        assert_eq!(result["error"]["details"][0]["path"], "task");
    }

    #[tokio::test]
    async fn test_project_lead_suggests_delegates() {
        let server = server();
        let result = server
            .agents
            .execute("project-lead", json!({"task": "set up freertos tasks"}), &server)
            .await;
        assert_eq!(result["success"], true);
        assert_eq!(result["data"]["data"]["suggestedAgents"], json!(["rtos-specialist"]));
        assert_eq!(result["data"]["data"]["availableAgents"].as_array().unwrap().len(), 6);
    }
}
