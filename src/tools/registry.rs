//! Tool registry: registration, enable/disable gating and name-based execution

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::capability::{handle, unwrap_content, Capability, Category};
use crate::context::ServerContext;
use crate::envelope::{ErrorBody, ResultEnvelope};
use crate::error::{codes, ErrorCategory, Result, ServerError};

struct ToolRegistration {
    tool: Arc<dyn Capability>,
    enabled: AtomicBool,
}

/// Registry for tools. Populated at startup; only the enabled flags change afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolRegistration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, enabled. Fails if the name is taken.
    pub fn register(&mut self, tool: Arc<dyn Capability>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ServerError::DuplicateTool(name));
        }
        debug!("Registered tool: {}", name);
        self.tools.insert(
            name,
            ToolRegistration {
                tool,
                enabled: AtomicBool::new(true),
            },
        );
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    /// Enable or disable a tool. Unknown names are ignored.
    pub fn set_enabled(&self, name: &str, enabled: bool) {
        if let Some(registration) = self.tools.get(name) {
            registration.enabled.store(enabled, Ordering::SeqCst);
        }
    }

    /// Registered and enabled
    pub fn is_available(&self, name: &str) -> bool {
        self.tools
            .get(name)
            .is_some_and(|r| r.enabled.load(Ordering::SeqCst))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.tools.get(name).map(|r| Arc::clone(&r.tool))
    }

    pub fn list_all(&self) -> Vec<Arc<dyn Capability>> {
        self.tools.values().map(|r| Arc::clone(&r.tool)).collect()
    }

    /// Enabled tools in one category
    pub fn list_by_category(&self, category: Category) -> Vec<Arc<dyn Capability>> {
        self.enabled()
            .filter(|r| r.tool.category() == category)
            .map(|r| Arc::clone(&r.tool))
            .collect()
    }

    pub fn list_enabled(&self) -> Vec<Arc<dyn Capability>> {
        self.enabled().map(|r| Arc::clone(&r.tool)).collect()
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Enabled tools grouped by category; every category is present
    pub fn get_by_category(&self) -> BTreeMap<Category, Vec<Arc<dyn Capability>>> {
        let mut grouped: BTreeMap<Category, Vec<Arc<dyn Capability>>> =
            Category::ALL.iter().map(|c| (*c, Vec::new())).collect();
        for registration in self.enabled() {
            grouped
                .entry(registration.tool.category())
                .or_default()
                .push(Arc::clone(&registration.tool));
        }
        grouped
    }

    /// Execute a tool by name and return its envelope as a plain value
    pub async fn execute(&self, name: &str, params: Value, server: &Arc<ServerContext>) -> Value {
        let Some(registration) = self.tools.get(name) else {
            return ResultEnvelope::failure(
                ErrorBody::new(codes::UNKNOWN_CAPABILITY, format!("Unknown tool: {}", name), ErrorCategory::Validation)
                    .with_suggestions(self.names()),
            )
            .to_value();
        };

        if !registration.enabled.load(Ordering::SeqCst) {
            return ResultEnvelope::failure(ErrorBody::new(
                codes::DISABLED_CAPABILITY,
                format!("Tool is disabled: {}", name),
                ErrorCategory::Validation,
            ))
            .to_value();
        }

        let ctx = server.execution_context();
        debug!("Executing tool '{}'", name);
        unwrap_content(&handle(registration.tool.as_ref(), params, &ctx).await)
    }

    fn enabled(&self) -> impl Iterator<Item = &ToolRegistration> {
        self.tools.values().filter(|r| r.enabled.load(Ordering::SeqCst))
    }
}
