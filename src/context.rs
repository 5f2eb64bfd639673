//! Shared server state and per-invocation execution context

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::agents::{register_builtin_agents, AgentRegistry};
use crate::config::Config;
use crate::error::Result;
use crate::hooks::{register_builtin_hooks, HookEngine};
use crate::templates::TemplateEngine;
use crate::tools::{register_all_tools, ToolRegistry};

/// Everything a running server shares across requests.
///
/// Registries are populated during startup while the context is still owned
/// mutably, then the whole context is frozen behind an `Arc`.
pub struct ServerContext {
    pub config: Config,
    pub tools: ToolRegistry,
    pub agents: AgentRegistry,
    pub hooks: HookEngine,
    pub templates: TemplateEngine,
    /// Environment snapshot taken once at startup
    pub environment: Arc<HashMap<String, String>>,
    pub working_directory: PathBuf,
}

impl ServerContext {
    /// Context with empty registries and the built-in templates
    pub fn new(config: Config, environment: HashMap<String, String>, working_directory: PathBuf) -> Self {
        Self {
            config,
            tools: ToolRegistry::new(),
            agents: AgentRegistry::new(),
            hooks: HookEngine::new(),
            templates: TemplateEngine::with_builtins(),
            environment: Arc::new(environment),
            working_directory,
        }
    }

    /// Context with every built-in tool, agent and hook registered
    pub fn with_builtins(
        config: Config,
        environment: HashMap<String, String>,
        working_directory: PathBuf,
    ) -> Result<Self> {
        let mut context = Self::new(config, environment, working_directory);
        register_all_tools(&mut context.tools)?;
        register_builtin_agents(&mut context.agents)?;
        register_builtin_hooks(&mut context.hooks)?;
        Ok(context)
    }

    /// Fresh execution context for one invocation
    pub fn execution_context(self: &Arc<Self>) -> ExecutionContext {
        ExecutionContext {
            working_directory: self.working_directory.clone(),
            environment: Arc::clone(&self.environment),
            timeout: Duration::from_millis(self.config.server.timeout_ms),
            server: Arc::clone(self),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Arc<Self> {
        Arc::new(Self::new(Config::default(), HashMap::new(), std::env::temp_dir()))
    }
}

/// Ambient context handed to every capability execution
#[derive(Clone)]
pub struct ExecutionContext {
    pub working_directory: PathBuf,
    pub environment: Arc<HashMap<String, String>>,
    /// Advisory only; executions are not cancelled when it elapses
    pub timeout: Duration,
    pub server: Arc<ServerContext>,
}

impl ExecutionContext {
    pub fn config(&self) -> &Config {
        &self.server.config
    }

    pub fn templates(&self) -> &TemplateEngine {
        &self.server.templates
    }

    /// Resolve a caller-supplied path against the working directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_directory.join(path)
        }
    }
}
