//! Hook-wrapped dispatch of tools and agents
//!
//! pre-hooks → registry execute → post-hooks. The registry's envelope is
//! returned unchanged; post-hook outcomes are advisory only.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::agents::agent_input_schema;
use crate::context::ServerContext;
use crate::envelope::{ErrorBody, ResultEnvelope};
use crate::error::{codes, ErrorCategory};
use crate::hooks::{HookContext, HookOutcome, HookTiming, HookTrigger};
use crate::schema::Schema;

/// Name under which agents are exposed as an MCP tool
pub const CONSULT_AGENT: &str = "consult_agent";

pub const NO_MATCHING_AGENT: &str = "no-matching-agent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Tool,
    Agent,
}

impl Kind {
    fn trigger(self) -> HookTrigger {
        match self {
            Kind::Tool => HookTrigger::Tool,
            Kind::Agent => HookTrigger::Agent,
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    server: Arc<ServerContext>,
}

impl Dispatcher {
    pub fn new(server: Arc<ServerContext>) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &Arc<ServerContext> {
        &self.server
    }

    pub async fn dispatch_tool(&self, name: &str, params: Map<String, Value>) -> Value {
        self.dispatch(Kind::Tool, name, params).await
    }

    pub async fn dispatch_agent(&self, name: &str, params: Map<String, Value>) -> Value {
        self.dispatch(Kind::Agent, name, params).await
    }

    async fn dispatch(&self, kind: Kind, name: &str, mut params: Map<String, Value>) -> Value {
        let trigger = kind.trigger();
        let hooks = &self.server.hooks;

        let pre = hooks
            .execute(HookTiming::Pre, trigger, name, self.hook_context(&params, None))
            .await;
        if !pre.proceed {
            info!("Pre-hook vetoed '{}': {}", name, pre.error.as_deref().unwrap_or("no reason given"));
            return veto_envelope(pre);
        }
        params.extend(pre.modified_params);

        debug!("Dispatching {:?} '{}'", kind, name);
        let result = match kind {
            Kind::Tool => self.server.tools.execute(name, Value::Object(params.clone()), &self.server).await,
            Kind::Agent => self.server.agents.execute(name, Value::Object(params.clone()), &self.server).await,
        };

        let post = hooks
            .execute(HookTiming::Post, trigger, name, self.hook_context(&params, Some(result.clone())))
            .await;
        if !post.proceed {
            debug!("Ignoring post-hook veto for '{}'", name);
        }

        result
    }

    fn hook_context(&self, params: &Map<String, Value>, result: Option<Value>) -> HookContext {
        let project_path = params
            .get("projectPath")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .unwrap_or_else(|| self.server.working_directory.clone());
        HookContext {
            params: params.clone(),
            result,
            environment: Arc::clone(&self.server.environment),
            project_path,
        }
    }

    /// Input contract of `consult_agent`: the agent contract plus an optional agent name
    pub fn consult_schema(&self) -> Schema {
        let names = self.server.agents.names();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let Schema::Object(mut fields) = agent_input_schema() else {
            return agent_input_schema();
        };
        fields.insert(
            0,
            (
                "agent".to_string(),
                Schema::enumeration(&names)
                    .optional()
                    .describe("Agent to consult; selected from the task when omitted"),
            ),
        );
        Schema::Object(fields)
    }

    /// Consult one named agent, or every agent whose keywords appear in the task
    pub async fn consult(&self, params: Map<String, Value>) -> Value {
        let mut params = match self.consult_schema().validate(&Value::Object(params)) {
            Ok(Value::Object(params)) => params,
            Ok(_) => Map::new(),
            Err(issues) => return ResultEnvelope::invalid_input(issues).to_value(),
        };

        if let Some(Value::String(agent)) = params.remove("agent") {
            return self.dispatch_agent(&agent, params).await;
        }

        let task = params.get("task").and_then(Value::as_str).unwrap_or_default();
        let selected: Vec<String> = self
            .server
            .agents
            .select_agents_for_task(task)
            .iter()
            .map(|agent| agent.name().to_string())
            .collect();
        if selected.is_empty() {
            return ResultEnvelope::failure(
                ErrorBody::new(
                    NO_MATCHING_AGENT,
                    format!("No agent matches task: {}", task),
                    ErrorCategory::Validation,
                )
                .with_suggestions(self.server.agents.names()),
            )
            .to_value();
        }

        let mut results = Map::new();
        for name in &selected {
            let envelope = self.dispatch_agent(name, params.clone()).await;
            results.insert(name.clone(), envelope);
        }
        ResultEnvelope::ok(json!({ "selectedAgents": selected, "results": results })).to_value()
    }
}

fn veto_envelope(outcome: HookOutcome) -> Value {
    let message = outcome
        .error
        .unwrap_or_else(|| "Pre-hook blocked execution".to_string());
    let mut error = ErrorBody::new(codes::HOOK_VETOED, message, ErrorCategory::Validation);
    if !outcome.suggestions.is_empty() {
        error = error.with_suggestions(outcome.suggestions);
    }
    ResultEnvelope::failure(error).to_value()
}
