//! MCP surface of the STM32N6 development server
//!
//! Tools come from the live [`ToolRegistry`](crate::tools::ToolRegistry), so
//! there is no static router. Agents are reachable through `consult_agent`.
//! Prompts are the fixed set in [`prompts`](crate::prompts).

use std::sync::Arc;

use rmcp::{
    model::*,
    service::RequestContext,
    ErrorData as McpError,
    RoleServer,
    ServerHandler,
};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::capability::format_value;
use crate::context::ServerContext;
use crate::dispatch::{Dispatcher, CONSULT_AGENT};
use crate::prompts;

pub const CONFIG_URI: &str = "stm32n6://config";
pub const TEMPLATES_URI: &str = "stm32n6://templates";
pub const AGENTS_URI: &str = "stm32n6://agents";

const CONSULT_DESCRIPTION: &str = "Consult an STM32N6 specialist agent. Name an agent, \
     or omit it to route the task to every agent whose expertise it mentions.";

#[derive(Clone)]
pub struct Stm32DevServer {
    dispatcher: Dispatcher,
}

impl Stm32DevServer {
    pub fn new(context: Arc<ServerContext>) -> Self {
        Self {
            dispatcher: Dispatcher::new(context),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn context(&self) -> &Arc<ServerContext> {
        self.dispatcher.server()
    }

    /// Enabled tools followed by `consult_agent`
    pub fn tool_list(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .context()
            .tools
            .list_enabled()
            .iter()
            .map(|tool| {
                Tool::new(
                    tool.name().to_string(),
                    tool.description().to_string(),
                    Arc::new(tool.json_schema()),
                )
            })
            .collect();
        tools.push(Tool::new(
            CONSULT_AGENT,
            CONSULT_DESCRIPTION,
            Arc::new(self.dispatcher.consult_schema().to_json_schema()),
        ));
        tools
    }

    /// Run one tool call through the dispatcher and format the envelope
    pub async fn call(&self, name: &str, arguments: Option<Map<String, Value>>) -> CallToolResult {
        let arguments = arguments.unwrap_or_default();
        let envelope = if name == CONSULT_AGENT {
            self.dispatcher.consult(arguments).await
        } else {
            self.dispatcher.dispatch_tool(name, arguments).await
        };
        format_value(&envelope)
    }

    pub fn resource_list(&self) -> Vec<Resource> {
        [
            (CONFIG_URI, "config", "Resolved server configuration", "application/toml"),
            (TEMPLATES_URI, "templates", "Registered code generation templates", "application/json"),
            (AGENTS_URI, "agents", "Specialist agent definitions", "application/json"),
        ]
        .into_iter()
        .map(|(uri, name, description, mime_type)| {
            let mut resource = RawResource::new(uri, name);
            resource.description = Some(description.to_string());
            resource.mime_type = Some(mime_type.to_string());
            resource.no_annotation()
        })
        .collect()
    }

    pub fn read(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        let context = self.context();
        let text = match uri {
            CONFIG_URI => context
                .config
                .to_toml()
                .map_err(|e| McpError::internal_error(e.to_string(), None))?,
            TEMPLATES_URI => to_json(&context.templates.list_all())?,
            AGENTS_URI => to_json(&context.agents.list_all())?,
            _ => {
                return Err(McpError::resource_not_found(
                    format!("Unknown resource: {}", uri),
                    None,
                ))
            }
        };
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, uri)],
        })
    }

    pub fn prompt(&self, name: &str, arguments: Option<&JsonObject>) -> Result<GetPromptResult, McpError> {
        prompts::get_prompt(name, arguments)
            .ok_or_else(|| McpError::invalid_params(format!("Unknown prompt: {}", name), None))
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

impl ServerHandler for Stm32DevServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(format!(
                "STM32N6 Development MCP Server - simulated build, flash, debug, code generation \
                 and Edge AI workflows. {} tools and {} specialist agents (via {}).",
                self.context().tools.list_enabled().len(),
                self.context().agents.count(),
                CONSULT_AGENT
            )),
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        info!(
            "STM32N6 MCP server initialized with {} tools and {} agents",
            self.context().tools.count(),
            self.context().agents.count()
        );
        Ok(self.get_info())
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: self.tool_list(),
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        debug!("call_tool: {}", request.name);
        Ok(self.call(&request.name, request.arguments).await)
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            next_cursor: None,
            resources: self.resource_list(),
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read(&request.uri)
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            next_cursor: None,
            prompts: prompts::list_prompts(),
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        self.prompt(&request.name, request.arguments.as_ref())
    }
}
