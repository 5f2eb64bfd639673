//! Integration tests for the stm32n6-dev MCP server
//!
//! Drives the public API end to end: context construction, the hook-wrapped
//! dispatcher, built-in tools and agents.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use stm32n6_dev::hooks::{HookDefinition, HookOutcome, HookTiming, HookTrigger};
use stm32n6_dev::{Config, Dispatcher, ServerContext, Stm32DevServer};

fn context_with(config: Config) -> ServerContext {
    ServerContext::with_builtins(config, HashMap::new(), std::env::temp_dir()).unwrap()
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(context_with(Config::default())))
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn test_server_creation() {
    let context = Arc::new(context_with(Config::default()));
    let server = Stm32DevServer::new(Arc::clone(&context));
    assert_eq!(server.tool_list().len(), context.tools.count() + 1);
    assert_eq!(server.resource_list().len(), 3);
}

#[test]
fn test_server_clone_shares_registries() {
    let server = Stm32DevServer::new(Arc::new(context_with(Config::default())));
    let clone = server.clone();
    server.dispatcher().server().tools.set_enabled("stm32_debug", false);
    assert!(!clone.dispatcher().server().tools.is_available("stm32_debug"));
    assert_eq!(clone.tool_list().len(), 10);
}

#[tokio::test]
async fn test_build_requires_project_path() {
    let result = dispatcher().dispatch_tool("stm32_build", Map::new()).await;
    assert_eq!(result["success"], false);
    assert_eq!(result["error"]["code"], "hook-vetoed");
    assert_eq!(result["error"]["message"], "Project path is required");
    assert_eq!(result["error"]["suggestions"][0], "Specify projectPath parameter");
}

#[tokio::test]
async fn test_build_uses_configured_jobs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("CMakeLists.txt"), "project(app C)\n").unwrap();

    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(config_file, "[build]\nparallel_jobs = 8\ndefault_build_type = \"Release\"").unwrap();
    let config = Config::load(Some(&config_file.path().to_path_buf())).unwrap();

    let dispatcher = Dispatcher::new(Arc::new(context_with(config)));
    let result = dispatcher
        .dispatch_tool(
            "stm32_build",
            args(json!({"projectPath": dir.path().to_str().unwrap()})),
        )
        .await;

    assert_eq!(result["success"], true);
    let output = result["data"]["output"].as_str().unwrap();
    assert!(output.contains("Parallel jobs: 8"));
    assert!(output.contains("Build type: Release"));
    assert!(result["data"]["binaryPath"].as_str().unwrap().ends_with("project.elf"));
}

#[tokio::test]
async fn test_flash_reports_file_size() {
    let mut binary = tempfile::NamedTempFile::new().unwrap();
    binary.write_all(&[0u8; 1024]).unwrap();

    let result = dispatcher()
        .dispatch_tool(
            "stm32_flash",
            args(json!({"binaryPath": binary.path().to_str().unwrap()})),
        )
        .await;

    assert_eq!(result["success"], true);
    assert_eq!(result["data"]["bytesWritten"], 1024);
    assert_eq!(result["data"]["verified"], true);
}

#[tokio::test]
async fn test_missing_binary_is_soft_failure() {
    let result = dispatcher()
        .dispatch_tool("stm32_flash", args(json!({"binaryPath": "/nonexistent/firmware.bin"})))
        .await;

    assert_eq!(result["success"], false);
    assert!(result.get("error").is_none());
    assert_eq!(result["data"]["bytesWritten"], 0);
}

#[tokio::test]
async fn test_invalid_input_lists_every_field() {
    let result = dispatcher()
        .dispatch_tool("register_inspect", args(json!({"action": "poke", "peripheral": 7})))
        .await;

    assert_eq!(result["error"]["code"], "invalid-input");
    assert_eq!(result["error"]["category"], "validation");
    let paths: Vec<&str> = result["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|issue| issue["path"].as_str())
        .collect();
    assert_eq!(paths, vec!["action", "peripheral", "register"]);
}

#[tokio::test]
async fn test_register_writes_persist_across_calls() {
    let dispatcher = dispatcher();
    dispatcher
        .dispatch_tool(
            "register_inspect",
            args(json!({"action": "write", "peripheral": "GPIOA", "register": "ODR", "value": 0x55})),
        )
        .await;
    let read = dispatcher
        .dispatch_tool(
            "register_inspect",
            args(json!({"action": "read", "peripheral": "GPIOA", "register": "ODR"})),
        )
        .await;
    assert_eq!(read["data"]["value"], 0x55);
}

#[tokio::test]
async fn test_custom_hook_runs_before_builtins() {
    let mut context = context_with(Config::default());
    context.hooks.register(HookDefinition::new(
        "freeze_flash",
        HookTiming::Pre,
        HookTrigger::Tool,
        "stm32_flash",
        500,
        |_ctx| async { Ok(HookOutcome::veto("Flashing is frozen")) },
    ));
    let dispatcher = Dispatcher::new(Arc::new(context));

    let result = dispatcher
        .dispatch_tool("stm32_flash", args(json!({"binaryPath": "/tmp/app.bin"})))
        .await;
    assert_eq!(result["error"]["message"], "Flashing is frozen");
}

#[tokio::test]
async fn test_disabled_tool_is_rejected() {
    let dispatcher = dispatcher();
    dispatcher.server().tools.set_enabled("memory_map", false);
    let result = dispatcher
        .dispatch_tool("memory_map", args(json!({"elfFile": "/tmp/app.elf"})))
        .await;
    assert_eq!(result["error"]["code"], "disabled-capability");
}

#[tokio::test]
async fn test_agents_answer_directly() {
    let result = dispatcher()
        .dispatch_agent("ai-engineer", args(json!({"task": "Quantize the model-zoo network for the NPU"})))
        .await;
    assert_eq!(result["success"], true);
    assert!(result["data"]["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn test_consult_routes_by_keyword() {
    let result = dispatcher()
        .consult(args(json!({"task": "Write unity tests for the spi-driver"})))
        .await;
    assert_eq!(result["success"], true);
    let selected = result["data"]["selectedAgents"].as_array().unwrap();
    assert!(selected.contains(&json!("test-engineer")));
    assert!(selected.contains(&json!("driver-developer")));
}

#[tokio::test]
async fn test_unknown_tool_suggests_names() {
    let result = dispatcher().dispatch_tool("stm32_bulid", Map::new()).await;
    assert_eq!(result["error"]["code"], "unknown-capability");
    assert_eq!(result["error"]["suggestions"].as_array().unwrap().len(), 10);
}
