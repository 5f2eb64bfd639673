//! Built-in hooks around the build, flash and debug tools

use serde_json::{json, Value};
use tracing::info;

use super::engine::{HookContext, HookDefinition, HookEngine, HookOutcome, HookTarget, HookTiming, HookTrigger};
use crate::error::HookError;

/// Tool payload inside a dispatch result (the envelope's `data`, or the value itself)
fn payload(result: &Option<Value>) -> Option<&Value> {
    let result = result.as_ref()?;
    Some(result.get("data").unwrap_or(result))
}

async fn validate_project(ctx: HookContext) -> Result<HookOutcome, HookError> {
    match ctx.params.get("projectPath").and_then(Value::as_str) {
        Some(path) if !path.is_empty() => Ok(HookOutcome::proceed()),
        _ => Ok(HookOutcome::veto("Project path is required").with_suggestion("Specify projectPath parameter")),
    }
}

async fn analyze_build_output(ctx: HookContext) -> Result<HookOutcome, HookError> {
    let Some(build) = payload(&ctx.result) else {
        return Ok(HookOutcome::proceed());
    };
    let succeeded = build.get("success").and_then(Value::as_bool).unwrap_or(false);
    let warnings = build
        .get("warnings")
        .and_then(Value::as_array)
        .map(|w| w.len())
        .unwrap_or(0);

    if succeeded && warnings > 0 {
        Ok(HookOutcome::proceed().with_suggestion(format!("Build completed with {} warnings", warnings)))
    } else {
        Ok(HookOutcome::proceed())
    }
}

async fn check_target_connection(_ctx: HookContext) -> Result<HookOutcome, HookError> {
    Ok(HookOutcome::proceed().with_metadata("probeStatus", json!("connected")))
}

async fn log_flash_result(ctx: HookContext) -> Result<HookOutcome, HookError> {
    if let Some(flash) = payload(&ctx.result) {
        if flash.get("success").and_then(Value::as_bool).unwrap_or(false) {
            let bytes = flash.get("bytesWritten").and_then(Value::as_u64).unwrap_or(0);
            info!("Flash completed: {} bytes written", bytes);
        }
    }
    Ok(HookOutcome::proceed())
}

/// Tools that talk to a debug probe
const PROBE_TOOLS: &str = "^(stm32_flash|stm32_debug)$";

/// Register the four built-in hooks
pub fn register_builtin_hooks(engine: &mut HookEngine) -> Result<(), regex::Error> {
    engine.register(HookDefinition::new(
        "validate_project",
        HookTiming::Pre,
        HookTrigger::Tool,
        "stm32_build",
        100,
        validate_project,
    ));
    engine.register(HookDefinition::new(
        "analyze_build_output",
        HookTiming::Post,
        HookTrigger::Tool,
        "stm32_build",
        50,
        analyze_build_output,
    ));

    engine.register(HookDefinition::new(
        "check_target_connection",
        HookTiming::Pre,
        HookTrigger::Tool,
        HookTarget::pattern(PROBE_TOOLS)?,
        100,
        check_target_connection,
    ));

    engine.register(HookDefinition::new(
        "log_flash_result",
        HookTiming::Post,
        HookTrigger::Tool,
        "stm32_flash",
        50,
        log_flash_result,
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn engine() -> HookEngine {
        let mut engine = HookEngine::new();
        register_builtin_hooks(&mut engine).unwrap();
        engine
    }

    #[tokio::test]
    async fn test_validate_project_vetoes_missing_path() {
        let outcome = engine()
            .execute(HookTiming::Pre, HookTrigger::Tool, "stm32_build", HookContext::default())
            .await;
        assert!(!outcome.proceed);
        assert_eq!(outcome.error.as_deref(), Some("Project path is required"));
        assert_eq!(outcome.suggestions, vec!["Specify projectPath parameter"]);
    }

    #[tokio::test]
    async fn test_validate_project_accepts_path() {
        let ctx = HookContext {
            params: params(json!({"projectPath": "/tmp/app"})),
            ..Default::default()
        };
        let outcome = engine()
            .execute(HookTiming::Pre, HookTrigger::Tool, "stm32_build", ctx)
            .await;
        assert!(outcome.proceed);
    }

    #[tokio::test]
    async fn test_analyze_build_output_counts_warnings() {
        let ctx = HookContext {
            result: Some(json!({
                "success": true,
                "data": {"success": true, "warnings": [{"message": "a"}, {"message": "b"}]}
            })),
            ..Default::default()
        };
        let outcome = engine()
            .execute(HookTiming::Post, HookTrigger::Tool, "stm32_build", ctx)
            .await;
        assert_eq!(outcome.suggestions, vec!["Build completed with 2 warnings"]);
    }

    #[tokio::test]
    async fn test_check_target_connection_matches_flash_and_debug() {
        for tool in ["stm32_flash", "stm32_debug"] {
            let outcome = engine()
                .execute(HookTiming::Pre, HookTrigger::Tool, tool, HookContext::default())
                .await;
            assert_eq!(outcome.metadata["probeStatus"], "connected");
        }

        let outcome = engine()
            .execute(HookTiming::Pre, HookTrigger::Tool, "memory_map", HookContext::default())
            .await;
        assert!(outcome.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_log_flash_result_is_advisory() {
        let ctx = HookContext {
            result: Some(json!({"success": true, "data": {"success": true, "bytesWritten": 1024}})),
            ..Default::default()
        };
        let outcome = engine()
            .execute(HookTiming::Post, HookTrigger::Tool, "stm32_flash", ctx)
            .await;
        assert_eq!(outcome, HookOutcome::proceed());
    }

    #[test]
    fn test_probe_hook_uses_pattern_target() {
        let mut engine = HookEngine::new();
        assert!(register_builtin_hooks(&mut engine).is_ok());
        let hook = engine
            .list_all()
            .iter()
            .find(|h| h.name == "check_target_connection")
            .unwrap();
        assert_eq!(hook.target.to_string(), "/^(stm32_flash|stm32_debug)$/");
    }

    #[test]
    fn test_registration_order() {
        let engine = engine();
        let names: Vec<&str> = engine.list_all().iter().map(|h| h.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["validate_project", "check_target_connection", "analyze_build_output", "log_flash_result"]
        );
    }
}
