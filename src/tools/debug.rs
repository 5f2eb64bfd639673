//! `stm32_debug`: simulated GDB server session

use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::path_exists;
use super::types::{DebugArgs, DebugInterface, DebugProbe, DebugResult, RtosAwareness};
use crate::capability::{parse_params, to_result, Capability, Category};
use crate::context::ExecutionContext;
use crate::error::CapabilityError;
use crate::schema::Schema;

pub const GDB_PORT: u16 = 3333;
pub const TELNET_PORT: u16 = 4444;

pub struct Stm32DebugTool;

#[async_trait]
impl Capability for Stm32DebugTool {
    fn name(&self) -> &str {
        "stm32_debug"
    }

    fn description(&self) -> &str {
        "Start GDB debug session with STM32N6 target"
    }

    fn category(&self) -> Category {
        Category::Debug
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            ("elfPath", Schema::string().describe("Path to ELF file with debug symbols")),
            ("probe", Schema::enumeration(DebugProbe::VARIANTS).optional()),
            ("interface", Schema::enumeration(DebugInterface::VARIANTS).optional()),
            (
                "speed",
                Schema::uint(u64::from(u32::MAX)).optional().describe("Probe clock in kHz; defaults to debug.speed_khz"),
            ),
            ("swv", Schema::boolean().default_value(json!(false))),
            ("swvSpeed", Schema::uint(u64::from(u32::MAX)).default_value(json!(2000))),
            (
                "rtosAwareness",
                Schema::enumeration(RtosAwareness::VARIANTS).default_value(json!("none")),
            ),
            ("initCommands", Schema::array(Schema::string()).optional()),
        ])
    }

    async fn execute(&self, params: Value, ctx: &ExecutionContext) -> Result<Value, CapabilityError> {
        let args: DebugArgs = parse_params(params)?;
        let elf = ctx.resolve_path(&args.elf_path);

        if !path_exists(&elf).await {
            return to_result(&DebugResult {
                success: false,
                session_id: None,
                gdb_port: None,
                telnet_port: None,
                target_status: None,
                message: format!("ELF file not found: {}", args.elf_path),
            });
        }

        let debug = &ctx.config().debug;
        let probe = args.probe.unwrap_or(debug.probe);
        let interface = args.interface.unwrap_or(debug.interface);
        let speed = args.speed.unwrap_or(debug.speed_khz);
        if speed == 0 {
            return Err(CapabilityError::InvalidArgument("speed must be greater than 0".to_string()));
        }

        let session_id = Uuid::new_v4().to_string();
        info!("Debug session {} started for {}", session_id, elf.display());

        to_result(&DebugResult {
            success: true,
            session_id: Some(session_id),
            gdb_port: Some(GDB_PORT),
            telnet_port: Some(TELNET_PORT),
            target_status: Some("halted".to_string()),
            message: startup_message(&args, probe, interface, speed),
        })
    }
}

fn startup_message(args: &DebugArgs, probe: DebugProbe, interface: DebugInterface, speed: u32) -> String {
    let mut message = String::from("Debug session started\n");
    let _ = writeln!(message, "ELF: {}", args.elf_path);
    let _ = writeln!(message, "Probe: {}", probe.as_str());
    let _ = writeln!(message, "Interface: {} @ {} kHz", interface.as_str(), speed);
    let _ = writeln!(message, "GDB Port: {}", GDB_PORT);
    let _ = writeln!(message, "Telnet Port: {}", TELNET_PORT);
    if args.swv {
        let _ = writeln!(message, "SWV: Enabled @ {} kHz", args.swv_speed);
    }
    if args.rtos_awareness != RtosAwareness::None {
        let _ = writeln!(message, "RTOS Awareness: {}", args.rtos_awareness.as_str());
    }
    for command in args.init_commands.iter().flatten() {
        let _ = writeln!(message, "Init: {}", command);
    }
    message.push_str(
        "\nTarget halted at address 0x08000100\n\
         Ready for debugging.\n\n\
         GDB commands available:\n\
         - break main         : Set breakpoint at main()\n\
         - continue           : Resume execution\n\
         - step               : Single step\n\
         - next               : Step over\n\
         - info registers     : Display registers\n\
         - x/10x 0x20000000   : Examine memory\n",
    );
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::invoke;
    use crate::context::ServerContext;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_debug_session_uses_config_defaults() {
        let dir = TempDir::new().unwrap();
        let elf = dir.path().join("app.elf");
        std::fs::write(&elf, b"\x7fELF").unwrap();
        let ctx = ServerContext::for_tests().execution_context();

        let first = invoke(&Stm32DebugTool, json!({"elfPath": elf.to_str().unwrap()}), &ctx).await.to_value();
        let second = invoke(&Stm32DebugTool, json!({"elfPath": elf.to_str().unwrap()}), &ctx).await.to_value();

        assert_eq!(first["success"], true);
        assert_eq!(first["data"]["gdbPort"], 3333);
        assert_eq!(first["data"]["telnetPort"], 4444);
        assert_eq!(first["data"]["targetStatus"], "halted");
        assert_ne!(first["data"]["sessionId"], second["data"]["sessionId"]);

        let message = first["data"]["message"].as_str().unwrap();
        assert!(message.contains("Probe: stlink"));
        assert!(message.contains("swd @ 4000 kHz"));
        assert!(!message.contains("SWV"));
    }

    #[tokio::test]
    async fn test_debug_swv_and_rtos_lines() {
        let dir = TempDir::new().unwrap();
        let elf = dir.path().join("app.elf");
        std::fs::write(&elf, b"\x7fELF").unwrap();
        let ctx = ServerContext::for_tests().execution_context();

        let result = invoke(
            &Stm32DebugTool,
            json!({"elfPath": elf.to_str().unwrap(), "swv": true, "rtosAwareness": "freertos", "speed": 1800}),
            &ctx,
        )
        .await
        .to_value();
        let message = result["data"]["message"].as_str().unwrap();
        assert!(message.contains("@ 1800 kHz"));
        assert!(message.contains("SWV: Enabled @ 2000 kHz"));
        assert!(message.contains("RTOS Awareness: freertos"));
    }

    #[tokio::test]
    async fn test_debug_missing_elf() {
        let ctx = ServerContext::for_tests().execution_context();
        let result = invoke(&Stm32DebugTool, json!({"elfPath": "missing.elf"}), &ctx).await.to_value();
        assert_eq!(result["success"], false);
        assert_eq!(result["data"]["message"], "ELF file not found: missing.elf");
        assert!(result["data"].get("sessionId").is_none());
    }
}
