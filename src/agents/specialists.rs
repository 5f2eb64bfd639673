//! The built-in specialist agents
//!
//! Each specialist is a static keyword profile plus a router that maps the
//! task text onto a canned answer.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{agent_input_schema, Agent, AgentInput, AgentResult};
use crate::capability::{parse_params, to_result, Capability, Category};
use crate::context::ExecutionContext;
use crate::error::CapabilityError;
use crate::schema::Schema;

type Router = fn(&AgentInput, &ExecutionContext) -> AgentResult;

pub struct Specialist {
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub capabilities: &'static [&'static str],
    pub expertise: &'static [&'static str],
    router: Router,
}

#[async_trait]
impl Capability for Specialist {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn category(&self) -> Category {
        self.category
    }

    fn input_schema(&self) -> Schema {
        agent_input_schema()
    }

    async fn execute(&self, params: Value, ctx: &ExecutionContext) -> Result<Value, CapabilityError> {
        let input: AgentInput = parse_params(params)?;
        debug!("[{}] {}", self.name, input.task);
        to_result(&(self.router)(&input, ctx))
    }
}

impl Agent for Specialist {
    fn capabilities(&self) -> &[&'static str] {
        self.capabilities
    }

    fn expertise(&self) -> &[&'static str] {
        self.expertise
    }
}

pub fn builtin_agents() -> Vec<Arc<dyn Agent>> {
    vec![
        Arc::new(project_lead()),
        Arc::new(stm32_architect()),
        Arc::new(driver_developer()),
        Arc::new(ai_engineer()),
        Arc::new(rtos_specialist()),
        Arc::new(debug_engineer()),
        Arc::new(test_engineer()),
    ]
}

// ============================================================================
// project-lead
// ============================================================================

pub fn project_lead() -> Specialist {
    Specialist {
        name: "project-lead",
        description: "Workflow orchestration and task coordination",
        category: Category::Build,
        capabilities: &["coordination", "planning", "review", "workflow"],
        expertise: &["devflow", "task-management", "code-review"],
        router: route_project_lead,
    }
}

fn route_project_lead(input: &AgentInput, ctx: &ExecutionContext) -> AgentResult {
    let team: Vec<String> = ctx
        .server
        .agents
        .names()
        .into_iter()
        .filter(|name| name != "project-lead")
        .collect();

    let delegates: Vec<String> = ctx
        .server
        .agents
        .select_agents_for_task(&input.task)
        .iter()
        .map(|a| a.name().to_string())
        .filter(|name| name != "project-lead")
        .collect();

    let next_steps = delegates
        .iter()
        .map(|name| format!("Consult {} for: {}", name, input.task))
        .collect();

    AgentResult::success(
        "Project Lead Agent ready. I coordinate workflows and manage project tasks.",
        json!({
            "availableAgents": team,
            "suggestedAgents": delegates,
        }),
    )
    .with_next_steps(next_steps)
}

// ============================================================================
// stm32-architect
// ============================================================================

pub fn stm32_architect() -> Specialist {
    Specialist {
        name: "stm32-architect",
        description: "System and software architecture expert for STM32N6",
        category: Category::Codegen,
        capabilities: &[
            "memory-layout",
            "clock-configuration",
            "boot-sequence",
            "power-management",
            "hal-integration",
            "middleware-config",
        ],
        expertise: &[
            "memory-maps",
            "clock-trees",
            "linker-scripts",
            "startup-code",
            "peripheral-configuration",
            "dma-channels",
        ],
        router: route_architect,
    }
}

fn route_architect(input: &AgentInput, ctx: &ExecutionContext) -> AgentResult {
    let target = &ctx.config().target;

    if input.mentions("memory") || input.mentions("layout") {
        return AgentResult::success(
            format!("Memory layout analysis for {}", target.board),
            json!({
                "totalRAM": "4.2 MB",
                "totalFlash": "2 MB",
                "flashBase": target.flash_base,
                "ramBase": target.ram_base,
            }),
        )
        .with_recommendations(&[
            "Use ITCM for interrupt handlers (128 KB)",
            "Use DTCM for stack and frequently accessed data (128 KB)",
            "Use SRAM3 for AI/ML buffers (512 KB)",
            "Configure MPU for memory protection",
        ])
        .with_next_steps(vec!["Run memory_map on the linked ELF".to_string()]);
    }

    if input.mentions("clock") || input.mentions("frequency") {
        return AgentResult::success(
            format!("Clock configuration guidance for {}", target.mcu),
            json!({
                "maxSysclk": "800 MHz",
                "maxAhb": "800 MHz",
                "maxApb1": "200 MHz",
                "maxApb2": "400 MHz",
                "npuClock": "1000 MHz",
            }),
        )
        .with_recommendations(&[
            "Use PLL1 for system clock",
            "Use PLL2 for NPU clock",
            "Enable CSS for clock security",
        ])
        .with_next_steps(vec!["Run clock_config with the target sysclk".to_string()]);
    }

    if input.mentions("boot") || input.mentions("startup") {
        return AgentResult::success(
            format!("Boot sequence configuration for {}", target.mcu),
            json!({
                "steps": [
                    "1. Reset -> Read BOOT pins",
                    "2. Load initial SP from vector table",
                    "3. Execute Reset_Handler",
                    "4. Initialize data sections (.data)",
                    "5. Zero BSS section",
                    "6. Enable FPU",
                    "7. Enable caches",
                    "8. Call SystemInit()",
                    "9. Call main()",
                ],
            }),
        );
    }

    AgentResult::success(
        "STM32 Architect Agent ready. I can help with memory layout, clock configuration, boot sequences, and system architecture.",
        json!({ "availableTopics": stm32_architect().capabilities }),
    )
}

// ============================================================================
// driver-developer
// ============================================================================

pub fn driver_developer() -> Specialist {
    Specialist {
        name: "driver-developer",
        description: "Peripheral driver development specialist for STM32N6",
        category: Category::Codegen,
        capabilities: &[
            "i2c-driver",
            "spi-driver",
            "uart-driver",
            "can-driver",
            "ethernet-driver",
            "dma-configuration",
            "interrupt-handling",
        ],
        expertise: &[
            "hal-drivers",
            "ll-drivers",
            "dma-transfers",
            "circular-buffers",
            "interrupt-handlers",
            "peripheral-init",
        ],
        router: route_driver_developer,
    }
}

fn driver_answer(peripheral: &str, instance: &str, features: &[&str]) -> AgentResult {
    let stem = peripheral.to_lowercase();
    AgentResult::success(
        format!("{} driver generation complete", peripheral),
        json!({
            "peripheral": peripheral,
            "features": features,
            "codeStructure": {
                "header": format!("{}_driver.h", stem),
                "source": format!("{}_driver.c", stem),
                "config": format!("{}_config.h", stem),
            },
        }),
    )
    .with_next_steps(vec![format!(
        "Run peripheral_config with peripheral={} to generate the sources",
        instance
    )])
}

fn route_driver_developer(input: &AgentInput, _ctx: &ExecutionContext) -> AgentResult {
    if input.mentions("i2c") {
        return driver_answer("I2C", "I2C1", &["Master mode", "DMA support", "Interrupt handling"]);
    }
    if input.mentions("spi") {
        return driver_answer("SPI", "SPI1", &["Master mode", "DMA support", "Chip select management"]);
    }
    if input.mentions("uart") || input.mentions("usart") {
        return driver_answer("UART", "USART1", &["DMA support", "Circular buffer", "Interrupt handling"]);
    }

    AgentResult::success(
        "Driver Developer Agent ready. I can help create drivers for I2C, SPI, UART, CAN, Ethernet, and other peripherals.",
        json!({
            "supportedPeripherals": ["I2C", "SPI", "UART", "CAN", "Ethernet", "DSI", "CSI"],
            "patterns": ["HAL", "LL", "DMA-based", "Interrupt-driven"],
        }),
    )
}

// ============================================================================
// ai-engineer
// ============================================================================

pub fn ai_engineer() -> Specialist {
    Specialist {
        name: "ai-engineer",
        description: "Edge AI and Neural-ART NPU specialist for STM32N6",
        category: Category::AiMl,
        capabilities: &[
            "model-conversion",
            "model-quantization",
            "npu-programming",
            "computer-vision",
            "isp-configuration",
            "camera-setup",
        ],
        expertise: &[
            "st-edge-ai",
            "neural-art",
            "model-zoo",
            "int8-quantization",
            "int4-quantization",
            "onnx",
            "tflite",
        ],
        router: route_ai_engineer,
    }
}

fn route_ai_engineer(input: &AgentInput, ctx: &ExecutionContext) -> AgentResult {
    if input.mentions("convert") || input.mentions("model") {
        return AgentResult::success(
            "Model conversion workflow",
            json!({
                "steps": [
                    "1. Analyze model architecture",
                    "2. Check operator compatibility",
                    "3. Convert to ST Edge AI format",
                    "4. Generate C code",
                    "5. Create inference wrapper",
                ],
                "supportedOperators": ["Conv2D", "DepthwiseConv2D", "FullyConnected", "ReLU", "Softmax"],
                "estimatedFlashUsage": "~850 KB (quantized)",
                "estimatedRAMUsage": "~400 KB",
            }),
        )
        .with_next_steps(vec!["Run model_convert on the source model".to_string()]);
    }

    if input.mentions("quantiz") {
        return AgentResult::success(
            "Quantization recommendations",
            json!({
                "defaultScheme": ctx.config().edge_ai.default_quantization.as_str(),
                "schemes": {
                    "int8": { "compression": "4x", "accuracyLoss": "<1%", "recommended": true },
                    "int4": { "compression": "8x", "accuracyLoss": "1-3%", "recommended": "for large models" },
                    "mixed": { "compression": "3-6x", "accuracyLoss": "<1%", "recommended": "for best balance" },
                },
                "workflow": [
                    "1. Prepare calibration dataset (100-1000 samples)",
                    "2. Run calibration",
                    "3. Evaluate accuracy",
                    "4. Fine-tune if needed",
                ],
            }),
        )
        .with_next_steps(vec!["Run model_quantize with evaluateAccuracy enabled".to_string()]);
    }

    if input.mentions("deploy") || input.mentions("inference") {
        return AgentResult::success(
            "Model deployment workflow for Neural-ART",
            json!({
                "steps": [
                    "1. Initialize NPU",
                    "2. Load model weights",
                    "3. Allocate input/output buffers",
                    "4. Configure ISP (if camera input)",
                    "5. Run inference",
                    "6. Post-process results",
                ],
                "codeTemplate": "ai_inference.c",
                "expectedLatency": "5-50ms (model dependent)",
            }),
        );
    }

    AgentResult::success(
        "AI Engineer Agent ready. I can help with model conversion, quantization, and deployment to Neural-ART NPU.",
        json!({
            "supportedFormats": ["ONNX", "TensorFlow Lite", "PyTorch", "Keras"],
            "quantizationOptions": ["int8", "int4", "mixed", "fp16"],
            "npuCapabilities": {
                "performance": "600 GOPS",
                "clock": "1 GHz",
                "memoryBandwidth": "High",
            },
        }),
    )
}

// ============================================================================
// rtos-specialist, debug-engineer, test-engineer
// ============================================================================

pub fn rtos_specialist() -> Specialist {
    Specialist {
        name: "rtos-specialist",
        description: "FreeRTOS and real-time systems expert",
        category: Category::Codegen,
        capabilities: &["freertos-config", "task-design", "synchronization", "memory-pools"],
        expertise: &["freertos", "tasks", "queues", "semaphores", "mutexes", "timers"],
        router: |_input, _ctx| {
            AgentResult::success(
                "RTOS Specialist Agent ready. I can help with FreeRTOS task design, queues, and synchronization.",
                json!({
                    "freertosConfig": {
                        "version": "V10.6.2",
                        "recommendedHeap": "128 KB",
                        "defaultTickRate": "1000 Hz",
                    },
                }),
            )
        },
    }
}

pub fn debug_engineer() -> Specialist {
    Specialist {
        name: "debug-engineer",
        description: "Hardware debugging and troubleshooting specialist",
        category: Category::Debug,
        capabilities: &["gdb-debugging", "swv-trace", "hard-fault", "memory-corruption"],
        expertise: &["gdb", "openocd", "swv", "etm", "hard-fault", "stack-overflow"],
        router: route_debug_engineer,
    }
}

fn route_debug_engineer(input: &AgentInput, ctx: &ExecutionContext) -> AgentResult {
    let result = AgentResult::success(
        "Debug Engineer Agent ready. I can help with GDB debugging, trace analysis, and fault diagnosis.",
        json!({
            "debugProbes": ["ST-Link V3", "J-Link", "ULINKplus"],
            "features": ["Breakpoints", "Watchpoints", "SWV", "ETM trace", "RTOS awareness"],
            "defaultProbe": ctx.config().debug.probe.as_str(),
        }),
    );

    if input.mentions("fault") {
        result
            .with_recommendations(&[
                "Read SCB->CFSR and SCB->HFSR to classify the fault",
                "Inspect the stacked PC and LR",
            ])
            .with_next_steps(vec!["Run register_inspect on SCB".to_string()])
    } else {
        result
    }
}

pub fn test_engineer() -> Specialist {
    Specialist {
        name: "test-engineer",
        description: "Embedded testing and validation specialist",
        category: Category::Analysis,
        capabilities: &["unit-testing", "integration-testing", "coverage", "mocking"],
        expertise: &["unity", "cmock", "ceedling", "gcov", "hil-testing"],
        router: |input, _ctx| {
            let result = AgentResult::success(
                "Test Engineer Agent ready. I can help with unit testing, mocking, and coverage analysis.",
                json!({
                    "frameworks": ["Unity", "CMock", "Ceedling"],
                    "features": ["Automated test generation", "Mock creation", "Coverage reporting"],
                }),
            );
            if input.mentions("coverage") {
                result.with_next_steps(vec!["Run trace_analyze with analysisType=[\"coverage\"]".to_string()])
            } else {
                result
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ServerContext;

    #[test]
    fn test_builtin_roster() {
        let agents = builtin_agents();
        let names: Vec<&str> = agents.iter().map(|a| a.name()).collect();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"rtos-specialist"));
    }

    #[test]
    fn test_matches_task_is_case_insensitive() {
        assert!(ai_engineer().matches_task("Convert my ONNX network"));
        assert!(debug_engineer().matches_task("investigate a HARD-FAULT"));
        assert!(!test_engineer().matches_task("configure the clock tree"));
    }

    #[test]
    fn test_architect_routes_by_keyword() {
        let ctx = ServerContext::for_tests().execution_context();
        let result = route_architect(&AgentInput::new("Plan the memory layout"), &ctx);
        assert!(result.message.starts_with("Memory layout analysis for STM32N6570-DK"));
        assert!(result.recommendations.unwrap().len() == 4);

        let result = route_architect(&AgentInput::new("what is the max clock"), &ctx);
        assert_eq!(result.data.unwrap()["maxApb1"], "200 MHz");

        let result = route_architect(&AgentInput::new("hello"), &ctx);
        assert_eq!(result.data.unwrap()["availableTopics"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_driver_developer_points_at_peripheral_config() {
        let ctx = ServerContext::for_tests().execution_context();
        let result = route_driver_developer(&AgentInput::new("write a USART driver"), &ctx);
        assert_eq!(result.data.as_ref().unwrap()["codeStructure"]["header"], "uart_driver.h");
        assert!(result.next_steps.unwrap()[0].contains("USART1"));
    }

    #[tokio::test]
    async fn test_execute_through_capability_contract() {
        let ctx = ServerContext::for_tests().execution_context();
        let value = ai_engineer()
            .execute(json!({"task": "quantize for the NPU"}), &ctx)
            .await
            .unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "Quantization recommendations");
        assert_eq!(value["data"]["defaultScheme"], "int8");
    }
}
