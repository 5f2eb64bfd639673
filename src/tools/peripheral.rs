//! `peripheral_config`: driver code generation for on-chip peripherals

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::types::{
    DmaChannel, DriverType, FileKind, GeneratedFile, InterruptConfig, PeripheralArgs, PeripheralConfigResult,
    PinAssignment,
};
use crate::capability::{parse_params, to_result, Capability, Category};
use crate::context::ExecutionContext;
use crate::error::CapabilityError;
use crate::schema::Schema;
use crate::templates::names;

pub const PERIPHERALS: &[&str] = &[
    "I2C1", "I2C2", "I2C3", "SPI1", "SPI2", "SPI3", "USART1", "USART2", "USART3", "UART4", "UART5", "CAN", "CANFD",
    "ETH", "DSI", "CSI", "ADC1", "ADC2", "DAC", "TIM1", "TIM2", "TIM3", "TIM4", "TIM5",
];

/// Register block type name used in the generated handle
pub fn peripheral_type(peripheral: &str) -> &'static str {
    match peripheral {
        p if p.starts_with("I2C") => "I2C",
        p if p.starts_with("SPI") => "SPI",
        p if p.starts_with("USART") || p.starts_with("UART") => "USART",
        p if p.starts_with("CAN") => "CAN",
        "ETH" => "Ethernet",
        "DSI" => "DSI",
        "CSI" => "CSI",
        p if p.starts_with("ADC") => "ADC",
        "DAC" => "DAC",
        p if p.starts_with("TIM") => "Timer",
        _ => "Unknown",
    }
}

fn default_speed(peripheral_type: &str) -> u64 {
    match peripheral_type {
        "I2C" => 400_000,
        "SPI" => 10_000_000,
        "USART" => 115_200,
        "CAN" => 500_000,
        _ => 0,
    }
}

fn pin(pin: &str, pull: &str, alternate: u8) -> PinAssignment {
    PinAssignment {
        pin: pin.to_string(),
        mode: "alternate".to_string(),
        pull: pull.to_string(),
        alternate,
    }
}

fn pin_config(peripheral: &str) -> Vec<PinAssignment> {
    match peripheral {
        "I2C1" => vec![pin("PB6", "up", 4), pin("PB7", "up", 4)],
        "I2C2" => vec![pin("PB10", "up", 4), pin("PB11", "up", 4)],
        "SPI1" => vec![pin("PA5", "none", 5), pin("PA6", "none", 5), pin("PA7", "none", 5)],
        "USART1" => vec![pin("PA9", "up", 7), pin("PA10", "up", 7)],
        _ => vec![pin("TBD", "none", 0)],
    }
}

fn dma_config(peripheral: &str) -> Vec<DmaChannel> {
    let pair = |tx: &str, rx: &str, channel: u8| {
        vec![
            DmaChannel {
                stream: tx.to_string(),
                channel,
                direction: "memory_to_periph".to_string(),
            },
            DmaChannel {
                stream: rx.to_string(),
                channel,
                direction: "periph_to_memory".to_string(),
            },
        ]
    };
    match peripheral {
        "I2C1" => pair("DMA1_Stream0", "DMA1_Stream1", 1),
        "SPI1" => pair("DMA1_Stream2", "DMA1_Stream3", 3),
        _ => vec![],
    }
}

fn interrupt_config(peripheral: &str) -> Vec<InterruptConfig> {
    let irqs: &[&str] = match peripheral {
        "I2C1" => &["I2C1_EV_IRQn", "I2C1_ER_IRQn"],
        "SPI1" => &["SPI1_IRQn"],
        "USART1" => &["USART1_IRQn"],
        _ => &[],
    };
    irqs.iter()
        .map(|irq| InterruptConfig {
            irq: irq.to_string(),
            priority: 5,
            sub_priority: 0,
        })
        .collect()
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

pub struct PeripheralConfigTool;

#[async_trait]
impl Capability for PeripheralConfigTool {
    fn name(&self) -> &str {
        "peripheral_config"
    }

    fn description(&self) -> &str {
        "Generate peripheral initialization code for STM32N6"
    }

    fn category(&self) -> Category {
        Category::Codegen
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            ("peripheral", Schema::enumeration(PERIPHERALS)),
            (
                "mode",
                Schema::string().describe("Operating mode (master, slave, tx, rx, etc.)"),
            ),
            ("config", Schema::opaque().describe("Peripheral-specific configuration")),
            ("outputPath", Schema::string().optional()),
            ("useDma", Schema::boolean().default_value(json!(true))),
            ("useInterrupts", Schema::boolean().default_value(json!(true))),
            ("driverType", Schema::enumeration(DriverType::VARIANTS).default_value(json!("HAL"))),
            ("generateExample", Schema::boolean().default_value(json!(true))),
        ])
    }

    async fn execute(&self, params: Value, ctx: &ExecutionContext) -> Result<Value, CapabilityError> {
        let args: PeripheralArgs = parse_params(params)?;
        let peripheral = args.peripheral.as_str();
        let kind = peripheral_type(peripheral);

        let speed = args
            .config
            .get("speed")
            .and_then(Value::as_u64)
            .unwrap_or_else(|| default_speed(kind))
            .to_string();
        let transfer_mode = if args.use_dma {
            "DMA"
        } else if args.use_interrupts {
            "Interrupt"
        } else {
            "Polling"
        };
        let vars = [
            ("PERIPHERAL", peripheral),
            ("PERIPHERAL_TYPE", kind),
            ("MCU", ctx.config().target.mcu.as_str()),
            ("MODE", args.mode.as_str()),
            ("DRIVER_TYPE", args.driver_type.as_str()),
            ("TRANSFER_MODE", transfer_mode),
            ("SPEED", speed.as_str()),
            ("USE_DMA", if args.use_dma { "true" } else { "false" }),
            ("USE_INTERRUPTS", if args.use_interrupts { "true" } else { "false" }),
        ];

        let templates = ctx.templates();
        let prefix = match &args.output_path {
            Some(dir) => format!("{}/", dir.trim_end_matches('/')),
            None => String::new(),
        };
        let stem = peripheral.to_lowercase();
        let mut outputs = vec![
            ("driver.h", names::DRIVER_HEADER, FileKind::Header),
            ("driver.c", names::DRIVER_SOURCE, FileKind::Source),
            ("config.h", names::DRIVER_CONFIG, FileKind::Config),
        ];
        if args.generate_example {
            outputs.push(("example.c", names::DRIVER_EXAMPLE, FileKind::Example));
        }

        let mut files = Vec::with_capacity(outputs.len());
        for (suffix, template, kind) in outputs {
            files.push(GeneratedFile {
                path: format!("{}{}_{}", prefix, stem, suffix),
                content: templates.render(template, &vars)?,
                kind,
            });
        }
        debug!("Generated {} files for {}", files.len(), peripheral);

        to_result(&PeripheralConfigResult {
            success: true,
            files,
            pin_config: pin_config(peripheral),
            dma_config: if args.use_dma { non_empty(dma_config(peripheral)) } else { None },
            interrupt_config: if args.use_interrupts { non_empty(interrupt_config(peripheral)) } else { None },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::invoke;
    use crate::context::ServerContext;

    #[test]
    fn test_peripheral_type_mapping() {
        assert_eq!(peripheral_type("UART4"), "USART");
        assert_eq!(peripheral_type("CANFD"), "CAN");
        assert_eq!(peripheral_type("ETH"), "Ethernet");
        assert_eq!(peripheral_type("TIM3"), "Timer");
    }

    #[tokio::test]
    async fn test_i2c1_generates_driver_set() {
        let ctx = ServerContext::for_tests().execution_context();
        let result = PeripheralConfigTool
            .execute(
                json!({
                    "peripheral": "I2C1",
                    "mode": "master",
                    "config": {"speed": 100000},
                    "useDma": true,
                    "useInterrupts": true,
                    "driverType": "HAL",
                    "generateExample": true
                }),
                &ctx,
            )
            .await
            .unwrap();

        let paths: Vec<&str> = result["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["i2c1_driver.h", "i2c1_driver.c", "i2c1_config.h", "i2c1_example.c"]);
        assert_eq!(result["files"][0]["type"], "header");

        let header = result["files"][0]["content"].as_str().unwrap();
        assert!(header.contains("__I2C1_DRIVER_H"));
        assert!(header.contains("I2C_TypeDef"));
        assert!(header.contains("STM32N6570"));
        assert!(!header.contains("{{"));
        let config = result["files"][2]["content"].as_str().unwrap();
        assert!(config.contains(".speed = 100000"));

        assert_eq!(result["pinConfig"][0]["pin"], "PB6");
        assert_eq!(result["pinConfig"][0]["alternate"], 4);
        assert_eq!(result["dmaConfig"].as_array().unwrap().len(), 2);
        assert_eq!(result["interruptConfig"][1]["irq"], "I2C1_ER_IRQn");
    }

    #[tokio::test]
    async fn test_unmapped_peripheral_omits_dma_and_irq() {
        let ctx = ServerContext::for_tests().execution_context();
        let envelope = invoke(
            &PeripheralConfigTool,
            json!({"peripheral": "DAC", "mode": "output", "config": {}, "generateExample": false, "outputPath": "gen/"}),
            &ctx,
        )
        .await
        .to_value();
        let data = &envelope["data"];
        assert_eq!(data["files"].as_array().unwrap().len(), 3);
        assert_eq!(data["files"][0]["path"], "gen/dac_driver.h");
        assert_eq!(data["pinConfig"][0]["pin"], "TBD");
        assert!(data.get("dmaConfig").is_none());
        assert!(data.get("interruptConfig").is_none());
    }

    #[tokio::test]
    async fn test_unknown_peripheral_rejected() {
        let ctx = ServerContext::for_tests().execution_context();
        let envelope = invoke(&PeripheralConfigTool, json!({"peripheral": "QSPI", "mode": "x", "config": {}}), &ctx)
            .await
            .to_value();
        assert_eq!(envelope["error"]["code"], "invalid-input");
        assert_eq!(envelope["error"]["details"][0]["path"], "peripheral");
    }
}
