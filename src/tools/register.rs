//! `register_inspect`: peripheral register access against a simulated target
//!
//! Writes are kept in an in-memory register file so later reads observe them.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::types::{BitField, RegisterAction, RegisterArgs, RegisterInspectResult};
use crate::capability::{parse_params, to_result, Capability, Category};
use crate::context::ExecutionContext;
use crate::error::CapabilityError;
use crate::schema::Schema;

const PERIPHERAL_BASES: &[(&str, u32)] = &[
    ("GPIOA", 0x4202_0000),
    ("GPIOB", 0x4202_0400),
    ("GPIOC", 0x4202_0800),
    ("GPIOD", 0x4202_0C00),
    ("GPIOE", 0x4202_1000),
    ("GPIOF", 0x4202_1400),
    ("GPIOG", 0x4202_1800),
    ("GPIOH", 0x4202_1C00),
    ("GPIOI", 0x4202_2000),
    ("I2C1", 0x4000_5400),
    ("I2C2", 0x4000_5800),
    ("I2C3", 0x4000_5C00),
    ("SPI1", 0x4001_3000),
    ("SPI2", 0x4000_3800),
    ("SPI3", 0x4000_3C00),
    ("USART1", 0x4001_1000),
    ("USART2", 0x4000_4400),
    ("USART3", 0x4000_4800),
    ("CAN1", 0x4000_6400),
    ("ETH", 0x4002_8000),
    ("RCC", 0x4602_0800),
    ("PWR", 0x4602_0000),
];

struct FieldDef {
    name: &'static str,
    position: &'static str,
    description: &'static str,
}

struct RegisterDef {
    peripheral: &'static str,
    name: &'static str,
    offset: u32,
    reset: u32,
    description: &'static str,
    fields: &'static [FieldDef],
}

const fn field(name: &'static str, position: &'static str, description: &'static str) -> FieldDef {
    FieldDef {
        name,
        position,
        description,
    }
}

const REGISTERS: &[RegisterDef] = &[
    RegisterDef {
        peripheral: "I2C1",
        name: "CR1",
        offset: 0x00,
        reset: 0x0001,
        description: "Control Register 1",
        fields: &[
            field("PE", "0", "Peripheral enable"),
            field("TXIE", "1", "TX interrupt enable"),
            field("RXIE", "2", "RX interrupt enable"),
            field("ADDRIE", "3", "Address match interrupt enable"),
            field("NACKIE", "4", "NACK interrupt enable"),
            field("STOPIE", "5", "STOP interrupt enable"),
            field("TCIE", "6", "Transfer complete interrupt enable"),
            field("ERRIE", "7", "Error interrupt enable"),
        ],
    },
    RegisterDef {
        peripheral: "I2C1",
        name: "CR2",
        offset: 0x04,
        reset: 0x0000,
        description: "Control Register 2",
        fields: &[
            field("SADD0", "0", "Slave address bit 0"),
            field("SADD1-7", "1-7", "Slave address bits 1-7"),
            field("RD_WRN", "10", "Transfer direction"),
            field("START", "13", "Start generation"),
            field("STOP", "14", "Stop generation"),
            field("NACK", "15", "NACK generation"),
        ],
    },
    RegisterDef {
        peripheral: "I2C1",
        name: "SR1",
        offset: 0x14,
        reset: 0x0001,
        description: "Status Register 1",
        fields: &[
            field("SB", "0", "Start bit"),
            field("ADDR", "1", "Address sent"),
            field("BTF", "2", "Byte transfer finished"),
            field("ADD10", "3", "10-bit header sent"),
            field("STOPF", "4", "Stop detection"),
        ],
    },
    RegisterDef {
        peripheral: "GPIOA",
        name: "MODER",
        offset: 0x00,
        reset: 0xA800_0000,
        description: "GPIO Mode Register",
        fields: &[
            field("MODER0", "0-1", "Port mode for pin 0"),
            field("MODER1", "2-3", "Port mode for pin 1"),
        ],
    },
    RegisterDef {
        peripheral: "GPIOA",
        name: "ODR",
        offset: 0x14,
        reset: 0x0000,
        description: "Output Data Register",
        fields: &[field("ODR0-15", "0-15", "Output data")],
    },
];

fn base_address(peripheral: &str) -> Option<u32> {
    PERIPHERAL_BASES
        .iter()
        .find(|(name, _)| *name == peripheral)
        .map(|(_, base)| *base)
}

fn find_register(peripheral: &str, register: &str) -> Option<&'static RegisterDef> {
    REGISTERS
        .iter()
        .find(|r| r.peripheral == peripheral && r.name == register)
}

/// Value of a `"n"` or `"lo-hi"` bit position within `value`
pub fn extract_bits(value: u32, position: &str) -> u32 {
    let (low, high) = match position.split_once('-') {
        Some((lo, hi)) => (lo.parse::<u32>().unwrap_or(0), hi.parse::<u32>().unwrap_or(0)),
        None => {
            let bit = position.parse::<u32>().unwrap_or(0);
            (bit, bit)
        }
    };
    if high < low || low > 31 {
        return 0;
    }
    let width = high.min(31) - low + 1;
    let mask = ((1u64 << width) - 1) as u32;
    (value >> low) & mask
}

fn decode(register: &RegisterDef, value: u32, qualified: bool) -> Vec<BitField> {
    register
        .fields
        .iter()
        .map(|f| BitField {
            name: if qualified {
                format!("{}.{}", register.name, f.name)
            } else {
                f.name.to_string()
            },
            position: f.position.to_string(),
            value: extract_bits(value, f.position),
            description: f.description.to_string(),
        })
        .collect()
}

fn failure(description: String) -> RegisterInspectResult {
    RegisterInspectResult {
        success: false,
        value: 0,
        hex_value: hex(0),
        binary_value: binary(0),
        bits: vec![],
        description,
    }
}

fn hex(value: u32) -> String {
    format!("0x{:08X}", value)
}

fn binary(value: u32) -> String {
    format!("0b{:032b}", value)
}

/// Register tool with its simulated register file
#[derive(Default)]
pub struct RegisterInspectTool {
    written: Mutex<HashMap<(String, String), u32>>,
}

impl RegisterInspectTool {
    pub fn new() -> Self {
        Self::default()
    }

    async fn current(&self, register: &RegisterDef) -> u32 {
        let key = (register.peripheral.to_string(), register.name.to_string());
        self.written.lock().await.get(&key).copied().unwrap_or(register.reset)
    }

    async fn store(&self, register: &RegisterDef, value: u32) {
        let key = (register.peripheral.to_string(), register.name.to_string());
        self.written.lock().await.insert(key, value);
    }
}

#[async_trait]
impl Capability for RegisterInspectTool {
    fn name(&self) -> &str {
        "register_inspect"
    }

    fn description(&self) -> &str {
        "Read or write peripheral registers on connected target"
    }

    fn category(&self) -> Category {
        Category::Debug
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            ("action", Schema::enumeration(RegisterAction::VARIANTS)),
            (
                "peripheral",
                Schema::string().describe("Peripheral name (e.g., I2C1, GPIOA)"),
            ),
            ("register", Schema::string().describe("Register name or offset")),
            ("value", Schema::uint(u64::from(u32::MAX)).optional().describe("Value to write")),
            ("mask", Schema::uint(u64::from(u32::MAX)).optional().describe("Bit mask for modify")),
            ("sessionId", Schema::string().optional()),
        ])
    }

    async fn execute(&self, params: Value, _ctx: &ExecutionContext) -> Result<Value, CapabilityError> {
        let args: RegisterArgs = parse_params(params)?;
        let peripheral = args.peripheral.to_uppercase();
        let register_name = args.register.to_uppercase();

        let Some(base) = base_address(&peripheral) else {
            return to_result(&failure(format!("Unknown peripheral: {}", peripheral)));
        };

        if args.action == RegisterAction::ReadAll {
            let mut bits = Vec::new();
            let mut names = Vec::new();
            for register in REGISTERS.iter().filter(|r| r.peripheral == peripheral) {
                bits.extend(decode(register, self.current(register).await, true));
                names.push(register.name);
            }
            return to_result(&RegisterInspectResult {
                success: !names.is_empty(),
                value: 0,
                hex_value: hex(0),
                binary_value: binary(0),
                bits,
                description: format!("{} @ {}: {}", peripheral, hex(base), names.join(", ")),
            });
        }

        let Some(register) = find_register(&peripheral, &register_name) else {
            return to_result(&failure(format!("Unknown register: {} for {}", register_name, peripheral)));
        };

        let value = match args.action {
            RegisterAction::Read | RegisterAction::ReadAll => self.current(register).await,
            RegisterAction::Write => {
                let value = args
                    .value
                    .ok_or_else(|| CapabilityError::InvalidArgument("write requires value".to_string()))?;
                self.store(register, value).await;
                value
            }
            RegisterAction::Modify => {
                let (Some(value), Some(mask)) = (args.value, args.mask) else {
                    return Err(CapabilityError::InvalidArgument(
                        "modify requires value and mask".to_string(),
                    ));
                };
                let updated = (self.current(register).await & !mask) | (value & mask);
                self.store(register, updated).await;
                updated
            }
        };

        if args.action == RegisterAction::Read {
            debug!("{}->{} = {}", peripheral, register.name, hex(value));
        } else {
            info!(
                "{}->{} @ {} set to {} (session {:?})",
                peripheral,
                register.name,
                hex(base + register.offset),
                hex(value),
                args.session_id
            );
        }

        to_result(&RegisterInspectResult {
            success: true,
            value,
            hex_value: hex(value),
            binary_value: binary(value),
            bits: decode(register, value, false),
            description: format!("{}->{} ({})", peripheral, register.name, register.description),
        })
    }
}
