//! `clock_config`: clock tree calculation and code generation

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use super::types::{
    BusPrescalers, ClockArgs, ClockConfigResult, ClockFrequencies, ClockSource, FileKind, GeneratedFile,
};
use crate::capability::{parse_params, to_result, Capability, Category};
use crate::context::ExecutionContext;
use crate::error::CapabilityError;
use crate::schema::Schema;
use crate::templates::names;

pub const MAX_SYSCLK: u64 = 800_000_000;

/// Upper bound for PLL and bus divider fields
const MAX_DIVIDER: u64 = u32::MAX as u64;
const MAX_APB1: u64 = 200_000_000;
const MAX_APB2: u64 = 400_000_000;
const DEFAULT_HSE: u64 = 25_000_000;

/// Bus frequencies for a system clock and prescaler set
pub fn derive_frequencies(sysclk: u64, prescalers: &BusPrescalers) -> Result<ClockFrequencies, CapabilityError> {
    let divide = |name: &str, div: u32| {
        if div == 0 {
            Err(CapabilityError::InvalidArgument(format!("{} prescaler must be greater than 0", name)))
        } else {
            Ok(sysclk / u64::from(div))
        }
    };
    Ok(ClockFrequencies {
        sysclk,
        hclk: divide("ahb", prescalers.ahb)?,
        pclk1: divide("apb1", prescalers.apb1)?,
        pclk2: divide("apb2", prescalers.apb2)?,
        pclk3: divide("apb3", prescalers.apb3)?,
    })
}

fn limit_warnings(frequencies: &ClockFrequencies) -> Vec<String> {
    let mut warnings = Vec::new();
    if frequencies.pclk1 > MAX_APB1 {
        warnings.push("APB1 frequency exceeds 200 MHz maximum".to_string());
    }
    if frequencies.pclk2 > MAX_APB2 {
        warnings.push("APB2 frequency exceeds 400 MHz maximum".to_string());
    }
    warnings
}

pub struct ClockConfigTool;

#[async_trait]
impl Capability for ClockConfigTool {
    fn name(&self) -> &str {
        "clock_config"
    }

    fn description(&self) -> &str {
        "Generate clock tree configuration for STM32N6"
    }

    fn category(&self) -> Category {
        Category::Codegen
    }

    fn input_schema(&self) -> Schema {
        let pll = Schema::object([
            ("m", Schema::uint(MAX_DIVIDER)),
            ("n", Schema::uint(MAX_DIVIDER)),
            ("p", Schema::uint(MAX_DIVIDER)),
            ("q", Schema::uint(MAX_DIVIDER)),
            ("r", Schema::uint(MAX_DIVIDER)),
        ]);
        let prescalers = Schema::object([
            ("ahb", Schema::uint(MAX_DIVIDER).default_value(json!(1))),
            ("apb1", Schema::uint(MAX_DIVIDER).default_value(json!(4))),
            ("apb2", Schema::uint(MAX_DIVIDER).default_value(json!(2))),
            ("apb3", Schema::uint(MAX_DIVIDER).default_value(json!(2))),
        ]);
        Schema::object([
            (
                "sysclk",
                Schema::uint(MAX_SYSCLK).describe("Target system clock frequency in Hz"),
            ),
            ("source", Schema::enumeration(ClockSource::VARIANTS).default_value(json!("PLL"))),
            ("hseFrequency", Schema::uint(MAX_SYSCLK).optional().describe("HSE frequency in Hz")),
            ("pllConfig", pll.optional()),
            ("busPrescalers", prescalers.optional()),
            ("outputPath", Schema::string().optional()),
        ])
    }

    async fn execute(&self, params: Value, ctx: &ExecutionContext) -> Result<Value, CapabilityError> {
        let args: ClockArgs = parse_params(params)?;
        let prescalers = args.bus_prescalers.unwrap_or_default();
        let frequencies = derive_frequencies(args.sysclk, &prescalers)?;
        let warnings = limit_warnings(&frequencies);
        for warning in &warnings {
            warn!("clock_config: {}", warning);
        }

        let pll = args.pll_config.unwrap_or_default();
        let pll_source = if args.source == ClockSource::Hse { "HSE" } else { "HSI" };
        let fields = [
            ("SYSCLK", frequencies.sysclk),
            ("HCLK", frequencies.hclk),
            ("PCLK1", frequencies.pclk1),
            ("PCLK2", frequencies.pclk2),
            ("PCLK3", frequencies.pclk3),
            ("PLL_M", u64::from(pll.m)),
            ("PLL_N", u64::from(pll.n)),
            ("PLL_P", u64::from(pll.p)),
            ("PLL_Q", u64::from(pll.q)),
            ("PLL_R", u64::from(pll.r)),
            ("AHB_DIV", u64::from(prescalers.ahb)),
            ("APB1_DIV", u64::from(prescalers.apb1)),
            ("APB2_DIV", u64::from(prescalers.apb2)),
            ("APB3_DIV", u64::from(prescalers.apb3)),
            ("HSE_VALUE", args.hse_frequency.unwrap_or(DEFAULT_HSE)),
        ];
        let numbers: Vec<(&str, String)> = fields.iter().map(|(k, v)| (*k, v.to_string())).collect();
        let sysclk_mhz = (args.sysclk as f64 / 1_000_000.0).to_string();

        let mut vars: Vec<(&str, &str)> = numbers.iter().map(|(k, v)| (*k, v.as_str())).collect();
        vars.push(("MCU", ctx.config().target.mcu.as_str()));
        vars.push(("SYSCLK_MHZ", sysclk_mhz.as_str()));
        vars.push(("SOURCE", args.source.as_str()));
        vars.push(("PLL_SOURCE", pll_source));

        let prefix = match &args.output_path {
            Some(dir) => format!("{}/", dir.trim_end_matches('/')),
            None => String::new(),
        };
        let templates = ctx.templates();
        let files = vec![
            GeneratedFile {
                path: format!("{}clock_config.c", prefix),
                content: templates.render(names::CLOCK_SOURCE, &vars)?,
                kind: FileKind::Source,
            },
            GeneratedFile {
                path: format!("{}clock_config.h", prefix),
                content: templates.render(names::CLOCK_HEADER, &vars)?,
                kind: FileKind::Header,
            },
        ];

        to_result(&ClockConfigResult {
            success: true,
            frequencies,
            files,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::invoke;
    use crate::context::ServerContext;

    #[test]
    fn test_derive_frequencies_defaults() {
        let f = derive_frequencies(800_000_000, &BusPrescalers::default()).unwrap();
        assert_eq!(f.hclk, 800_000_000);
        assert_eq!(f.pclk1, 200_000_000);
        assert_eq!(f.pclk2, 400_000_000);
        assert!(limit_warnings(&f).is_empty());
    }

    #[test]
    fn test_zero_prescaler_rejected() {
        let prescalers = BusPrescalers { ahb: 1, apb1: 0, apb2: 2, apb3: 2 };
        assert!(derive_frequencies(100, &prescalers).is_err());
    }

    #[tokio::test]
    async fn test_clock_config_warns_on_fast_apb() {
        let ctx = ServerContext::for_tests().execution_context();
        let result = ClockConfigTool
            .execute(
                json!({
                    "sysclk": 800000000,
                    "source": "HSE",
                    "hseFrequency": 48000000,
                    "busPrescalers": {"ahb": 1, "apb1": 2, "apb2": 1, "apb3": 2}
                }),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(result["frequencies"]["pclk1"], 400_000_000u64);
        assert_eq!(
            result["warnings"],
            json!(["APB1 frequency exceeds 200 MHz maximum", "APB2 frequency exceeds 400 MHz maximum"])
        );
        let source = result["files"][0]["content"].as_str().unwrap();
        assert!(source.contains("Target SYSCLK: 800 MHz"));
        assert!(source.contains("PLL1SRC_HSE"));
        assert!(source.contains("48000000UL"));
        assert_eq!(result["files"][1]["path"], "clock_config.h");
    }

    #[tokio::test]
    async fn test_sysclk_above_limit_is_invalid_input() {
        let ctx = ServerContext::for_tests().execution_context();
        let envelope = invoke(&ClockConfigTool, json!({"sysclk": 900000000}), &ctx).await.to_value();
        assert_eq!(envelope["error"]["code"], "invalid-input");
        assert_eq!(envelope["error"]["details"][0]["path"], "sysclk");
    }

    #[tokio::test]
    async fn test_fractional_and_negative_clocks_name_the_field() {
        let ctx = ServerContext::for_tests().execution_context();
        let envelope = invoke(&ClockConfigTool, json!({"sysclk": 1.5}), &ctx).await.to_value();
        assert_eq!(envelope["error"]["code"], "invalid-input");
        assert_eq!(envelope["error"]["details"][0]["path"], "sysclk");

        let envelope = invoke(
            &ClockConfigTool,
            json!({"sysclk": 400000000, "busPrescalers": {"apb1": -5}}),
            &ctx,
        )
        .await
        .to_value();
        assert_eq!(envelope["error"]["details"][0]["path"], "busPrescalers.apb1");
    }

    #[tokio::test]
    async fn test_partial_prescalers_take_defaults() {
        let ctx = ServerContext::for_tests().execution_context();
        let envelope = invoke(&ClockConfigTool, json!({"sysclk": 400000000, "busPrescalers": {"apb1": 8}}), &ctx)
            .await
            .to_value();
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["data"]["frequencies"]["pclk1"], 50_000_000u64);
        assert_eq!(envelope["data"]["frequencies"]["pclk2"], 200_000_000u64);
    }
}
