//! Analysis tools: `trace_analyze` and `memory_map`

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::path_exists;
use super::types::{
    AnalysisType, CoverageReport, FunctionTiming, MemoryMapArgs, MemoryMapResult, MemorySection, MemoryUsage,
    MemoryUsageDetail, SectionKind, SymbolInfo, TimingReport, TraceAnalysisReport, TraceAnalyzeResult, TraceArgs,
    Visualization,
};
use crate::capability::{parse_params, to_result, Capability, Category};
use crate::context::ExecutionContext;
use crate::error::CapabilityError;
use crate::schema::Schema;

const FLASH_TOTAL: u64 = 2 * 1024 * 1024;
const RAM_TOTAL: u64 = 4_404_019;

/// Functions averaging above this many milliseconds are flagged
const SLOW_FUNCTION_MS: f64 = 1.0;
const COVERAGE_TARGET: f64 = 80.0;

// ============================================================================
// trace_analyze
// ============================================================================

const CAPTURE_DURATION_MS: f64 = 1000.0;
const CAPTURE_INSTRUCTIONS: u64 = 50_000_000;

fn timing(name: &str, total: f64, calls: u32, avg: f64, max: f64, min: f64) -> FunctionTiming {
    FunctionTiming {
        name: name.to_string(),
        total_time: total,
        call_count: calls,
        avg_time: avg,
        max_time: max,
        min_time: min,
    }
}

fn simulated_timing() -> TimingReport {
    TimingReport {
        functions: vec![
            timing("main", 850.5, 1, 850.5, 850.5, 850.5),
            timing("HAL_I2C_Master_Transmit", 45.2, 100, 0.452, 1.2, 0.38),
            timing("HAL_SPI_TransmitReceive", 32.8, 50, 0.656, 0.9, 0.55),
            timing("AI_Inference", 15.5, 10, 1.55, 2.1, 1.4),
            timing("BSP_LED_Toggle", 2.1, 500, 0.0042, 0.005, 0.004),
        ],
    }
}

fn simulated_coverage() -> CoverageReport {
    CoverageReport {
        line_coverage: 78.5,
        function_coverage: 85.2,
        uncovered_functions: vec![
            "Error_Handler".to_string(),
            "HardFault_Handler".to_string(),
            "NMI_Handler".to_string(),
        ],
    }
}

fn recommendations(report: &TraceAnalysisReport, args: &TraceArgs) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(timing) = &report.timing {
        let slow: Vec<&str> = timing
            .functions
            .iter()
            .filter(|f| f.avg_time > SLOW_FUNCTION_MS)
            .map(|f| f.name.as_str())
            .collect();
        if !slow.is_empty() {
            out.push(format!("Consider optimizing these slow functions: {}", slow.join(", ")));
        }
    }
    if let Some(coverage) = &report.coverage {
        if coverage.line_coverage < COVERAGE_TARGET {
            out.push(format!(
                "Line coverage is {}%. Consider adding more tests.",
                coverage.line_coverage
            ));
        }
    }
    if let Some(exceptions) = report.exceptions.as_ref().filter(|e| !e.is_empty()) {
        out.push(format!("{} exceptions detected. Review exception handling.", exceptions.len()));
    }
    if args.elf_file.is_none() {
        out.push("Provide elfFile to resolve addresses to symbols".to_string());
    }
    if !args.analysis_type.contains(&AnalysisType::Itm) {
        out.push("Enable ITM stimulus ports for more detailed logging".to_string());
    }
    if !args.analysis_type.contains(&AnalysisType::PcSampling) {
        out.push("Consider using PC sampling for execution profiling".to_string());
    }
    out
}

pub struct TraceAnalyzeTool;

#[async_trait]
impl Capability for TraceAnalyzeTool {
    fn name(&self) -> &str {
        "trace_analyze"
    }

    fn description(&self) -> &str {
        "Analyze SWV/ETM trace data for performance debugging"
    }

    fn category(&self) -> Category {
        Category::Analysis
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            ("traceFile", Schema::string().describe("Path to trace capture file")),
            ("analysisType", Schema::array(Schema::enumeration(AnalysisType::VARIANTS))),
            (
                "elfFile",
                Schema::string().optional().describe("ELF file for symbol resolution"),
            ),
            (
                "timeRange",
                Schema::object([("start", Schema::number()), ("end", Schema::number())]).optional(),
            ),
            (
                "outputFormat",
                Schema::enumeration(&["json", "html", "csv"]).default_value(json!("json")),
            ),
        ])
    }

    async fn execute(&self, params: Value, ctx: &ExecutionContext) -> Result<Value, CapabilityError> {
        let args: TraceArgs = parse_params(params)?;

        if !path_exists(&ctx.resolve_path(&args.trace_file)).await {
            return to_result(&TraceAnalyzeResult {
                success: false,
                analysis_report: TraceAnalysisReport::default(),
                visualizations: vec![],
                recommendations: vec!["Trace file not found".to_string()],
            });
        }

        let duration = match args.time_range {
            Some(range) if range.end <= range.start => {
                return Err(CapabilityError::InvalidArgument(format!(
                    "timeRange.end ({}) must be greater than timeRange.start ({})",
                    range.end, range.start
                )));
            }
            Some(range) => (range.end - range.start).min(CAPTURE_DURATION_MS),
            None => CAPTURE_DURATION_MS,
        };
        let wants = |kind: AnalysisType| args.analysis_type.contains(&kind);

        let report = TraceAnalysisReport {
            duration,
            total_instructions: (CAPTURE_INSTRUCTIONS as f64 * duration / CAPTURE_DURATION_MS) as u64,
            timing: wants(AnalysisType::Timing).then(simulated_timing),
            coverage: wants(AnalysisType::Coverage).then(simulated_coverage),
            exceptions: wants(AnalysisType::Exceptions).then(Vec::new),
        };

        let mut visualizations = Vec::new();
        if report.timing.is_some() {
            visualizations.push(Visualization {
                kind: "timing_flamegraph".to_string(),
                path: format!("{}_timing.svg", args.trace_file),
            });
        }
        if report.coverage.is_some() {
            visualizations.push(Visualization {
                kind: "coverage_report".to_string(),
                path: format!("{}_coverage.{}", args.trace_file, args.output_format),
            });
        }
        debug!("Trace analysis of {} over {} ms", args.trace_file, duration);

        to_result(&TraceAnalyzeResult {
            success: true,
            recommendations: recommendations(&report, &args),
            analysis_report: report,
            visualizations,
        })
    }
}

// ============================================================================
// memory_map
// ============================================================================

fn section(name: &str, address: &str, size: u64, kind: SectionKind) -> MemorySection {
    MemorySection {
        name: name.to_string(),
        address: address.to_string(),
        size,
        kind,
    }
}

fn simulated_sections() -> Vec<MemorySection> {
    vec![
        section(".isr_vector", "0x08000000", 1024, SectionKind::Code),
        section(".text", "0x08000400", 45000, SectionKind::Code),
        section(".rodata", "0x0800B400", 2048, SectionKind::Rodata),
        section(".data", "0x20000000", 1024, SectionKind::Data),
        section(".bss", "0x20000400", 8192, SectionKind::Bss),
        section(".heap", "0x20002400", 32768, SectionKind::Heap),
        section(".stack", "0x2000A400", 16384, SectionKind::Stack),
        section(".ai_buffer", "0x20100000", 262_144, SectionKind::Data),
    ]
}

fn symbol(name: &str, size: u64, section: &str, address: &str) -> SymbolInfo {
    SymbolInfo {
        name: name.to_string(),
        size,
        section: section.to_string(),
        address: address.to_string(),
    }
}

/// Largest first
fn simulated_symbols() -> Vec<SymbolInfo> {
    let mut symbols = vec![
        symbol("ai_model_weights", 850_000, ".rodata", "0x08010000"),
        symbol("frame_buffer", 307_200, ".bss", "0x20100000"),
        symbol("neural_network_input", 150_528, ".bss", "0x2014B000"),
        symbol("dma_tx_buffer", 4096, ".bss", "0x20000800"),
        symbol("dma_rx_buffer", 4096, ".bss", "0x20001800"),
        symbol("freertos_heap", 32768, ".heap", "0x20002400"),
        symbol("main_stack", 16384, ".stack", "0x2000A400"),
    ];
    symbols.sort_by(|a, b| b.size.cmp(&a.size));
    symbols
}

/// Usage of the sections that land in a memory region
pub fn usage(sections: &[MemorySection], kinds: &[SectionKind], total: u64) -> MemoryUsageDetail {
    let used: u64 = sections.iter().filter(|s| kinds.contains(&s.kind)).map(|s| s.size).sum();
    MemoryUsageDetail {
        used,
        total,
        percentage: used as f64 / total as f64 * 100.0,
    }
}

pub struct MemoryMapTool;

#[async_trait]
impl Capability for MemoryMapTool {
    fn name(&self) -> &str {
        "memory_map"
    }

    fn description(&self) -> &str {
        "Generate memory map visualization and analysis"
    }

    fn category(&self) -> Category {
        Category::Analysis
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            ("elfPath", Schema::string().optional().describe("Path to ELF file")),
            ("mapPath", Schema::string().optional().describe("Path to linker map file")),
            (
                "analysisType",
                Schema::array(Schema::enumeration(&["sections", "symbols", "peripheral", "usage"]))
                    .default_value(json!(["sections", "usage"])),
            ),
            (
                "outputFormat",
                Schema::enumeration(&["json", "svg", "html"]).default_value(json!("json")),
            ),
        ])
    }

    async fn execute(&self, params: Value, _ctx: &ExecutionContext) -> Result<Value, CapabilityError> {
        let args: MemoryMapArgs = parse_params(params)?;
        let sections = simulated_sections();
        let memory_usage = MemoryUsage {
            flash: usage(&sections, &[SectionKind::Code, SectionKind::Rodata], FLASH_TOTAL),
            ram: usage(
                &sections,
                &[SectionKind::Data, SectionKind::Bss, SectionKind::Heap, SectionKind::Stack],
                RAM_TOTAL,
            ),
        };
        let extension = if args.output_format == "svg" { "svg" } else { "html" };
        debug!("Memory map for {:?} ({:?})", args.elf_path, args.analysis_type);

        to_result(&MemoryMapResult {
            success: true,
            sections,
            memory_usage,
            largest_symbols: simulated_symbols(),
            visualization_path: args
                .elf_path
                .as_ref()
                .map(|elf| format!("{}_memory_map.{}", elf, extension)),
        })
    }
}
