//! Type definitions for STM32N6 MCP tools

use serde::{Deserialize, Serialize};

// ============================================================================
// Shared enumerations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildType {
    Debug,
    Release,
    MinSizeRel,
}

impl BuildType {
    pub const VARIANTS: &'static [&'static str] = &["Debug", "Release", "MinSizeRel"];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
            BuildType::MinSizeRel => "MinSizeRel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugProbe {
    Stlink,
    Jlink,
    Ulink,
}

impl DebugProbe {
    pub const VARIANTS: &'static [&'static str] = &["stlink", "jlink", "ulink"];

    pub fn as_str(&self) -> &'static str {
        match self {
            DebugProbe::Stlink => "stlink",
            DebugProbe::Jlink => "jlink",
            DebugProbe::Ulink => "ulink",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugInterface {
    Swd,
    Jtag,
}

impl DebugInterface {
    pub const VARIANTS: &'static [&'static str] = &["swd", "jtag"];

    pub fn as_str(&self) -> &'static str {
        match self {
            DebugInterface::Swd => "swd",
            DebugInterface::Jtag => "jtag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantizationScheme {
    Int8,
    Int4,
    Mixed,
    Fp16,
}

impl QuantizationScheme {
    pub const VARIANTS: &'static [&'static str] = &["int8", "int4", "mixed", "fp16"];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuantizationScheme::Int8 => "int8",
            QuantizationScheme::Int4 => "int4",
            QuantizationScheme::Mixed => "mixed",
            QuantizationScheme::Fp16 => "fp16",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizeFor {
    Latency,
    Memory,
    Balanced,
}

impl OptimizeFor {
    pub const VARIANTS: &'static [&'static str] = &["latency", "memory", "balanced"];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizeFor::Latency => "latency",
            OptimizeFor::Memory => "memory",
            OptimizeFor::Balanced => "balanced",
        }
    }
}

/// A source artifact produced by a code generation tool
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Source,
    Header,
    Config,
    Documentation,
    Example,
}

// ============================================================================
// stm32_build
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildArgs {
    pub project_path: String,
    /// Falls back to `build.default_build_type`
    #[serde(default)]
    pub build_type: Option<BuildType>,
    pub target: String,
    pub verbose: bool,
    pub clean: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildDiagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SizeReport {
    pub text: u64,
    pub data: u64,
    pub bss: u64,
    pub flash: u64,
    pub ram: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_path: Option<String>,
    pub errors: Vec<BuildDiagnostic>,
    pub warnings: Vec<BuildDiagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_report: Option<SizeReport>,
}

// ============================================================================
// stm32_flash
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EraseType {
    Full,
    Sector,
    None,
}

impl EraseType {
    pub const VARIANTS: &'static [&'static str] = &["full", "sector", "none"];

    pub fn as_str(&self) -> &'static str {
        match self {
            EraseType::Full => "full",
            EraseType::Sector => "sector",
            EraseType::None => "none",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashArgs {
    pub binary_path: String,
    /// Falls back to `target.flash_base`
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub probe: Option<DebugProbe>,
    #[serde(default)]
    pub interface: Option<DebugInterface>,
    pub verify: bool,
    pub reset: bool,
    pub erase_type: EraseType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub chip_id: String,
    pub flash_size: u64,
    pub ram_size: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashResult {
    pub success: bool,
    pub bytes_written: u64,
    /// Seconds spent programming
    pub duration: f64,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_info: Option<TargetInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

// ============================================================================
// stm32_debug
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RtosAwareness {
    None,
    Freertos,
    Threadx,
}

impl RtosAwareness {
    pub const VARIANTS: &'static [&'static str] = &["none", "freertos", "threadx"];

    pub fn as_str(&self) -> &'static str {
        match self {
            RtosAwareness::None => "none",
            RtosAwareness::Freertos => "freertos",
            RtosAwareness::Threadx => "threadx",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugArgs {
    pub elf_path: String,
    #[serde(default)]
    pub probe: Option<DebugProbe>,
    #[serde(default)]
    pub interface: Option<DebugInterface>,
    /// kHz; falls back to `debug.speed_khz`
    #[serde(default)]
    pub speed: Option<u32>,
    pub swv: bool,
    pub swv_speed: u32,
    pub rtos_awareness: RtosAwareness,
    #[serde(default)]
    pub init_commands: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gdb_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telnet_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_status: Option<String>,
    pub message: String,
}

// ============================================================================
// peripheral_config
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DriverType {
    #[serde(rename = "HAL")]
    Hal,
    #[serde(rename = "LL")]
    Ll,
}

impl DriverType {
    pub const VARIANTS: &'static [&'static str] = &["HAL", "LL"];

    pub fn as_str(&self) -> &'static str {
        match self {
            DriverType::Hal => "HAL",
            DriverType::Ll => "LL",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeripheralArgs {
    pub peripheral: String,
    pub mode: String,
    pub config: serde_json::Value,
    #[serde(default)]
    pub output_path: Option<String>,
    pub use_dma: bool,
    pub use_interrupts: bool,
    pub driver_type: DriverType,
    pub generate_example: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinAssignment {
    pub pin: String,
    pub mode: String,
    pub pull: String,
    pub alternate: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct DmaChannel {
    pub stream: String,
    pub channel: u8,
    pub direction: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptConfig {
    pub irq: String,
    pub priority: u8,
    pub sub_priority: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeripheralConfigResult {
    pub success: bool,
    pub files: Vec<GeneratedFile>,
    pub pin_config: Vec<PinAssignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dma_config: Option<Vec<DmaChannel>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt_config: Option<Vec<InterruptConfig>>,
}

// ============================================================================
// clock_config
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ClockSource {
    #[serde(rename = "HSI")]
    Hsi,
    #[serde(rename = "HSE")]
    Hse,
    #[serde(rename = "PLL")]
    Pll,
}

impl ClockSource {
    pub const VARIANTS: &'static [&'static str] = &["HSI", "HSE", "PLL"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClockSource::Hsi => "HSI",
            ClockSource::Hse => "HSE",
            ClockSource::Pll => "PLL",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PllConfig {
    pub m: u32,
    pub n: u32,
    pub p: u32,
    pub q: u32,
    pub r: u32,
}

impl Default for PllConfig {
    fn default() -> Self {
        Self { m: 5, n: 160, p: 2, q: 2, r: 2 }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BusPrescalers {
    pub ahb: u32,
    pub apb1: u32,
    pub apb2: u32,
    pub apb3: u32,
}

impl Default for BusPrescalers {
    fn default() -> Self {
        Self { ahb: 1, apb1: 4, apb2: 2, apb3: 2 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockArgs {
    pub sysclk: u64,
    pub source: ClockSource,
    #[serde(default)]
    pub hse_frequency: Option<u64>,
    #[serde(default)]
    pub pll_config: Option<PllConfig>,
    #[serde(default)]
    pub bus_prescalers: Option<BusPrescalers>,
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClockFrequencies {
    pub sysclk: u64,
    pub hclk: u64,
    pub pclk1: u64,
    pub pclk2: u64,
    pub pclk3: u64,
}

#[derive(Debug, Serialize)]
pub struct ClockConfigResult {
    pub success: bool,
    pub frequencies: ClockFrequencies,
    pub files: Vec<GeneratedFile>,
    pub warnings: Vec<String>,
}

// ============================================================================
// model_convert / model_quantize
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Onnx,
    Tflite,
    Pytorch,
    Keras,
}

impl ModelFormat {
    pub const VARIANTS: &'static [&'static str] = &["onnx", "tflite", "pytorch", "keras"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::Onnx => "onnx",
            ModelFormat::Tflite => "tflite",
            ModelFormat::Pytorch => "pytorch",
            ModelFormat::Keras => "keras",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvertOutputFormat {
    Stedgeai,
    TfliteMicro,
}

impl ConvertOutputFormat {
    pub const VARIANTS: &'static [&'static str] = &["stedgeai", "tflite_micro"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConvertOutputFormat::Stedgeai => "stedgeai",
            ConvertOutputFormat::TfliteMicro => "tflite_micro",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConvertArgs {
    pub input_model: String,
    pub input_format: ModelFormat,
    #[serde(default)]
    pub output_path: Option<String>,
    pub output_format: ConvertOutputFormat,
    pub target_device: String,
    #[serde(default)]
    pub optimize_for: Option<OptimizeFor>,
    pub use_cloud: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub framework: ModelFormat,
    pub input_shape: Vec<u32>,
    pub output_shape: Vec<u32>,
    pub parameters: u64,
    pub operations: Vec<String>,
    pub supported_operators: Vec<String>,
    pub unsupported_operators: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEstimate {
    pub weights_ram: u64,
    pub activations_ram: u64,
    pub total_ram: u64,
    pub flash: u64,
}

#[derive(Debug, Serialize)]
pub struct ConversionReport {
    pub path: String,
    pub summary: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConvertResult {
    pub success: bool,
    pub output_path: String,
    pub model_info: ModelInfo,
    pub memory_estimate: MemoryEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ConversionReport>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelQuantizeArgs {
    pub input_model: String,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub quantization_scheme: Option<QuantizationScheme>,
    #[serde(default)]
    pub calibration_data: Option<String>,
    pub calibration_samples: u32,
    pub evaluate_accuracy: bool,
    #[serde(default)]
    pub evaluation_data: Option<String>,
    #[serde(default)]
    pub target_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyMetrics {
    pub original_accuracy: f64,
    pub quantized_accuracy: f64,
    pub accuracy_drop: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantizationReport {
    pub original_size: u64,
    pub quantized_size: u64,
    pub compression_ratio: f64,
    /// Milliseconds per inference
    pub estimated_latency: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_metrics: Option<AccuracyMetrics>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerAnalysis {
    pub layer: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub original_size: u64,
    pub quantized_size: u64,
    pub dynamic_range: (i32, i32),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelQuantizeResult {
    pub success: bool,
    pub output_path: String,
    pub quantization_report: QuantizationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_analysis: Option<Vec<LayerAnalysis>>,
}

// ============================================================================
// trace_analyze
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisType {
    Timing,
    Coverage,
    Exceptions,
    Data,
    PcSampling,
    Itm,
}

impl AnalysisType {
    pub const VARIANTS: &'static [&'static str] =
        &["timing", "coverage", "exceptions", "data", "pc-sampling", "itm"];
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceArgs {
    pub trace_file: String,
    pub analysis_type: Vec<AnalysisType>,
    #[serde(default)]
    pub elf_file: Option<String>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    pub output_format: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionTiming {
    pub name: String,
    pub total_time: f64,
    pub call_count: u32,
    pub avg_time: f64,
    pub max_time: f64,
    pub min_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimingReport {
    pub functions: Vec<FunctionTiming>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub line_coverage: f64,
    pub function_coverage: f64,
    pub uncovered_functions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceException {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: f64,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceAnalysisReport {
    /// Milliseconds covered by the capture
    pub duration: f64,
    pub total_instructions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exceptions: Option<Vec<TraceException>>,
}

#[derive(Debug, Serialize)]
pub struct Visualization {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceAnalyzeResult {
    pub success: bool,
    pub analysis_report: TraceAnalysisReport,
    pub visualizations: Vec<Visualization>,
    pub recommendations: Vec<String>,
}

// ============================================================================
// memory_map
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMapArgs {
    #[serde(default)]
    pub elf_path: Option<String>,
    #[serde(default)]
    pub map_path: Option<String>,
    pub analysis_type: Vec<String>,
    pub output_format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Code,
    Data,
    Bss,
    Rodata,
    Heap,
    Stack,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemorySection {
    pub name: String,
    pub address: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: SectionKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsageDetail {
    pub used: u64,
    pub total: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryUsage {
    pub flash: MemoryUsageDetail,
    pub ram: MemoryUsageDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolInfo {
    pub name: String,
    pub size: u64,
    pub section: String,
    pub address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMapResult {
    pub success: bool,
    pub sections: Vec<MemorySection>,
    pub memory_usage: MemoryUsage,
    pub largest_symbols: Vec<SymbolInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization_path: Option<String>,
}

// ============================================================================
// register_inspect
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterAction {
    Read,
    Write,
    Modify,
    ReadAll,
}

impl RegisterAction {
    pub const VARIANTS: &'static [&'static str] = &["read", "write", "modify", "read_all"];
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterArgs {
    pub action: RegisterAction,
    pub peripheral: String,
    pub register: String,
    #[serde(default)]
    pub value: Option<u32>,
    #[serde(default)]
    pub mask: Option<u32>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BitField {
    pub name: String,
    pub position: String,
    pub value: u32,
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInspectResult {
    pub success: bool,
    pub value: u32,
    pub hex_value: String,
    pub binary_value: String,
    pub bits: Vec<BitField>,
    pub description: String,
}
