//! Edge AI tools: `model_convert` and `model_quantize`
//!
//! Both simulate ST Edge AI. Model analysis returns a MobileNet-like profile;
//! quantization sizes are derived from the real input file size.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::path_exists;
use super::types::{
    AccuracyMetrics, ConversionReport, ConvertOutputFormat, LayerAnalysis, MemoryEstimate, ModelConvertArgs,
    ModelConvertResult, ModelFormat, ModelInfo, ModelQuantizeArgs, ModelQuantizeResult, OptimizeFor,
    QuantizationReport, QuantizationScheme,
};
use crate::capability::{parse_params, to_result, Capability, Category};
use crate::context::ExecutionContext;
use crate::error::CapabilityError;
use crate::schema::Schema;

const SIMULATED_PARAMETERS: u64 = 3_400_000;
const ACTIVATIONS_RAM: u64 = 1024 * 1024;
const RUNTIME_FLASH: u64 = 32 * 1024;
const BASE_LATENCY_MS: f64 = 15.0;
const BASE_ACCURACY: f64 = 0.92;

const OPERATIONS: &[&str] = &[
    "Conv2D",
    "BatchNormalization",
    "ReLU",
    "DepthwiseConv2D",
    "GlobalAveragePooling2D",
    "FullyConnected",
    "Softmax",
];

/// (layer, type, share of model size)
const LAYERS: &[(&str, &str, f64)] = &[
    ("conv1", "Conv2D", 0.15),
    ("conv2_dw", "DepthwiseConv2D", 0.02),
    ("conv2_pw", "Conv2D", 0.12),
    ("conv3_dw", "DepthwiseConv2D", 0.02),
    ("conv3_pw", "Conv2D", 0.18),
    ("fc", "FullyConnected", 0.25),
];

/// `dir/model.onnx` + `_int8` → `dir/model_int8`
fn sibling_output(input: &str, suffix: &str) -> String {
    let stem = Path::new(input).with_extension("");
    format!("{}{}", stem.display(), suffix)
}

fn model_name(input: &str) -> String {
    Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

impl QuantizationScheme {
    pub fn compression_ratio(&self) -> f64 {
        match self {
            QuantizationScheme::Int8 => 4.0,
            QuantizationScheme::Int4 => 8.0,
            QuantizationScheme::Mixed => 3.0,
            QuantizationScheme::Fp16 => 2.0,
        }
    }

    pub fn latency_speedup(&self) -> f64 {
        match self {
            QuantizationScheme::Int8 => 2.5,
            QuantizationScheme::Int4 => 3.0,
            QuantizationScheme::Mixed => 2.0,
            QuantizationScheme::Fp16 => 1.5,
        }
    }

    pub fn accuracy_drop(&self) -> f64 {
        match self {
            QuantizationScheme::Int8 => 0.005,
            QuantizationScheme::Int4 => 0.02,
            QuantizationScheme::Mixed => 0.01,
            QuantizationScheme::Fp16 => 0.001,
        }
    }

    fn dynamic_range(&self) -> (i32, i32) {
        match self {
            QuantizationScheme::Int4 => (-8, 7),
            _ => (-128, 127),
        }
    }
}

pub fn estimate_memory(parameters: u64) -> MemoryEstimate {
    let float32_bytes = parameters * 4;
    // int8 storage
    let weights = float32_bytes / 4;
    MemoryEstimate {
        weights_ram: weights,
        activations_ram: ACTIVATIONS_RAM,
        total_ram: weights + ACTIVATIONS_RAM,
        flash: weights + RUNTIME_FLASH,
    }
}

// ============================================================================
// model_convert
// ============================================================================

pub struct ModelConvertTool;

fn analyze_model(args: &ModelConvertArgs) -> ModelInfo {
    let operations: Vec<String> = OPERATIONS.iter().map(|s| s.to_string()).collect();
    ModelInfo {
        name: model_name(&args.input_model),
        framework: args.input_format,
        input_shape: vec![1, 224, 224, 3],
        output_shape: vec![1, 1000],
        parameters: SIMULATED_PARAMETERS,
        supported_operators: operations.clone(),
        operations,
        unsupported_operators: vec![],
    }
}

fn conversion_summary(
    info: &ModelInfo,
    memory: &MemoryEstimate,
    format: ConvertOutputFormat,
    optimize_for: OptimizeFor,
    target: &str,
) -> String {
    let kb = |bytes: u64| format!("{:.1} KB", bytes as f64 / 1024.0);
    let unsupported = if info.unsupported_operators.is_empty() {
        "None".to_string()
    } else {
        info.unsupported_operators.join(", ")
    };
    format!(
        "Model Conversion Summary\n\
         ========================\n\n\
         Model: {}\n\
         Framework: {}\n\
         Target: {} ({})\n\
         Optimized for: {}\n\
         Input Shape:  {:?}\n\
         Output Shape: {:?}\n\
         Parameters: {:.2}M\n\n\
         Operations: {}\n\
         Supported Operators: {}/{}\n\
         Unsupported: {}\n\n\
         Memory Estimation (int8 quantized):\n  \
         Weights:     {}\n  \
         Activations: {}\n  \
         Total RAM:   {}\n  \
         Flash:       {}\n\n\
         Status: Ready for Neural-ART deployment\n",
        info.name,
        info.framework.as_str(),
        target,
        format.as_str(),
        optimize_for.as_str(),
        info.input_shape,
        info.output_shape,
        info.parameters as f64 / 1_000_000.0,
        info.operations.len(),
        info.supported_operators.len(),
        info.operations.len(),
        unsupported,
        kb(memory.weights_ram),
        kb(memory.activations_ram),
        kb(memory.total_ram),
        kb(memory.flash),
    )
}

#[async_trait]
impl Capability for ModelConvertTool {
    fn name(&self) -> &str {
        "model_convert"
    }

    fn description(&self) -> &str {
        "Convert ML models for STM32N6 Neural-ART deployment"
    }

    fn category(&self) -> Category {
        Category::AiMl
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            ("inputModel", Schema::string().describe("Path to input model file")),
            ("inputFormat", Schema::enumeration(ModelFormat::VARIANTS)),
            ("outputPath", Schema::string().optional()),
            (
                "outputFormat",
                Schema::enumeration(ConvertOutputFormat::VARIANTS).default_value(json!("stedgeai")),
            ),
            ("targetDevice", Schema::string().default_value(json!("STM32N6570"))),
            (
                "optimizeFor",
                Schema::enumeration(OptimizeFor::VARIANTS)
                    .optional()
                    .describe("Defaults to edge_ai.optimize_for"),
            ),
            ("useCloud", Schema::boolean().default_value(json!(false))),
        ])
    }

    async fn execute(&self, params: Value, ctx: &ExecutionContext) -> Result<Value, CapabilityError> {
        let args: ModelConvertArgs = parse_params(params)?;
        let edge_ai = &ctx.config().edge_ai;

        if !path_exists(&ctx.resolve_path(&args.input_model)).await {
            return to_result(&ModelConvertResult {
                success: false,
                output_path: String::new(),
                model_info: ModelInfo {
                    name: String::new(),
                    framework: args.input_format,
                    input_shape: vec![],
                    output_shape: vec![],
                    parameters: 0,
                    operations: vec![],
                    supported_operators: vec![],
                    unsupported_operators: vec![],
                },
                memory_estimate: MemoryEstimate::default(),
                report: None,
            });
        }

        if args.use_cloud && edge_ai.developer_cloud_api.is_none() {
            return Err(CapabilityError::InvalidArgument(
                "useCloud requires edge_ai.developer_cloud_api to be configured".to_string(),
            ));
        }

        let optimize_for = args.optimize_for.unwrap_or(edge_ai.optimize_for);
        let info = analyze_model(&args);
        let memory = estimate_memory(info.parameters);
        let output_path = args
            .output_path
            .clone()
            .unwrap_or_else(|| sibling_output(&args.input_model, "_converted"));
        info!("Converted {} for {} ({})", info.name, args.target_device, optimize_for.as_str());

        let summary = conversion_summary(&info, &memory, args.output_format, optimize_for, &args.target_device);
        to_result(&ModelConvertResult {
            success: true,
            report: Some(ConversionReport {
                path: format!("{}_report.json", output_path),
                summary,
            }),
            output_path,
            model_info: info,
            memory_estimate: memory,
        })
    }
}

// ============================================================================
// model_quantize
// ============================================================================

pub struct ModelQuantizeTool;

fn layer_analysis(scheme: QuantizationScheme, original_size: u64) -> Vec<LayerAnalysis> {
    LAYERS
        .iter()
        .map(|(layer, kind, share)| {
            let size = original_size as f64 * share;
            LayerAnalysis {
                layer: layer.to_string(),
                kind: kind.to_string(),
                original_size: size.ceil() as u64,
                quantized_size: (size / scheme.compression_ratio()).ceil() as u64,
                dynamic_range: scheme.dynamic_range(),
            }
        })
        .collect()
}

#[async_trait]
impl Capability for ModelQuantizeTool {
    fn name(&self) -> &str {
        "model_quantize"
    }

    fn description(&self) -> &str {
        "Quantize models for efficient Neural-ART execution"
    }

    fn category(&self) -> Category {
        Category::AiMl
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            ("inputModel", Schema::string().describe("Path to converted model")),
            ("outputPath", Schema::string().optional()),
            (
                "quantizationScheme",
                Schema::enumeration(QuantizationScheme::VARIANTS)
                    .optional()
                    .describe("Defaults to edge_ai.default_quantization"),
            ),
            (
                "calibrationData",
                Schema::string().optional().describe("Path to calibration dataset"),
            ),
            ("calibrationSamples", Schema::uint(u64::from(u32::MAX)).default_value(json!(100))),
            ("evaluateAccuracy", Schema::boolean().default_value(json!(true))),
            ("evaluationData", Schema::string().optional()),
            ("targetAccuracy", Schema::number().optional()),
        ])
    }

    async fn execute(&self, params: Value, ctx: &ExecutionContext) -> Result<Value, CapabilityError> {
        let args: ModelQuantizeArgs = parse_params(params)?;
        let model = ctx.resolve_path(&args.input_model);

        if !path_exists(&model).await {
            return to_result(&ModelQuantizeResult {
                success: false,
                output_path: String::new(),
                quantization_report: QuantizationReport {
                    original_size: 0,
                    quantized_size: 0,
                    compression_ratio: 0.0,
                    estimated_latency: 0.0,
                    accuracy_metrics: None,
                },
                layer_analysis: None,
            });
        }

        let scheme = args
            .quantization_scheme
            .unwrap_or(ctx.config().edge_ai.default_quantization);
        let original_size = tokio::fs::metadata(&model).await?.len();
        let ratio = scheme.compression_ratio();

        let accuracy_metrics = args.evaluate_accuracy.then(|| {
            let drop = scheme.accuracy_drop();
            AccuracyMetrics {
                original_accuracy: BASE_ACCURACY,
                quantized_accuracy: BASE_ACCURACY - drop,
                accuracy_drop: drop,
            }
        });
        if let (Some(metrics), Some(target)) = (&accuracy_metrics, args.target_accuracy) {
            if metrics.quantized_accuracy < target {
                warn!(
                    "Quantized accuracy {:.3} is below target {:.3} for {}",
                    metrics.quantized_accuracy,
                    target,
                    scheme.as_str()
                );
            }
        }

        let output_path = args
            .output_path
            .clone()
            .unwrap_or_else(|| sibling_output(&args.input_model, &format!("_{}", scheme.as_str())));
        info!("Quantized {} with {} ({} calibration samples)", args.input_model, scheme.as_str(), args.calibration_samples);

        to_result(&ModelQuantizeResult {
            success: true,
            output_path,
            quantization_report: QuantizationReport {
                original_size,
                quantized_size: (original_size as f64 / ratio).ceil() as u64,
                compression_ratio: ratio,
                estimated_latency: BASE_LATENCY_MS / scheme.latency_speedup(),
                accuracy_metrics,
            },
            layer_analysis: Some(layer_analysis(scheme, original_size)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::invoke;
    use crate::context::ServerContext;
    use tempfile::TempDir;

    #[test]
    fn test_sibling_output_replaces_extension() {
        assert_eq!(sibling_output("models/net.onnx", "_int8"), "models/net_int8");
        assert_eq!(sibling_output("net", "_converted"), "net_converted");
    }

    #[test]
    fn test_memory_estimate() {
        let memory = estimate_memory(SIMULATED_PARAMETERS);
        assert_eq!(memory.weights_ram, 3_400_000);
        assert_eq!(memory.total_ram, 3_400_000 + 1_048_576);
        assert_eq!(memory.flash, 3_400_000 + 32_768);
    }

    #[tokio::test]
    async fn test_convert_existing_model() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("mobilenet.onnx");
        std::fs::write(&model, b"onnx").unwrap();
        let ctx = ServerContext::for_tests().execution_context();

        let envelope = invoke(
            &ModelConvertTool,
            json!({"inputModel": model.to_str().unwrap(), "inputFormat": "onnx"}),
            &ctx,
        )
        .await
        .to_value();
        let data = &envelope["data"];
        assert_eq!(envelope["success"], true);
        assert_eq!(data["modelInfo"]["name"], "mobilenet");
        assert_eq!(data["modelInfo"]["framework"], "onnx");
        assert!(data["outputPath"].as_str().unwrap().ends_with("mobilenet_converted"));
        assert!(data["report"]["path"].as_str().unwrap().ends_with("_converted_report.json"));
        let summary = data["report"]["summary"].as_str().unwrap();
        assert!(summary.contains("Parameters: 3.40M"));
        assert!(summary.contains("Optimized for: balanced"));
    }

    #[tokio::test]
    async fn test_convert_cloud_requires_api() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("m.tflite");
        std::fs::write(&model, b"x").unwrap();
        let ctx = ServerContext::for_tests().execution_context();

        let envelope = invoke(
            &ModelConvertTool,
            json!({"inputModel": model.to_str().unwrap(), "inputFormat": "tflite", "useCloud": true}),
            &ctx,
        )
        .await
        .to_value();
        assert_eq!(envelope["error"]["category"], "validation");
    }

    #[tokio::test]
    async fn test_convert_missing_model() {
        let ctx = ServerContext::for_tests().execution_context();
        let envelope = invoke(&ModelConvertTool, json!({"inputModel": "nope.onnx", "inputFormat": "keras"}), &ctx)
            .await
            .to_value();
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["data"]["modelInfo"]["framework"], "keras");
        assert_eq!(envelope["data"]["memoryEstimate"]["flash"], 0);
    }

    #[tokio::test]
    async fn test_quantize_int4() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("net.tflite");
        std::fs::write(&model, vec![1u8; 8000]).unwrap();
        let ctx = ServerContext::for_tests().execution_context();

        let result = ModelQuantizeTool
            .execute(
                json!({
                    "inputModel": model.to_str().unwrap(),
                    "quantizationScheme": "int4",
                    "calibrationSamples": 100,
                    "evaluateAccuracy": true
                }),
                &ctx,
            )
            .await
            .unwrap();
        let report = &result["quantizationReport"];
        assert_eq!(report["originalSize"], 8000);
        assert_eq!(report["quantizedSize"], 1000);
        assert_eq!(report["compressionRatio"], 8.0);
        assert_eq!(report["estimatedLatency"], 5.0);
        assert_eq!(report["accuracyMetrics"]["accuracyDrop"], 0.02);
        assert!(result["outputPath"].as_str().unwrap().ends_with("net_int4"));

        let layers = result["layerAnalysis"].as_array().unwrap();
        assert_eq!(layers.len(), 6);
        assert_eq!(layers[0]["layer"], "conv1");
        assert_eq!(layers[0]["originalSize"], 1200);
        assert_eq!(layers[0]["quantizedSize"], 150);
        assert_eq!(layers[0]["dynamicRange"], json!([-8, 7]));
    }

    #[tokio::test]
    async fn test_quantize_uses_configured_scheme_and_skips_accuracy() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("net.bin");
        std::fs::write(&model, vec![0u8; 400]).unwrap();
        let ctx = ServerContext::for_tests().execution_context();

        let result = ModelQuantizeTool
            .execute(
                json!({"inputModel": model.to_str().unwrap(), "calibrationSamples": 10, "evaluateAccuracy": false}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(result["quantizationReport"]["quantizedSize"], 100);
        assert!(result["quantizationReport"].get("accuracyMetrics").is_none());
        assert!(result["outputPath"].as_str().unwrap().ends_with("net_int8"));
    }
}
