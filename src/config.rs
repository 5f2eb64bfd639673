//! Configuration for the STM32N6 development MCP server
//!
//! Values resolve in order: built-in defaults, TOML file, environment
//! snapshot, then command line arguments.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};
use crate::tools::types::{BuildType, DebugInterface, DebugProbe, OptimizeFor, QuantizationScheme};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "stm32n6-dev")]
#[command(about = "MCP server for STM32N6 development workflows")]
#[command(version)]
pub struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace). Overrides the config file.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log file path (defaults to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Tool execution timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Show resolved configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub validate_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub toolchain: ToolchainConfig,
    pub target: TargetConfig,
    pub debug: DebugConfig,
    pub build: BuildConfig,
    pub edge_ai: EdgeAiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: LogLevel,
    /// Advisory timeout handed to every tool execution
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub stm32cube_ide_path: Option<String>,
    pub gcc_arm_path: Option<String>,
    pub stm32cube_prog_path: Option<String>,
    pub st_edge_ai_path: Option<String>,
    pub openocd_path: Option<String>,
}

/// External toolchain entries that may be configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolchain {
    Stm32CubeIde,
    GccArm,
    Stm32CubeProg,
    StEdgeAi,
    OpenOcd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub mcu: String,
    pub board: String,
    pub flash_base: String,
    pub ram_base: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            mcu: "STM32N6570".to_string(),
            board: "STM32N6570-DK".to_string(),
            flash_base: "0x08000000".to_string(),
            ram_base: "0x20000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub probe: DebugProbe,
    pub interface: DebugInterface,
    pub speed_khz: u32,
    pub swo_enabled: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            probe: DebugProbe::Stlink,
            interface: DebugInterface::Swd,
            speed_khz: 4000,
            swo_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub default_build_type: BuildType,
    pub parallel_jobs: u32,
    pub warnings_as_errors: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            default_build_type: BuildType::Debug,
            parallel_jobs: 4,
            warnings_as_errors: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeAiConfig {
    pub developer_cloud_api: Option<String>,
    pub default_quantization: QuantizationScheme,
    pub optimize_for: OptimizeFor,
}

impl Default for EdgeAiConfig {
    fn default() -> Self {
        Self {
            developer_cloud_api: None,
            default_quantization: QuantizationScheme::Int8,
            optimize_for: OptimizeFor::Balanced,
        }
    }
}

impl Config {
    /// Resolve the full configuration for a server run
    pub fn resolve(args: &Args, env: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::load(args.config.as_ref())?;
        config.apply_env(env);
        config.merge_args(args);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file or create default
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    ServerError::InvalidConfig(format!("Failed to read config file {}: {}", path.display(), e))
                })?;
                let config: Config = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Config::default()),
        }
    }

    /// Apply overrides from an environment snapshot. Unparseable values are ignored.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) {
        let toolchain_vars: [(&str, &mut Option<String>); 5] = [
            ("STM32CUBE_IDE_PATH", &mut self.toolchain.stm32cube_ide_path),
            ("GCC_ARM_PATH", &mut self.toolchain.gcc_arm_path),
            ("STM32CUBE_PROG_PATH", &mut self.toolchain.stm32cube_prog_path),
            ("ST_EDGE_AI_PATH", &mut self.toolchain.st_edge_ai_path),
            ("OPENOCD_PATH", &mut self.toolchain.openocd_path),
        ];
        for (var, slot) in toolchain_vars {
            if let Some(value) = env.get(var).filter(|v| !v.is_empty()) {
                *slot = Some(value.clone());
            }
        }

        if let Some(level) = env.get("STM32N6_LOG_LEVEL").and_then(|v| LogLevel::parse(v)) {
            self.server.log_level = level;
        }
        if let Some(timeout) = env.get("STM32N6_TIMEOUT").and_then(|v| v.parse::<u64>().ok()) {
            self.server.timeout_ms = timeout;
        }
    }

    /// Merge command line arguments into configuration
    pub fn merge_args(&mut self, args: &Args) {
        if let Some(level) = args.log_level.as_deref().and_then(LogLevel::parse) {
            self.server.log_level = level;
        }
        if let Some(timeout) = args.timeout {
            self.server.timeout_ms = timeout;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.timeout_ms == 0 {
            return Err(ServerError::InvalidConfig("server.timeout_ms must be > 0".to_string()));
        }
        if self.build.parallel_jobs == 0 {
            return Err(ServerError::InvalidConfig("build.parallel_jobs must be > 0".to_string()));
        }
        if self.debug.speed_khz == 0 {
            return Err(ServerError::InvalidConfig("debug.speed_khz must be > 0".to_string()));
        }
        for (field, value) in [
            ("target.flash_base", &self.target.flash_base),
            ("target.ram_base", &self.target.ram_base),
        ] {
            if parse_hex(value).is_none() {
                return Err(ServerError::InvalidConfig(format!(
                    "{} must be a hex address, got '{}'",
                    field, value
                )));
            }
        }
        Ok(())
    }

    pub fn is_tool_available(&self, tool: Toolchain) -> bool {
        self.tool_path(tool, None).is_some_and(|p| !p.is_empty())
    }

    /// Configured path for a toolchain entry, or `fallback`
    pub fn tool_path(&self, tool: Toolchain, fallback: Option<&str>) -> Option<String> {
        let configured = match tool {
            Toolchain::Stm32CubeIde => &self.toolchain.stm32cube_ide_path,
            Toolchain::GccArm => &self.toolchain.gcc_arm_path,
            Toolchain::Stm32CubeProg => &self.toolchain.stm32cube_prog_path,
            Toolchain::StEdgeAi => &self.toolchain.st_edge_ai_path,
            Toolchain::OpenOcd => &self.toolchain.openocd_path,
        };
        configured.clone().or_else(|| fallback.map(String::from))
    }

    /// Render the configuration as TOML (for `--show-config`)
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ServerError::InvalidConfig(format!("Failed to serialize config: {}", e)))
    }
}

/// Parse a `0x`-prefixed hex address
pub fn parse_hex(value: &str) -> Option<u64> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.timeout_ms, 60_000);
        assert_eq!(config.server.log_level, LogLevel::Info);
        assert_eq!(config.target.mcu, "STM32N6570");
        assert_eq!(config.debug.speed_khz, 4000);
        assert_eq!(config.build.parallel_jobs, 4);
        assert_eq!(config.edge_ai.default_quantization, QuantizationScheme::Int8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_args_parsing_defaults() {
        let args = Args::parse_from(["stm32n6-dev"]);
        assert!(args.config.is_none());
        assert!(args.log_level.is_none());
        assert!(args.timeout.is_none());
        assert!(!args.show_config);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(&env(&[
            ("GCC_ARM_PATH", "/opt/gcc-arm"),
            ("STM32N6_LOG_LEVEL", "debug"),
            ("STM32N6_TIMEOUT", "5000"),
        ]));
        assert_eq!(config.toolchain.gcc_arm_path.as_deref(), Some("/opt/gcc-arm"));
        assert_eq!(config.server.log_level, LogLevel::Debug);
        assert_eq!(config.server.timeout_ms, 5000);
        assert!(config.is_tool_available(Toolchain::GccArm));
        assert!(!config.is_tool_available(Toolchain::OpenOcd));
    }

    #[test]
    fn test_env_invalid_values_ignored() {
        let mut config = Config::default();
        config.apply_env(&env(&[("STM32N6_LOG_LEVEL", "verbose"), ("STM32N6_TIMEOUT", "soon")]));
        assert_eq!(config.server.log_level, LogLevel::Info);
        assert_eq!(config.server.timeout_ms, 60_000);
    }

    #[test]
    fn test_trace_level_accepted_from_env_and_args() {
        let mut config = Config::default();
        config.apply_env(&env(&[("STM32N6_LOG_LEVEL", "trace")]));
        assert_eq!(config.server.log_level, LogLevel::Trace);

        let args = Args::parse_from(["stm32n6-dev", "--log-level", "trace"]);
        let config = Config::resolve(&args, &HashMap::new()).unwrap();
        assert_eq!(config.server.log_level.as_str(), "trace");
    }

    #[test]
    fn test_args_override_env() {
        let args = Args::parse_from(["stm32n6-dev", "--timeout", "1234", "--log-level", "warn"]);
        let config = Config::resolve(&args, &env(&[("STM32N6_TIMEOUT", "5000")])).unwrap();
        assert_eq!(config.server.timeout_ms, 1234);
        assert_eq!(config.server.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_load_partial_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[build]\nparallel_jobs = 8\n\n[debug]\nprobe = \"jlink\"").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.build.parallel_jobs, 8);
        assert_eq!(config.debug.probe, DebugProbe::Jlink);
        assert_eq!(config.server.timeout_ms, 60_000);
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[build\nparallel_jobs = ").unwrap();
        let result = Config::load(Some(&file.path().to_path_buf()));
        assert!(matches!(result, Err(ServerError::TomlError(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.server.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.target.flash_base = "08000000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tool_path_fallback() {
        let config = Config::default();
        assert_eq!(
            config.tool_path(Toolchain::OpenOcd, Some("openocd")).as_deref(),
            Some("openocd")
        );
        assert!(config.tool_path(Toolchain::OpenOcd, None).is_none());
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("0x08000000"), Some(0x0800_0000));
        assert_eq!(parse_hex("0X20"), Some(0x20));
        assert_eq!(parse_hex("1234"), None);
        assert_eq!(parse_hex("0xZZ"), None);
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.target.board, config.target.board);
    }
}
