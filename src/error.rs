//! Error types for the STM32N6 development MCP server

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::envelope::FieldIssue;

/// Startup and configuration errors for the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Agent already registered: {0}")]
    DuplicateAgent(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid hook target pattern: {0}")]
    HookPattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error category reported in the wire-level error envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Validation,
    Toolchain,
    Build,
    Connection,
    Integration,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Toolchain => "toolchain",
            ErrorCategory::Build => "build",
            ErrorCategory::Connection => "connection",
            ErrorCategory::Integration => "integration",
            ErrorCategory::Internal => "internal",
        }
    }
}

/// Wire error codes
pub mod codes {
    pub const INVALID_INPUT: &str = "invalid-input";
    pub const INTERNAL_ERROR: &str = "internal-error";
    pub const UNKNOWN_CAPABILITY: &str = "unknown-capability";
    pub const DISABLED_CAPABILITY: &str = "disabled-capability";
    pub const HOOK_VETOED: &str = "hook-vetoed";
}

/// Failure raised by a capability's `execute`
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// Structured input failed to match the capability's typed parameters
    #[error("Invalid input parameters")]
    InvalidInput(Vec<FieldIssue>),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl CapabilityError {
    /// Whether this error is validation-shaped (bad caller input) rather than internal
    pub fn is_validation(&self) -> bool {
        matches!(self, CapabilityError::InvalidInput(_) | CapabilityError::InvalidArgument(_))
    }

    pub fn category(&self) -> ErrorCategory {
        if self.is_validation() {
            ErrorCategory::Validation
        } else {
            ErrorCategory::Internal
        }
    }

    pub fn code(&self) -> &'static str {
        if self.is_validation() {
            codes::INVALID_INPUT
        } else {
            codes::INTERNAL_ERROR
        }
    }
}

/// Failure raised by a hook handler. Never fatal to the hook chain.
#[derive(Error, Debug)]
pub enum HookError {
    #[error("Hook failed: {0}")]
    Failed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&ErrorCategory::Validation).unwrap();
        assert_eq!(json, "\"validation\"");
        assert_eq!(ErrorCategory::Internal.as_str(), "internal");
    }

    #[test]
    fn test_bad_hook_pattern_is_a_startup_error() {
        let err: ServerError = regex::Regex::new("(unclosed").unwrap_err().into();
        assert!(err.to_string().starts_with("Invalid hook target pattern"));
    }

    #[test]
    fn test_capability_error_classification() {
        let err = CapabilityError::InvalidArgument("bad".to_string());
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.code(), codes::INVALID_INPUT);

        let err = CapabilityError::InternalError("boom".to_string());
        assert_eq!(err.category(), ErrorCategory::Internal);
        assert_eq!(err.code(), codes::INTERNAL_ERROR);
        assert_eq!(err.to_string(), "Internal error: boom");
    }
}
