//! Error types for `CrowdSafe`
//!
//! The scenario core itself has almost no failure paths: missing
//! collaborators, out-of-range zone indices and counter underflow all
//! degrade silently. What remains here is configuration loading, the few
//! constructor checks the engine performs, and the CLI exit code mapping.

use std::path::PathBuf;
use thiserror::Error;

use crate::scenario::Phase;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `CrowdSafe` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Scenario engine error (invalid hold target, cancelled run)
    pub const PHASE_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `CrowdSafe` operations.
///
/// Aggregates the domain-specific errors and maps each onto an exit code.
#[derive(Debug, Error)]
pub enum CrowdSafeError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scenario engine error
    #[error(transparent)]
    Phase(#[from] PhaseError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CrowdSafeError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Phase(_) => ExitCode::PHASE_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Scenario configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at {location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Location in the configuration where it was referenced
        location: String,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "hold.pose_target")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the configuration from being used
    Error,
    /// Reported, but the configuration still loads
    Warning,
}

// ============================================================================
// Scenario Engine Errors
// ============================================================================

/// Scenario engine errors.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// A hold timer was configured with a non-positive or non-finite target
    #[error("invalid hold target: {0} (must be a positive number of seconds)")]
    InvalidHoldTarget(f32),

    /// The scenario run was cancelled before reaching `Finished`
    #[error("scenario cancelled during phase {phase}")]
    Cancelled {
        /// Phase that was current when the run stopped
        phase: Phase,
    },
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `CrowdSafe` operations.
pub type Result<T> = std::result::Result<T, CrowdSafeError>;
