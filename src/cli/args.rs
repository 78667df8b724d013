//! CLI argument definitions
//!
//! All Clap derive structs for `CrowdSafe` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Crowd-crush safety training scenario engine.
#[derive(Parser, Debug)]
#[command(name = "crowdsafe", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "CROWDSAFE_COLOR")]
    pub color: ColorChoice,

    /// Log line format.
    #[arg(long, default_value = "human", global = true, env = "CROWDSAFE_LOG_FORMAT")]
    pub log_format: LogFormatChoice,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scenario headlessly against a scripted input timeline.
    Run(RunArgs),

    /// Validate scenario configuration files.
    Validate(ValidateArgs),

    /// Print the phase order and each phase's steps.
    Phases(PhasesArgs),

    /// Display version and build information.
    Version(VersionArgs),
}

// ============================================================================
// Run / Validate / Phases
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the scenario configuration file (defaults apply when omitted).
    #[arg(short, long, env = "CROWDSAFE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the input timeline to replay.
    #[arg(short, long)]
    pub inputs: PathBuf,

    /// Write structured JSONL events to this file instead of stderr.
    #[arg(long, env = "CROWDSAFE_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "CROWDSAFE_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Give up after this long (e.g. "5m").
    #[arg(long, value_parser = humantime::parse_duration)]
    pub max_duration: Option<std::time::Duration>,

    /// Run without the UI collaborator (every visual step is skipped).
    #[arg(long)]
    pub no_ui: bool,

    /// Output format for the run summary.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `phases`.
#[derive(Args, Debug)]
pub struct PhasesArgs {
    /// Configuration whose timings to show (defaults apply when omitted).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatChoice {
    /// Human-readable lines.
    #[default]
    Human,
    /// Newline-delimited JSON.
    Json,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================
