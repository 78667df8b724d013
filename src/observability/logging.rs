//! Tracing subscriber setup.
//!
//! The `-v` flags only raise the level of the engine's own `crowdsafe`
//! target; dependencies stay at `warn`. `CROWDSAFE_LOG_LEVEL` replaces the
//! whole filter when set. Logs always go to stderr so that JSON summaries
//! and listings on stdout stay machine-readable.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::cli::args::{Cli, ColorChoice, LogFormatChoice};

/// Environment variable holding a full filter directive.
pub const LOG_LEVEL_ENV: &str = "CROWDSAFE_LOG_LEVEL";

/// Logging setup resolved from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    /// Line format
    pub format: LogFormatChoice,
    /// Number of `-v` flags
    pub verbosity: u8,
    /// Whether to emit ANSI colors (human format only)
    pub ansi: bool,
}

impl LogSettings {
    /// Resolves settings from parsed arguments. `None` under `--quiet`.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Option<Self> {
        if cli.quiet {
            return None;
        }
        let ansi = wants_ansi(
            cli.color,
            std::io::stderr().is_terminal(),
            std::env::var_os("NO_COLOR").is_some(),
        );
        Some(Self {
            format: cli.log_format,
            verbosity: cli.verbose,
            ansi,
        })
    }

    /// Default filter directive: dependencies at `warn`, the engine at the
    /// level picked by `-v`.
    #[must_use]
    pub fn directive(&self) -> String {
        let engine = match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        format!("warn,crowdsafe={engine}")
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new(self.directive()))
    }

    /// Installs the global subscriber. Later calls are ignored.
    pub fn install(self) {
        // Targets only help once per-step debug output is on.
        let with_target = self.verbosity >= 2;
        let installed = match self.format {
            LogFormatChoice::Human => tracing_subscriber::fmt()
                .with_env_filter(self.filter())
                .with_ansi(self.ansi)
                .with_target(with_target)
                .with_writer(std::io::stderr)
                .try_init(),
            LogFormatChoice::Json => tracing_subscriber::fmt()
                .with_env_filter(self.filter())
                .json()
                .flatten_event(true)
                .with_target(with_target)
                .with_writer(std::io::stderr)
                .try_init(),
        };
        if installed.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }
}

fn wants_ansi(color: ColorChoice, stderr_is_terminal: bool, no_color: bool) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => stderr_is_terminal && !no_color,
    }
}
