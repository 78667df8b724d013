//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod phases;
pub mod run;
pub mod validate;
pub mod version;

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands};
use crate::config::{ConfigLoader, ScenarioConfig};
use crate::error::CrowdSafeError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), CrowdSafeError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cancel).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Phases(args) => phases::run(&args),
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Loads `path` if given, logging every load warning, or falls back to the
/// built-in defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Arc<ScenarioConfig>, CrowdSafeError> {
    let Some(path) = path else {
        tracing::info!("no configuration given, using defaults");
        return Ok(Arc::new(ScenarioConfig::default()));
    };

    tracing::info!(config = %path.display(), "loading configuration");
    let load_result = ConfigLoader::with_defaults().load(path)?;
    for warning in &load_result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
    Ok(load_result.config)
}
