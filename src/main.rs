//! `CrowdSafe` - crowd-crush safety drill engine

use std::sync::atomic::{AtomicI32, Ordering};

use clap::Parser;
use tokio_util::sync::CancellationToken;

use crowdsafe::cli::args::Cli;
use crowdsafe::cli::commands;
use crowdsafe::error::ExitCode;
use crowdsafe::observability::LogSettings;

/// Exit code of the signal that cancelled the run, or 0.
static SIGNAL_EXIT: AtomicI32 = AtomicI32::new(0);

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Some(logging) = LogSettings::from_cli(&cli) {
        logging.install();
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();

    // Spawn signal handler for graceful shutdown
    tokio::spawn(async move {
        let Ok(mut sigterm) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            tracing::error!("failed to register SIGTERM handler");
            return;
        };

        let code = tokio::select! {
            _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
            _ = sigterm.recv() => ExitCode::TERMINATED,
        };
        SIGNAL_EXIT.store(code, Ordering::SeqCst);
        shutdown.cancel();

        eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
            _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
        }
    });

    let result = commands::dispatch(cli, cancel).await;

    match result {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            let signalled = SIGNAL_EXIT.load(Ordering::SeqCst);
            std::process::exit(if signalled == 0 {
                e.exit_code()
            } else {
                signalled
            });
        }
    }
}
