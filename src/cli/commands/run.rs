//! `run` command handler
//!
//! Replays an input timeline against the full scenario engine, wired to
//! the headless collaborators, and prints a summary of the run.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{OutputFormat, RunArgs};
use crate::error::CrowdSafeError;
use crate::observability::EventEmitter;
use crate::observability::events::duration_ms;
use crate::scenario::{Phase, RunSummary};
use crate::sim::{InputTimeline, SimOptions, Simulation};
use crate::stats::StatsSnapshot;

use super::load_config;

/// Run the scenario headlessly.
///
/// # Errors
///
/// Returns a config error if the configuration or timeline fails to load,
/// an I/O error if the events file or metrics listener cannot be opened,
/// or `PhaseError::Cancelled` if the run is interrupted or exceeds
/// `--max-duration`.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), CrowdSafeError> {
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let config = load_config(args.config.as_deref())?;

    let timeline = InputTimeline::load(&args.inputs)?;
    tracing::info!(
        inputs = %args.inputs.display(),
        count = timeline.events.len(),
        span = %humantime::format_duration(timeline.span()),
        "input timeline loaded"
    );

    let events = if let Some(ref path) = args.events_file {
        EventEmitter::from_file(path)?
    } else {
        EventEmitter::stderr()
    };

    if args.no_ui {
        tracing::warn!("running without UI; instruction and feedback text will not be shown");
    }

    let simulation = Simulation::new(
        &config,
        &timeline,
        SimOptions {
            bind_ui: !args.no_ui,
            events: Arc::new(events),
        },
    )?;

    let run_cancel = cancel.child_token();
    let deadline = args.max_duration.map(|limit| {
        let token = run_cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            tracing::warn!(limit = %humantime::format_duration(limit), "maximum run duration reached");
            token.cancel();
        })
    });

    let result = simulation.run(&timeline, run_cancel).await;
    if let Some(deadline) = deadline {
        deadline.abort();
    }
    let summary = result?;

    let stats = simulation.harness.stats.snapshot();
    print_summary(&summary, &stats, args.format)?;
    Ok(())
}

fn print_summary(
    summary: &RunSummary,
    stats: &StatsSnapshot,
    format: OutputFormat,
) -> Result<(), CrowdSafeError> {
    match format {
        OutputFormat::Human => print!("{}", render_summary(summary, stats)),
        OutputFormat::Json => {
            let value = serde_json::json!({
                "session_id": summary.session_id,
                "phases": summary.phases,
                "play_time_ms": duration_ms(summary.play_time),
                "missions": summary.missions,
                "over_budget": summary.over_budget,
                "stats": stats,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

fn render_summary(summary: &RunSummary, stats: &StatsSnapshot) -> String {
    let phases: Vec<&str> = summary.phases.iter().copied().map(Phase::as_str).collect();
    let play_time = Duration::from_secs(summary.play_time.as_secs());
    format!(
        "session:   {}\nphases:    {}\nplay time: {}\nmissions:  {} ({} over budget)\nmistakes:  {}\n",
        summary.session_id,
        phases.join(" > "),
        humantime::format_duration(play_time),
        summary.missions,
        summary.over_budget,
        stats.mistakes,
    )
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_render_summary() {
        let summary = RunSummary {
            session_id: Uuid::nil(),
            phases: vec![Phase::Caution, Phase::Tutorial],
            play_time: Duration::from_millis(95_400),
            missions: 8,
            over_budget: 1,
        };
        let stats = StatsSnapshot {
            mistakes: 2,
            ..StatsSnapshot::default()
        };
        let text = render_summary(&summary, &stats);
        assert!(text.contains("caution > tutorial"));
        assert!(text.contains("play time: 1m 35s"));
        assert!(text.contains("missions:  8 (1 over budget)"));
        assert!(text.contains("mistakes:  2"));
    }
}
