//! Metrics collection for `CrowdSafe`.
//!
//! Prometheus-compatible metrics with typed convenience functions. All
//! label values come from closed enums, so there is no cardinality risk.
//! The record functions are no-ops until [`init_metrics`] installs a recorder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::CrowdSafeError;
use crate::scenario::Phase;
use crate::zone::ZoneKind;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `CrowdSafeError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), CrowdSafeError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| CrowdSafeError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "crowdsafe_phase_transitions_total",
        "Total number of phase transitions"
    );
    describe_gauge!(
        "crowdsafe_current_phase",
        "Currently active phase (1 = active)"
    );
    describe_counter!(
        "crowdsafe_zone_events_total",
        "Zone entries reported by the trigger collaborator"
    );
    describe_counter!(
        "crowdsafe_rollbacks_total",
        "Checkpoint rollbacks started, including superseded ones"
    );
    describe_counter!("crowdsafe_missions_total", "Missions finished by outcome");
    describe_histogram!(
        "crowdsafe_mission_duration_seconds",
        "Time taken to complete a mission"
    );
}

/// Records a phase transition.
pub fn record_phase_transition(from: Phase, to: Phase) {
    counter!(
        "crowdsafe_phase_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

/// Sets the currently active phase gauge, zeroing the previous phase label.
pub fn set_current_phase(phase: Phase, previous: Option<Phase>) {
    if let Some(prev) = previous {
        gauge!("crowdsafe_current_phase", "phase" => prev.as_str()).set(0.0);
    }
    gauge!("crowdsafe_current_phase", "phase" => phase.as_str()).set(1.0);
}

/// Records a zone entry.
pub fn record_zone_event(kind: ZoneKind) {
    counter!("crowdsafe_zone_events_total", "kind" => kind.as_str()).increment(1);
}

/// Records a rollback request.
pub fn record_rollback(superseded: bool) {
    counter!(
        "crowdsafe_rollbacks_total",
        "superseded" => if superseded { "true" } else { "false" }
    )
    .increment(1);
}

/// Records a finished mission and how long it took.
pub fn record_mission(over_budget: bool, duration: Duration) {
    let outcome = if over_budget { "over_budget" } else { "in_budget" };
    counter!("crowdsafe_missions_total", "outcome" => outcome).increment(1);
    histogram!("crowdsafe_mission_duration_seconds").record(duration.as_secs_f64());
}
