//! Timed missions: poll a completion condition every frame while driving
//! the mission readout.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{info, trace, warn};

use crate::gateway::ScenarioContext;
use crate::observability::events::duration_ms;
use crate::observability::{Event, metrics};

type Condition = Box<dyn Fn() -> bool + Send + Sync>;
type Progress = Box<dyn Fn() -> f32 + Send + Sync>;

/// One mission window: what "done" means and how to present it.
pub struct Mission {
    label: String,
    time_limit: Duration,
    is_complete: Condition,
    progress: Option<Progress>,
    show_panel: bool,
}

impl fmt::Debug for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mission")
            .field("label", &self.label)
            .field("time_limit", &self.time_limit)
            .field("has_progress", &self.progress.is_some())
            .field("show_panel", &self.show_panel)
            .finish_non_exhaustive()
    }
}

impl Mission {
    /// Creates a mission shown on the readout.
    #[must_use]
    pub fn new<F>(label: impl Into<String>, time_limit: Duration, is_complete: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            time_limit,
            is_complete: Box::new(is_complete),
            progress: None,
            show_panel: true,
        }
    }

    /// Drives the readout from `progress` instead of the remaining time.
    #[must_use]
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn() -> f32 + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Runs the mission without touching the readout.
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.show_panel = false;
        self
    }

    /// Mission label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Time budget.
    #[must_use]
    pub const fn time_limit(&self) -> Duration {
        self.time_limit
    }

    fn fraction(&self, remaining: Duration) -> f32 {
        let raw = match &self.progress {
            Some(progress) => progress(),
            None if self.time_limit.is_zero() => 0.0,
            None => remaining.as_secs_f32() / self.time_limit.as_secs_f32(),
        };
        if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) }
    }
}

/// How a mission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionOutcome {
    /// Time from start to completion
    pub elapsed: Duration,
    /// Whether completion came after the time budget ran out
    pub over_budget: bool,
}

/// Polls `mission` once per frame until its condition holds.
///
/// Running past the time budget does not fail the mission: a single warning
/// is logged and polling continues. Without a UI the readout updates are
/// skipped and only the condition is awaited.
pub async fn run_timed_mission(ctx: &ScenarioContext, mission: Mission) -> MissionOutcome {
    let label = mission.label.as_str();
    let ui = if mission.show_panel {
        ctx.ui.as_deref()
    } else {
        None
    };

    ctx.events.emit(Event::MissionStarted {
        timestamp: Utc::now(),
        label: label.to_string(),
        time_limit_ms: duration_ms(mission.time_limit),
    });
    info!(label, time_limit = ?mission.time_limit, "mission started");

    if let Some(ui) = ui {
        ui.show_mission(label);
    }

    let started = Instant::now();
    let mut ticker = ctx.clock.ticker();
    let mut warned = false;

    while !(mission.is_complete)() {
        let elapsed = started.elapsed();
        let remaining = mission.time_limit.saturating_sub(elapsed);
        if !warned && elapsed > mission.time_limit {
            warn!(label, time_limit = ?mission.time_limit, "mission over time budget; still waiting");
            warned = true;
        }

        let fraction = mission.fraction(remaining);
        if let Some(ui) = ui {
            ui.update_mission(label, fraction, remaining);
        }
        trace!(label, fraction, ?remaining, "mission tick");

        ticker.tick().await;
    }

    if let Some(ui) = ui {
        ui.hide_mission();
    }

    let elapsed = started.elapsed();
    let over_budget = elapsed > mission.time_limit;

    ctx.events.emit(Event::MissionCompleted {
        timestamp: Utc::now(),
        label: label.to_string(),
        duration_ms: duration_ms(elapsed),
        over_budget,
    });
    metrics::record_mission(over_budget, elapsed);
    info!(label, ?elapsed, over_budget, "mission completed");

    MissionOutcome {
        elapsed,
        over_budget,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use glam::Vec3;

    use super::*;
    use crate::sim::{SimHarness, UiRecord};

    #[tokio::test(start_paused = true)]
    async fn test_completes_immediately_when_already_true() {
        let harness = SimHarness::new(Vec3::ZERO);
        let mission = Mission::new("noop", Duration::from_secs(5), || true);
        let outcome = run_timed_mission(&harness.ctx, mission).await;
        assert_eq!(outcome.elapsed, Duration::ZERO);
        assert!(!outcome.over_budget);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_condition() {
        let harness = SimHarness::new(Vec3::ZERO);
        let flag = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&flag);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            setter.store(true, Ordering::SeqCst);
        });

        let probe = Arc::clone(&flag);
        let mission = Mission::new("reach", Duration::from_secs(10), move || {
            probe.load(Ordering::SeqCst)
        });
        let outcome = run_timed_mission(&harness.ctx, mission).await;
        assert!(outcome.elapsed >= Duration::from_secs(2));
        assert!(outcome.elapsed < Duration::from_millis(2100));
        assert!(!outcome.over_budget);
        assert_eq!(
            harness.ui.records(),
            vec![
                UiRecord::MissionShown {
                    label: "reach".to_string()
                },
                UiRecord::MissionHidden,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_budget_keeps_waiting() {
        let harness = SimHarness::new(Vec3::ZERO);
        let flag = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&flag);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            setter.store(true, Ordering::SeqCst);
        });

        let probe = Arc::clone(&flag);
        let mission = Mission::new("slow", Duration::from_secs(1), move || {
            probe.load(Ordering::SeqCst)
        });
        let outcome = run_timed_mission(&harness.ctx, mission).await;
        assert!(outcome.over_budget);
        assert!(outcome.elapsed >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_from_remaining_time() {
        let harness = SimHarness::new(Vec3::ZERO);
        let flag = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&flag);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            setter.store(true, Ordering::SeqCst);
        });

        let probe = Arc::clone(&flag);
        let mission = Mission::new("reach", Duration::from_secs(4), move || {
            probe.load(Ordering::SeqCst)
        });
        run_timed_mission(&harness.ctx, mission).await;
        let last = harness.ui.last_progress().unwrap();
        assert!((0.2..=0.3).contains(&last), "got {last}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_callback_is_clamped() {
        let harness = SimHarness::new(Vec3::ZERO);
        let flag = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&flag);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            setter.store(true, Ordering::SeqCst);
        });

        let probe = Arc::clone(&flag);
        let mission = Mission::new("hold", Duration::from_secs(4), move || {
            probe.load(Ordering::SeqCst)
        })
        .with_progress(|| 7.5);
        run_timed_mission(&harness.ctx, mission).await;
        assert_eq!(harness.ui.last_progress(), Some(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_mission_skips_readout() {
        let harness = SimHarness::new(Vec3::ZERO);
        let mission = Mission::new("quiet", Duration::from_secs(1), || true).hidden();
        run_timed_mission(&harness.ctx, mission).await;
        assert!(harness.ui.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_without_ui() {
        let harness = SimHarness::without_ui(Vec3::ZERO);
        let flag = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&flag);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            setter.store(true, Ordering::SeqCst);
        });

        let probe = Arc::clone(&flag);
        let mission = Mission::new("reach", Duration::from_secs(4), move || {
            probe.load(Ordering::SeqCst)
        });
        let outcome = run_timed_mission(&harness.ctx, mission).await;
        assert!(outcome.elapsed >= Duration::from_secs(1));
    }

    #[test]
    fn test_zero_limit_fraction() {
        let mission = Mission::new("zero", Duration::ZERO, || false);
        assert!(mission.fraction(Duration::ZERO).abs() < f32::EPSILON);
    }
}
