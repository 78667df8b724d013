//! Headless collaborators for running the scenario without a headset.
//!
//! The CLI `run` command and the test suites drive the engine through these:
//! a simulated rig standing in for tracking and player control, a UI that
//! records instead of rendering, and a replayable input timeline.

pub mod driver;
pub mod rig;
pub mod timeline;
pub mod ui;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::Vec3;
use tracing::{debug, info};

use crate::gateway::{FeedbackSink, GameLifecycle, ScenarioContext, UiGateway};
use crate::observability::EventEmitter;
use crate::runtime::FrameClock;
use crate::stats::SessionStats;

pub use driver::{SimOptions, Simulation};
pub use rig::SimulatedRig;
pub use timeline::{InputAction, InputTimeline, TimedInput};
pub use ui::{HeadlessUi, UiRecord};

/// Counts scenario-complete signals.
#[derive(Debug, Default)]
pub struct SimLifecycle {
    completions: AtomicUsize,
}

impl SimLifecycle {
    /// How many times completion was signalled.
    #[must_use]
    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

impl GameLifecycle for SimLifecycle {
    fn trigger_scenario_complete(&self) {
        let n = self.completions.fetch_add(1, Ordering::SeqCst) + 1;
        info!(completions = n, "scenario complete signalled");
    }
}

/// Counts the one-shot cue played when a pose first becomes valid.
#[derive(Debug, Default)]
pub struct SimHaptics {
    pulses: AtomicUsize,
}

impl SimHaptics {
    /// Number of cues played.
    #[must_use]
    pub fn pulses(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }
}

impl FeedbackSink for SimHaptics {
    fn action_entered(&self) {
        self.pulses.fetch_add(1, Ordering::SeqCst);
        debug!("haptic pulse");
    }
}

/// A full set of simulated collaborators plus the context wiring them in.
#[derive(Debug, Clone)]
pub struct SimHarness {
    /// Player rig and tracking
    pub rig: Arc<SimulatedRig>,
    /// Recording UI (bound to `ctx` only when requested)
    pub ui: Arc<HeadlessUi>,
    /// Session statistics
    pub stats: Arc<SessionStats>,
    /// Lifecycle hooks
    pub lifecycle: Arc<SimLifecycle>,
    /// Pose-entered cue
    pub haptics: Arc<SimHaptics>,
    /// Context handed to the engine
    pub ctx: ScenarioContext,
}

impl SimHarness {
    /// A harness with the UI bound, discarding events.
    #[must_use]
    pub fn new(position: Vec3) -> Self {
        Self::assemble(
            SimulatedRig::at(position),
            true,
            Arc::new(EventEmitter::noop()),
            FrameClock::default(),
        )
    }

    /// A harness with no UI bound.
    #[must_use]
    pub fn without_ui(position: Vec3) -> Self {
        Self::assemble(
            SimulatedRig::at(position),
            false,
            Arc::new(EventEmitter::noop()),
            FrameClock::default(),
        )
    }

    /// A harness whose rig has no transform.
    #[must_use]
    pub fn unbound() -> Self {
        Self::assemble(
            SimulatedRig::unbound(),
            true,
            Arc::new(EventEmitter::noop()),
            FrameClock::default(),
        )
    }

    /// A harness with every knob exposed.
    #[must_use]
    pub fn assemble(
        rig: SimulatedRig,
        bind_ui: bool,
        events: Arc<EventEmitter>,
        clock: FrameClock,
    ) -> Self {
        let rig = Arc::new(rig);
        let ui = Arc::new(HeadlessUi::new());
        let stats = Arc::new(SessionStats::new());
        let lifecycle = Arc::new(SimLifecycle::default());
        let ctx = ScenarioContext {
            ui: bind_ui.then(|| Arc::clone(&ui) as Arc<dyn UiGateway>),
            player: rig.clone(),
            stats: stats.clone(),
            lifecycle: lifecycle.clone(),
            events,
            clock,
            panel: Arc::default(),
        };
        Self {
            rig,
            ui,
            stats,
            lifecycle,
            haptics: Arc::new(SimHaptics::default()),
            ctx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_ui_leaves_context_unbound() {
        let harness = SimHarness::without_ui(Vec3::ZERO);
        assert!(harness.ctx.ui.is_none());
        assert!(!harness.ctx.panel_visible());
    }

    #[test]
    fn test_context_controls_reach_rig() {
        let harness = SimHarness::new(Vec3::ZERO);
        harness.ctx.unlock_controls();
        assert!(harness.rig.movement_enabled());
        assert!(harness.rig.interaction_enabled());
        harness.ctx.lock_controls();
        assert!(!harness.rig.movement_enabled());
        assert!(!harness.rig.interaction_enabled());
    }

    #[test]
    fn test_lifecycle_counts() {
        let lifecycle = SimLifecycle::default();
        lifecycle.trigger_scenario_complete();
        assert_eq!(lifecycle.completions(), 1);
    }
}
