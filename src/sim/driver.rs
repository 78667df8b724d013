//! Wires the engine to simulated collaborators and replays a timeline
//! against it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::action::{ActionValidator, GrabSession, Grabbable};
use crate::checkpoint::Checkpoint;
use crate::config::schema::{GestureConfig, ScenarioConfig};
use crate::error::PhaseError;
use crate::gateway::FeedbackSink;
use crate::observability::EventEmitter;
use crate::runtime::FrameClock;
use crate::scenario::{PhaseOrchestrator, RunSummary};
use crate::zone::{Zone, ZoneDetector, ZoneKind, ZoneRegistry, ZoneSignal};

use super::{InputAction, InputTimeline, SimHarness, SimulatedRig};

/// How to assemble a [`Simulation`].
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Bind the recording UI; without it all visual steps are skipped
    pub bind_ui: bool,
    /// Where structured events go
    pub events: Arc<EventEmitter>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            bind_ui: true,
            events: Arc::new(EventEmitter::noop()),
        }
    }
}

/// A complete headless scenario: engine plus simulated world.
#[derive(Debug)]
pub struct Simulation {
    /// Simulated collaborators
    pub harness: SimHarness,
    orchestrator: PhaseOrchestrator,
    detector: ZoneDetector,
    grabs: Arc<GrabSession>,
    gesture: GestureConfig,
}

impl Simulation {
    /// Builds the engine for `config` with the rig placed at `timeline.start`.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::InvalidHoldTarget` if the configuration holds an
    /// unusable hold target.
    pub fn new(
        config: &ScenarioConfig,
        timeline: &InputTimeline,
        options: SimOptions,
    ) -> Result<Self, PhaseError> {
        let harness = SimHarness::assemble(
            SimulatedRig::at(timeline.start),
            options.bind_ui,
            options.events,
            FrameClock::from_rate(config.frame_rate),
        );

        let grabs = GrabSession::new();
        let validator = Arc::new(
            ActionValidator::new(
                harness.rig.clone(),
                Arc::clone(&grabs),
                config.gesture.clone(),
                config.grab.clone(),
            )
            .with_feedback(Arc::clone(&harness.haptics) as Arc<dyn FeedbackSink>),
        );

        let zones = Arc::new(ZoneRegistry::from_config(&config.zones));
        let signal = Arc::new(ZoneSignal::new());
        let checkpoint = Checkpoint::new(harness.ctx.clone(), config.rollback.clone());
        let detector = ZoneDetector::new(
            harness.ctx.clone(),
            Arc::clone(&zones),
            Arc::clone(&signal),
            Arc::clone(&checkpoint),
        );
        let orchestrator = PhaseOrchestrator::new(
            harness.ctx.clone(),
            config,
            validator,
            zones,
            signal,
            checkpoint,
        )?;

        Ok(Self {
            harness,
            orchestrator,
            detector,
            grabs,
            gesture: config.gesture.clone(),
        })
    }

    /// The orchestrator being driven.
    #[must_use]
    pub const fn orchestrator(&self) -> &PhaseOrchestrator {
        &self.orchestrator
    }

    /// The zone detector inputs are dispatched to.
    #[must_use]
    pub const fn detector(&self) -> &ZoneDetector {
        &self.detector
    }

    /// Runs the scenario while replaying `timeline`.
    ///
    /// Inputs left over when the scenario finishes are dropped. If the
    /// timeline runs out first the scenario keeps waiting until it finishes
    /// or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::Cancelled` if `cancel` fires first.
    pub async fn run(
        &self,
        timeline: &InputTimeline,
        cancel: CancellationToken,
    ) -> Result<RunSummary, PhaseError> {
        let run = self.orchestrator.run(cancel);
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => result,
            () = self.replay(timeline) => {
                debug!("input timeline exhausted");
                run.await
            }
        }
    }

    async fn replay(&self, timeline: &InputTimeline) {
        let started = Instant::now();
        let mut objects: HashMap<String, Grabbable> = HashMap::new();

        for input in &timeline.events {
            tokio::time::sleep_until(started + input.at).await;
            debug!(at = ?input.at, action = ?input.action, "input");
            self.apply(&input.action, &mut objects);
        }
    }

    fn apply(&self, action: &InputAction, objects: &mut HashMap<String, Grabbable>) {
        let rig = &self.harness.rig;
        match action {
            InputAction::EnterZone { zone } => {
                let kind = self
                    .detector
                    .zones()
                    .get(*zone)
                    .map_or(ZoneKind::Goal, Zone::kind);
                self.detector.on_zone_entered(*zone, kind);
            }
            InputAction::ExitZone { zone } => self.detector.on_zone_exited(*zone),
            InputAction::Pose { held } => rig.set_posed(*held, &self.gesture),
            InputAction::Override { held } => rig.set_override(*held),
            InputAction::Grip { held } => rig.set_grips(*held),
            InputAction::Grab { object } => {
                if !rig.interaction_enabled() {
                    debug!(object, "interaction locked; grab ignored");
                    return;
                }
                let grabbable = objects
                    .entry(object.clone())
                    .or_insert_with(|| Grabbable::new(object.as_str(), &self.grabs));
                grabbable.on_grab_enter();
            }
            InputAction::Release { object } => {
                if let Some(grabbable) = objects.get_mut(object) {
                    grabbable.on_grab_exit();
                }
            }
            InputAction::Deactivate { object } => {
                if let Some(grabbable) = objects.get_mut(object) {
                    grabbable.deactivate();
                }
            }
            InputAction::Dismiss => self.harness.ui.dismiss(),
            InputAction::MoveTo { position } => {
                if rig.movement_enabled() {
                    rig.walk_to(*position);
                } else {
                    debug!("movement locked; move ignored");
                }
            }
        }
    }
}
