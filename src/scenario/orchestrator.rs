//! Top-level scenario state machine.
//!
//! Walks the phases in order, running each phase's script steps. Controls
//! are locked while text is on screen and unlocked only for the mission
//! window. Hold steps run a background [`Monitor`] alongside the mission
//! wait and cancel it as soon as the wait resolves.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::action::ActionValidator;
use crate::checkpoint::Checkpoint;
use crate::config::schema::{HoldConfig, ScenarioConfig};
use crate::error::PhaseError;
use crate::gateway::ScenarioContext;
use crate::hold::HoldTimer;
use crate::observability::events::duration_ms;
use crate::observability::{Event, metrics};
use crate::zone::{ZoneRegistry, ZoneSignal};

use super::mission::{Mission, run_timed_mission};
use super::monitor::Monitor;
use super::phase::{Phase, PhaseState};
use super::script::{ActionKind, PhaseScript, Step};
use super::steps::{PanelMessage, show_message_and_wait};

/// What a finished run looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Identifier of the run, as reported in the event stream
    pub session_id: Uuid,
    /// Phases entered, in order
    pub phases: Vec<Phase>,
    /// Time from start to `Finished`
    pub play_time: Duration,
    /// Missions completed
    pub missions: usize,
    /// Missions completed after their time budget ran out
    pub over_budget: usize,
}

#[derive(Debug, Default)]
struct Tally {
    missions: usize,
    over_budget: usize,
}

/// Drives the scenario from `Caution` to `Finished`.
#[derive(Debug)]
pub struct PhaseOrchestrator {
    ctx: ScenarioContext,
    script: PhaseScript,
    hold: HoldConfig,
    validator: Arc<ActionValidator>,
    zones: Arc<ZoneRegistry>,
    signal: Arc<ZoneSignal>,
    checkpoint: Arc<Checkpoint>,
    state: Arc<PhaseState>,
    completed: AtomicBool,
}

impl PhaseOrchestrator {
    /// Builds an orchestrator for `config`.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::InvalidHoldTarget` if any scripted hold has a
    /// non-positive or non-finite target.
    pub fn new(
        ctx: ScenarioContext,
        config: &ScenarioConfig,
        validator: Arc<ActionValidator>,
        zones: Arc<ZoneRegistry>,
        signal: Arc<ZoneSignal>,
        checkpoint: Arc<Checkpoint>,
    ) -> Result<Self, PhaseError> {
        let script = PhaseScript::build(config);
        for (_, steps) in script.iter() {
            for step in steps {
                if let Step::HoldAction { target, .. } = step {
                    hold_timer(&config.hold, *target)?;
                }
            }
        }

        Ok(Self {
            ctx,
            script,
            hold: config.hold.clone(),
            validator,
            zones,
            signal,
            checkpoint,
            state: Arc::new(PhaseState::new()),
            completed: AtomicBool::new(false),
        })
    }

    /// The phase currently running.
    #[must_use]
    pub fn current_phase(&self) -> Phase {
        self.state.current()
    }

    /// Shared phase state, for observers.
    #[must_use]
    pub const fn phase_state(&self) -> &Arc<PhaseState> {
        &self.state
    }

    /// The step list being executed.
    #[must_use]
    pub const fn script(&self) -> &PhaseScript {
        &self.script
    }

    /// Runs the scenario to completion or until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::Cancelled` with the phase that was running when
    /// the token fired.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary, PhaseError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                let phase = self.current_phase();
                warn!(%phase, "scenario cancelled");
                self.checkpoint.abort();
                self.ctx.with_ui(|ui| {
                    ui.hide_mission();
                    ui.close_panel();
                });
                Err(PhaseError::Cancelled { phase })
            }
            summary = self.run_phases() => summary,
        }
    }

    async fn run_phases(&self) -> Result<RunSummary, PhaseError> {
        let session_id = Uuid::new_v4();
        self.ctx.events.emit(Event::ScenarioStarted {
            timestamp: Utc::now(),
            session_id,
        });
        info!(%session_id, "scenario started");

        let started = Instant::now();
        let mut tally = Tally::default();
        let mut phase = self.state.current();
        self.ctx.lock_controls();
        self.enter_phase(phase, None);

        loop {
            for step in self.script.steps(phase) {
                self.run_step(step, started, &mut tally).await?;
            }

            let Some(next) = phase.next() else { break };
            if self.state.try_advance(phase, next) {
                metrics::record_phase_transition(phase, next);
                self.enter_phase(next, Some(phase));
            } else {
                warn!(from = %phase, to = %next, "phase advance rejected");
            }
            phase = next;
        }

        Ok(RunSummary {
            session_id,
            phases: self.state.history(),
            play_time: started.elapsed(),
            missions: tally.missions,
            over_budget: tally.over_budget,
        })
    }

    fn enter_phase(&self, phase: Phase, previous: Option<Phase>) {
        info!(%phase, index = phase.index(), "phase entered");
        self.ctx.events.emit(Event::PhaseEntered {
            timestamp: Utc::now(),
            phase,
            phase_index: phase.index(),
        });
        metrics::set_current_phase(phase, previous);
    }

    async fn run_step(
        &self,
        step: &Step,
        started: Instant,
        tally: &mut Tally,
    ) -> Result<(), PhaseError> {
        debug!(%step, "step");
        match step {
            Step::InitializeSession => self.ctx.stats.initialize_session(),
            Step::SaveCheckpoint => {
                self.checkpoint.save_current();
            }
            Step::Message { id, duration } => {
                self.ctx.lock_controls();
                show_message_and_wait(&self.ctx, PanelMessage::Instruction(id), *duration).await;
            }
            Step::Feedback { id, duration } => {
                self.ctx.lock_controls();
                show_message_and_wait(
                    &self.ctx,
                    PanelMessage::Feedback {
                        id,
                        negative: false,
                    },
                    *duration,
                )
                .await;
            }
            Step::ReachZone {
                zone,
                label,
                time_limit,
            } => {
                self.zones.set_active(*zone, true);
                self.signal.reset();

                let signal = Arc::clone(&self.signal);
                let mission = Mission::new(label.as_str(), *time_limit, move || signal.is_reached());
                self.ctx.unlock_controls();
                let outcome = run_timed_mission(&self.ctx, mission).await;
                self.ctx.lock_controls();

                self.zones.set_active(*zone, false);
                self.record_success(outcome.over_budget, tally);
            }
            Step::HoldAction {
                action,
                target,
                label,
                time_limit,
            } => {
                let timer = hold_timer(&self.hold, *target)?;
                let validator = Arc::clone(&self.validator);
                let condition: Box<dyn Fn() -> bool + Send> = match action {
                    ActionKind::Pose => Box::new(move || validator.is_action_valid()),
                    ActionKind::Grab => Box::new(move || validator.is_holding_climb_handle()),
                };

                self.ctx.unlock_controls();
                let monitor = Monitor::spawn(label.as_str(), self.ctx.clock, timer, condition);
                let done = monitor.probe();
                let progress = monitor.probe();
                let mission = Mission::new(label.as_str(), *time_limit, move || done.is_complete())
                    .with_progress(move || progress.progress());
                let outcome = run_timed_mission(&self.ctx, mission).await;
                monitor.cancel().await;
                self.ctx.lock_controls();

                self.record_success(outcome.over_budget, tally);
            }
            Step::Complete => {
                let play_time = started.elapsed();
                self.ctx.stats.add_play_time(play_time);
                if self.completed.swap(true, Ordering::SeqCst) {
                    debug!("scenario completion already signalled");
                } else {
                    self.ctx.lifecycle.trigger_scenario_complete();
                    self.ctx.events.emit(Event::ScenarioCompleted {
                        timestamp: Utc::now(),
                        play_time_ms: duration_ms(play_time),
                    });
                    info!(?play_time, "scenario complete");
                }
            }
        }
        Ok(())
    }

    fn record_success(&self, over_budget: bool, tally: &mut Tally) {
        self.ctx.stats.add_success_count();
        tally.missions += 1;
        if over_budget {
            tally.over_budget += 1;
        }
    }
}

fn hold_timer(hold: &HoldConfig, target: f32) -> Result<HoldTimer, PhaseError> {
    HoldTimer::with_rates(target, hold.increase_rate, hold.decrease_rate)
}
