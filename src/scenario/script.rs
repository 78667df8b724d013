//! The fixed per-phase step list.
//!
//! Phase order and step order never change; configuration only supplies the
//! timings and hold targets that go into each step.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::config::schema::ScenarioConfig;
use crate::scenario::phase::Phase;

/// Zone indices the script waits on, in the order it reaches them.
pub const SCRIPTED_ZONES: [usize; 5] = [0, 1, 2, 3, 4];

/// The condition a hold step keeps true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Protective posture (or manual override)
    Pose,
    /// Two-handed grab
    Grab,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pose => "pose",
            Self::Grab => "grab",
        })
    }
}

/// One step within a phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Start a fresh stats session
    InitializeSession,
    /// Save the rig position as the rollback point
    SaveCheckpoint,
    /// Show instruction text
    Message {
        /// Text identifier
        id: String,
        /// Display time
        #[serde(with = "crate::config::schema::duration_str")]
        duration: Duration,
    },
    /// Show positive feedback text
    Feedback {
        /// Text identifier
        id: String,
        /// Display time
        #[serde(with = "crate::config::schema::duration_str")]
        duration: Duration,
    },
    /// Wait for the user to walk into a goal zone
    ReachZone {
        /// Zone index
        zone: usize,
        /// Mission label
        label: String,
        /// Mission time budget
        #[serde(with = "crate::config::schema::duration_str")]
        time_limit: Duration,
    },
    /// Wait for an action to be held long enough
    HoldAction {
        /// Which condition to hold
        action: ActionKind,
        /// Hold target in seconds
        target: f32,
        /// Mission label
        label: String,
        /// Mission time budget
        #[serde(with = "crate::config::schema::duration_str")]
        time_limit: Duration,
    },
    /// Record play time and signal scenario completion
    Complete,
}

impl Step {
    /// Whether finishing this step counts as a success.
    #[must_use]
    pub const fn is_mission(&self) -> bool {
        matches!(self, Self::ReachZone { .. } | Self::HoldAction { .. })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializeSession => f.write_str("initialize session"),
            Self::SaveCheckpoint => f.write_str("save checkpoint"),
            Self::Message { id, duration } => {
                write!(f, "message '{id}' ({})", humantime::format_duration(*duration))
            }
            Self::Feedback { id, duration } => {
                write!(f, "feedback '{id}' ({})", humantime::format_duration(*duration))
            }
            Self::ReachZone {
                zone, time_limit, ..
            } => write!(
                f,
                "reach zone {zone} (budget {})",
                humantime::format_duration(*time_limit)
            ),
            Self::HoldAction {
                action,
                target,
                time_limit,
                ..
            } => write!(
                f,
                "hold {action} for {target}s (budget {})",
                humantime::format_duration(*time_limit)
            ),
            Self::Complete => f.write_str("complete scenario"),
        }
    }
}

/// Steps for every phase, in phase order.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseScript {
    steps: [Vec<Step>; Phase::ALL.len()],
}

impl PhaseScript {
    /// Builds the script from configuration.
    #[must_use]
    pub fn build(config: &ScenarioConfig) -> Self {
        let messages = &config.messages;
        let hold = &config.hold;
        let reach_limit = config.missions.reach_limit;
        let hold_limit = config.missions.hold_limit;

        let message = |phase: Phase| Step::Message {
            id: phase.as_str().to_string(),
            duration: messages.instruction,
        };
        let feedback = |phase: Phase| Step::Feedback {
            id: format!("{}_done", phase.as_str()),
            duration: messages.feedback,
        };
        let reach = |phase: Phase, zone: usize| Step::ReachZone {
            zone,
            label: phase.as_str().to_string(),
            time_limit: reach_limit,
        };
        let hold_step = |phase: Phase, action: ActionKind, target: f32| Step::HoldAction {
            action,
            target,
            label: phase.as_str().to_string(),
            time_limit: hold_limit,
        };
        let [tutorial_zone, move1_zone, move2_zone, climb_zone, exit_zone] = SCRIPTED_ZONES;

        let steps = Phase::ALL.map(|phase| match phase {
            Phase::Caution => vec![
                Step::InitializeSession,
                Step::Message {
                    id: phase.as_str().to_string(),
                    duration: messages.caution,
                },
            ],
            Phase::Tutorial => vec![
                message(phase),
                reach(phase, tutorial_zone),
                feedback(phase),
            ],
            Phase::Move1 => vec![
                Step::SaveCheckpoint,
                message(phase),
                reach(phase, move1_zone),
                feedback(phase),
            ],
            Phase::ABCPose => vec![
                message(phase),
                hold_step(phase, ActionKind::Pose, hold.pose_hold),
                feedback(phase),
            ],
            Phase::Move2 => vec![
                Step::SaveCheckpoint,
                message(phase),
                reach(phase, move2_zone),
                feedback(phase),
            ],
            Phase::HoldPillar => vec![
                message(phase),
                hold_step(phase, ActionKind::Grab, hold.pillar_hold),
                feedback(phase),
            ],
            Phase::ClimbUp => vec![
                Step::SaveCheckpoint,
                message(phase),
                hold_step(phase, ActionKind::Grab, hold.climb_hold),
                reach(phase, climb_zone),
                feedback(phase),
            ],
            Phase::Escape => vec![
                Step::SaveCheckpoint,
                message(phase),
                reach(phase, exit_zone),
                feedback(phase),
            ],
            Phase::Finished => vec![Step::Complete],
        });

        Self { steps }
    }

    /// Steps of `phase`, in order.
    #[must_use]
    pub fn steps(&self, phase: Phase) -> &[Step] {
        &self.steps[phase.index()]
    }

    /// Every phase with its steps, in order.
    pub fn iter(&self) -> impl Iterator<Item = (Phase, &[Step])> {
        Phase::ALL
            .into_iter()
            .zip(self.steps.iter().map(Vec::as_slice))
    }
}
