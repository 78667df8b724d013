//! Phase enumeration and forward-only phase state.

use std::fmt;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// One step of the linear scenario, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Safety warning before anything else
    Caution,
    /// Basic locomotion practice
    Tutorial,
    /// First move through the crowd
    Move1,
    /// Protective posture (arms crossed over the chest)
    #[serde(rename = "abc_pose")]
    ABCPose,
    /// Second move through the crowd
    Move2,
    /// Two-handed hold on a pillar
    HoldPillar,
    /// Climb out of the crush
    ClimbUp,
    /// Evacuate to the exit
    Escape,
    /// Terminal state
    Finished,
}

impl Phase {
    /// Every phase, in scenario order.
    pub const ALL: [Self; 9] = [
        Self::Caution,
        Self::Tutorial,
        Self::Move1,
        Self::ABCPose,
        Self::Move2,
        Self::HoldPillar,
        Self::ClimbUp,
        Self::Escape,
        Self::Finished,
    ];

    /// Zero-based position in [`Phase::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The phase after this one, or `None` for `Finished`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Caution => Some(Self::Tutorial),
            Self::Tutorial => Some(Self::Move1),
            Self::Move1 => Some(Self::ABCPose),
            Self::ABCPose => Some(Self::Move2),
            Self::Move2 => Some(Self::HoldPillar),
            Self::HoldPillar => Some(Self::ClimbUp),
            Self::ClimbUp => Some(Self::Escape),
            Self::Escape => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Whether this is the terminal phase.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Stable snake-case name, used for metrics labels and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Caution => "caution",
            Self::Tutorial => "tutorial",
            Self::Move1 => "move1",
            Self::ABCPose => "abc_pose",
            Self::Move2 => "move2",
            Self::HoldPillar => "hold_pillar",
            Self::ClimbUp => "climb_up",
            Self::Escape => "escape",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Current phase plus the ordered record of every phase entered.
///
/// Transitions only move forward by exactly one step. Observers can follow
/// changes through [`subscribe`](Self::subscribe).
#[derive(Debug)]
pub struct PhaseState {
    current: watch::Sender<Phase>,
    history: Mutex<Vec<Phase>>,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseState {
    /// Creates state positioned at `Caution`.
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(Phase::Caution);
        Self {
            current,
            history: Mutex::new(vec![Phase::Caution]),
        }
    }

    /// The current phase.
    #[must_use]
    pub fn current(&self) -> Phase {
        *self.current.borrow()
    }

    /// Attempts to advance from `from` to `to`.
    ///
    /// Succeeds only if `from` is current and `to` is its direct successor.
    pub fn try_advance(&self, from: Phase, to: Phase) -> bool {
        if from.next() != Some(to) {
            return false;
        }
        let advanced = self.current.send_if_modified(|current| {
            if *current == from {
                *current = to;
                true
            } else {
                false
            }
        });
        if advanced {
            self.history
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(to);
        }
        advanced
    }

    /// Every phase entered so far, starting with `Caution`.
    #[must_use]
    pub fn history(&self) -> Vec<Phase> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Subscribes to phase changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.current.subscribe()
    }
}
