//! Simulated player rig: permissions, transform and tracked input.

use std::sync::{Mutex, MutexGuard, PoisonError};

use glam::Vec3;
use tracing::{debug, info};

use crate::config::schema::GestureConfig;
use crate::gateway::{PlayerGateway, TrackingSnapshot, TrackingSource};

#[derive(Debug, Default)]
struct RigState {
    position: Option<Vec3>,
    movement_enabled: bool,
    interaction_enabled: bool,
    tracking: TrackingSnapshot,
    teleports: Vec<Vec3>,
}

/// A player rig with no headset behind it.
///
/// Input is set directly (by tests or a replayed input timeline) and
/// permission changes are recorded so callers can inspect them.
#[derive(Debug, Default)]
pub struct SimulatedRig {
    state: Mutex<RigState>,
}

impl SimulatedRig {
    /// Creates a rig standing at `position`, head at standing height.
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        let rig = Self::default();
        {
            let mut state = rig.lock();
            state.position = Some(position);
            state.tracking.head = Some(position + Vec3::Y * 1.7);
        }
        rig
    }

    /// Creates a rig with no bound transform.
    #[must_use]
    pub fn unbound() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RigState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the rig as locomotion would, ignoring the movement permission.
    pub fn walk_to(&self, position: Vec3) {
        let mut state = self.lock();
        let lift = state
            .tracking
            .head
            .zip(state.position)
            .map_or(Vec3::Y * 1.7, |(head, pos)| head - pos);
        state.position = Some(position);
        state.tracking.head = Some(position + lift);
    }

    /// Places both hands in (or out of) the protective posture.
    pub fn set_posed(&self, posed: bool, gesture: &GestureConfig) {
        let mut state = self.lock();
        let head = state.tracking.head.unwrap_or(Vec3::Y * 1.7);
        let chest = crate::action::chest_point(head, gesture);
        let (left, right) = if posed {
            let spread = Vec3::X * (gesture.hand_to_hand * 0.25);
            (chest - spread, chest + spread)
        } else {
            let reach = Vec3::X * (gesture.hand_to_chest + 0.5);
            (chest - reach, chest + reach)
        };
        state.tracking.left_hand = Some(left);
        state.tracking.right_hand = Some(right);
    }

    /// Holds or releases both override controls.
    pub fn set_override(&self, pressed: bool) {
        let mut state = self.lock();
        state.tracking.override_left = pressed;
        state.tracking.override_right = pressed;
    }

    /// Holds or releases both grip controls.
    pub fn set_grips(&self, pressed: bool) {
        let mut state = self.lock();
        state.tracking.grip_left = pressed;
        state.tracking.grip_right = pressed;
    }

    /// Replaces the whole tracked snapshot.
    pub fn set_tracking(&self, snapshot: TrackingSnapshot) {
        self.lock().tracking = snapshot;
    }

    /// Whether locomotion is currently allowed.
    #[must_use]
    pub fn movement_enabled(&self) -> bool {
        self.lock().movement_enabled
    }

    /// Whether interactions are currently allowed.
    #[must_use]
    pub fn interaction_enabled(&self) -> bool {
        self.lock().interaction_enabled
    }

    /// Every teleport destination, in order.
    #[must_use]
    pub fn teleports(&self) -> Vec<Vec3> {
        self.lock().teleports.clone()
    }
}

impl PlayerGateway for SimulatedRig {
    fn set_movement_enabled(&self, enabled: bool) {
        let mut state = self.lock();
        if state.movement_enabled != enabled {
            debug!(enabled, "movement permission changed");
        }
        state.movement_enabled = enabled;
    }

    fn set_interaction_enabled(&self, enabled: bool) {
        let mut state = self.lock();
        if state.interaction_enabled != enabled {
            debug!(enabled, "interaction permission changed");
        }
        state.interaction_enabled = enabled;
    }

    fn position(&self) -> Option<Vec3> {
        self.lock().position
    }

    fn teleport(&self, position: Vec3) {
        let mut state = self.lock();
        if state.position.is_none() {
            debug!("teleport requested with no bound transform; ignoring");
            return;
        }
        let lift = state
            .tracking
            .head
            .zip(state.position)
            .map_or(Vec3::Y * 1.7, |(head, pos)| head - pos);
        state.position = Some(position);
        state.tracking.head = Some(position + lift);
        state.teleports.push(position);
        info!(x = position.x, y = position.y, z = position.z, "rig teleported");
    }
}

impl TrackingSource for SimulatedRig {
    fn snapshot(&self) -> TrackingSnapshot {
        self.lock().tracking
    }
}
