//! Action validation: protective posture and two-handed grab checks.
//!
//! The posture check is a plain distance heuristic against a chest point
//! estimated below the head. Tracking is imprecise, so a manual override
//! (both designated controls held together) satisfies the check as well.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec3;
use tracing::debug;

use crate::config::schema::{GestureConfig, GrabConfig};
use crate::gateway::{FeedbackSink, TrackingSnapshot, TrackingSource};

use super::grab::GrabSession;

/// Evaluates the action conditions polled by the orchestrator's monitors.
pub struct ActionValidator {
    tracking: Arc<dyn TrackingSource>,
    grabs: Arc<GrabSession>,
    gesture: GestureConfig,
    grab: GrabConfig,
    feedback: Option<Arc<dyn FeedbackSink>>,
    in_range: AtomicBool,
}

impl ActionValidator {
    /// Creates a validator reading from `tracking` and `grabs`.
    #[must_use]
    pub fn new(
        tracking: Arc<dyn TrackingSource>,
        grabs: Arc<GrabSession>,
        gesture: GestureConfig,
        grab: GrabConfig,
    ) -> Self {
        Self {
            tracking,
            grabs,
            gesture,
            grab,
            feedback: None,
            in_range: AtomicBool::new(false),
        }
    }

    /// Attaches a cue played on the rising edge of action validity.
    #[must_use]
    pub fn with_feedback(mut self, feedback: Arc<dyn FeedbackSink>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    /// Returns `true` when the protective posture is held or the manual
    /// override is engaged.
    ///
    /// Plays the feedback cue once each time validity goes from false to
    /// true; holding a valid pose does not repeat it.
    pub fn is_action_valid(&self) -> bool {
        let snapshot = self.tracking.snapshot();
        let valid = pose_matches(&snapshot, &self.gesture) || override_engaged(&snapshot);

        let was_valid = self.in_range.swap(valid, Ordering::SeqCst);
        if valid && !was_valid {
            debug!("action entered valid range");
            if let Some(feedback) = &self.feedback {
                feedback.action_entered();
            }
        }
        valid
    }

    /// Returns `true` when enough objects are grabbed at once (and, when
    /// configured, both grip controls are held).
    #[must_use]
    pub fn is_holding_climb_handle(&self) -> bool {
        if self.grabs.active_count() < self.grab.required_count {
            return false;
        }
        if self.grab.require_grip_buttons {
            let snapshot = self.tracking.snapshot();
            return snapshot.grip_left && snapshot.grip_right;
        }
        true
    }

    /// Shared grab counter consulted by [`is_holding_climb_handle`](Self::is_holding_climb_handle).
    #[must_use]
    pub const fn grabs(&self) -> &Arc<GrabSession> {
        &self.grabs
    }
}

impl std::fmt::Debug for ActionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionValidator")
            .field("gesture", &self.gesture)
            .field("grab", &self.grab)
            .field("active_grabs", &self.grabs.active_count())
            .finish_non_exhaustive()
    }
}

/// Estimated chest point: `chest_offset` metres straight below the head.
#[must_use]
pub fn chest_point(head: Vec3, gesture: &GestureConfig) -> Vec3 {
    head - Vec3::Y * gesture.chest_offset
}

/// Geometric posture check: both hands near the chest and near each other.
///
/// Fails when any of the three transforms is missing.
#[must_use]
pub fn pose_matches(snapshot: &TrackingSnapshot, gesture: &GestureConfig) -> bool {
    let (Some(head), Some(left), Some(right)) =
        (snapshot.head, snapshot.left_hand, snapshot.right_hand)
    else {
        return false;
    };

    let chest = chest_point(head, gesture);
    left.distance(chest) <= gesture.hand_to_chest
        && right.distance(chest) <= gesture.hand_to_chest
        && left.distance(right) <= gesture.hand_to_hand
}

/// Manual override: both designated controls held together.
#[must_use]
pub const fn override_engaged(snapshot: &TrackingSnapshot) -> bool {
    snapshot.override_left && snapshot.override_right
}
