//! Collaborator interfaces and the injected scenario context.
//!
//! Rendering, audio, haptics, device polling and session bookkeeping live
//! outside the engine. The engine reaches them only through the traits in
//! this module, handed over once in a [`ScenarioContext`] at construction.
//! The UI gateway is optional: without it every visual step degrades to
//! waiting on the underlying condition alone.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;

use crate::observability::EventEmitter;
use crate::runtime::FrameClock;
use crate::scenario::steps::PanelStack;

/// Instruction/feedback panel and mission readout.
pub trait UiGateway: Send + Sync {
    /// Shows the panel.
    fn open_panel(&self);

    /// Hides the panel.
    fn close_panel(&self);

    /// Displays the instruction text identified by `id`.
    fn update_instruction(&self, id: &str);

    /// Displays the feedback text identified by `id`.
    fn update_feedback(&self, id: &str, negative: bool);

    /// Whether the panel is still on screen (the user may dismiss it early).
    fn panel_visible(&self) -> bool;

    /// Shows the mission readout for `label`.
    fn show_mission(&self, label: &str) {
        let _ = label;
    }

    /// Refreshes the mission readout.
    fn update_mission(&self, label: &str, progress: f32, remaining: Duration) {
        let _ = (label, progress, remaining);
    }

    /// Hides the mission readout.
    fn hide_mission(&self) {}
}

/// Player-control permissions and the tracked rig transform.
pub trait PlayerGateway: Send + Sync {
    /// Enables or disables locomotion.
    fn set_movement_enabled(&self, enabled: bool);

    /// Enables or disables grabbing and other interactions.
    fn set_interaction_enabled(&self, enabled: bool);

    /// Current rig position, or `None` when no transform is bound.
    fn position(&self) -> Option<Vec3>;

    /// Moves the rig to `position`. A no-op when no transform is bound.
    fn teleport(&self, position: Vec3);
}

/// Session statistics sink.
pub trait StatsGateway: Send + Sync {
    /// Starts a fresh session.
    fn initialize_session(&self);

    /// Records one completed mission.
    fn add_success_count(&self);

    /// Records one mistake (danger-zone entry).
    fn add_mistake_count(&self);

    /// Adds to the total play time.
    fn add_play_time(&self, elapsed: Duration);
}

/// Game lifecycle hooks.
pub trait GameLifecycle: Send + Sync {
    /// Signals that the whole scenario has been completed.
    fn trigger_scenario_complete(&self);
}

/// One frame of tracked input, as polled from the headset and controllers.
///
/// Missing transforms are `None`; spatial checks involving them fail.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackingSnapshot {
    /// Head (camera) position
    pub head: Option<Vec3>,
    /// Left hand proxy position
    pub left_hand: Option<Vec3>,
    /// Right hand proxy position
    pub right_hand: Option<Vec3>,
    /// Left designated override control held
    pub override_left: bool,
    /// Right designated override control held
    pub override_right: bool,
    /// Left grip control held
    pub grip_left: bool,
    /// Right grip control held
    pub grip_right: bool,
}

/// Device input polling.
pub trait TrackingSource: Send + Sync {
    /// Returns the latest tracked input.
    fn snapshot(&self) -> TrackingSnapshot;
}

/// One-shot audio/haptic cue played when the user first strikes a valid pose.
pub trait FeedbackSink: Send + Sync {
    /// Called on the rising edge of action validity.
    fn action_entered(&self);
}

/// Everything the orchestrator and its helpers need from the outside world.
#[derive(Clone)]
pub struct ScenarioContext {
    /// Optional UI; `None` skips all visual feedback
    pub ui: Option<Arc<dyn UiGateway>>,
    /// Player permissions and transform
    pub player: Arc<dyn PlayerGateway>,
    /// Session statistics
    pub stats: Arc<dyn StatsGateway>,
    /// Lifecycle hooks
    pub lifecycle: Arc<dyn GameLifecycle>,
    /// Structured event stream
    pub events: Arc<EventEmitter>,
    /// Frame clock driving every wait
    pub clock: FrameClock,
    /// Messages waiting on the UI panel
    pub panel: Arc<PanelStack>,
}

impl ScenarioContext {
    /// Disables both movement and interaction.
    pub fn lock_controls(&self) {
        self.player.set_movement_enabled(false);
        self.player.set_interaction_enabled(false);
    }

    /// Enables both movement and interaction.
    pub fn unlock_controls(&self) {
        self.player.set_movement_enabled(true);
        self.player.set_interaction_enabled(true);
    }

    /// Runs `f` against the UI when one is bound.
    pub fn with_ui<F>(&self, f: F)
    where
        F: FnOnce(&dyn UiGateway),
    {
        match &self.ui {
            Some(ui) => f(ui.as_ref()),
            None => tracing::trace!("no UI bound; skipping visual update"),
        }
    }

    /// Whether the UI panel is currently visible. `false` without a UI.
    #[must_use]
    pub fn panel_visible(&self) -> bool {
        self.ui.as_ref().is_some_and(|ui| ui.panel_visible())
    }
}

impl fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("has_ui", &self.ui.is_some())
            .field("clock", &self.clock)
            .field("panel_depth", &self.panel.depth())
            .finish_non_exhaustive()
    }
}
