//! Headless UI that records what would have been displayed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use crate::gateway::UiGateway;

/// One recorded panel or mission update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UiRecord {
    /// Instruction text shown
    Instruction {
        /// Text identifier
        id: String,
    },
    /// Feedback text shown
    Feedback {
        /// Text identifier
        id: String,
        /// Negative (mistake) feedback
        negative: bool,
    },
    /// Mission readout shown
    MissionShown {
        /// Mission label
        label: String,
    },
    /// Mission readout hidden
    MissionHidden,
}

/// A [`UiGateway`] with no display.
///
/// The panel can be dismissed from outside with [`dismiss`](Self::dismiss),
/// mimicking a user closing it early.
#[derive(Debug, Default)]
pub struct HeadlessUi {
    visible: AtomicBool,
    records: Mutex<Vec<UiRecord>>,
    last_progress: Mutex<Option<f32>>,
}

impl HeadlessUi {
    /// Creates a UI with the panel hidden.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn records_mut(&self) -> MutexGuard<'_, Vec<UiRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Closes the panel as if the user dismissed it.
    pub fn dismiss(&self) {
        if self.visible.swap(false, Ordering::SeqCst) {
            debug!("panel dismissed by user");
        }
    }

    /// Everything displayed so far, in order.
    #[must_use]
    pub fn records(&self) -> Vec<UiRecord> {
        self.records_mut().clone()
    }

    /// Identifiers of the feedback shown, in order.
    #[must_use]
    pub fn feedback_ids(&self) -> Vec<String> {
        self.records_mut()
            .iter()
            .filter_map(|r| match r {
                UiRecord::Feedback { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// The last mission progress fraction pushed, if any.
    #[must_use]
    pub fn last_progress(&self) -> Option<f32> {
        *self
            .last_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl UiGateway for HeadlessUi {
    fn open_panel(&self) {
        self.visible.store(true, Ordering::SeqCst);
    }

    fn close_panel(&self) {
        self.visible.store(false, Ordering::SeqCst);
    }

    fn update_instruction(&self, id: &str) {
        debug!(id, "instruction");
        self.records_mut()
            .push(UiRecord::Instruction { id: id.to_string() });
    }

    fn update_feedback(&self, id: &str, negative: bool) {
        debug!(id, negative, "feedback");
        self.records_mut().push(UiRecord::Feedback {
            id: id.to_string(),
            negative,
        });
    }

    fn panel_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    fn show_mission(&self, label: &str) {
        self.records_mut().push(UiRecord::MissionShown {
            label: label.to_string(),
        });
    }

    fn update_mission(&self, label: &str, progress: f32, remaining: Duration) {
        trace!(label, progress, ?remaining, "mission readout");
        *self
            .last_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(progress);
    }

    fn hide_mission(&self) {
        self.records_mut().push(UiRecord::MissionHidden);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dismiss_hides_panel() {
        let ui = HeadlessUi::new();
        ui.open_panel();
        assert!(ui.panel_visible());
        ui.dismiss();
        assert!(!ui.panel_visible());
    }

    #[test]
    fn test_records_in_order() {
        let ui = HeadlessUi::new();
        ui.update_instruction("move1");
        ui.show_mission("reach");
        ui.update_feedback("move1_done", false);
        ui.hide_mission();
        assert_eq!(
            ui.records(),
            vec![
                UiRecord::Instruction {
                    id: "move1".to_string()
                },
                UiRecord::MissionShown {
                    label: "reach".to_string()
                },
                UiRecord::Feedback {
                    id: "move1_done".to_string(),
                    negative: false
                },
                UiRecord::MissionHidden,
            ]
        );
        assert_eq!(ui.feedback_ids(), vec!["move1_done".to_string()]);
    }

    #[test]
    fn test_progress_tracks_last_update() {
        let ui = HeadlessUi::new();
        assert_eq!(ui.last_progress(), None);
        ui.update_mission("hold", 0.25, Duration::from_secs(3));
        ui.update_mission("hold", 0.5, Duration::from_secs(2));
        assert_eq!(ui.last_progress(), Some(0.5));
    }
}
