//! Single-slot checkpoint and the rollback sequence.
//!
//! Only the most recent save is kept. A rollback locks movement, shows a
//! negative feedback message, teleports the rig back to the saved point and
//! unlocks movement again. Requesting a rollback while one is still running
//! aborts the running one and starts over; [`Checkpoint::abort`] stops it
//! outright when the scenario is torn down.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use glam::Vec3;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::schema::RollbackConfig;
use crate::gateway::ScenarioContext;
use crate::observability::Event;
use crate::observability::metrics;
use crate::scenario::steps::{PanelMessage, show_message_and_wait};

/// The last safe position and the machinery to return to it.
pub struct Checkpoint {
    ctx: ScenarioContext,
    config: RollbackConfig,
    saved: Mutex<Vec3>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkpoint")
            .field("saved", &self.saved_position())
            .field("rolling_back", &self.is_rolling_back())
            .finish_non_exhaustive()
    }
}

impl Checkpoint {
    /// Creates a checkpoint with nothing saved yet.
    #[must_use]
    pub fn new(ctx: ScenarioContext, config: RollbackConfig) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            config,
            saved: Mutex::new(Vec3::ZERO),
            in_flight: Mutex::new(None),
        })
    }

    /// Overwrites the saved position.
    pub fn save_position(&self, position: Vec3) {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = position;
        debug!(x = position.x, y = position.y, z = position.z, "checkpoint saved");
    }

    /// Saves the rig's current position.
    ///
    /// Returns `false` (and saves nothing) when no rig transform is bound.
    pub fn save_current(&self) -> bool {
        match self.ctx.player.position() {
            Some(position) => {
                self.save_position(position);
                true
            }
            None => {
                debug!("no rig transform bound; checkpoint not saved");
                false
            }
        }
    }

    /// The saved position. `Vec3::ZERO` means nothing was ever saved.
    #[must_use]
    pub fn saved_position(&self) -> Vec3 {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a rollback sequence is currently running.
    #[must_use]
    pub fn is_rolling_back(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts the rollback sequence, replacing any sequence still running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn rollback(self: &Arc<Self>) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let superseded = match in_flight.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        };
        if superseded {
            info!("rollback restarted");
        }

        self.ctx.events.emit(Event::RollbackStarted {
            timestamp: Utc::now(),
            superseded,
        });
        metrics::record_rollback(superseded);

        let this = Arc::clone(self);
        *in_flight = Some(tokio::spawn(async move { this.run_sequence().await }));
    }

    /// Stops a running rollback sequence without teleporting or handing
    /// movement back. Returns whether one was running.
    pub fn abort(&self) -> bool {
        let handle = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                info!("rollback aborted");
                true
            }
            _ => false,
        }
    }

    async fn run_sequence(&self) {
        self.ctx.player.set_movement_enabled(false);

        show_message_and_wait(
            &self.ctx,
            PanelMessage::Feedback {
                id: &self.config.message,
                negative: true,
            },
            self.config.duration,
        )
        .await;

        let target = self.saved_position();
        // Zero doubles as "never saved"; a real save at the origin is
        // indistinguishable from no save.
        let restored = if target == Vec3::ZERO {
            warn!("rollback requested but no checkpoint was saved; staying put");
            false
        } else if self.ctx.player.position().is_none() {
            debug!("no rig transform bound; skipping teleport");
            false
        } else {
            self.ctx.player.teleport(target);
            true
        };

        self.ctx.player.set_movement_enabled(true);

        self.ctx.events.emit(Event::RollbackCompleted {
            timestamp: Utc::now(),
            restored,
        });
        info!(restored, "rollback complete");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::gateway::{PlayerGateway, UiGateway};
    use crate::sim::{SimHarness, UiRecord};

    fn config() -> RollbackConfig {
        RollbackConfig {
            message: "rollback_warning".to_string(),
            duration: Duration::from_secs(3),
        }
    }

    #[test]
    fn test_save_overwrites() {
        let harness = SimHarness::new(Vec3::ZERO);
        let checkpoint = Checkpoint::new(harness.ctx.clone(), config());
        assert_eq!(checkpoint.saved_position(), Vec3::ZERO);
        checkpoint.save_position(Vec3::new(1.0, 0.0, 0.0));
        checkpoint.save_position(Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(checkpoint.saved_position(), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_save_current_reads_rig() {
        let harness = SimHarness::new(Vec3::new(3.0, 0.0, -1.0));
        let checkpoint = Checkpoint::new(harness.ctx.clone(), config());
        assert!(checkpoint.save_current());
        assert_eq!(checkpoint.saved_position(), Vec3::new(3.0, 0.0, -1.0));
    }

    #[test]
    fn test_save_current_without_rig_transform() {
        let harness = SimHarness::unbound();
        let checkpoint = Checkpoint::new(harness.ctx.clone(), config());
        assert!(!checkpoint.save_current());
        assert_eq!(checkpoint.saved_position(), Vec3::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollback_sequence() {
        let harness = SimHarness::new(Vec3::new(5.0, 0.0, 5.0));
        harness.ctx.unlock_controls();
        let checkpoint = Checkpoint::new(harness.ctx.clone(), config());
        checkpoint.save_position(Vec3::new(1.0, 0.0, 2.0));

        checkpoint.rollback();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(checkpoint.is_rolling_back());
        assert!(!harness.rig.movement_enabled());
        assert!(harness.ui.panel_visible());
        assert!(harness.rig.teleports().is_empty());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!checkpoint.is_rolling_back());
        assert!(harness.rig.movement_enabled());
        assert!(!harness.ui.panel_visible());
        assert_eq!(harness.rig.position(), Some(Vec3::new(1.0, 0.0, 2.0)));
        assert_eq!(
            harness.ui.feedback_ids(),
            vec!["rollback_warning".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_rollback_restores_once() {
        let harness = SimHarness::new(Vec3::new(5.0, 0.0, 5.0));
        let checkpoint = Checkpoint::new(harness.ctx.clone(), config());
        checkpoint.save_position(Vec3::new(1.0, 0.0, 2.0));

        checkpoint.rollback();
        tokio::time::sleep(Duration::from_secs(1)).await;
        checkpoint.rollback();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(harness.rig.teleports(), vec![Vec3::new(1.0, 0.0, 2.0)]);
        assert_eq!(harness.rig.position(), Some(Vec3::new(1.0, 0.0, 2.0)));
        assert!(harness.rig.movement_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarted_rollback_waits_full_duration() {
        let harness = SimHarness::new(Vec3::new(5.0, 0.0, 5.0));
        let checkpoint = Checkpoint::new(harness.ctx.clone(), config());
        checkpoint.save_position(Vec3::new(1.0, 0.0, 2.0));

        checkpoint.rollback();
        tokio::time::sleep(Duration::from_secs(2)).await;
        checkpoint.rollback();
        // The first sequence would have finished here.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(harness.rig.teleports().is_empty());
        assert!(checkpoint.is_rolling_back());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(harness.rig.teleports().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollback_without_save_stays_put() {
        let harness = SimHarness::new(Vec3::new(5.0, 0.0, 5.0));
        let checkpoint = Checkpoint::new(harness.ctx.clone(), config());

        checkpoint.rollback();
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(harness.rig.teleports().is_empty());
        assert_eq!(harness.rig.position(), Some(Vec3::new(5.0, 0.0, 5.0)));
        assert!(harness.rig.movement_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismissed_message_shortens_rollback() {
        let harness = SimHarness::new(Vec3::new(5.0, 0.0, 5.0));
        let checkpoint = Checkpoint::new(harness.ctx.clone(), config());
        checkpoint.save_position(Vec3::new(1.0, 0.0, 2.0));

        checkpoint.rollback();
        tokio::time::sleep(Duration::from_millis(500)).await;
        harness.ui.dismiss();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(harness.rig.teleports().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_leaves_rig_in_place() {
        let harness = SimHarness::new(Vec3::new(5.0, 0.0, 5.0));
        harness.ctx.unlock_controls();
        let checkpoint = Checkpoint::new(harness.ctx.clone(), config());
        checkpoint.save_position(Vec3::new(1.0, 0.0, 2.0));
        assert!(!checkpoint.abort());

        checkpoint.rollback();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(checkpoint.abort());
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!checkpoint.is_rolling_back());
        assert!(harness.rig.teleports().is_empty());
        assert!(!harness.rig.movement_enabled());
        assert_eq!(harness.ctx.panel.depth(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_ending_mid_rollback_keeps_rollback_running() {
        let harness = SimHarness::new(Vec3::new(5.0, 0.0, 5.0));
        let checkpoint = Checkpoint::new(harness.ctx.clone(), config());
        checkpoint.save_position(Vec3::new(1.0, 0.0, 2.0));

        checkpoint.rollback();
        tokio::time::sleep(Duration::from_millis(500)).await;
        show_message_and_wait(
            &harness.ctx,
            PanelMessage::Feedback {
                id: "move1_done",
                negative: false,
            },
            Duration::from_secs(1),
        )
        .await;

        // The feedback is gone; the rollback text is back and still counting.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(checkpoint.is_rolling_back());
        assert!(harness.ui.panel_visible());
        assert!(harness.rig.teleports().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(harness.rig.teleports(), vec![Vec3::new(1.0, 0.0, 2.0)]);
        assert!(!harness.ui.panel_visible());
        assert_eq!(
            harness.ui.feedback_ids(),
            vec!["rollback_warning", "move1_done", "rollback_warning"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollback_mid_instruction_hands_panel_back() {
        let harness = SimHarness::new(Vec3::new(5.0, 0.0, 5.0));
        let checkpoint = Checkpoint::new(harness.ctx.clone(), config());
        checkpoint.save_position(Vec3::new(1.0, 0.0, 2.0));

        let ctx = harness.ctx.clone();
        let instruction = tokio::spawn(async move {
            show_message_and_wait(&ctx, PanelMessage::Instruction("move2"), Duration::from_secs(6))
                .await;
        });
        tokio::time::sleep(Duration::from_millis(500)).await;
        checkpoint.rollback();

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(harness.rig.teleports().len(), 1);
        assert!(!instruction.is_finished());
        assert!(harness.ui.panel_visible());

        instruction.await.unwrap();
        assert!(!harness.ui.panel_visible());
        assert_eq!(
            harness.ui.records(),
            vec![
                UiRecord::Instruction {
                    id: "move2".to_string()
                },
                UiRecord::Feedback {
                    id: "rollback_warning".to_string(),
                    negative: true,
                },
                UiRecord::Instruction {
                    id: "move2".to_string()
                },
            ]
        );
    }
}
