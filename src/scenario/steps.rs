//! Message display primitive shared by the orchestrator and rollback.
//!
//! Both the orchestrator and a rollback put messages on the same panel, and
//! their waits can overlap. Every shown message claims a slot on the
//! [`PanelStack`]; only the newest claim owns the panel. When the owner
//! finishes, the message underneath is shown again instead of the panel
//! being closed under it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::gateway::{ScenarioContext, UiGateway};

/// What to put on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMessage<'a> {
    /// Instruction text for the upcoming mission
    Instruction(&'a str),
    /// Feedback after a mission or a mistake
    Feedback {
        /// Text identifier
        id: &'a str,
        /// Whether this is negative feedback
        negative: bool,
    },
}

impl<'a> PanelMessage<'a> {
    const fn id(&self) -> &'a str {
        match *self {
            Self::Instruction(id) | Self::Feedback { id, .. } => id,
        }
    }

    fn show_on(&self, ui: &dyn UiGateway) {
        match *self {
            Self::Instruction(id) => ui.update_instruction(id),
            Self::Feedback { id, negative } => ui.update_feedback(id, negative),
        }
    }
}

#[derive(Debug)]
enum Shown {
    Instruction(String),
    Feedback { id: String, negative: bool },
}

impl Shown {
    fn as_message(&self) -> PanelMessage<'_> {
        match self {
            Self::Instruction(id) => PanelMessage::Instruction(id),
            Self::Feedback { id, negative } => PanelMessage::Feedback {
                id,
                negative: *negative,
            },
        }
    }
}

impl From<PanelMessage<'_>> for Shown {
    fn from(message: PanelMessage<'_>) -> Self {
        match message {
            PanelMessage::Instruction(id) => Self::Instruction(id.to_string()),
            PanelMessage::Feedback { id, negative } => Self::Feedback {
                id: id.to_string(),
                negative,
            },
        }
    }
}

#[derive(Debug)]
struct Claim {
    token: u64,
    shown: Shown,
}

/// Messages currently waiting on the panel, newest last.
#[derive(Debug, Default)]
pub struct PanelStack {
    next_token: AtomicU64,
    claims: Mutex<Vec<Claim>>,
}

impl PanelStack {
    fn claims(&self) -> MutexGuard<'_, Vec<Claim>> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of messages waiting on the panel.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.claims().len()
    }

    fn push(&self, ui: &dyn UiGateway, message: PanelMessage<'_>) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let mut claims = self.claims();
        ui.open_panel();
        message.show_on(ui);
        claims.push(Claim {
            token,
            shown: message.into(),
        });
        token
    }

    fn owns_panel(&self, token: u64) -> bool {
        self.claims().last().is_some_and(|claim| claim.token == token)
    }

    fn release(&self, ui: &dyn UiGateway, token: u64) {
        let mut claims = self.claims();
        let Some(index) = claims.iter().position(|claim| claim.token == token) else {
            return;
        };
        let owned = index + 1 == claims.len();
        let claim = claims.remove(index);
        let id = claim.shown.as_message().id();

        if !owned {
            debug!(message = id, "buried message expired");
            return;
        }
        match claims.last() {
            Some(below) => {
                let restored = below.shown.as_message();
                ui.open_panel();
                restored.show_on(ui);
                debug!(message = id, restored = restored.id(), "panel handed back");
            }
            None if ui.panel_visible() => ui.close_panel(),
            None => debug!(message = id, "panel dismissed early"),
        }
    }
}

/// Releases its claim when the wait ends or the waiting task is aborted.
struct ClaimGuard<'a> {
    stack: &'a PanelStack,
    ui: &'a dyn UiGateway,
    token: u64,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.stack.release(self.ui, self.token);
    }
}

/// Shows `message` and waits until `duration` passes or the user dismisses
/// the panel, whichever comes first.
///
/// A dismissal only counts while this message owns the panel. If another
/// message was shown on top in the meantime, this one keeps waiting and is
/// shown again once the newer one is gone. The panel is closed afterwards
/// only when nothing else is waiting on it.
///
/// Without a UI the message is skipped but the duration is still waited
/// out, so pacing does not depend on the visual layer being present.
pub async fn show_message_and_wait(
    ctx: &ScenarioContext,
    message: PanelMessage<'_>,
    duration: Duration,
) {
    let Some(ui) = ctx.ui.as_deref() else {
        debug!(message = message.id(), "no UI bound; waiting without panel");
        ctx.clock.wait_for(duration).await;
        return;
    };

    let stack = ctx.panel.as_ref();
    let token = stack.push(ui, message);
    let _claim = ClaimGuard { stack, ui, token };
    debug!(message = message.id(), ?duration, "panel shown");

    let deadline = Instant::now() + duration;
    ctx.clock
        .wait_until(|| {
            Instant::now() >= deadline || (!ui.panel_visible() && stack.owns_panel(token))
        })
        .await;
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::sim::{SimHarness, UiRecord};

    #[tokio::test(start_paused = true)]
    async fn test_waits_full_duration_and_closes() {
        let harness = SimHarness::new(Vec3::ZERO);
        let start = Instant::now();
        show_message_and_wait(
            &harness.ctx,
            PanelMessage::Instruction("tutorial"),
            Duration::from_secs(2),
        )
        .await;

        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(!harness.ui.panel_visible());
        assert_eq!(
            harness.ui.records(),
            vec![UiRecord::Instruction {
                id: "tutorial".to_string()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_dismissal_ends_wait() {
        let harness = SimHarness::new(Vec3::ZERO);
        let ui = harness.ui.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            ui.dismiss();
        });

        let start = Instant::now();
        show_message_and_wait(
            &harness.ctx,
            PanelMessage::Feedback {
                id: "move1_done",
                negative: false,
            },
            Duration::from_secs(10),
        )
        .await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_secs(1));
        assert_eq!(harness.ui.feedback_ids(), vec!["move1_done".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_ui_still_waits() {
        let harness = SimHarness::without_ui(Vec3::ZERO);
        let start = Instant::now();
        show_message_and_wait(
            &harness.ctx,
            PanelMessage::Instruction("caution"),
            Duration::from_secs(3),
        )
        .await;

        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(harness.ui.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismissal_only_ends_the_newest_message() {
        let harness = SimHarness::new(Vec3::ZERO);
        let ctx = harness.ctx.clone();
        let outer = tokio::spawn(async move {
            show_message_and_wait(&ctx, PanelMessage::Instruction("move1"), Duration::from_secs(5))
                .await;
        });
        tokio::time::sleep(Duration::from_secs(1)).await;

        let ui = harness.ui.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            ui.dismiss();
        });
        show_message_and_wait(
            &harness.ctx,
            PanelMessage::Feedback {
                id: "tutorial_done",
                negative: false,
            },
            Duration::from_secs(10),
        )
        .await;

        assert!(harness.ui.panel_visible());
        assert_eq!(harness.ctx.panel.depth(), 1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!outer.is_finished());

        outer.await.unwrap();
        assert!(!harness.ui.panel_visible());
        assert_eq!(harness.ctx.panel.depth(), 0);
        assert_eq!(
            harness.ui.records().last(),
            Some(&UiRecord::Instruction {
                id: "move1".to_string()
            })
        );
    }
}
