//! Background hold monitors.
//!
//! A monitor samples a condition once per frame and feeds it into a
//! [`HoldTimer`]. It stops by itself when the timer completes and can be
//! cancelled at any time; dropping the handle cancels it too. After it stops
//! its last sample stays readable through a [`MonitorProbe`].

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::hold::{HoldSample, HoldTimer};
use crate::runtime::FrameClock;

#[derive(Debug)]
struct Shared {
    sample: Mutex<HoldSample>,
    target: f32,
}

impl Shared {
    fn load(&self) -> HoldSample {
        *self.sample.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, sample: HoldSample) {
        *self.sample.lock().unwrap_or_else(PoisonError::into_inner) = sample;
    }
}

/// Read-only view of a monitor's hold state.
#[derive(Debug, Clone)]
pub struct MonitorProbe {
    shared: Arc<Shared>,
}

impl MonitorProbe {
    /// Whether the hold timer has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.shared.load().complete
    }

    /// Accumulated hold time in seconds.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.shared.load().elapsed
    }

    /// Fraction of the target reached, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        (self.elapsed() / self.shared.target).clamp(0.0, 1.0)
    }
}

/// Handle to a running monitor task.
#[derive(Debug)]
pub struct Monitor {
    label: String,
    cancel: CancellationToken,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Spawns a monitor feeding `condition` into `timer` every frame.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(label: impl Into<String>, clock: FrameClock, timer: HoldTimer, condition: F) -> Self
    where
        F: Fn() -> bool + Send + 'static,
    {
        let label = label.into();
        let cancel = CancellationToken::new();
        let shared = Arc::new(Shared {
            sample: Mutex::new(timer.sample()),
            target: timer.target(),
        });

        let handle = tokio::spawn(run_monitor(
            label.clone(),
            clock,
            timer,
            condition,
            cancel.clone(),
            Arc::clone(&shared),
        ));
        debug!(label = %label, target = shared.target, "monitor started");

        Self {
            label,
            cancel,
            shared,
            handle: Some(handle),
        }
    }

    /// Monitor label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// A cloneable view of the hold state.
    #[must_use]
    pub fn probe(&self) -> MonitorProbe {
        MonitorProbe {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Whether the task has stopped, by completion or cancellation.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancels the task and waits for it to stop.
    ///
    /// The final hold state is frozen and returned.
    pub async fn cancel(mut self) -> HoldSample {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        self.shared.load()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_monitor<F>(
    label: String,
    clock: FrameClock,
    mut timer: HoldTimer,
    condition: F,
    cancel: CancellationToken,
    shared: Arc<Shared>,
) where
    F: Fn() -> bool + Send + 'static,
{
    let mut ticker = clock.ticker();
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(label = %label, elapsed = timer.elapsed(), "monitor cancelled");
                break;
            }
            dt = ticker.tick() => {
                let sample = timer.update(condition(), dt);
                shared.store(sample);
                trace!(label = %label, elapsed = sample.elapsed, "monitor tick");
                if sample.complete {
                    debug!(label = %label, "monitor hold complete");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;

    fn clock() -> FrameClock {
        FrameClock::new(Duration::from_millis(100))
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_and_stops() {
        let monitor = Monitor::spawn("pose", clock(), HoldTimer::new(1.0).unwrap(), || true);
        let probe = monitor.probe();
        assert!(!probe.is_complete());

        tokio::time::sleep(Duration::from_millis(1150)).await;
        assert!(probe.is_complete());
        assert!(monitor.is_finished());
        assert!((probe.progress() - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_freezes_state() {
        let monitor = Monitor::spawn("grab", clock(), HoldTimer::new(10.0).unwrap(), || true);
        let probe = monitor.probe();
        tokio::time::sleep(Duration::from_millis(550)).await;

        let frozen = monitor.cancel().await;
        assert!(!frozen.complete);
        assert!(frozen.elapsed > 0.0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!((probe.elapsed() - frozen.elapsed).abs() < f32::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_task() {
        let monitor = Monitor::spawn("grab", clock(), HoldTimer::new(10.0).unwrap(), || true);
        let probe = monitor.probe();
        tokio::time::sleep(Duration::from_millis(350)).await;
        drop(monitor);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let before = probe.elapsed();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!((probe.elapsed() - before).abs() < f32::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_condition_drop_decays() {
        let held = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&held);
        let monitor = Monitor::spawn(
            "pose",
            clock(),
            HoldTimer::new(3.0).unwrap(),
            move || flag.load(Ordering::SeqCst),
        );
        let probe = monitor.probe();

        tokio::time::sleep(Duration::from_millis(1050)).await;
        let peak = probe.elapsed();
        assert!(peak >= 0.9);

        held.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(probe.elapsed().abs() < f32::EPSILON);
        assert!(!probe.is_complete());
        monitor.cancel().await;
    }
}
