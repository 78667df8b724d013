//! Frame clock and cooperative wait primitives.
//!
//! The scenario advances once per rendered frame. Every wait in the engine
//! is a suspension point on this clock: it yields back to the runtime and
//! resumes on a later frame, never blocking a thread. Under tokio's paused
//! test clock all of these resolve deterministically.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

/// Default frame rate of the target headset.
pub const DEFAULT_FRAME_RATE: f32 = 72.0;

/// Source of frame ticks shared by the orchestrator and its monitors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    period: Duration,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::from_rate(DEFAULT_FRAME_RATE)
    }
}

impl FrameClock {
    /// Creates a clock ticking once per `period`.
    ///
    /// A zero period is bumped to one millisecond so waits always yield.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
        }
    }

    /// Creates a clock from a frames-per-second rate.
    ///
    /// Non-positive or non-finite rates fall back to [`DEFAULT_FRAME_RATE`].
    #[must_use]
    pub fn from_rate(frames_per_second: f32) -> Self {
        let rate = if frames_per_second.is_finite() && frames_per_second > 0.0 {
            frames_per_second
        } else {
            DEFAULT_FRAME_RATE
        };
        Self::new(Duration::from_secs_f64(1.0 / f64::from(rate)))
    }

    /// Duration of a single frame.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Starts a per-task frame ticker.
    ///
    /// Each long-running task owns its own ticker so that `dt` reflects the
    /// time that actually passed between its own resumptions.
    #[must_use]
    pub fn ticker(&self) -> FrameTicker {
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        FrameTicker {
            interval,
            last: Instant::now(),
        }
    }

    /// Suspends until the next frame and returns the frame delta in seconds.
    pub async fn next_frame(&self) -> f32 {
        let start = Instant::now();
        tokio::time::sleep(self.period).await;
        start.elapsed().as_secs_f32()
    }

    /// Suspends for at least `duration`, resuming on a frame boundary.
    pub async fn wait_for(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            self.next_frame().await;
        }
    }

    /// Suspends until `condition` returns true, checking once per frame.
    ///
    /// The condition is checked before the first suspension, so an already
    /// satisfied condition returns without yielding. A condition that can
    /// never become true waits forever.
    pub async fn wait_until<F>(&self, mut condition: F)
    where
        F: FnMut() -> bool,
    {
        while !condition() {
            self.next_frame().await;
        }
    }
}

/// A frame ticker owned by a single task.
#[derive(Debug)]
pub struct FrameTicker {
    interval: tokio::time::Interval,
    last: Instant,
}

impl FrameTicker {
    /// Waits for the next frame and returns the seconds since the previous one.
    pub async fn tick(&mut self) -> f32 {
        let now = self.interval.tick().await;
        let dt = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_from_rate() {
        let clock = FrameClock::from_rate(10.0);
        assert_eq!(clock.period(), Duration::from_millis(100));
    }

    #[test]
    fn test_invalid_rate_falls_back() {
        assert_eq!(FrameClock::from_rate(0.0), FrameClock::default());
        assert_eq!(FrameClock::from_rate(-3.0), FrameClock::default());
        assert_eq!(FrameClock::from_rate(f32::NAN), FrameClock::default());
    }

    #[test]
    fn test_zero_period_is_bumped() {
        let clock = FrameClock::new(Duration::ZERO);
        assert_eq!(clock.period(), Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_frame_reports_period() {
        let clock = FrameClock::from_rate(10.0);
        let dt = clock.next_frame().await;
        assert!((dt - 0.1).abs() < 1e-3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_duration() {
        let clock = FrameClock::from_rate(10.0);
        let start = Instant::now();
        clock.wait_for(Duration::from_millis(450)).await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(450));
        assert!(waited <= Duration::from_millis(550));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_returns_immediately_when_true() {
        let clock = FrameClock::from_rate(10.0);
        let start = Instant::now();
        clock.wait_until(|| true).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_sees_flag_on_next_frame() {
        let clock = FrameClock::from_rate(10.0);
        let flag = Arc::new(AtomicBool::new(false));

        let setter = Arc::clone(&flag);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            setter.store(true, Ordering::SeqCst);
        });

        let start = Instant::now();
        clock.wait_until(|| flag.load(Ordering::SeqCst)).await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(250));
        assert!(waited <= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_stays_pending_while_false() {
        let clock = FrameClock::from_rate(10.0);
        let mut wait = tokio_test::task::spawn(clock.wait_until(|| false));
        tokio_test::assert_pending!(wait.poll());
        tokio::time::advance(Duration::from_secs(5)).await;
        tokio_test::assert_pending!(wait.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_counts_frames() {
        let clock = FrameClock::from_rate(20.0);
        let mut ticker = clock.ticker();
        let mut total = 0.0;
        for _ in 0..20 {
            total += ticker.tick().await;
        }
        assert!((total - 1.0).abs() < 1e-3);
    }
}
