//! Hold timer: a bounded, asymmetric-rate accumulator.
//!
//! Turns a per-frame boolean ("is the condition true right now") into a
//! durable "has it been held long enough" result. Progress builds at
//! `increase_rate` while the condition holds and drains at `decrease_rate`
//! while it does not, so a wobbling pose loses ground quickly.

use crate::error::PhaseError;

/// Rate at which elapsed time builds while the condition holds.
pub const DEFAULT_INCREASE_RATE: f32 = 1.0;

/// Rate at which elapsed time drains while the condition does not hold.
pub const DEFAULT_DECREASE_RATE: f32 = 2.0;

/// Snapshot returned by [`HoldTimer::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldSample {
    /// Accumulated hold time in seconds, always within `[0, target]`.
    pub elapsed: f32,
    /// Whether the target has been reached (latched).
    pub complete: bool,
}

/// Bounded accumulator with asymmetric build/decay rates.
///
/// `elapsed` is clamped into `[0, target]` after every update. Once it
/// reaches `target` the timer latches complete and ignores further samples
/// until [`reset`](Self::reset) is called.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldTimer {
    elapsed: f32,
    target: f32,
    increase_rate: f32,
    decrease_rate: f32,
    complete: bool,
}

impl HoldTimer {
    /// Creates a timer with the default 1:2 build/decay ratio.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::InvalidHoldTarget`] if `target` is not a
    /// positive finite number.
    pub fn new(target: f32) -> Result<Self, PhaseError> {
        Self::with_rates(target, DEFAULT_INCREASE_RATE, DEFAULT_DECREASE_RATE)
    }

    /// Creates a timer with explicit build and decay rates.
    ///
    /// Non-positive rates are treated as zero (the timer never builds or
    /// never decays, respectively).
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::InvalidHoldTarget`] if `target` is not a
    /// positive finite number.
    pub fn with_rates(
        target: f32,
        increase_rate: f32,
        decrease_rate: f32,
    ) -> Result<Self, PhaseError> {
        if !target.is_finite() || target <= 0.0 {
            return Err(PhaseError::InvalidHoldTarget(target));
        }
        Ok(Self {
            elapsed: 0.0,
            target,
            increase_rate: increase_rate.max(0.0),
            decrease_rate: decrease_rate.max(0.0),
            complete: false,
        })
    }

    /// Feeds one frame's sample into the timer.
    ///
    /// A negative or NaN `dt` is treated as zero.
    pub fn update(&mut self, condition: bool, dt: f32) -> HoldSample {
        if self.complete {
            return self.sample();
        }

        let dt = if dt.is_nan() { 0.0 } else { dt.max(0.0) };
        let delta = if condition {
            dt * self.increase_rate
        } else {
            -dt * self.decrease_rate
        };
        self.elapsed = (self.elapsed + delta).clamp(0.0, self.target);
        self.complete = self.elapsed >= self.target;

        self.sample()
    }

    /// Clears accumulated progress and the completion latch.
    pub const fn reset(&mut self) {
        self.elapsed = 0.0;
        self.complete = false;
    }

    /// Current snapshot without advancing the timer.
    #[must_use]
    pub const fn sample(&self) -> HoldSample {
        HoldSample {
            elapsed: self.elapsed,
            complete: self.complete,
        }
    }

    /// Accumulated hold time in seconds.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Target hold time in seconds.
    #[must_use]
    pub const fn target(&self) -> f32 {
        self.target
    }

    /// Whether the target has been reached since the last reset.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Fraction of the target reached, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        (self.elapsed / self.target).clamp(0.0, 1.0)
    }
}
