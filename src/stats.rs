//! In-memory session statistics.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::gateway::StatsGateway;

/// Snapshot of a session's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Sessions started through this sink
    pub sessions: u32,
    /// Missions completed
    pub successes: u32,
    /// Danger-zone entries
    pub mistakes: u32,
    /// Accumulated play time in milliseconds
    pub play_time_ms: u64,
}

/// Session statistics backed by saturating atomic counters.
#[derive(Debug, Default)]
pub struct SessionStats {
    sessions: AtomicU32,
    successes: AtomicU32,
    mistakes: AtomicU32,
    play_time_ms: AtomicU64,
}

impl SessionStats {
    /// Creates zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sessions: self.sessions.load(Ordering::SeqCst),
            successes: self.successes.load(Ordering::SeqCst),
            mistakes: self.mistakes.load(Ordering::SeqCst),
            play_time_ms: self.play_time_ms.load(Ordering::SeqCst),
        }
    }

    /// Removes one mistake, never going below zero.
    pub fn forgive_mistake(&self) {
        let _ = self
            .mistakes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)));
    }
}

fn saturating_increment(counter: &AtomicU32) -> u32 {
    let prev = counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_add(1)))
        .unwrap_or(u32::MAX);
    prev.saturating_add(1)
}

impl StatsGateway for SessionStats {
    fn initialize_session(&self) {
        self.successes.store(0, Ordering::SeqCst);
        self.mistakes.store(0, Ordering::SeqCst);
        self.play_time_ms.store(0, Ordering::SeqCst);
        let sessions = saturating_increment(&self.sessions);
        info!(sessions, "session initialized");
    }

    fn add_success_count(&self) {
        let successes = saturating_increment(&self.successes);
        debug!(successes, "success recorded");
    }

    fn add_mistake_count(&self) {
        let mistakes = saturating_increment(&self.mistakes);
        info!(mistakes, "mistake recorded");
    }

    fn add_play_time(&self, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let _ = self
            .play_time_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_add(ms)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_accumulate() {
        let stats = SessionStats::new();
        stats.initialize_session();
        stats.add_success_count();
        stats.add_success_count();
        stats.add_mistake_count();
        stats.add_play_time(Duration::from_millis(1500));
        stats.add_play_time(Duration::from_millis(500));

        let snap = stats.snapshot();
        assert_eq!(snap.sessions, 1);
        assert_eq!(snap.successes, 2);
        assert_eq!(snap.mistakes, 1);
        assert_eq!(snap.play_time_ms, 2000);
    }

    #[test]
    fn test_initialize_resets_session_counters() {
        let stats = SessionStats::new();
        stats.add_success_count();
        stats.add_mistake_count();
        stats.initialize_session();
        let snap = stats.snapshot();
        assert_eq!(snap.successes, 0);
        assert_eq!(snap.mistakes, 0);
        assert_eq!(snap.sessions, 1);
    }

    #[test]
    fn test_forgive_mistake_clamps_at_zero() {
        let stats = SessionStats::new();
        stats.forgive_mistake();
        assert_eq!(stats.snapshot().mistakes, 0);
        stats.add_mistake_count();
        stats.forgive_mistake();
        stats.forgive_mistake();
        assert_eq!(stats.snapshot().mistakes, 0);
    }
}
