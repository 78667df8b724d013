//! Shared grab counter for two-handed holds.
//!
//! Each [`Grabbable`] reports its grabbed/released transitions to one
//! [`GrabSession`]. A grabbed object holds a [`GrabGuard`]; dropping the
//! guard (on release, forced deactivation, or the object itself being
//! dropped) is the only way the count goes down, so the count can never leak
//! upward when an object disappears mid-grab.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, trace};

/// Count of currently grabbed objects, shared by every grabbable in a scene.
#[derive(Debug, Default)]
pub struct GrabSession {
    active: AtomicUsize,
}

impl GrabSession {
    /// Creates a session with no active grabs.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of objects currently held.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn acquire(self: &Arc<Self>) -> GrabGuard {
        let count = self.active.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        trace!(count, "grab acquired");
        GrabGuard {
            session: Arc::clone(self),
        }
    }

    /// Saturating decrement; never wraps below zero.
    fn release(&self) {
        let prev = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_sub(1))
            })
            .unwrap_or(0);
        trace!(count = prev.saturating_sub(1), "grab released");
    }
}

/// Proof that one grab is counted. Releases the count when dropped.
#[derive(Debug)]
pub struct GrabGuard {
    session: Arc<GrabSession>,
}

impl Drop for GrabGuard {
    fn drop(&mut self) {
        self.session.release();
    }
}

/// An object that can be grabbed, e.g. a pillar handhold or climb handle.
#[derive(Debug)]
pub struct Grabbable {
    name: String,
    session: Arc<GrabSession>,
    held: Option<GrabGuard>,
    active: bool,
}

impl Grabbable {
    /// Creates an active, un-held grabbable bound to `session`.
    #[must_use]
    pub fn new(name: impl Into<String>, session: &Arc<GrabSession>) -> Self {
        Self {
            name: name.into(),
            session: Arc::clone(session),
            held: None,
            active: true,
        }
    }

    /// Object name, for logging.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the object is currently held.
    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Whether the object can currently be grabbed.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Enters the grabbed state.
    ///
    /// Returns `false` (and counts nothing) if the object is inactive or
    /// already held.
    pub fn on_grab_enter(&mut self) -> bool {
        if !self.active || self.held.is_some() {
            return false;
        }
        self.held = Some(self.session.acquire());
        debug!(object = %self.name, active = self.session.active_count(), "grabbed");
        true
    }

    /// Leaves the grabbed state. A no-op if not held.
    pub fn on_grab_exit(&mut self) {
        if self.held.take().is_some() {
            debug!(object = %self.name, active = self.session.active_count(), "released");
        }
    }

    /// Forcibly deactivates the object, releasing any grab still in place.
    pub fn deactivate(&mut self) {
        self.active = false;
        if self.held.take().is_some() {
            debug!(object = %self.name, "deactivated while grabbed; grab released");
        }
    }

    /// Makes the object grabbable again.
    pub const fn activate(&mut self) {
        self.active = true;
    }
}
