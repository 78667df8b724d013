//! Zone registry and dispatch of zone-trigger events.
//!
//! Geometry is computed elsewhere. The engine only receives "entered" and
//! "exited" reports keyed by zone index, toggles which goal zones are live,
//! and reacts: a goal entry raises the shared reached flag, a danger entry
//! records a mistake and rolls the player back to the checkpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::checkpoint::Checkpoint;
use crate::config::schema::ZoneConfig;
use crate::gateway::ScenarioContext;
use crate::observability::Event;
use crate::observability::metrics;

/// Zone classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    /// Target region for a movement mission
    Goal,
    /// Region the user must avoid
    Danger,
}

impl ZoneKind {
    /// Lowercase name, used for metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Goal => "goal",
            Self::Danger => "danger",
        }
    }
}

/// A single indexed zone.
#[derive(Debug)]
pub struct Zone {
    name: String,
    kind: ZoneKind,
    active: AtomicBool,
}

impl Zone {
    /// Creates an inactive zone.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ZoneKind) -> Self {
        Self {
            name: name.into(),
            kind,
            active: AtomicBool::new(false),
        }
    }

    /// Zone name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zone classification.
    #[must_use]
    pub const fn kind(&self) -> ZoneKind {
        self.kind
    }

    /// Whether the zone currently counts toward a mission.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// The fixed, ordered set of zones in the scene.
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
}

impl ZoneRegistry {
    /// Builds the registry from configuration, preserving order.
    #[must_use]
    pub fn from_config(zones: &[ZoneConfig]) -> Self {
        Self {
            zones: zones
                .iter()
                .map(|z| Zone::new(z.name.clone(), z.kind))
                .collect(),
        }
    }

    /// Number of zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Whether the registry has no zones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// The zone at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Zone> {
        self.zones.get(index)
    }

    /// Activates or deactivates the zone at `index`.
    ///
    /// Out-of-range indices are ignored. Returns whether a zone was updated.
    pub fn set_active(&self, index: usize, active: bool) -> bool {
        let Some(zone) = self.zones.get(index) else {
            debug!(index, "zone index out of range; ignoring activation");
            return false;
        };
        zone.active.store(active, Ordering::SeqCst);
        trace!(index, name = %zone.name, active, "zone activation changed");
        true
    }

    /// Whether the zone at `index` exists and is active.
    #[must_use]
    pub fn is_active(&self, index: usize) -> bool {
        self.zones.get(index).is_some_and(Zone::is_active)
    }
}

/// Shared "zone reached" flag.
///
/// Written by the zone-trigger path, read and reset by the orchestrator.
#[derive(Debug, Default)]
pub struct ZoneSignal {
    reached: AtomicBool,
}

impl ZoneSignal {
    /// Creates a lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag.
    pub fn notify_zone_reached(&self, reached: bool) {
        self.reached.store(reached, Ordering::SeqCst);
    }

    /// Current value.
    #[must_use]
    pub fn is_reached(&self) -> bool {
        self.reached.load(Ordering::SeqCst)
    }

    /// Lowers the flag.
    pub fn reset(&self) {
        self.notify_zone_reached(false);
    }
}

/// Reacts to zone entry and exit reports.
#[derive(Debug)]
pub struct ZoneDetector {
    ctx: ScenarioContext,
    zones: Arc<ZoneRegistry>,
    signal: Arc<ZoneSignal>,
    checkpoint: Arc<Checkpoint>,
}

impl ZoneDetector {
    /// Creates a detector wired to the given registry, flag and checkpoint.
    #[must_use]
    pub const fn new(
        ctx: ScenarioContext,
        zones: Arc<ZoneRegistry>,
        signal: Arc<ZoneSignal>,
        checkpoint: Arc<Checkpoint>,
    ) -> Self {
        Self {
            ctx,
            zones,
            signal,
            checkpoint,
        }
    }

    /// Handles an entry into the zone at `index`, classified as `kind`.
    ///
    /// Goal entries only count while that zone is active. Danger entries
    /// always count: one mistake is recorded and a rollback starts (or
    /// restarts, if one is already running). Out-of-range indices are
    /// ignored.
    pub fn on_zone_entered(&self, index: usize, kind: ZoneKind) {
        let Some(zone) = self.zones.get(index) else {
            debug!(index, "zone index out of range; ignoring entry");
            return;
        };

        self.ctx.events.emit(Event::ZoneEntered {
            timestamp: Utc::now(),
            zone_index: index,
            kind,
        });
        metrics::record_zone_event(kind);

        match kind {
            ZoneKind::Goal => {
                if zone.is_active() {
                    info!(index, name = zone.name(), "goal zone reached");
                    self.signal.notify_zone_reached(true);
                } else {
                    debug!(index, name = zone.name(), "inactive goal zone entered; ignoring");
                }
            }
            ZoneKind::Danger => {
                info!(index, name = zone.name(), "danger zone entered; rolling back");
                self.ctx.stats.add_mistake_count();
                self.checkpoint.rollback();
            }
        }
    }

    /// Handles an exit from the zone at `index`. Exits carry no behavior.
    pub fn on_zone_exited(&self, index: usize) {
        trace!(index, "zone exited");
    }

    /// The registry this detector dispatches against.
    #[must_use]
    pub const fn zones(&self) -> &Arc<ZoneRegistry> {
        &self.zones
    }

    /// The shared reached flag.
    #[must_use]
    pub const fn signal(&self) -> &Arc<ZoneSignal> {
        &self.signal
    }
}
