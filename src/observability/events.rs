//! Structured event stream for `CrowdSafe`.
//!
//! Discrete, typed events emitted during a scenario run. Events are
//! serialized as newline-delimited JSON (JSONL) and carry a monotonically
//! increasing sequence number for ordering.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::scenario::Phase;
use crate::zone::ZoneKind;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a scenario run.
///
/// Each variant is tagged with `"type"` when serialized to JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A scenario run has started.
    ScenarioStarted {
        /// When the run started.
        timestamp: DateTime<Utc>,
        /// Identifier of this run.
        session_id: Uuid,
    },

    /// A new phase has been entered.
    PhaseEntered {
        /// When the transition occurred.
        timestamp: DateTime<Utc>,
        /// The phase that was entered.
        phase: Phase,
        /// Zero-based position of the phase in the scenario.
        phase_index: usize,
    },

    /// A mission window opened.
    MissionStarted {
        /// When the mission started.
        timestamp: DateTime<Utc>,
        /// Mission label.
        label: String,
        /// Configured time budget in milliseconds.
        time_limit_ms: u64,
    },

    /// A mission's completion condition became true.
    MissionCompleted {
        /// When the mission completed.
        timestamp: DateTime<Utc>,
        /// Mission label.
        label: String,
        /// Time taken in milliseconds.
        duration_ms: u64,
        /// Whether the time budget had been exceeded.
        over_budget: bool,
    },

    /// The zone-trigger collaborator reported an entry.
    ZoneEntered {
        /// When the entry was reported.
        timestamp: DateTime<Utc>,
        /// Zone index.
        zone_index: usize,
        /// Goal or danger.
        kind: ZoneKind,
    },

    /// A rollback to the checkpoint started.
    RollbackStarted {
        /// When the rollback started.
        timestamp: DateTime<Utc>,
        /// Whether an in-flight rollback was cancelled to make room.
        superseded: bool,
    },

    /// A rollback finished and control was returned.
    RollbackCompleted {
        /// When the rollback finished.
        timestamp: DateTime<Utc>,
        /// Whether the rig was actually moved.
        restored: bool,
    },

    /// The scenario reached `Finished`.
    ScenarioCompleted {
        /// When the scenario completed.
        timestamp: DateTime<Utc>,
        /// Total play time in milliseconds.
        play_time_ms: u64,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization or I/O failures are silently dropped; observability must
/// never stall a scenario.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

/// Saturating conversion of a duration to whole milliseconds.
#[must_use]
pub fn duration_ms(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;

    /// In-memory writer for capturing emitter output in tests.
    #[derive(Clone)]
    struct TestWriter(Arc<StdMutex<Vec<u8>>>);

    impl TestWriter {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(Vec::new())))
        }

        fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn sample_event() -> Event {
        Event::PhaseEntered {
            timestamp: DateTime::parse_from_rfc3339("2026-03-04T10:15:30Z")
                .unwrap()
                .with_timezone(&Utc),
            phase: Phase::ABCPose,
            phase_index: 3,
        }
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_string(&sample_event()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "PhaseEntered");
        assert_eq!(parsed["phase"], "abc_pose");
        assert_eq!(parsed["phase_index"], 3);
    }

    #[test]
    fn emitter_increments_sequence() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(sample_event());
        emitter.emit(Event::RollbackStarted {
            timestamp: Utc::now(),
            superseded: false,
        });

        assert_eq!(emitter.event_count(), 2);

        let lines: Vec<serde_json::Value> = tw
            .contents()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[1]["sequence"], 1);
        assert_eq!(lines[1]["type"], "RollbackStarted");
    }

    #[test]
    fn zone_event_uses_lowercase_kind() {
        let json = serde_json::to_string(&Event::ZoneEntered {
            timestamp: Utc::now(),
            zone_index: 5,
            kind: ZoneKind::Danger,
        })
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["kind"], "danger");
    }

    #[test]
    fn envelope_flattens_event_fields() {
        let envelope = EventEnvelope {
            sequence: 7,
            event: sample_event(),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["sequence"], 7);
        assert_eq!(parsed["type"], "PhaseEntered");
        assert!(parsed.get("event").is_none());
    }

    #[test]
    fn duration_ms_saturates() {
        assert_eq!(duration_ms(std::time::Duration::from_millis(1500)), 1500);
        assert_eq!(duration_ms(std::time::Duration::MAX), u64::MAX);
    }
}
