//! Scenario engine
//!
//! The linear phase machine and the primitives it is built from: message
//! display, timed missions and background hold monitors.

pub mod mission;
pub mod monitor;
pub mod orchestrator;
pub mod phase;
pub mod script;
pub mod steps;

pub use mission::{Mission, MissionOutcome, run_timed_mission};
pub use monitor::{Monitor, MonitorProbe};
pub use orchestrator::{PhaseOrchestrator, RunSummary};
pub use phase::{Phase, PhaseState};
pub use script::{ActionKind, PhaseScript, SCRIPTED_ZONES, Step};
pub use steps::{PanelMessage, PanelStack, show_message_and_wait};
