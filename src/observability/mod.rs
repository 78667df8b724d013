//! Observability
//!
//! Logging, metrics, and the structured event stream used to follow a
//! scenario run from outside the headset.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{Event, EventEmitter};
pub use logging::LogSettings;
pub use metrics::init_metrics;
