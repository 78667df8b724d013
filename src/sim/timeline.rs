//! Scripted input timelines.
//!
//! A timeline is a YAML list of inputs, each stamped with an offset from the
//! start of the run:
//!
//! ```yaml
//! start: [0.0, 0.0, 0.0]
//! events:
//!   - { at: 17s, action: enter_zone, zone: 0 }
//!   - { at: 40s, action: pose, held: true }
//!   - { at: 52s, action: grab, object: pillar_left }
//! ```

use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::schema::duration_str;
use crate::error::ConfigError;

/// One user or scene input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InputAction {
    /// The rig entered a zone
    EnterZone {
        /// Zone index
        zone: usize,
    },
    /// The rig left a zone
    ExitZone {
        /// Zone index
        zone: usize,
    },
    /// Hands moved into or out of the protective posture
    Pose {
        /// Posture held
        held: bool,
    },
    /// Both override controls pressed or released
    Override {
        /// Controls held
        held: bool,
    },
    /// A grabbable object was grabbed
    Grab {
        /// Object name
        object: String,
    },
    /// A grabbed object was let go
    Release {
        /// Object name
        object: String,
    },
    /// A grabbable object was removed from the scene
    Deactivate {
        /// Object name
        object: String,
    },
    /// Both grip controls pressed or released
    Grip {
        /// Controls held
        held: bool,
    },
    /// The user closed the panel
    Dismiss,
    /// The rig walked somewhere
    MoveTo {
        /// Destination
        position: Vec3,
    },
}

/// An input stamped with its offset from the start of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedInput {
    /// Offset from the start of the run
    #[serde(with = "duration_str")]
    pub at: Duration,

    /// What happens
    #[serde(flatten)]
    pub action: InputAction,
}

/// An ordered input script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTimeline {
    /// Where the rig starts
    #[serde(default = "default_start")]
    pub start: Vec3,

    /// Inputs, sorted by `at` after loading
    #[serde(default)]
    pub events: Vec<TimedInput>,
}

const fn default_start() -> Vec3 {
    Vec3::new(0.0, 0.0, -1.0)
}

impl InputTimeline {
    /// Parses a timeline from YAML text. `path` is used only for errors.
    ///
    /// Inputs are stably sorted by offset, so inputs sharing an offset keep
    /// their written order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` for malformed YAML or unknown
    /// actions.
    pub fn from_yaml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut timeline: Self = serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;
        timeline.events.sort_by_key(|input| input.at);
        Ok(timeline)
    }

    /// Reads and parses a timeline file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingFile` if the file cannot be read, or a
    /// parse error as for [`from_yaml`](Self::from_yaml).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        Self::from_yaml(&raw, path)
    }

    /// Offset of the last input.
    #[must_use]
    pub fn span(&self) -> Duration {
        self.events.last().map_or(Duration::ZERO, |input| input.at)
    }
}
