//! Configuration schema types
//!
//! Every section and key is optional; the defaults describe the stock
//! scenario. Durations are written as human-readable strings such as
//! `"3s"` or `"1m 30s"`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::hold::{DEFAULT_DECREASE_RATE, DEFAULT_INCREASE_RATE};
use crate::runtime::DEFAULT_FRAME_RATE;
use crate::zone::ZoneKind;

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScenarioConfig {
    /// Frames per second driving every wait
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,

    /// Message display durations
    #[serde(default)]
    pub messages: MessageConfig,

    /// Hold targets and timer rates
    #[serde(default)]
    pub hold: HoldConfig,

    /// Protective posture thresholds
    #[serde(default)]
    pub gesture: GestureConfig,

    /// Climb-handle grab requirements
    #[serde(default)]
    pub grab: GrabConfig,

    /// Ordered zone list; the script refers to zones by position
    #[serde(default = "default_zones")]
    pub zones: Vec<ZoneConfig>,

    /// Mission time budgets
    #[serde(default)]
    pub missions: MissionConfig,

    /// Rollback presentation
    #[serde(default)]
    pub rollback: RollbackConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            messages: MessageConfig::default(),
            hold: HoldConfig::default(),
            gesture: GestureConfig::default(),
            grab: GrabConfig::default(),
            zones: default_zones(),
            missions: MissionConfig::default(),
            rollback: RollbackConfig::default(),
        }
    }
}

const fn default_frame_rate() -> f32 {
    DEFAULT_FRAME_RATE
}

fn default_zones() -> Vec<ZoneConfig> {
    vec![
        ZoneConfig::goal("tutorial_marker"),
        ZoneConfig::goal("move1_goal"),
        ZoneConfig::goal("move2_goal"),
        ZoneConfig::goal("climb_top"),
        ZoneConfig::goal("exit"),
        ZoneConfig::danger("crowd_crush"),
    ]
}

// ============================================================================
// Sections
// ============================================================================

/// How long each kind of message stays on the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// Opening safety warning
    #[serde(with = "duration_str")]
    pub caution: Duration,

    /// Instruction before each mission
    #[serde(with = "duration_str")]
    pub instruction: Duration,

    /// Feedback after each mission
    #[serde(with = "duration_str")]
    pub feedback: Duration,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            caution: Duration::from_secs(10),
            instruction: Duration::from_secs(6),
            feedback: Duration::from_secs(3),
        }
    }
}

/// Hold targets (seconds) and hold-timer rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldConfig {
    /// Protective posture hold
    pub pose_hold: f32,
    /// Two-handed pillar hold
    pub pillar_hold: f32,
    /// Climb handle hold
    pub climb_hold: f32,
    /// Buildup per second while the condition holds
    pub increase_rate: f32,
    /// Decay per second while it does not
    pub decrease_rate: f32,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            pose_hold: 3.0,
            pillar_hold: 3.0,
            climb_hold: 2.0,
            increase_rate: DEFAULT_INCREASE_RATE,
            decrease_rate: DEFAULT_DECREASE_RATE,
        }
    }
}

/// Distance thresholds (metres) for the protective posture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// How far below the head the chest point sits
    pub chest_offset: f32,
    /// Maximum hand-to-chest distance
    pub hand_to_chest: f32,
    /// Maximum hand-to-hand distance
    pub hand_to_hand: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            chest_offset: 0.3,
            hand_to_chest: 0.25,
            hand_to_hand: 0.2,
        }
    }
}

/// Requirements for a climb-handle grab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    /// Objects that must be held at once
    pub required_count: usize,
    /// Additionally require both grip controls
    pub require_grip_buttons: bool,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            required_count: 2,
            require_grip_buttons: false,
        }
    }
}

/// A zone as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Zone name, for logs
    pub name: String,
    /// Goal or danger
    pub kind: ZoneKind,
}

impl ZoneConfig {
    /// A goal zone named `name`.
    #[must_use]
    pub fn goal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ZoneKind::Goal,
        }
    }

    /// A danger zone named `name`.
    #[must_use]
    pub fn danger(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ZoneKind::Danger,
        }
    }
}

/// Mission time budgets. Exceeding one is logged, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Budget for reaching a goal zone
    #[serde(with = "duration_str")]
    pub reach_limit: Duration,

    /// Budget for completing a hold
    #[serde(with = "duration_str")]
    pub hold_limit: Duration,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            reach_limit: Duration::from_secs(60),
            hold_limit: Duration::from_secs(30),
        }
    }
}

/// Rollback presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollbackConfig {
    /// Feedback text id shown while rolling back
    pub message: String,

    /// How long the feedback stays up
    #[serde(with = "duration_str")]
    pub duration: Duration,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            message: "rollback_warning".to_string(),
            duration: Duration::from_secs(3),
        }
    }
}

/// `serde` adapter writing [`Duration`] as a `humantime` string.
pub mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes as e.g. `"1m 30s"`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    /// Parses strings such as `"3s"`, `"250ms"` or `"1m 30s"`.
    ///
    /// # Errors
    ///
    /// Returns a deserialization error for malformed durations.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: ScenarioConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ScenarioConfig::default());
        assert_eq!(config.zones.len(), 6);
        assert_eq!(config.grab.required_count, 2);
        assert!((config.hold.decrease_rate - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let yaml = r#"
messages:
  feedback: 500ms
hold:
  pose_hold: 1.5
"#;
        let config: ScenarioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.messages.feedback, Duration::from_millis(500));
        assert_eq!(config.messages.caution, Duration::from_secs(10));
        assert!((config.hold.pose_hold - 1.5).abs() < f32::EPSILON);
        assert!((config.hold.climb_hold - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zone_kinds_parse_lowercase() {
        let yaml = r"
zones:
  - { name: a, kind: goal }
  - { name: b, kind: danger }
";
        let config: ScenarioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.zones, vec![ZoneConfig::goal("a"), ZoneConfig::danger("b")]);
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        let err = serde_yaml::from_str::<ScenarioConfig>("rollback:\n  duration: soon\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_durations_serialize_human_readable() {
        let yaml = serde_yaml::to_string(&MissionConfig::default()).unwrap();
        assert!(yaml.contains("reach_limit: 1m"), "{yaml}");
        assert!(yaml.contains("hold_limit: 30s"), "{yaml}");
    }
}
