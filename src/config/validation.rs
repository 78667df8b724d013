//! Configuration validation
//!
//! Runs on the fully deserialized `ScenarioConfig` and collects every issue
//! instead of stopping at the first one.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::schema::ScenarioConfig;
use crate::error::{Severity, ValidationIssue};
use crate::scenario::script::SCRIPTED_ZONES;
use crate::zone::ZoneKind;

/// Message durations above this are flagged.
const LONG_MESSAGE: Duration = Duration::from_secs(60);

/// Frame rates outside this band are flagged.
const FRAME_RATE_BAND: (f32, f32) = (30.0, 240.0);

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &ScenarioConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_frame_rate(config.frame_rate);
        self.validate_messages(config);
        self.validate_hold(config);
        self.validate_gesture(config);
        self.validate_grab(config);
        self.validate_zones(config);
        self.validate_missions(config);
        self.validate_rollback(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Sections
    // ========================================================================

    fn validate_frame_rate(&mut self, rate: f32) {
        if !is_positive(rate) {
            self.add_error("frame_rate", format!("must be a positive number, got {rate}"));
        } else if rate < FRAME_RATE_BAND.0 || rate > FRAME_RATE_BAND.1 {
            self.add_warning(
                "frame_rate",
                format!(
                    "{rate} fps is outside the usual {}-{} fps range",
                    FRAME_RATE_BAND.0, FRAME_RATE_BAND.1
                ),
            );
        }
    }

    fn validate_messages(&mut self, config: &ScenarioConfig) {
        let messages = &config.messages;
        for (field, value) in [
            ("messages.caution", messages.caution),
            ("messages.instruction", messages.instruction),
            ("messages.feedback", messages.feedback),
        ] {
            if value > LONG_MESSAGE {
                self.add_warning(
                    field,
                    format!(
                        "message stays up for {}; users may think the scenario stalled",
                        humantime::format_duration(value)
                    ),
                );
            }
        }
    }

    fn validate_hold(&mut self, config: &ScenarioConfig) {
        let hold = &config.hold;
        for (field, value) in [
            ("hold.pose_hold", hold.pose_hold),
            ("hold.pillar_hold", hold.pillar_hold),
            ("hold.climb_hold", hold.climb_hold),
            ("hold.increase_rate", hold.increase_rate),
            ("hold.decrease_rate", hold.decrease_rate),
        ] {
            if !is_positive(value) {
                self.add_error(field, format!("must be a positive number, got {value}"));
            }
        }

        if is_positive(hold.increase_rate)
            && is_positive(hold.decrease_rate)
            && hold.decrease_rate < hold.increase_rate
        {
            self.add_warning(
                "hold.decrease_rate",
                "decay is slower than buildup; brief lapses will barely cost progress",
            );
        }
    }

    fn validate_gesture(&mut self, config: &ScenarioConfig) {
        let gesture = &config.gesture;
        for (field, value) in [
            ("gesture.chest_offset", gesture.chest_offset),
            ("gesture.hand_to_chest", gesture.hand_to_chest),
            ("gesture.hand_to_hand", gesture.hand_to_hand),
        ] {
            if !is_positive(value) {
                self.add_error(field, format!("must be a positive distance, got {value}"));
            }
        }
    }

    fn validate_grab(&mut self, config: &ScenarioConfig) {
        if config.grab.required_count == 0 {
            self.add_error(
                "grab.required_count",
                "must be at least 1; a zero requirement completes every grab hold instantly",
            );
        }
    }

    fn validate_zones(&mut self, config: &ScenarioConfig) {
        for index in SCRIPTED_ZONES {
            match config.zones.get(index) {
                None => self.add_error(
                    format!("zones[{index}]"),
                    "zone is required by the scenario script but not declared",
                ),
                Some(zone) if zone.kind != ZoneKind::Goal => self.add_error(
                    format!("zones[{index}]"),
                    format!("zone '{}' is reached by the script and must be a goal", zone.name),
                ),
                Some(_) => {}
            }
        }

        let mut seen = HashSet::new();
        for (index, zone) in config.zones.iter().enumerate() {
            if zone.name.is_empty() {
                self.add_error(format!("zones[{index}].name"), "zone name cannot be empty");
            } else if !seen.insert(zone.name.as_str()) {
                self.add_warning(
                    format!("zones[{index}].name"),
                    format!("duplicate zone name '{}'", zone.name),
                );
            }
        }

        if !config.zones.iter().any(|z| z.kind == ZoneKind::Danger) {
            self.add_warning("zones", "no danger zones declared; rollbacks can never trigger");
        }
    }

    fn validate_missions(&mut self, config: &ScenarioConfig) {
        for (field, value) in [
            ("missions.reach_limit", config.missions.reach_limit),
            ("missions.hold_limit", config.missions.hold_limit),
        ] {
            if value.is_zero() {
                self.add_error(field, "time budget must be greater than zero");
            }
        }
    }

    fn validate_rollback(&mut self, config: &ScenarioConfig) {
        if config.rollback.message.trim().is_empty() {
            self.add_error("rollback.message", "feedback text id cannot be empty");
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        });
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}
