//! Shared integration-test helpers: fast configurations, eager input
//! timelines and a wrapper for spawning the `crowdsafe` binary.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;

use crowdsafe::config::ScenarioConfig;
use crowdsafe::sim::{InputAction, InputTimeline, TimedInput};
use glam::Vec3;

/// Where the rig starts in every helper timeline.
pub const START: Vec3 = Vec3::new(0.0, 0.0, -1.0);

/// Absolute path to a file under `tests/fixtures/`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Runs the `crowdsafe` binary to completion with `args`.
#[allow(clippy::missing_panics_doc)]
pub fn spawn_command(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_crowdsafe"))
        .args(args)
        .env_remove("CROWDSAFE_LOG_LEVEL")
        .output()
        .expect("failed to spawn crowdsafe")
}

/// A configuration where every message and hold takes about a second.
pub fn quick_config() -> ScenarioConfig {
    let mut config = ScenarioConfig::default();
    config.messages.caution = Duration::from_secs(2);
    config.messages.instruction = Duration::from_secs(1);
    config.messages.feedback = Duration::from_secs(1);
    config.hold.pose_hold = 1.0;
    config.hold.pillar_hold = 1.0;
    config.hold.climb_hold = 1.0;
    config.missions.reach_limit = Duration::from_secs(20);
    config.missions.hold_limit = Duration::from_secs(20);
    config
}

/// A timeline that keeps offering every goal zone and both climb handles
/// from `from` until `until`, with the protective pose held throughout.
///
/// Entries to inactive zones and grabs while interaction is locked are
/// ignored by the engine, so the scenario advances as fast as it allows.
pub fn eager_timeline(from: Duration, until: Duration, step: Duration) -> InputTimeline {
    let mut events = vec![TimedInput {
        at: Duration::ZERO,
        action: InputAction::Pose { held: true },
    }];
    let mut at = from;
    while at <= until {
        for zone in 0..5 {
            events.push(TimedInput {
                at,
                action: InputAction::EnterZone { zone },
            });
        }
        for object in ["pillar_left", "pillar_right"] {
            events.push(TimedInput {
                at,
                action: InputAction::Grab {
                    object: object.to_string(),
                },
            });
        }
        at += step;
    }
    InputTimeline {
        start: START,
        events,
    }
}

/// Serializes `value` as YAML into `dir/name`.
#[allow(clippy::missing_panics_doc)]
pub fn write_yaml<T: serde::Serialize>(dir: &Path, name: &str, value: &T) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_yaml::to_string(value).expect("serialize yaml"))
        .expect("write yaml");
    path
}

/// Reads a JSONL file into one value per line.
#[allow(clippy::missing_panics_doc)]
pub fn read_events(path: &Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .expect("read events file")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("event line is JSON"))
        .collect()
}
