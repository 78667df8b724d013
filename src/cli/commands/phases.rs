//! `phases` command handler
//!
//! Prints the fixed phase order with each phase's steps, using the timings
//! of the given configuration.

use serde::Serialize;

use crate::cli::args::{OutputFormat, PhasesArgs};
use crate::error::CrowdSafeError;
use crate::scenario::{Phase, PhaseScript, Step};

use super::load_config;

#[derive(Debug, Serialize)]
struct PhaseListing<'a> {
    index: usize,
    phase: Phase,
    steps: &'a [Step],
}

/// Print the phase script.
///
/// # Errors
///
/// Returns a config error if `--config` is given and fails to load.
pub fn run(args: &PhasesArgs) -> Result<(), CrowdSafeError> {
    let config = load_config(args.config.as_deref())?;
    let script = PhaseScript::build(&config);

    match args.format {
        OutputFormat::Human => print!("{}", render(&script)),
        OutputFormat::Json => {
            let listing: Vec<_> = script
                .iter()
                .map(|(phase, steps)| PhaseListing {
                    index: phase.index(),
                    phase,
                    steps,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
    }
    Ok(())
}

fn render(script: &PhaseScript) -> String {
    let mut out = String::new();
    for (phase, steps) in script.iter() {
        out.push_str(&format!("{:>2}. {phase}\n", phase.index()));
        for step in steps {
            out.push_str(&format!("      - {step}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;

    #[test]
    fn test_render_lists_every_phase_in_order() {
        let script = PhaseScript::build(&ScenarioConfig::default());
        let text = render(&script);
        let mut last = 0;
        for phase in Phase::ALL {
            let pos = text
                .find(&format!(". {phase}\n"))
                .unwrap_or_else(|| panic!("{phase} missing"));
            assert!(pos >= last);
            last = pos;
        }
        assert!(text.contains("complete scenario"));
    }

    #[test]
    fn test_listing_serializes_steps() {
        let script = PhaseScript::build(&ScenarioConfig::default());
        let (phase, steps) = script.iter().next().unwrap();
        let json = serde_json::to_value(PhaseListing {
            index: phase.index(),
            phase,
            steps,
        })
        .unwrap();
        assert_eq!(json["index"], 0);
        assert_eq!(json["phase"], "caution");
        assert!(json["steps"].as_array().is_some_and(|s| !s.is_empty()));
    }
}
