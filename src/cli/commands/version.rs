//! Version information display
//!
//! Prints version and build metadata in human or JSON format.

use crate::cli::args::{OutputFormat, VersionArgs};

/// Print version and build information.
pub fn run(args: &VersionArgs) {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    match args.format {
        OutputFormat::Human => {
            println!("{name} {version}");
            println!("target frame rate: {} Hz", crate::runtime::DEFAULT_FRAME_RATE);
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "name": name,
                    "version": version,
                    "frame_rate": crate::runtime::DEFAULT_FRAME_RATE,
                })
            );
        }
    }
}
