//! Command-line interface
//!
//! Argument definitions and command handlers for the `crowdsafe` binary.

pub mod args;
pub mod commands;
