//! `CrowdSafe` - scenario engine for crowd-crush safety VR drills
//!
//! This library provides the phase orchestrator, hold timing, action
//! validation, zone handling and checkpoint rollback for a linear training
//! scenario, plus headless collaborators for running it without a headset.

pub mod action;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod hold;
pub mod observability;
pub mod runtime;
pub mod scenario;
pub mod sim;
pub mod stats;
pub mod zone;
