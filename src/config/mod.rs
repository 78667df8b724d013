//! Configuration module
//!
//! Loads and validates scenario configuration files: timings, hold targets,
//! gesture thresholds, zones and rollback presentation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
