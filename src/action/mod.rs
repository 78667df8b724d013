//! Physical action checks polled by the scenario monitors.
//!
//! - [`ActionValidator`]: posture and two-handed grab conditions
//! - [`GrabSession`] / [`Grabbable`]: the shared grab counter and its objects

pub mod grab;
pub mod validator;

pub use grab::{GrabGuard, GrabSession, Grabbable};
pub use validator::{ActionValidator, chest_point, override_engaged, pose_matches};
