//! Observer kinematics and the camera-to-observer bridge.
//!
//! # Invariants
//! - Observer orientation is rebuilt wholesale from the camera, never rotated
//!   incrementally.
//! - Observer time only moves forward for non-negative `dt` and time scale.
//! - Degenerate numeric input (zero velocity, parallel axes) yields NaN; it is
//!   a caller precondition, not an error.

pub mod camera;
pub mod observer;

pub use camera::{
    INITIAL_PITCH_DEGREES, INITIAL_YAW_DEGREES, InitialView, frobenius_distance,
    initialize_camera, update_camera,
};
pub use observer::{ORBITAL_LEAD, Observer};

/// Package name and version, for diagnostics.
pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
