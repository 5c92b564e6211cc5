//! Desktop input mapped to a small set of viewer actions.
//!
//! # Invariants
//! - The viewer consumes actions, never raw window events.
//! - Input never touches shader parameters directly; the control panel does.

pub mod action;

pub use action::{Action, OrbitDrag};

/// Package name and version, for diagnostics.
pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
