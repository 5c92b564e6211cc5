//! Renderer-agnostic core of the lensing visualizer.
//!
//! Compiles the fragment-shader template, derives per-frame uniforms from the
//! observer, and gates rendering so the expensive raymarch pass only runs
//! when the shader or the camera changed.
//!
//! # Invariants
//! - Compiled shader source is a pure function of the template and parameters.
//! - The shader dirty flag is the only signal that a rebuild is due.
//! - A tick with an unchanged camera and a clean shader draws nothing.
//! - Renderers never mutate session state.

mod frame;
mod renderer;
mod session;
mod shader;
mod stats;
mod uniforms;

pub use frame::{
    CAMERA_EPSILON, FrameClock, FrameDecision, FrameGate, FrameOutcome, FrameState, RenderLoop,
    RenderReason,
};
pub use renderer::{DebugTextRenderer, Renderer};
pub use session::Session;
pub use shader::{Shader, ShaderError, ShaderTemplate};
pub use stats::FrameStats;
pub use uniforms::FrameUniforms;

/// Package name and version, for diagnostics.
pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
