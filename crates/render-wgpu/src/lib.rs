//! wgpu render backend for the lensing visualizer.
//!
//! Draws the compiled raymarch fragment program over a fullscreen quad into an
//! offscreen scene target, and blits that target to the surface every display
//! frame. The orbit camera supplies the view matrix the observer follows.
//!
//! # Invariants
//! - Renderer never mutates session state.
//! - A rejected fragment program leaves the previous pipeline in use.
//! - The scene target is only redrawn when the render loop asks for a frame.

mod camera;
mod gpu;
mod shaders;

pub use camera::OrbitCamera;
pub use gpu::{RaymarchRenderer, RenderError, ScenePass};
pub use shaders::RAYTRACER_TEMPLATE;
