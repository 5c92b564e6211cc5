use crate::uniforms::FrameUniforms;
use std::convert::Infallible;
use std::fmt::Write as _;

/// Backend interface driven by the render loop. All renderers implement this
/// trait.
///
/// A renderer receives compiled fragment source only when it changes, and a
/// fresh set of uniforms for every frame the loop decides to draw. It never
/// mutates session state.
pub trait Renderer {
    type Error;

    /// Replace the fragment program with newly compiled source.
    fn rebuild_shader(&mut self, fragment_source: &str) -> Result<(), Self::Error>;

    /// Draw one frame with the given uniforms.
    fn draw(&mut self, uniforms: &FrameUniforms) -> Result<(), Self::Error>;
}

/// Debug text renderer: a GPU-free backend.
///
/// Produces a human-readable log of shader rebuilds and drawn frames. Useful
/// for CLI output and for testing the render loop.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    output: String,
    shader_builds: usize,
    frames: usize,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn shader_builds(&self) -> usize {
        self.shader_builds
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl Renderer for DebugTextRenderer {
    type Error = Infallible;

    fn rebuild_shader(&mut self, fragment_source: &str) -> Result<(), Infallible> {
        self.shader_builds += 1;
        let _ = writeln!(
            self.output,
            "=== shader #{} ({} lines) ===",
            self.shader_builds,
            fragment_source.lines().count()
        );
        Ok(())
    }

    fn draw(&mut self, u: &FrameUniforms) -> Result<(), Infallible> {
        self.frames += 1;
        let _ = writeln!(
            self.output,
            "frame {:>4} t={:.3} res={}x{} pos=({:.2}, {:.2}, {:.2}) vel=({:.2}, {:.2}, {:.2})",
            self.frames,
            u.time,
            u.resolution.x,
            u.resolution.y,
            u.cam_pos.x,
            u.cam_pos.y,
            u.cam_pos.z,
            u.cam_vel.x,
            u.cam_vel.y,
            u.cam_vel.z,
        );
        let _ = writeln!(
            self.output,
            "      x=({:.3}, {:.3}, {:.3}) y=({:.3}, {:.3}, {:.3}) z=({:.3}, {:.3}, {:.3})",
            u.cam_x.x, u.cam_x.y, u.cam_x.z, u.cam_y.x, u.cam_y.y, u.cam_y.z, u.cam_z.x,
            u.cam_z.y, u.cam_z.z,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    fn uniforms() -> FrameUniforms {
        FrameUniforms {
            time: 1.5,
            resolution: Vec2::new(640.0, 480.0),
            cam_pos: Vec3::new(0.0, -11.0, 0.5),
            cam_vel: Vec3::ZERO,
            cam_x: Vec3::X,
            cam_y: Vec3::Y,
            cam_z: Vec3::Z,
        }
    }

    #[test]
    fn debug_renderer_starts_empty() {
        let r = DebugTextRenderer::new();
        assert!(r.output().is_empty());
        assert_eq!(r.frames(), 0);
        assert_eq!(r.shader_builds(), 0);
    }

    #[test]
    fn debug_renderer_logs_frames() {
        let mut r = DebugTextRenderer::new();
        r.rebuild_shader("a\nb\nc").unwrap();
        r.draw(&uniforms()).unwrap();

        assert_eq!(r.shader_builds(), 1);
        assert_eq!(r.frames(), 1);
        assert!(r.output().contains("shader #1 (3 lines)"));
        assert!(r.output().contains("t=1.500"));
        assert!(r.output().contains("res=640x480"));
    }
}
