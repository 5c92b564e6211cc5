use crate::shader::Shader;
use glam::{Mat4, UVec2};
use lensing_kernel::{Observer, update_camera};

/// Everything one visualization session mutates between frames.
///
/// The host owns a single `Session` and lends it to the camera bridge and the
/// render loop; there is no process-wide state.
#[derive(Debug, Clone)]
pub struct Session {
    pub observer: Observer,
    pub shader: Shader,
    resolution: UVec2,
}

impl Session {
    pub fn new(shader: Shader) -> Self {
        Self {
            observer: Observer::new(),
            shader,
            resolution: UVec2::ONE,
        }
    }

    /// Output size in physical pixels.
    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    /// Record a new output size. Zero extents are clamped to one pixel.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.resolution = UVec2::new(width.max(1), height.max(1));
        tracing::debug!(width = self.resolution.x, height = self.resolution.y, "session resized");
    }

    /// Re-derive the observer from the camera's view matrix at the configured
    /// orbit distance. Called whenever the orbit controls report a change.
    pub fn follow_camera(&mut self, world_inverse: &Mat4) {
        let distance = self.shader.params().observer.distance;
        update_camera(&mut self.observer, world_inverse, distance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DVec3, Vec3};

    fn session() -> Session {
        Session::new(Shader::with_defaults("{{n_steps}}").unwrap())
    }

    #[test]
    fn resize_clamps_to_one_pixel() {
        let mut s = session();
        s.resize(0, 720);
        assert_eq!(s.resolution(), UVec2::new(1, 720));
    }

    #[test]
    fn resize_leaves_observer_and_shader_alone() {
        let mut s = session();
        s.shader.take_needs_update();
        let observer = s.observer;
        s.resize(1280, 720);
        assert_eq!(s.observer, observer);
        assert!(!s.shader.needs_update());
    }

    #[test]
    fn follow_camera_uses_configured_distance() {
        let mut s = session();
        s.shader.update_params(|p| p.observer.distance = 20.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        s.follow_camera(&view);

        assert_eq!(s.observer.position, -s.observer.orientation.z_axis * 20.0);
        assert_eq!(s.observer.velocity, DVec3::ZERO);
    }
}
