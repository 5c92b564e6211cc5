use glam::{Mat4, Vec3};
use std::f32::consts::PI;

const POLAR_MARGIN: f32 = 0.01;

/// Orbit camera circling a target point. Drag input rotates it, the wheel
/// zooms it; its view matrix feeds the observer bridge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    /// Rotation about +Y, measured from +Z towards +X.
    pub azimuth: f32,
    /// Angle from +Y.
    pub polar: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub sensitivity: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            radius: 1.0,
            azimuth: 0.0,
            polar: PI / 2.0,
            min_radius: 0.1,
            max_radius: 1000.0,
            sensitivity: 0.005,
        }
    }
}

impl OrbitCamera {
    /// Camera at `position` looking at the origin.
    pub fn from_position(position: Vec3) -> Self {
        let mut camera = Self::default();
        camera.set_position(position);
        camera
    }

    pub fn set_position(&mut self, position: Vec3) {
        let offset = position - self.target;
        self.radius = offset.length().clamp(self.min_radius, self.max_radius);
        self.azimuth = offset.x.atan2(offset.z);
        self.polar = (offset.y / offset.length().max(f32::EPSILON))
            .clamp(-1.0, 1.0)
            .acos()
            .clamp(POLAR_MARGIN, PI - POLAR_MARGIN);
    }

    pub fn position(&self) -> Vec3 {
        let (sin_p, cos_p) = self.polar.sin_cos();
        let (sin_a, cos_a) = self.azimuth.sin_cos();
        self.target + self.radius * Vec3::new(sin_p * sin_a, cos_p, sin_p * cos_a)
    }

    /// Orbit by a cursor delta in pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.azimuth -= dx * self.sensitivity;
        self.polar = (self.polar - dy * self.sensitivity).clamp(POLAR_MARGIN, PI - POLAR_MARGIN);
    }

    /// Scale the orbit radius; positive `delta` moves closer.
    pub fn zoom(&mut self, delta: f32) {
        self.radius = (self.radius * 0.9_f32.powf(delta)).clamp(self.min_radius, self.max_radius);
    }

    /// View matrix, the inverse of the camera's world transform.
    pub fn world_inverse(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }
}
