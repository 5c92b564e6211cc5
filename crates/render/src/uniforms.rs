use crate::session::Session;
use glam::{Vec2, Vec3};

/// Per-draw values pushed to the fragment program.
///
/// Names mirror the uniform block the shader template declares. Texture
/// handles are bound once by the backend and are not part of this record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub time: f32,
    pub resolution: Vec2,
    pub cam_pos: Vec3,
    pub cam_vel: Vec3,
    pub cam_x: Vec3,
    pub cam_y: Vec3,
    pub cam_z: Vec3,
}

impl FrameUniforms {
    /// Snapshot the session's observer and output size.
    pub fn capture(session: &Session) -> Self {
        let observer = &session.observer;
        let orientation = observer.orientation;
        Self {
            time: observer.time as f32,
            resolution: session.resolution().as_vec2(),
            cam_pos: observer.position.as_vec3(),
            cam_vel: observer.velocity.as_vec3(),
            cam_x: orientation.x_axis.as_vec3(),
            cam_y: orientation.y_axis.as_vec3(),
            cam_z: orientation.z_axis.as_vec3(),
        }
    }
}
