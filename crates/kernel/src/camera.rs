use crate::observer::Observer;
use glam::{DMat3, DVec3, Mat4, Vec3};

/// Pitch of the reproducible starting viewpoint, in degrees.
pub const INITIAL_PITCH_DEGREES: f32 = 3.0;
/// Yaw of the reproducible starting viewpoint, in degrees.
pub const INITIAL_YAW_DEGREES: f32 = 0.0;

/// Starting camera state, independent of the orbit controls' own placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialView {
    pub world_inverse: Mat4,
    /// Unit-distance camera position along the view's back axis.
    pub position: Vec3,
}

/// Build the initial view rotation from a pitch and yaw in degrees.
pub fn initialize_camera(pitch_degrees: f32, yaw_degrees: f32) -> InitialView {
    let world_inverse = Mat4::from_rotation_x((-pitch_degrees).to_radians())
        * Mat4::from_rotation_y((-yaw_degrees).to_radians());
    let m = world_inverse.to_cols_array();
    InitialView {
        world_inverse,
        position: Vec3::new(m[2], m[6], m[10]),
    }
}

/// Derive observer orientation and position from the camera's world-inverse
/// (view) matrix.
///
/// The rows of the view rotation become the observer axes with the Y and Z
/// channels exchanged, matching the shader's coordinate convention. The
/// observer sits `distance` units behind the origin along the remapped back
/// axis. Velocity is cleared: manual orbiting imparts no simulated motion.
///
/// `world_inverse` must have an orthonormal rotation part.
pub fn update_camera(observer: &mut Observer, world_inverse: &Mat4, distance: f64) {
    let m = world_inverse.to_cols_array().map(f64::from);

    #[rustfmt::skip]
    let orientation = DMat3::from_cols_array(&[
        m[0], m[8], m[4],
        m[1], m[9], m[5],
        m[2], m[10], m[6],
    ]);

    observer.orientation = orientation;
    observer.position = -orientation.z_axis * distance;
    observer.velocity = DVec3::ZERO;

    tracing::debug!(
        position = ?observer.position,
        distance,
        "observer follows camera"
    );
}

/// Square root of the summed squared element-wise differences.
pub fn frobenius_distance(a: &Mat4, b: &Mat4) -> f64 {
    a.to_cols_array()
        .iter()
        .zip(b.to_cols_array().iter())
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn initial_view_is_pitched_down_slightly() {
        let view = initialize_camera(INITIAL_PITCH_DEGREES, INITIAL_YAW_DEGREES);
        let pitch = 3.0_f32.to_radians();
        assert_abs_diff_eq!(view.position.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(view.position.y, -pitch.sin(), epsilon = 1e-6);
        assert_abs_diff_eq!(view.position.z, pitch.cos(), epsilon = 1e-6);
        assert_abs_diff_eq!(view.position.length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn initial_view_is_reproducible() {
        let a = initialize_camera(INITIAL_PITCH_DEGREES, INITIAL_YAW_DEGREES);
        let b = initialize_camera(INITIAL_PITCH_DEGREES, INITIAL_YAW_DEGREES);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_angles_give_identity() {
        let view = initialize_camera(0.0, 0.0);
        assert_eq!(view.world_inverse, Mat4::IDENTITY);
        assert_eq!(view.position, Vec3::Z);
    }

    #[test]
    fn update_camera_places_observer_behind_forward_axis() {
        let mut obs = Observer::new();
        let view = Mat4::look_at_rh(Vec3::new(3.0, 4.0, 5.0), Vec3::ZERO, Vec3::Y);
        update_camera(&mut obs, &view, 11.0);

        let forward = obs.orientation.z_axis;
        assert_eq!(obs.position, -forward * 11.0);
        assert_eq!(obs.velocity, DVec3::ZERO);
    }

    #[test]
    fn update_camera_swaps_y_and_z_channels() {
        let mut obs = Observer::new();
        let view = Mat4::from_rotation_y(0.7) * Mat4::from_rotation_x(-0.3);
        update_camera(&mut obs, &view, 2.0);

        let r0 = view.row(0);
        let r1 = view.row(1);
        let r2 = view.row(2);
        let x = obs.orientation.x_axis;
        let y = obs.orientation.y_axis;
        let z = obs.orientation.z_axis;
        // Observer axis i is row i of the view rotation, re-ordered (x, z, y).
        for (axis, row) in [(x, r0), (y, r1), (z, r2)] {
            assert_abs_diff_eq!(axis.x, f64::from(row.x), epsilon = 1e-12);
            assert_abs_diff_eq!(axis.y, f64::from(row.z), epsilon = 1e-12);
            assert_abs_diff_eq!(axis.z, f64::from(row.y), epsilon = 1e-12);
        }
    }

    #[test]
    fn update_camera_keeps_orientation_orthonormal() {
        let mut obs = Observer::new();
        let view = Mat4::look_at_rh(Vec3::new(-2.0, 1.0, 8.0), Vec3::ZERO, Vec3::Y);
        update_camera(&mut obs, &view, 5.0);

        let m = obs.orientation;
        let product = m * m.transpose();
        let diff = product - DMat3::IDENTITY;
        for col in [diff.x_axis, diff.y_axis, diff.z_axis] {
            assert_abs_diff_eq!(col.length(), 0.0, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(obs.position.length(), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn frobenius_distance_of_identical_matrices_is_zero() {
        let m = Mat4::look_at_rh(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y);
        assert_eq!(frobenius_distance(&m, &m), 0.0);
    }

    #[test]
    fn frobenius_distance_is_symmetric() {
        let a = Mat4::from_rotation_x(0.4);
        let b = Mat4::from_translation(Vec3::new(1.0, -2.0, 0.5));
        assert_eq!(frobenius_distance(&a, &b), frobenius_distance(&b, &a));
    }

    #[test]
    fn frobenius_distance_sees_translation() {
        let a = Mat4::IDENTITY;
        let b = Mat4::from_translation(Vec3::new(3.0, 4.0, 0.0));
        assert_abs_diff_eq!(frobenius_distance(&a, &b), 5.0, epsilon = 1e-12);
    }
}
