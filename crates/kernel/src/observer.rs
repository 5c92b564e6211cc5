use glam::{DMat3, DVec3};

/// Distance along the direction of travel used to lead the orbital `y` axis.
///
/// Tunable; it has no physical derivation.
pub const ORBITAL_LEAD: f64 = 4.0;

/// The simulated viewpoint fed to the raymarching shader.
///
/// `orientation` holds the camera axes as columns (`x_axis` = right,
/// `y_axis` = up, `z_axis` = back) and is rebuilt wholesale on every camera
/// update rather than rotated incrementally, so it cannot drift away from
/// orthonormal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    pub position: DVec3,
    pub velocity: DVec3,
    pub orientation: DMat3,
    /// Simulation clock in scaled seconds.
    pub time: f64,
}

impl Default for Observer {
    fn default() -> Self {
        Self {
            position: DVec3::new(10.0, 0.0, 0.0),
            velocity: DVec3::new(0.0, 1.0, 0.0),
            orientation: DMat3::IDENTITY,
            time: 0.0,
        }
    }
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orthonormal basis derived from the current position and velocity.
    ///
    /// The `y` axis points from the observer towards a point `ORBITAL_LEAD`
    /// units along the direction of travel, `z` is normal to the plane spanned
    /// by position and `y`, and `x` completes the right-handed frame. Columns
    /// of the returned matrix are `x`, `y`, `z`.
    ///
    /// A zero velocity, or a position parallel to the derived `y` axis,
    /// produces NaN components. Check [`Observer::has_degenerate_frame`] first
    /// when the state is not known to be well formed.
    pub fn orbital_frame(&self) -> DMat3 {
        let y = (self.velocity.normalize() * ORBITAL_LEAD - self.position).normalize();
        let z = self.position.cross(y).normalize();
        let x = y.cross(z);
        DMat3::from_cols(x, y, z)
    }

    pub fn has_degenerate_frame(&self) -> bool {
        !self.orbital_frame().is_finite()
    }

    /// Advance the simulation clock by `dt` real seconds scaled by `time_scale`.
    ///
    /// Only `time` changes. Position and velocity are not integrated here; the
    /// motion inside the scene is driven by the shader from `time`. A negative
    /// step is dropped so `time` never decreases.
    pub fn advance(&mut self, dt: f64, time_scale: f64) {
        let step = dt * time_scale;
        if step > 0.0 {
            self.time += step;
        }
        tracing::trace!(dt, time_scale, time = self.time, "observer advanced");
    }
}
