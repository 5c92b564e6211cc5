use glam::Vec2;

/// A high-level action produced by desktop input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Orbit the camera by a cursor delta in pixels.
    Orbit(Vec2),
    /// Move the camera towards (positive) or away from the target.
    Zoom(f32),
    /// Return to the initial viewpoint.
    ResetView,
    /// Show or hide the parameter panel.
    TogglePanel,
    /// Show or hide the FPS overlay.
    ToggleStats,
}

/// Turns primary-button drags into [`Action::Orbit`] deltas.
#[derive(Debug, Clone, Default)]
pub struct OrbitDrag {
    dragging: bool,
    last: Option<Vec2>,
}

impl OrbitDrag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn press(&mut self) {
        self.dragging = true;
    }

    pub fn release(&mut self) {
        self.dragging = false;
    }

    /// Feed a cursor position. Emits an orbit delta while dragging.
    pub fn cursor_moved(&mut self, position: Vec2) -> Option<Action> {
        let previous = self.last.replace(position);
        if !self.dragging {
            return None;
        }
        let delta = position - previous?;
        if delta == Vec2::ZERO {
            return None;
        }
        tracing::trace!(?delta, "orbit drag");
        Some(Action::Orbit(delta))
    }
}
