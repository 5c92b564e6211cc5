use crate::renderer::Renderer;
use crate::session::Session;
use crate::uniforms::FrameUniforms;
use glam::Mat4;
use lensing_kernel::frobenius_distance;
use std::time::Instant;

/// Camera change (Frobenius distance between view matrices) that warrants a
/// new frame.
pub const CAMERA_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Rendering,
}

/// Why a frame is drawn. When several apply, the first in declaration order wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderReason {
    ShaderChanged,
    Invalidated,
    CameraMoved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    Skip,
    Render(RenderReason),
}

/// Idle/Rendering state machine deciding whether a tick draws.
///
/// Raymarching is expensive, so a frame is only drawn when the shader is
/// dirty, the camera moved, or the output was invalidated (e.g. resized).
#[derive(Debug, Clone)]
pub struct FrameGate {
    state: FrameState,
    last_camera: Mat4,
    invalidated: bool,
}

impl Default for FrameGate {
    fn default() -> Self {
        Self {
            state: FrameState::Idle,
            last_camera: Mat4::IDENTITY,
            invalidated: false,
        }
    }
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// View matrix of the last drawn frame.
    pub fn last_camera(&self) -> Mat4 {
        self.last_camera
    }

    /// Force the next poll to render.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    /// Idle -> Rendering when a redraw is due, otherwise stay Idle.
    pub fn poll(&mut self, shader_dirty: bool, camera: &Mat4) -> FrameDecision {
        let reason = if shader_dirty {
            Some(RenderReason::ShaderChanged)
        } else if self.invalidated {
            Some(RenderReason::Invalidated)
        } else if frobenius_distance(camera, &self.last_camera) > CAMERA_EPSILON {
            Some(RenderReason::CameraMoved)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                self.state = FrameState::Rendering;
                FrameDecision::Render(reason)
            }
            None => FrameDecision::Skip,
        }
    }

    /// Rendering -> Idle, remembering the camera the frame was drawn with.
    pub fn finish(&mut self, camera: Mat4) {
        self.last_camera = camera;
        self.invalidated = false;
        self.state = FrameState::Idle;
    }
}

/// Wall-clock delta between measurements.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous call. The first call sets the baseline and
    /// returns zero.
    pub fn delta(&mut self, now: Instant) -> f64 {
        let dt = match self.last {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f64(),
            None => 0.0,
        };
        self.last = Some(now);
        dt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Skipped,
    Rendered(RenderReason),
}

/// Per-tick driver: gates rendering, advances the observer, pushes uniforms.
#[derive(Debug, Default)]
pub struct RenderLoop {
    gate: FrameGate,
    clock: FrameClock,
    frames_rendered: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gate(&self) -> &FrameGate {
        &self.gate
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Force a redraw on the next tick, e.g. after the output surface changed.
    pub fn invalidate(&mut self) {
        self.gate.invalidate();
    }

    /// Run one animation tick.
    ///
    /// On a skipped tick nothing is touched, including the frame clock, so
    /// idle time is folded into the next rendered frame's delta. A failed
    /// draw still leaves the gate Idle with the new camera snapshot; the
    /// error is returned for the host to report.
    pub fn tick<R: Renderer>(
        &mut self,
        session: &mut Session,
        camera_inverse: Mat4,
        now: Instant,
        renderer: &mut R,
    ) -> Result<FrameOutcome, R::Error> {
        let _span = tracing::debug_span!("frame_tick").entered();

        let reason = match self.gate.poll(session.shader.needs_update(), &camera_inverse) {
            FrameDecision::Skip => return Ok(FrameOutcome::Skipped),
            FrameDecision::Render(reason) => reason,
        };
        tracing::debug!(?reason, "rendering frame");

        let result = self.render(session, now, renderer);
        self.gate.finish(camera_inverse);
        result?;

        self.frames_rendered += 1;
        Ok(FrameOutcome::Rendered(reason))
    }

    fn render<R: Renderer>(
        &mut self,
        session: &mut Session,
        now: Instant,
        renderer: &mut R,
    ) -> Result<(), R::Error> {
        if session.shader.take_needs_update() {
            let source = session.shader.compile();
            tracing::info!(lines = source.lines().count(), "rebuilding fragment shader");
            renderer.rebuild_shader(&source)?;
        }

        let dt = self.clock.delta(now);
        let time_scale = session.shader.params().time_scale;
        session.observer.advance(dt, time_scale);

        renderer.draw(&FrameUniforms::capture(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::DebugTextRenderer;
    use crate::shader::Shader;
    use glam::Vec3;
    use std::time::Duration;

    /// Counts calls and can be told to reject shader rebuilds.
    #[derive(Default)]
    struct CountingRenderer {
        builds: usize,
        draws: usize,
        reject_shaders: bool,
        last: Option<FrameUniforms>,
    }

    impl Renderer for CountingRenderer {
        type Error = String;

        fn rebuild_shader(&mut self, _source: &str) -> Result<(), String> {
            self.builds += 1;
            if self.reject_shaders {
                return Err("compile failed".into());
            }
            Ok(())
        }

        fn draw(&mut self, uniforms: &FrameUniforms) -> Result<(), String> {
            self.draws += 1;
            self.last = Some(*uniforms);
            Ok(())
        }
    }

    fn session() -> Session {
        Session::new(Shader::with_defaults("const N: i32 = {{n_steps}};").unwrap())
    }

    fn view(x: f32) -> Mat4 {
        Mat4::look_at_rh(Vec3::new(x, 1.0, 10.0), Vec3::ZERO, Vec3::Y)
    }

    #[test]
    fn frame_gate_idle_without_changes() {
        let mut gate = FrameGate::new();
        assert_eq!(gate.poll(false, &Mat4::IDENTITY), FrameDecision::Skip);
        assert_eq!(gate.state(), FrameState::Idle);
    }

    #[test]
    fn frame_gate_reports_reason() {
        let mut gate = FrameGate::new();
        assert_eq!(
            gate.poll(false, &view(1.0)),
            FrameDecision::Render(RenderReason::CameraMoved)
        );
        assert_eq!(gate.state(), FrameState::Rendering);
        gate.finish(view(1.0));
        assert_eq!(gate.state(), FrameState::Idle);
        assert_eq!(
            gate.poll(true, &view(1.0)),
            FrameDecision::Render(RenderReason::ShaderChanged)
        );
    }

    #[test]
    fn frame_gate_ignores_change_below_epsilon() {
        let mut gate = FrameGate::new();
        gate.finish(Mat4::IDENTITY);
        assert_eq!(gate.poll(false, &Mat4::IDENTITY), FrameDecision::Skip);
    }

    #[test]
    fn frame_clock_first_delta_is_zero() {
        let mut clock = FrameClock::new();
        let t0 = Instant::now();
        assert_eq!(clock.delta(t0), 0.0);
        assert_eq!(clock.delta(t0 + Duration::from_millis(250)), 0.25);
        assert_eq!(clock.delta(t0 + Duration::from_millis(250)), 0.0);
    }

    #[test]
    fn first_tick_compiles_and_renders() {
        let mut session = session();
        let mut lp = RenderLoop::new();
        let mut r = CountingRenderer::default();

        let outcome = lp
            .tick(&mut session, Mat4::IDENTITY, Instant::now(), &mut r)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Rendered(RenderReason::ShaderChanged));
        assert_eq!(r.builds, 1);
        assert_eq!(r.draws, 1);
        assert!(!session.shader.needs_update());
        // First measurement is the baseline.
        assert_eq!(session.observer.time, 0.0);
    }

    #[test]
    fn idle_tick_does_not_redraw() {
        let mut session = session();
        let mut lp = RenderLoop::new();
        let mut r = CountingRenderer::default();
        let t0 = Instant::now();
        let camera = view(2.0);

        lp.tick(&mut session, camera, t0, &mut r).unwrap();
        let drawn = r.draws;

        let outcome = lp
            .tick(&mut session, camera, t0 + Duration::from_millis(16), &mut r)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(r.draws, drawn);
        assert_eq!(lp.frames_rendered(), 1);
    }

    #[test]
    fn camera_change_redraws_once_and_caches_matrix() {
        let mut session = session();
        let mut lp = RenderLoop::new();
        let mut r = CountingRenderer::default();
        let t0 = Instant::now();

        lp.tick(&mut session, view(0.0), t0, &mut r).unwrap();
        let moved = view(3.0);
        let outcome = lp
            .tick(&mut session, moved, t0 + Duration::from_millis(16), &mut r)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Rendered(RenderReason::CameraMoved));
        assert_eq!(r.draws, 2);
        assert_eq!(r.builds, 1);
        assert_eq!(lp.gate().last_camera(), moved);

        let outcome = lp
            .tick(&mut session, moved, t0 + Duration::from_millis(32), &mut r)
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(r.draws, 2);
    }

    #[test]
    fn time_scale_applies_to_rendered_frames() {
        let mut session = session();
        session.shader.update_params(|p| p.time_scale = 2.0);
        let mut lp = RenderLoop::new();
        let mut r = CountingRenderer::default();
        let t0 = Instant::now();

        lp.tick(&mut session, view(0.0), t0, &mut r).unwrap();
        lp.tick(&mut session, view(1.0), t0 + Duration::from_millis(500), &mut r)
            .unwrap();
        assert_eq!(session.observer.time, 1.0);
        assert_eq!(r.last.unwrap().time, 1.0);
    }

    #[test]
    fn idle_time_folds_into_next_frame() {
        let mut session = session();
        let mut lp = RenderLoop::new();
        let mut r = CountingRenderer::default();
        let t0 = Instant::now();
        let camera = view(0.0);

        lp.tick(&mut session, camera, t0, &mut r).unwrap();
        lp.tick(&mut session, camera, t0 + Duration::from_secs(1), &mut r)
            .unwrap();
        lp.tick(&mut session, view(5.0), t0 + Duration::from_secs(2), &mut r)
            .unwrap();
        assert_eq!(session.observer.time, 2.0);
    }

    #[test]
    fn parameter_edit_triggers_rebuild() {
        let mut session = session();
        let mut lp = RenderLoop::new();
        let mut r = CountingRenderer::default();
        let t0 = Instant::now();
        let camera = view(0.0);

        lp.tick(&mut session, camera, t0, &mut r).unwrap();
        session.shader.update_params(|p| p.n_steps = 400);
        let outcome = lp.tick(&mut session, camera, t0, &mut r).unwrap();
        assert_eq!(outcome, FrameOutcome::Rendered(RenderReason::ShaderChanged));
        assert_eq!(r.builds, 2);
        assert_eq!(r.draws, 2);
    }

    #[test]
    fn invalidate_forces_exactly_one_render() {
        let mut session = session();
        let mut lp = RenderLoop::new();
        let mut r = CountingRenderer::default();
        let t0 = Instant::now();
        let camera = view(0.0);

        lp.tick(&mut session, camera, t0, &mut r).unwrap();
        lp.invalidate();
        let outcome = lp.tick(&mut session, camera, t0, &mut r).unwrap();
        assert_eq!(outcome, FrameOutcome::Rendered(RenderReason::Invalidated));
        let outcome = lp.tick(&mut session, camera, t0, &mut r).unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(r.draws, 2);
    }

    #[test]
    fn failed_rebuild_does_not_spin() {
        let mut session = session();
        let mut lp = RenderLoop::new();
        let mut r = CountingRenderer {
            reject_shaders: true,
            ..Default::default()
        };
        let t0 = Instant::now();
        let camera = view(0.0);

        assert!(lp.tick(&mut session, camera, t0, &mut r).is_err());
        assert_eq!(r.draws, 0);
        assert_eq!(lp.frames_rendered(), 0);
        assert_eq!(lp.gate().state(), FrameState::Idle);

        let outcome = lp.tick(&mut session, camera, t0, &mut r).unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(r.builds, 1);
    }

    #[test]
    fn debug_renderer_records_session() {
        let mut session = session();
        session.resize(320, 200);
        let mut lp = RenderLoop::new();
        let mut r = DebugTextRenderer::new();
        let t0 = Instant::now();

        for i in 0..4u64 {
            let camera = view(i as f32);
            let now = t0 + Duration::from_millis(100 * i);
            lp.tick(&mut session, camera, now, &mut r).unwrap();
        }
        assert_eq!(r.frames(), 4);
        assert_eq!(r.shader_builds(), 1);
        assert!(r.output().contains("res=320x200"));
    }
}
