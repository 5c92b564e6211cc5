use anyhow::{Context as _, Result};
use clap::Parser;
use egui::Context as EguiContext;
use glam::Vec2;
use lensing_assets::{LoadedScene, SceneLoader, TemplateSource};
use lensing_common::ShaderParams;
use lensing_input::{Action, OrbitDrag};
use lensing_kernel::{INITIAL_PITCH_DEGREES, INITIAL_YAW_DEGREES, initialize_camera};
use lensing_render::{FrameOutcome, FrameStats, RenderLoop, RenderReason, Session, Shader};
use lensing_render_wgpu::{OrbitCamera, RAYTRACER_TEMPLATE, RaymarchRenderer, ScenePass};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "lensing-desktop", about = "Real-time gravitational lensing viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory containing the img/ textures
    #[arg(long, default_value = ".")]
    assets: PathBuf,

    /// YAML file overriding shader parameters
    #[arg(long)]
    params: Option<PathBuf>,

    /// Fragment template to use instead of the built-in raytracer
    #[arg(long)]
    template: Option<PathBuf>,
}

const STATS_WINDOW: usize = 120;

/// Orbit camera plus the panel toggles.
struct Controls {
    camera: OrbitCamera,
    home: OrbitCamera,
    drag: OrbitDrag,
    show_panel: bool,
    show_stats: bool,
}

impl Controls {
    fn new(distance: f64) -> Self {
        let initial = initialize_camera(INITIAL_PITCH_DEGREES, INITIAL_YAW_DEGREES);
        let home = OrbitCamera::from_position(initial.position * distance as f32);
        Self {
            camera: home,
            home,
            drag: OrbitDrag::new(),
            show_panel: true,
            show_stats: true,
        }
    }

    /// Returns true when the camera moved.
    fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::Orbit(delta) => {
                self.camera.rotate(delta.x, delta.y);
                true
            }
            Action::Zoom(amount) => {
                self.camera.zoom(amount);
                true
            }
            Action::ResetView => {
                self.camera = self.home;
                true
            }
            Action::TogglePanel => {
                self.show_panel = !self.show_panel;
                false
            }
            Action::ToggleStats => {
                self.show_stats = !self.show_stats;
                false
            }
        }
    }
}

fn key_action(key: KeyCode) -> Option<Action> {
    match key {
        KeyCode::F1 => Some(Action::TogglePanel),
        KeyCode::F2 => Some(Action::ToggleStats),
        KeyCode::KeyR | KeyCode::Home => Some(Action::ResetView),
        _ => None,
    }
}

/// A running scene: session state and the GPU pass that draws it.
struct Scene {
    session: Session,
    render_loop: RenderLoop,
    renderer: RaymarchRenderer,
    last_error: Option<String>,
}

struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(window: Arc<Window>, egui_ctx: &EguiContext) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create a rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context(
            "no compatible GPU adapter found; this viewer needs a Vulkan, Metal, DX12 or GL \
             capable device",
        )?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("lensing_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("the GPU adapter refused to create a device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("the surface reports no supported formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            egui_winit,
            egui_renderer,
        })
    }
}

struct App {
    params: ShaderParams,
    loader: Option<SceneLoader>,
    pending: Option<LoadedScene>,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    scene: Option<Scene>,
    controls: Controls,
    stats: FrameStats,
    last_present: Option<Instant>,
    egui_ctx: EguiContext,
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(params: ShaderParams, loader: SceneLoader) -> Self {
        Self {
            controls: Controls::new(params.observer.distance),
            params,
            loader: Some(loader),
            pending: None,
            window: None,
            gpu: None,
            scene: None,
            stats: FrameStats::new(STATS_WINDOW),
            last_present: None,
            egui_ctx: EguiContext::default(),
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Lensing")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);
        let gpu = Gpu::new(window.clone(), &self.egui_ctx)?;
        self.window = Some(window);
        self.gpu = Some(gpu);
        self.try_start()
    }

    fn poll_loader(&mut self) -> Result<()> {
        if let Some(loader) = &mut self.loader {
            if let Some(loaded) = loader.poll().context("failed to load scene assets")? {
                self.loader = None;
                self.pending = Some(loaded);
            }
        }
        self.try_start()
    }

    /// Start the scene once both the GPU and the assets are ready.
    fn try_start(&mut self) -> Result<()> {
        if self.scene.is_some() {
            return Ok(());
        }
        let Some(gpu) = &self.gpu else {
            return Ok(());
        };
        let Some(loaded) = self.pending.take() else {
            return Ok(());
        };

        let shader =
            Shader::new(&loaded.template, self.params).context("fragment template is invalid")?;
        let mut session = Session::new(shader);
        session.resize(gpu.config.width, gpu.config.height);
        session.follow_camera(&self.controls.camera.world_inverse());

        let renderer = RaymarchRenderer::new(
            &gpu.device,
            &gpu.queue,
            gpu.config.format,
            gpu.config.width,
            gpu.config.height,
            &loaded.textures,
        );

        tracing::info!("scene started");
        self.scene = Some(Scene {
            session,
            render_loop: RenderLoop::new(),
            renderer,
            last_error: None,
        });
        Ok(())
    }

    fn handle_action(&mut self, action: Action) {
        if self.controls.apply(action) {
            self.camera_changed();
        }
    }

    fn camera_changed(&mut self) {
        if let Some(scene) = &mut self.scene {
            scene.session.follow_camera(&self.controls.camera.world_inverse());
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        gpu.config.width = size.width.max(1);
        gpu.config.height = size.height.max(1);
        gpu.surface.configure(&gpu.device, &gpu.config);

        if let Some(scene) = &mut self.scene {
            scene.session.resize(gpu.config.width, gpu.config.height);
            scene.renderer.resize(&gpu.device, gpu.config.width, gpu.config.height);
            scene.render_loop.invalidate();
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let App {
            loader,
            window,
            gpu,
            scene,
            controls,
            stats,
            last_present,
            egui_ctx,
            ..
        } = self;
        let (Some(window), Some(gpu)) = (window.as_ref(), gpu.as_mut()) else {
            return Ok(());
        };
        let now = Instant::now();

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timeout, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let mut rendered = false;
        if let Some(scene) = scene.as_mut() {
            let camera = controls.camera.world_inverse();
            let mut pass = ScenePass::new(&mut scene.renderer, &gpu.device, &gpu.queue);
            match scene.render_loop.tick(&mut scene.session, camera, now, &mut pass) {
                Ok(FrameOutcome::Rendered(reason)) => {
                    rendered = true;
                    if reason == RenderReason::ShaderChanged {
                        scene.last_error = None;
                    }
                }
                Ok(FrameOutcome::Skipped) => {}
                Err(err) => {
                    tracing::error!(error = %err, "frame failed");
                    scene.last_error = Some(err.to_string());
                }
            }
        }
        if let Some(prev) = last_present.replace(now) {
            stats.record(now - prev, rendered);
        }

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        match scene.as_ref() {
            Some(scene) => scene.renderer.present(&mut encoder, &view),
            None => clear(&mut encoder, &view),
        }

        let loading = loader.as_ref().map(SceneLoader::remaining);
        let mut camera_changed = false;
        let raw_input = gpu.egui_winit.take_egui_input(window);
        let full_output = egui_ctx.run(raw_input, |ctx| {
            camera_changed |= draw_ui(ctx, scene.as_mut(), controls, stats, loading);
        });
        gpu.egui_winit
            .handle_platform_output(window, full_output.platform_output);

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }
        output.present();

        if camera_changed {
            self.camera_changed();
        }
        Ok(())
    }
}

fn clear(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
    let _ = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("clear_pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        ..Default::default()
    });
}

/// Draw the overlay and control panel. Returns true when the observer must
/// re-follow the camera.
fn draw_ui(
    ctx: &EguiContext,
    scene: Option<&mut Scene>,
    controls: &mut Controls,
    stats: &FrameStats,
    loading: Option<usize>,
) -> bool {
    let mut camera_changed = false;

    if controls.show_stats {
        egui::Area::new(egui::Id::new("fps_overlay"))
            .anchor(egui::Align2::RIGHT_TOP, [-8.0, 8.0])
            .show(ctx, |ui| {
                ui.label(format!("{:.0} fps", stats.fps()));
                ui.small(format!(
                    "worst {:.1} ms",
                    stats.worst_frame_time().as_secs_f64() * 1000.0
                ));
                ui.small(format!(
                    "raymarched {} / reused {}",
                    stats.rendered(),
                    stats.reused()
                ));
            });
    }

    let Some(scene) = scene else {
        let text = match loading {
            Some(remaining) => format!("Loading assets ({remaining} remaining)"),
            None => "Starting".to_string(),
        };
        egui::Area::new(egui::Id::new("loading"))
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| ui.heading(text));
        return camera_changed;
    };

    if !controls.show_panel {
        return camera_changed;
    }

    egui::SidePanel::left("controls")
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.heading("Lensing");
            ui.separator();

            let current = *scene.session.shader.params();
            let mut params = current;
            ui.add(egui::Slider::new(&mut params.n_steps, 8..=1000).text("raymarch steps"));
            ui.add(egui::Slider::new(&mut params.time_scale, 0.0..=10.0).text("time scale"));
            ui.add(
                egui::Slider::new(&mut params.observer.distance, 2.0..=40.0)
                    .text("observer distance"),
            );
            ui.add(
                egui::Slider::new(&mut params.observer.orbital_inclination, -90.0..=90.0)
                    .text("inclination (deg)"),
            );
            scene.session.shader.set_params(params);
            if params.observer.distance != current.observer.distance {
                camera_changed = true;
            }

            ui.separator();
            let observer = &scene.session.observer;
            ui.label(format!("t = {:.2}", observer.time));
            ui.label(format!(
                "position ({:.2}, {:.2}, {:.2})",
                observer.position.x, observer.position.y, observer.position.z
            ));
            ui.label(format!(
                "frames raymarched: {}",
                scene.render_loop.frames_rendered()
            ));
            if ui.button("Reset view (R)").clicked() {
                camera_changed |= controls.apply(Action::ResetView);
            }

            if let Some(err) = &scene.last_error {
                ui.separator();
                ui.colored_label(egui::Color32::LIGHT_RED, err);
            }

            ui.separator();
            ui.small("F1: panel | F2: stats | LMB drag: orbit | wheel: zoom");
        });

    camera_changed
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init_window(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Always end a drag, even when the release lands on the panel.
        if let WindowEvent::MouseInput {
            button: MouseButton::Left,
            state: ElementState::Released,
            ..
        } = event
        {
            self.controls.drag.release();
        }

        if let (Some(gpu), Some(window)) = (&mut self.gpu, &self.window) {
            let response = gpu.egui_winit.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.resize(new_size);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(action) = key_action(key) {
                    self.handle_action(action);
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: ElementState::Pressed,
                ..
            } => {
                self.controls.drag.press();
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                if let Some(action) = self.controls.drag.cursor_moved(position) {
                    self.handle_action(action);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
                self.handle_action(Action::Zoom(amount));
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.poll_loader() {
            self.fail(event_loop, err);
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("lensing-desktop starting");

    let params = match &cli.params {
        Some(path) => ShaderParams::load(path)
            .with_context(|| format!("failed to read parameters from {}", path.display()))?,
        None => ShaderParams::default(),
    };
    let template = match cli.template {
        Some(path) => TemplateSource::File(path),
        None => TemplateSource::Inline(RAYTRACER_TEMPLATE.to_string()),
    };
    let loader = SceneLoader::spawn(cli.assets, template);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(params, loader);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_view_sits_at_configured_distance() {
        let controls = Controls::new(11.0);
        assert!((controls.camera.position().length() - 11.0).abs() < 1e-4);
        // Pitched up by the initial angle: the camera sits slightly below the plane.
        assert!(controls.camera.position().y < 0.0);
    }

    #[test]
    fn toggles_do_not_move_the_camera() {
        let mut controls = Controls::new(11.0);
        assert!(!controls.apply(Action::TogglePanel));
        assert!(!controls.show_panel);
        assert!(!controls.apply(Action::ToggleStats));
        assert!(!controls.show_stats);
    }

    #[test]
    fn reset_returns_home() {
        let mut controls = Controls::new(11.0);
        assert!(controls.apply(Action::Orbit(Vec2::new(40.0, 10.0))));
        assert_ne!(controls.camera, controls.home);
        assert!(controls.apply(Action::ResetView));
        assert_eq!(controls.camera, controls.home);
    }

    #[test]
    fn key_bindings() {
        assert_eq!(key_action(KeyCode::F1), Some(Action::TogglePanel));
        assert_eq!(key_action(KeyCode::KeyR), Some(Action::ResetView));
        assert_eq!(key_action(KeyCode::KeyW), None);
    }
}
