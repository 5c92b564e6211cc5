use anyhow::Context as _;
use clap::{Parser, Subcommand};
use glam::Mat4;
use lensing_common::ShaderParams;
use lensing_kernel::{INITIAL_PITCH_DEGREES, INITIAL_YAW_DEGREES, initialize_camera};
use lensing_render::{DebugTextRenderer, FrameOutcome, RenderLoop, Session, Shader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Minimal template used by `simulate` when none is given.
const PROBE_TEMPLATE: &str = "// n_steps={{n_steps}}\n\
                              // time_scale={{time_scale}}\n\
                              // distance={{observer.distance}}\n\
                              // inclination={{observer.orbital_inclination}}\n";

#[derive(Parser)]
#[command(name = "lensing-cli", about = "CLI tool for lensing operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print shader parameters as JSON
    Params {
        /// YAML parameter file; defaults are used when omitted
        #[arg(short, long)]
        params: Option<PathBuf>,
    },
    /// Substitute parameters into a fragment template and print the result
    Compile {
        /// Fragment template
        template: PathBuf,
        /// YAML parameter file
        #[arg(short, long)]
        params: Option<PathBuf>,
    },
    /// Drive the render loop headlessly and print each drawn frame
    Simulate {
        /// Number of animation ticks
        #[arg(short, long, default_value = "10")]
        frames: u32,
        /// Seconds between ticks
        #[arg(long, default_value = "0.016")]
        dt: f64,
        /// Camera orbit per tick in degrees; 0 holds the camera still
        #[arg(long, default_value = "0.5")]
        orbit: f32,
        /// Fragment template
        #[arg(short, long)]
        template: Option<PathBuf>,
        /// YAML parameter file
        #[arg(short, long)]
        params: Option<PathBuf>,
    },
}

fn load_params(path: Option<&Path>) -> anyhow::Result<ShaderParams> {
    match path {
        Some(path) => ShaderParams::load(path)
            .with_context(|| format!("failed to read parameters from {}", path.display())),
        None => Ok(ShaderParams::default()),
    }
}

fn load_template(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read template {}", path.display()))
}

/// Run `frames` ticks, orbiting the camera about +Y by `orbit` degrees each
/// tick. Returns the renderer log and the number of frames drawn.
fn simulate(shader: Shader, frames: u32, dt: f64, orbit: f32) -> (DebugTextRenderer, u64) {
    let mut session = Session::new(shader);
    session.resize(640, 360);
    let mut render_loop = RenderLoop::new();
    let mut renderer = DebugTextRenderer::new();

    let initial = initialize_camera(INITIAL_PITCH_DEGREES, INITIAL_YAW_DEGREES);
    let start = Instant::now();
    let mut previous: Option<Mat4> = None;

    for i in 0..frames {
        let camera = initial.world_inverse * Mat4::from_rotation_y((orbit * i as f32).to_radians());
        if previous != Some(camera) {
            session.follow_camera(&camera);
            previous = Some(camera);
        }
        let now = start + Duration::from_secs_f64(dt * f64::from(i));
        match render_loop.tick(&mut session, camera, now, &mut renderer) {
            Ok(FrameOutcome::Rendered(reason)) => tracing::debug!(tick = i, ?reason, "rendered"),
            Ok(FrameOutcome::Skipped) => tracing::debug!(tick = i, "skipped"),
            Err(never) => match never {},
        }
    }

    let drawn = render_loop.frames_rendered();
    (renderer, drawn)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("lensing-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("kernel: {}", lensing_kernel::crate_info());
            println!("render: {}", lensing_render::crate_info());
            println!("input: {}", lensing_input::crate_info());
            println!("assets: {}", lensing_assets::crate_info());
            println!("parameters: {}", ShaderParams::KEYS.join(", "));
        }
        Commands::Params { params } => {
            let params = load_params(params.as_deref())?;
            println!("{}", params.to_json_pretty()?);
        }
        Commands::Compile { template, params } => {
            let params = load_params(params.as_deref())?;
            let shader = Shader::new(&load_template(&template)?, params)?;
            print!("{}", shader.compile());
        }
        Commands::Simulate {
            frames,
            dt,
            orbit,
            template,
            params,
        } => {
            let params = load_params(params.as_deref())?;
            let source = match template {
                Some(path) => load_template(&path)?,
                None => PROBE_TEMPLATE.to_string(),
            };
            let shader = Shader::new(&source, params)?;

            let (renderer, drawn) = simulate(shader, frames, dt, orbit);
            print!("{}", renderer.output());
            println!(
                "drew {drawn} of {frames} ticks, {} shader build(s)",
                renderer.shader_builds()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn still_camera_draws_once() {
        let shader = Shader::with_defaults(PROBE_TEMPLATE).unwrap();
        let (renderer, drawn) = simulate(shader, 5, 0.016, 0.0);
        assert_eq!(drawn, 1);
        assert_eq!(renderer.frames(), 1);
        assert_eq!(renderer.shader_builds(), 1);
    }

    #[test]
    fn orbiting_camera_draws_every_tick() {
        let shader = Shader::with_defaults(PROBE_TEMPLATE).unwrap();
        let (renderer, drawn) = simulate(shader, 4, 0.016, 1.0);
        assert_eq!(drawn, 4);
        assert_eq!(renderer.shader_builds(), 1);
        assert!(renderer.output().contains("res=640x360"));
    }

    #[test]
    fn params_file_feeds_compile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        std::fs::write(&path, "n_steps: 42\n").unwrap();

        let params = load_params(Some(&path)).unwrap();
        let shader = Shader::new(PROBE_TEMPLATE, params).unwrap();
        let source = shader.compile();
        assert!(source.contains("n_steps=42"));
        assert!(source.contains("distance=11.0"));
    }

    #[test]
    fn out_of_range_params_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        std::fs::write(&path, "n_steps: 3000000000\nobserver:\n  distance: .nan\n").unwrap();

        let err = load_params(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("n_steps"));
    }
}
