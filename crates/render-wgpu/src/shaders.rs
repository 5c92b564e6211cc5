/// Fullscreen quad vertex stage shared by the raymarch and blit pipelines.
pub const VERTEX_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(position, 0.0, 1.0);
    out.uv = vec2<f32>(0.5 * position.x + 0.5, 0.5 - 0.5 * position.y);
    return out;
}
"#;

/// Copies the offscreen scene target to the surface.
pub const BLIT_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0)
var scene_texture: texture_2d<f32>;
@group(0) @binding(1)
var scene_sampler: sampler;

@fragment
fn fs_blit(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(scene_texture, scene_sampler, in.uv);
}
"#;

/// Default fragment template. Placeholders are substituted by the shader
/// compiler before the module is built.
pub const RAYTRACER_TEMPLATE: &str = r#"
const PI: f32 = 3.14159265;
const N_STEPS: i32 = {{n_steps}};
const OBSERVER_DISTANCE: f32 = {{observer.distance}};
const ORBITAL_INCLINATION_DEG: f32 = {{observer.orbital_inclination}};

const HORIZON_RADIUS: f32 = 1.0;
const DISK_INNER: f32 = 2.6;
const DISK_OUTER: f32 = 12.0;
const FOV_SCALE: f32 = 1.0;

struct Uniforms {
    time: f32,
    resolution: vec2<f32>,
    cam_pos: vec3<f32>,
    cam_vel: vec3<f32>,
    cam_x: vec3<f32>,
    cam_y: vec3<f32>,
    cam_z: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0)
var<uniform> u: Uniforms;

@group(1) @binding(0)
var star_texture: texture_2d<f32>;
@group(1) @binding(1)
var star_sampler: sampler;
@group(1) @binding(2)
var galaxy_texture: texture_2d<f32>;
@group(1) @binding(3)
var galaxy_sampler: sampler;
@group(1) @binding(4)
var spectrum_texture: texture_2d<f32>;
@group(1) @binding(5)
var spectrum_sampler: sampler;

// Relativistic aberration of a view ray for an observer moving at `vel`
// (units of c).
fn aberrate(dir: vec3<f32>, vel: vec3<f32>) -> vec3<f32> {
    let speed = length(vel);
    if (speed < 1e-6) {
        return dir;
    }
    let beta = min(speed, 0.99);
    let n = vel / speed;
    let gamma = 1.0 / sqrt(1.0 - beta * beta);
    let par = dot(dir, n);
    let perp = dir - par * n;
    let k = 1.0 + beta * par;
    return normalize(((par + beta) / k) * n + perp / (gamma * k));
}

fn sky_color(dir: vec3<f32>) -> vec3<f32> {
    let uv = vec2<f32>(
        atan2(dir.z, dir.x) / (2.0 * PI) + 0.5,
        acos(clamp(dir.y, -1.0, 1.0)) / PI,
    );
    let galaxy = textureSampleLevel(galaxy_texture, galaxy_sampler, uv, 0.0).rgb;
    let stars = textureSampleLevel(star_texture, star_sampler, uv * 4.0, 0.0).rgb;
    return galaxy * 0.6 + stars * 0.4;
}

// Blackbody-ish disk colour looked up from the spectrum strip.
fn disk_color(p: vec3<f32>, r: f32, normal: vec3<f32>) -> vec4<f32> {
    let temperature = pow(DISK_INNER / r, 0.75);
    let spectrum_uv = vec2<f32>(temperature, 0.5);
    let spectrum = textureSampleLevel(spectrum_texture, spectrum_sampler, spectrum_uv, 0.0).rgb;

    let tangent = normalize(cross(normal, p));
    let omega = inverseSqrt(r * r * r);
    let phase = atan2(dot(p, tangent), length(p)) - u.time * omega;
    let swirl_uv = vec2<f32>(phase / (2.0 * PI), r / DISK_OUTER);
    let swirl = textureSampleLevel(star_texture, star_sampler, swirl_uv, 0.0).r;

    let inner = smoothstep(DISK_INNER, DISK_INNER + 0.5, r);
    let outer = 1.0 - smoothstep(DISK_OUTER - 2.0, DISK_OUTER, r);
    let edge = inner * outer;
    let alpha = clamp(edge * (0.6 + 0.4 * swirl), 0.0, 1.0);
    return vec4<f32>(spectrum * (1.5 * temperature), alpha);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let aspect = u.resolution.x / u.resolution.y;
    let p = vec2<f32>((2.0 * in.uv.x - 1.0) * aspect, 1.0 - 2.0 * in.uv.y);

    var dir = normalize(u.cam_z * FOV_SCALE + p.x * u.cam_x + p.y * u.cam_y);
    dir = aberrate(dir, u.cam_vel);

    let incl = radians(ORBITAL_INCLINATION_DEG);
    let disk_normal = normalize(vec3<f32>(0.0, cos(incl), sin(incl)));

    var pos = u.cam_pos;
    var vel = dir;
    let h = cross(pos, vel);
    let h2 = dot(h, h);
    let escape_radius = 2.0 * max(OBSERVER_DISTANCE, DISK_OUTER);
    let base_step = 2.0 * OBSERVER_DISTANCE / f32(N_STEPS);

    var color = vec3<f32>(0.0);
    var transmittance = 1.0;
    var captured = false;

    for (var i = 0; i < N_STEPS; i = i + 1) {
        let r2 = dot(pos, pos);
        let r = sqrt(r2);
        let dt = base_step * clamp(r / OBSERVER_DISTANCE, 0.1, 2.0);
        let accel = -1.5 * h2 * pos / (r2 * r2 * r);

        let old = pos;
        pos = pos + vel * dt;
        vel = vel + accel * dt;

        let side_old = dot(old, disk_normal);
        let side_new = dot(pos, disk_normal);
        if (side_old * side_new < 0.0) {
            let t = side_old / (side_old - side_new);
            let hit = mix(old, pos, t);
            let hr = length(hit);
            if (hr > DISK_INNER && hr < DISK_OUTER) {
                let d = disk_color(hit, hr, disk_normal);
                color = color + transmittance * d.a * d.rgb;
                transmittance = transmittance * (1.0 - d.a);
            }
        }

        if (length(pos) < HORIZON_RADIUS) {
            captured = true;
            break;
        }
        if (length(pos) > escape_radius && dot(pos, vel) > 0.0) {
            break;
        }
    }

    if (!captured) {
        color = color + transmittance * sky_color(normalize(vel));
    }
    return vec4<f32>(color, 1.0);
}
"#;
