use crate::shaders;
use bytemuck::{Pod, Zeroable};
use lensing_assets::{ImageData, Interpolation, TextureKind, TextureSet};
use lensing_render::{FrameUniforms, Renderer};
use wgpu::util::DeviceExt;

/// Textures bound to the raymarch pass, in binding order. Each takes a
/// texture slot followed by its sampler slot.
const BOUND_TEXTURES: [TextureKind; 3] =
    [TextureKind::Stars, TextureKind::Galaxy, TextureKind::Spectra];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("fragment shader rejected: {0}")]
    ShaderCompile(String),
    #[error("no fragment shader has been built yet")]
    NoPipeline,
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// GPU layout of [`FrameUniforms`], padded to WGSL uniform alignment.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct Uniforms {
    time: f32,
    _pad0: f32,
    resolution: [f32; 2],
    cam_pos: [f32; 3],
    _pad1: f32,
    cam_vel: [f32; 3],
    _pad2: f32,
    cam_x: [f32; 3],
    _pad3: f32,
    cam_y: [f32; 3],
    _pad4: f32,
    cam_z: [f32; 3],
    _pad5: f32,
}

impl From<&FrameUniforms> for Uniforms {
    fn from(u: &FrameUniforms) -> Self {
        Self {
            time: u.time,
            resolution: u.resolution.to_array(),
            cam_pos: u.cam_pos.to_array(),
            cam_vel: u.cam_vel.to_array(),
            cam_x: u.cam_x.to_array(),
            cam_y: u.cam_y.to_array(),
            cam_z: u.cam_z.to_array(),
            ..Zeroable::zeroed()
        }
    }
}

#[rustfmt::skip]
const QUAD_VERTICES: [[f32; 2]; 4] = [
    [-1.0, -1.0],
    [ 1.0, -1.0],
    [ 1.0,  1.0],
    [-1.0,  1.0],
];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Offscreen texture holding the last raymarched frame.
struct SceneTarget {
    view: wgpu::TextureView,
    blit_bind_group: wgpu::BindGroup,
}

/// wgpu backend for the raymarch pass.
///
/// The expensive fragment program renders into an offscreen scene target only
/// when the render loop asks for a frame; [`RaymarchRenderer::present`] blits
/// that target to the surface on every display refresh.
pub struct RaymarchRenderer {
    pipeline: Option<wgpu::RenderPipeline>,
    pipeline_layout: wgpu::PipelineLayout,
    vertex_module: wgpu::ShaderModule,
    blit_pipeline: wgpu::RenderPipeline,
    blit_layout: wgpu::BindGroupLayout,
    blit_sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    scene: SceneTarget,
    surface_format: wgpu::TextureFormat,
}

impl RaymarchRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        textures: &TextureSet,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform_buffer"),
            contents: bytemuck::bytes_of(&Uniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_textures_layout"),
            entries: &texture_layout_entries(BOUND_TEXTURES.len()),
        });
        let uploaded: Vec<(wgpu::TextureView, wgpu::Sampler)> = BOUND_TEXTURES
            .iter()
            .map(|&kind| upload_texture(device, queue, kind, textures.get(kind)))
            .collect();
        let texture_entries: Vec<wgpu::BindGroupEntry> = uploaded
            .iter()
            .enumerate()
            .flat_map(|(i, (view, sampler))| {
                let slot = 2 * i as u32;
                [
                    wgpu::BindGroupEntry {
                        binding: slot,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: slot + 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ]
            })
            .collect();
        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_textures"),
            layout: &texture_layout,
            entries: &texture_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("raymarch_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quad_vertex"),
            source: wgpu::ShaderSource::Wgsl(shaders::VERTEX_SHADER.into()),
        });

        // Blit pipeline
        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit_layout"),
            entries: &texture_layout_entries(1),
        });
        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit_pipeline_layout"),
            bind_group_layouts: &[&blit_layout],
            push_constant_ranges: &[],
        });
        let blit_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::BLIT_SHADER.into()),
        });
        let blit_pipeline = fullscreen_pipeline(
            device,
            "blit_pipeline",
            &blit_pipeline_layout,
            &vertex_module,
            &blit_module,
            "fs_blit",
            surface_format,
        );
        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("blit_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Quad mesh
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_vertex_buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_index_buffer"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let scene = create_scene_target(
            device,
            surface_format,
            &blit_layout,
            &blit_sampler,
            width,
            height,
        );

        Self {
            pipeline: None,
            pipeline_layout,
            vertex_module,
            blit_pipeline,
            blit_layout,
            blit_sampler,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group,
            vertex_buffer,
            index_buffer,
            scene,
            surface_format,
        }
    }

    /// Recreate the scene target. The caller must invalidate the frame gate
    /// so the new target gets drawn.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.scene = create_scene_target(
            device,
            self.surface_format,
            &self.blit_layout,
            &self.blit_sampler,
            width,
            height,
        );
    }

    /// Build the raymarch pipeline from compiled fragment source. On a
    /// validation error the previous pipeline stays in place.
    pub fn rebuild(
        &mut self,
        device: &wgpu::Device,
        fragment_source: &str,
    ) -> Result<(), RenderError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("raytracer"),
            source: wgpu::ShaderSource::Wgsl(fragment_source.into()),
        });
        let pipeline = fullscreen_pipeline(
            device,
            "raymarch_pipeline",
            &self.pipeline_layout,
            &self.vertex_module,
            &module,
            "fs_main",
            self.surface_format,
        );
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            tracing::error!(error = %err, "fragment shader rejected, keeping previous pipeline");
            return Err(RenderError::ShaderCompile(err.to_string()));
        }

        self.pipeline = Some(pipeline);
        tracing::info!(lines = fragment_source.lines().count(), "raymarch pipeline rebuilt");
        Ok(())
    }

    /// Raymarch one frame into the scene target.
    pub fn draw_scene(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        uniforms: &FrameUniforms,
    ) -> Result<(), RenderError> {
        let pipeline = self.pipeline.as_ref().ok_or(RenderError::NoPipeline)?;
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&Uniforms::from(uniforms)));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("raymarch_encoder"),
        });
        {
            let mut pass = begin_fullscreen_pass(&mut encoder, "raymarch_pass", &self.scene.view);
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &self.texture_bind_group, &[]);
            self.draw_quad(&mut pass);
        }
        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Copy the scene target onto `view`.
    pub fn present(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut pass = begin_fullscreen_pass(encoder, "blit_pass", view);
        pass.set_pipeline(&self.blit_pipeline);
        pass.set_bind_group(0, &self.scene.blit_bind_group, &[]);
        self.draw_quad(&mut pass);
    }

    fn draw_quad(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
    }
}

/// Adapts [`RaymarchRenderer`] to the render loop for one tick.
pub struct ScenePass<'a> {
    renderer: &'a mut RaymarchRenderer,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
}

impl<'a> ScenePass<'a> {
    pub fn new(
        renderer: &'a mut RaymarchRenderer,
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
    ) -> Self {
        Self {
            renderer,
            device,
            queue,
        }
    }
}

impl Renderer for ScenePass<'_> {
    type Error = RenderError;

    fn rebuild_shader(&mut self, fragment_source: &str) -> Result<(), RenderError> {
        self.renderer.rebuild(self.device, fragment_source)
    }

    fn draw(&mut self, uniforms: &FrameUniforms) -> Result<(), RenderError> {
        self.renderer.draw_scene(self.device, self.queue, uniforms)
    }
}

fn texture_layout_entries(pairs: usize) -> Vec<wgpu::BindGroupLayoutEntry> {
    (0..pairs as u32)
        .flat_map(|i| {
            [
                wgpu::BindGroupLayoutEntry {
                    binding: 2 * i,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2 * i + 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ]
        })
        .collect()
}

fn filter_mode(interpolation: Interpolation) -> wgpu::FilterMode {
    match interpolation {
        Interpolation::Nearest => wgpu::FilterMode::Nearest,
        Interpolation::Linear => wgpu::FilterMode::Linear,
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    kind: TextureKind,
    image: &ImageData,
) -> (wgpu::TextureView, wgpu::Sampler) {
    let size = wgpu::Extent3d {
        width: image.width.max(1),
        height: image.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(kind.name()),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    if image.width > 0 && image.height > 0 {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.bytes_per_row()),
                rows_per_image: Some(image.height),
            },
            size,
        );
    }

    // The spectrum is a 1D lookup and must not wrap.
    let address_mode = match kind {
        TextureKind::Spectra => wgpu::AddressMode::ClampToEdge,
        _ => wgpu::AddressMode::Repeat,
    };
    let filter = filter_mode(kind.interpolation());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(kind.name()),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        mag_filter: filter,
        min_filter: filter,
        ..Default::default()
    });

    tracing::debug!(%kind, width = image.width, height = image.height, ?filter, "texture uploaded");
    (texture.create_view(&Default::default()), sampler)
}

fn create_scene_target(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    blit_layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    width: u32,
    height: u32,
) -> SceneTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("scene_target"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&Default::default());
    let blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("blit_bind_group"),
        layout: blit_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    SceneTarget { view, blit_bind_group }
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x2],
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some(fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn begin_fullscreen_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    #[test]
    fn uniform_block_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 96);
        assert_eq!(std::mem::offset_of!(Uniforms, resolution), 8);
        assert_eq!(std::mem::offset_of!(Uniforms, cam_pos), 16);
        assert_eq!(std::mem::offset_of!(Uniforms, cam_vel), 32);
        assert_eq!(std::mem::offset_of!(Uniforms, cam_x), 48);
        assert_eq!(std::mem::offset_of!(Uniforms, cam_y), 64);
        assert_eq!(std::mem::offset_of!(Uniforms, cam_z), 80);
    }

    #[test]
    fn uniforms_copy_frame_values() {
        let frame = FrameUniforms {
            time: 3.0,
            resolution: Vec2::new(1920.0, 1080.0),
            cam_pos: Vec3::new(0.0, -11.0, 0.0),
            cam_vel: Vec3::new(0.1, 0.0, 0.0),
            cam_x: Vec3::X,
            cam_y: Vec3::Z,
            cam_z: Vec3::Y,
        };
        let u = Uniforms::from(&frame);
        assert_eq!(u.time, 3.0);
        assert_eq!(u.resolution, [1920.0, 1080.0]);
        assert_eq!(u.cam_pos, [0.0, -11.0, 0.0]);
        assert_eq!(u.cam_y, [0.0, 0.0, 1.0]);
        assert_eq!(u._pad5, 0.0);
    }

    #[test]
    fn bound_textures_skip_moon() {
        assert!(!BOUND_TEXTURES.contains(&TextureKind::Moon));
        assert_eq!(texture_layout_entries(BOUND_TEXTURES.len()).len(), 6);
        assert_eq!(filter_mode(TextureKind::Galaxy.interpolation()), wgpu::FilterMode::Nearest);
    }
}
