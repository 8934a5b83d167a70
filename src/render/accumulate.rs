use wgpu::util::DeviceExt;

use super::geometry::{Mesh, MeshBuffers};
use super::instance::{FrameUniforms, GeometryVertex, SampleInstance, FRAME_UNIFORMS_WGSL};
use crate::error::{HeatmapError, Result};
use crate::kernel;

/// Two-channel float surface holding (Σ u·w, Σ w) per texel.
pub const ACCUMULATION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg32Float;

/// Accumulation buffer size for a viewport: `ceil(size * factor)` per axis,
/// at least 1.
///
/// `None` for a zero-sized viewport. The factor is taken to six decimal
/// places and the product is computed in integers, so an f32 factor such
/// as 0.3 does not round 100 px up to 31.
pub fn buffer_size(viewport: (u32, u32), factor: f32) -> Option<(u32, u32)> {
    if viewport.0 == 0 || viewport.1 == 0 {
        return None;
    }
    const SCALE: u64 = 1_000_000;
    let micros = (factor as f64 * SCALE as f64).round() as u64;
    let scale = |v: u32| ((v as u64 * micros).div_ceil(SCALE) as u32).max(1);
    Some((scale(viewport.0), scale(viewport.1)))
}

/// Checks that the device can render into and additively blend
/// [`ACCUMULATION_FORMAT`].
///
/// `format` comes from `Adapter::get_texture_format_features`. Those
/// adapter-specific capabilities only apply when the device was created
/// with `TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES`.
pub fn check_support(
    device_features: wgpu::Features,
    format: wgpu::TextureFormatFeatures,
) -> Result<()> {
    if !device_features.contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES) {
        return Err(HeatmapError::Capability(format!(
            "TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES is required to render into {ACCUMULATION_FORMAT:?}"
        )));
    }
    let usages = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
    if !format.allowed_usages.contains(usages) {
        return Err(HeatmapError::Capability(format!(
            "{ACCUMULATION_FORMAT:?} supports {:?}, need {usages:?}",
            format.allowed_usages
        )));
    }
    if !format
        .flags
        .contains(wgpu::TextureFormatFeatureFlags::BLENDABLE)
    {
        return Err(HeatmapError::Capability(format!(
            "{ACCUMULATION_FORMAT:?} is not blendable on this adapter"
        )));
    }
    Ok(())
}

pub struct AccumulationTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl AccumulationTarget {
    pub fn new(device: &wgpu::Device, (width, height): (u32, u32)) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("accumulation_texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ACCUMULATION_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// GPU resources for the scatter pass.
pub struct AccumulationPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub mesh: MeshBuffers,
    pub instance_buffer: wgpu::Buffer,
    pub num_instances: u32,
    pub uniform_buffer: wgpu::Buffer,
    pub uniform_bind_group: wgpu::BindGroup,
}

impl AccumulationPipeline {
    pub fn new(device: &wgpu::Device, mesh: &Mesh, instances: &[SampleInstance]) -> Self {
        let source = format!(
            "{}\n{}\n{}",
            kernel::wgsl_constants(),
            FRAME_UNIFORMS_WGSL,
            include_str!("shaders/accumulate.wgsl"),
        );
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("accumulate_shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("accumulate_uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("accumulate_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Additive blending: every sample instance sums into the target.
        let additive = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("accumulate_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GeometryVertex::layout(), SampleInstance::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ACCUMULATION_FORMAT,
                    blend: Some(wgpu::BlendState {
                        color: additive,
                        alpha: additive,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None, // AOI winding is arbitrary
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let mesh = MeshBuffers::new(device, mesh, "accumulate");

        let instance_data: &[SampleInstance] = if instances.is_empty() {
            &[SampleInstance {
                position: [0.0; 2],
                value: 0.0,
            }]
        } else {
            instances
        };
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sample_instance_buffer"),
            contents: bytemuck::cast_slice(instance_data),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("accumulate_uniform_buffer"),
            contents: bytemuck::bytes_of(&FrameUniforms::new(glam::Mat4::IDENTITY, (1, 1), 1.0, 1.0)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("accumulate_uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            mesh,
            instance_buffer,
            num_instances: instances.len() as u32,
            uniform_buffer,
            uniform_bind_group,
        }
    }

    /// Clears `target` and scatters every sample into it.
    pub fn encode(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &AccumulationTarget,
        uniforms: &FrameUniforms,
    ) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("accumulate_render_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.mesh.index_count, 0, 0..self.num_instances);
    }

    pub fn destroy(&self) {
        self.mesh.destroy();
        self.instance_buffer.destroy();
        self.uniform_buffer.destroy();
    }
}
