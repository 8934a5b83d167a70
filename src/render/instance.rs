use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::sample::Sample;

/// WGSL declaration of [`FrameUniforms`] and its binding, shared by both passes.
pub const FRAME_UNIFORMS_WGSL: &str = include_str!("shaders/common.wgsl");

/// Geometry vertex, in the host's planar space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GeometryVertex {
    pub position: [f32; 2],
}

impl GeometryVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![
        0 => Float32x2,  // position
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GeometryVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Per-sample instance data for the accumulation pass.
/// Stride = 12 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SampleInstance {
    /// Planar position, projected by the frame matrix in the shader.
    pub position: [f32; 2],
    /// Normalized value in [0, 1].
    pub value: f32,
}

impl SampleInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        1 => Float32x2,  // sample position
        2 => Float32,    // normalized value
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SampleInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

impl From<&Sample> for SampleInstance {
    fn from(s: &Sample) -> Self {
        Self {
            position: s.position.into(),
            value: s.normalized_value,
        }
    }
}

/// Uniforms written once per stage per frame. 80 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub matrix: [[f32; 4]; 4],
    pub target_size: [f32; 2],
    pub power: f32,
    pub opacity: f32,
}

impl FrameUniforms {
    pub fn new(matrix: Mat4, target_size: (u32, u32), power: f32, opacity: f32) -> Self {
        Self {
            matrix: matrix.to_cols_array_2d(),
            target_size: [target_size.0 as f32, target_size.1 as f32],
            power,
            opacity,
        }
    }
}
