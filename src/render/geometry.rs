use glam::Vec2;
use wgpu::util::DeviceExt;

use super::instance::GeometryVertex;
use crate::triangulate::triangulate;

/// Triangulated region in the host's planar space.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<GeometryVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn from_ring(ring: &[Vec2]) -> Self {
        Self {
            vertices: ring
                .iter()
                .map(|p| GeometryVertex {
                    position: (*p).into(),
                })
                .collect(),
            indices: triangulate(ring),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Picks the draw mesh (AOI, or the world rectangle when there is no AOI)
/// and the accumulation mesh.
///
/// The accumulation pass only reuses the AOI when `exact_match` is set;
/// otherwise it covers the world so that downsampled texels along the AOI
/// edge still hold data.
pub fn layer_meshes(aoi: Option<&[Vec2]>, world: [Vec2; 4], exact_match: bool) -> (Mesh, Mesh) {
    let world_mesh = Mesh::from_ring(&world);
    let draw = match aoi {
        Some(ring) if !ring.is_empty() => Mesh::from_ring(ring),
        _ => world_mesh.clone(),
    };
    let accumulate = if exact_match { draw.clone() } else { world_mesh };
    (draw, accumulate)
}

/// Vertex and index buffers for one [`Mesh`].
pub struct MeshBuffers {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffers {
    pub fn new(device: &wgpu::Device, mesh: &Mesh, label: &str) -> Self {
        // Empty meshes are never drawn but still get a valid buffer.
        let vertices: &[GeometryVertex] = if mesh.vertices.is_empty() {
            &[GeometryVertex { position: [0.0; 2] }]
        } else {
            &mesh.vertices
        };
        let indices: &[u32] = if mesh.indices.is_empty() {
            &[0]
        } else {
            &mesh.indices
        };

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_vertex_buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_index_buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }

    pub fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> [Vec2; 4] {
        [
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
        ]
    }

    fn triangle_aoi() -> Vec<Vec2> {
        vec![
            Vec2::new(0.2, 0.2),
            Vec2::new(0.6, 0.2),
            Vec2::new(0.4, 0.5),
        ]
    }

    #[test]
    fn no_aoi_uses_world_quad() {
        let (draw, acc) = layer_meshes(None, world(), false);
        assert_eq!(draw.vertices.len(), 4);
        assert_eq!(draw.triangle_count(), 2);
        assert_eq!(draw, acc);
    }

    #[test]
    fn empty_aoi_is_absent() {
        let (draw, _) = layer_meshes(Some(&[]), world(), false);
        assert_eq!(draw.triangle_count(), 2);
    }

    #[test]
    fn accumulation_covers_world_unless_exact() {
        let aoi = triangle_aoi();
        let (draw, acc) = layer_meshes(Some(&aoi), world(), false);
        assert_eq!(draw.triangle_count(), 1);
        assert_eq!(acc.triangle_count(), 2);

        let (draw, acc) = layer_meshes(Some(&aoi), world(), true);
        assert_eq!(draw, acc);
    }

    #[test]
    fn short_aoi_yields_empty_mesh() {
        let aoi = [Vec2::ZERO, Vec2::ONE];
        let (draw, _) = layer_meshes(Some(&aoi), world(), false);
        assert!(draw.is_empty());
    }
}
