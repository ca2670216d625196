use std::mem::size_of;
use color_eyre::Result;
use crate::renderer::core::device::{BufferKind, GraphicsDevice};

/// 24 unit-cube corner positions, four per face so faces never share vertices
pub const CUBE_VERTICES: [[f32; 3]; 24] = [
    // -Z
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5],
    // +Z
    [-0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [0.5, -0.5, 0.5],
    [-0.5, 0.5, 0.5],
    // -X
    [-0.5, 0.5, 0.5],
    [-0.5, -0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [-0.5, -0.5, 0.5],
    // +X
    [0.5, 0.5, 0.5],
    [0.5, 0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, -0.5, 0.5],
    // -Y
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, 0.5],
    [0.5, -0.5, -0.5],
    [-0.5, -0.5, 0.5],
    // +Y
    [-0.5, 0.5, -0.5],
    [0.5, 0.5, -0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
];

/// 12 triangles, clockwise when seen from outside the cube
pub const CUBE_INDICES: [u16; 36] = [
    0, 1, 2, 2, 3, 0,
    4, 5, 6, 5, 4, 7,
    8, 9, 10, 9, 8, 11,
    12, 13, 14, 14, 15, 12,
    16, 17, 18, 17, 16, 19,
    20, 21, 22, 22, 23, 20,
];

pub const CUBE_VERTEX_STRIDE: u32 = size_of::<[f32; 3]>() as u32;

/// Vertex and index buffer pair holding the static cube mesh
pub struct GeometryBuffer<D: GraphicsDevice> {
    pub vertices: D::Buffer,
    pub indices: D::Buffer,
    pub index_count: u32,
    pub vertex_stride: u32,
}

impl<D: GraphicsDevice> GeometryBuffer<D> {
    pub fn new_cube(device: &mut D) -> Result<Self> {
        let vertices = device.create_buffer(
            BufferKind::Vertex,
            bytemuck::cast_slice(&CUBE_VERTICES),
        )?;
        let indices = match device.create_buffer(
            BufferKind::Index,
            bytemuck::cast_slice(&CUBE_INDICES),
        ) {
            Ok(indices) => indices,
            Err(e) => {
                device.delete_buffer(vertices);
                return Err(e);
            }
        };

        Ok(Self {
            vertices,
            indices,
            index_count: CUBE_INDICES.len() as u32,
            vertex_stride: CUBE_VERTEX_STRIDE,
        })
    }

    pub fn destroy(self, device: &mut D) {
        device.delete_buffer(self.vertices);
        device.delete_buffer(self.indices);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn indices_stay_in_range() {
        assert!(CUBE_INDICES.iter().all(|&i| (i as usize) < CUBE_VERTICES.len()));
        assert_eq!(CUBE_INDICES.len() / 3, 12);
    }

    #[test]
    fn every_triangle_winds_clockwise_from_outside() {
        for triangle in CUBE_INDICES.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|k| Vec3::from(CUBE_VERTICES[triangle[k] as usize]));
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) < 0.0, "triangle {triangle:?}");
        }
    }
}
