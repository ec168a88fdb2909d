use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    #[must_use]
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// CPU-side indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl GeometryData {
    #[must_use]
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// A `width × height` quad in the XY plane facing +Z.
    ///
    /// UVs put `v = 0` at the top edge (+Y), the texture-space origin used by
    /// the GPU.
    #[must_use]
    pub fn plane(width: f32, height: f32) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        let normal = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex::new([-hw, hh, 0.0], normal, [0.0, 0.0]),
            Vertex::new([hw, hh, 0.0], normal, [1.0, 0.0]),
            Vertex::new([-hw, -hh, 0.0], normal, [0.0, 1.0]),
            Vertex::new([hw, -hh, 0.0], normal, [1.0, 1.0]),
        ];
        Self {
            vertices,
            indices: vec![0, 2, 1, 2, 3, 1],
        }
    }

    /// Rotates every position and normal about X, baking the rotation in.
    #[must_use]
    pub fn rotated_x(mut self, angle: f32) -> Self {
        let rotation = Quat::from_rotation_x(angle);
        for vertex in &mut self.vertices {
            vertex.position = (rotation * Vec3::from(vertex.position)).to_array();
            vertex.normal = (rotation * Vec3::from(vertex.normal)).to_array();
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
