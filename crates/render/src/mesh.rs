use crate::command::RenderCommand;
use crate::context::RenderContext;
use crate::resource::MeshId;
use bytemuck::{Pod, Zeroable};
use std::f32::consts::{PI, TAU};

/// Interleaved vertex consumed by the geometry vertex program.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
}

/// CPU-side geometry ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub label: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Uploaded geometry. Cheap to copy; the device owns the buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mesh {
    pub id: MeshId,
    pub vertex_count: u32,
    pub index_count: u32,
}

impl Mesh {
    /// Bind the mesh buffers and issue one indexed draw.
    pub fn draw<C: RenderContext + ?Sized>(&self, ctx: &mut C) {
        ctx.record(RenderCommand::DrawIndexed {
            mesh: self.id,
            index_count: self.index_count,
        });
    }
}

impl MeshData {
    /// Axis-aligned cube centered on the origin.
    pub fn cube(label: &str, size: f32) -> Self {
        let h = size * 0.5;
        // (normal, tangent) per face; bitangent = normal x tangent.
        #[rustfmt::skip]
        let faces: [([f32; 3], [f32; 3]); 6] = [
            ([ 0.0,  0.0,  1.0], [-1.0,  0.0,  0.0]),
            ([ 0.0,  0.0, -1.0], [ 1.0,  0.0,  0.0]),
            ([ 1.0,  0.0,  0.0], [ 0.0,  0.0,  1.0]),
            ([-1.0,  0.0,  0.0], [ 0.0,  0.0, -1.0]),
            ([ 0.0,  1.0,  0.0], [ 1.0,  0.0,  0.0]),
            ([ 0.0, -1.0,  0.0], [ 1.0,  0.0,  0.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, tangent) in faces {
            let n = glam::Vec3::from(normal);
            let t = glam::Vec3::from(tangent);
            let b = n.cross(t);
            let base = vertices.len() as u32;
            for (u, v) in [(0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)] {
                let p = (n + t * (u * 2.0 - 1.0) + b * (1.0 - v * 2.0)) * h;
                vertices.push(Vertex {
                    position: p.to_array(),
                    normal,
                    uv: [u, v],
                    tangent,
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self {
            label: label.to_string(),
            vertices,
            indices,
        }
    }

    /// UV sphere with `slices` segments around Y and `stacks` from pole to pole.
    pub fn sphere(label: &str, radius: f32, slices: u32, stacks: u32) -> Self {
        let slices = slices.max(3);
        let stacks = stacks.max(2);
        let mut vertices = Vec::with_capacity(((slices + 1) * (stacks + 1)) as usize);
        for stack in 0..=stacks {
            let v = stack as f32 / stacks as f32;
            let phi = v * PI;
            for slice in 0..=slices {
                let u = slice as f32 / slices as f32;
                let theta = u * TAU;
                let normal = [phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()];
                vertices.push(Vertex {
                    position: normal.map(|c| c * radius),
                    normal,
                    uv: [u, v],
                    tangent: [-theta.sin(), 0.0, theta.cos()],
                });
            }
        }

        let row = slices + 1;
        let mut indices = Vec::with_capacity((slices * stacks * 6) as usize);
        for stack in 0..stacks {
            for slice in 0..slices {
                let a = stack * row + slice;
                let b = a + row;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }

        Self {
            label: label.to_string(),
            vertices,
            indices,
        }
    }
}
