//! Skinned meshes, their materials and the model that groups them.

use std::collections::HashSet;

use cgmath::{MetricSpace, Point3, Vector4};
use wgpu::util::DeviceExt;

use crate::{
    context::RenderContext,
    data_structures::{
        skeleton::BonePalette,
        texture::Texture,
    },
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// xyz tangent, w bitangent sign
    pub tangent: [f32; 4],
    pub tex_coords: [f32; 2],
    pub color: [f32; 4],
    pub bone_indices: [u32; 4],
    /// All zero for rigid vertices.
    pub bone_weights: [f32; 4],
}

impl ModelVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x4,
        3 => Float32x2,
        4 => Float32x4,
        5 => Uint32x4,
        6 => Float32x4,
    ];
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// One draw call worth of geometry.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub num_vertices: u32,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    /// Line list over the unique triangle edges, drawn by the wireframe overlay.
    pub edge_buffer: wgpu::Buffer,
    pub num_edge_elements: u32,
    pub material: usize,
}

impl Mesh {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
        material: usize,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let edges = edge_indices(indices);
        let edge_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Edge Buffer", name)),
            contents: bytemuck::cast_slice(&edges),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: name.to_string(),
            vertex_buffer,
            num_vertices: vertices.len() as u32,
            index_buffer,
            num_elements: indices.len() as u32,
            edge_buffer,
            num_edge_elements: edges.len() as u32,
            material,
        }
    }
}

/// Texture set of a mesh: base colour, normal map, the packed
/// metalness / roughness / ambient occlusion / specular params map and
/// the emissive map.
#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        name: &str,
        col: &Texture,
        nor: &Texture,
        prm: &Texture,
        emi: &Texture,
    ) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&col.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&nor.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&prm.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&emi.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&col.sampler),
                },
            ],
            label: Some(name),
        });
        Self {
            name: name.to_string(),
            bind_group,
        }
    }
}

/// A renderable character model.
///
/// Each model owns its frame uniform and bone buffers so several models can
/// be drawn in one pass with different poses.
pub struct Model {
    /// xyz centre, w radius; in bind pose model space.
    pub bounding_sphere: Vector4<f32>,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub(crate) bone_palette: BonePalette,
    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) bone_buffer: wgpu::Buffer,
    pub(crate) frame_bind_group: wgpu::BindGroup,
}

impl Model {
    pub fn new(
        ctx: &RenderContext,
        meshes: Vec<Mesh>,
        materials: Vec<Material>,
        bounding_sphere: Vector4<f32>,
    ) -> Self {
        let device = &ctx.device;
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Uniform Buffer"),
            size: std::mem::size_of::<crate::render::model::ModelUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bone_palette = BonePalette::identity();
        let bone_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bone Buffer"),
            contents: bone_palette.as_bytes(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &ctx.layouts.frame,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bone_buffer.as_entire_binding(),
                },
            ],
            label: Some("model_frame_bind_group"),
        });
        Self {
            bounding_sphere,
            meshes,
            materials,
            bone_palette,
            uniform_buffer,
            bone_buffer,
            frame_bind_group,
        }
    }

    /// The palette uploaded on the last render (identity until a skeleton is passed).
    pub fn bone_palette(&self) -> &BonePalette {
        &self.bone_palette
    }
}

/// Axis-aligned box centre and the farthest vertex distance from it.
pub fn bounding_sphere<'a>(positions: impl IntoIterator<Item = &'a [f32; 3]>) -> Vector4<f32> {
    let positions: Vec<Point3<f32>> = positions.into_iter().map(|&p| p.into()).collect();
    let Some(first) = positions.first() else {
        return Vector4::new(0.0, 0.0, 0.0, 0.0);
    };
    let (min, max) = positions.iter().fold((*first, *first), |(min, max), p| {
        (
            Point3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
            Point3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
        )
    });
    let center = min + (max - min) * 0.5;
    let radius = positions
        .iter()
        .map(|p| p.distance(center))
        .fold(0.0f32, f32::max);
    Vector4::new(center.x, center.y, center.z, radius)
}

/// Unique undirected triangle edges as a line list.
pub fn edge_indices(triangles: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for tri in triangles.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            if seen.insert((a.min(b), a.max(b))) {
                edges.push(a);
                edges.push(b);
            }
        }
    }
    edges
}

pub trait DrawModel {
    fn draw_mesh(&mut self, mesh: &Mesh, material: &Material);

    fn draw_mesh_edges(&mut self, mesh: &Mesh);
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh(&mut self, mesh: &Mesh, material: &Material) {
        // empty buffers cannot be sliced
        if mesh.num_vertices == 0 || mesh.num_elements == 0 {
            return;
        }
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(2, &material.bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, 0..1);
    }

    fn draw_mesh_edges(&mut self, mesh: &Mesh) {
        if mesh.num_vertices == 0 || mesh.num_edge_elements == 0 {
            return;
        }
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.edge_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_edge_elements, 0, 0..1);
    }
}
