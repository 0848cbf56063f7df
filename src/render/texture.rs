//! Full-screen preview of a single 2D texture.

use std::mem;

use crate::{
    camera::Camera,
    context::RenderContext,
    data_structures::{model::Vertex, texture::Texture},
    pipelines::shader::ProgramKind,
    render::Renderable,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScreenVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl ScreenVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];
}

impl Vertex for ScreenVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ScreenVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// One triangle that covers the whole viewport; the part outside is clipped.
pub const SCREEN_TRIANGLE: [ScreenVertex; 3] = [
    ScreenVertex {
        position: [-1.0, -1.0],
        tex_coords: [0.0, 1.0],
    },
    ScreenVertex {
        position: [3.0, -1.0],
        tex_coords: [2.0, 1.0],
    },
    ScreenVertex {
        position: [-1.0, 3.0],
        tex_coords: [0.0, -1.0],
    },
];

/// Mirror of `PreviewUniforms` in `texture.frag.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct PreviewUniform {
    is_srgb: u32,
    _padding: [u32; 3],
}

/// Draws a texture over the whole viewport.
///
/// Without a texture the renderer still draws, sampling a 1x1 placeholder.
/// The camera is ignored.
pub struct TextureRenderer {
    texture: Option<Texture>,
    /// Decode the sampled colour from sRGB before output.
    pub is_srgb: bool,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl TextureRenderer {
    pub fn new(ctx: &RenderContext) -> Self {
        let uniform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Preview Uniform Buffer"),
            size: mem::size_of::<PreviewUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = Self::bind(ctx, &ctx.placeholder, &uniform_buffer);
        Self {
            texture: None,
            is_srgb: false,
            uniform_buffer,
            bind_group,
        }
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    /// Replaces the previewed texture; `None` falls back to the placeholder.
    pub fn set_texture(&mut self, ctx: &RenderContext, texture: Option<Texture>) {
        let shown = texture.as_ref().unwrap_or(&ctx.placeholder);
        self.bind_group = Self::bind(ctx, shown, &self.uniform_buffer);
        self.texture = texture;
    }

    fn bind(ctx: &RenderContext, texture: &Texture, uniform_buffer: &wgpu::Buffer) -> wgpu::BindGroup {
        ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &ctx.layouts.preview,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
            label: Some("preview_bind_group"),
        })
    }
}

impl Renderable for TextureRenderer {
    fn render(
        &mut self,
        ctx: &RenderContext,
        pass: &mut wgpu::RenderPass<'_>,
        _camera: &Camera,
    ) -> anyhow::Result<()> {
        let program = ctx.program(ProgramKind::TexturePreview)?;
        let Some(pipeline) = program.pipeline() else {
            return Ok(());
        };
        let triangle = ctx.screen_triangle();

        let uniform = PreviewUniform {
            is_srgb: (self.texture.is_some() && self.is_srgb) as u32,
            ..Default::default()
        };
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, triangle.slice(..));
        pass.draw(0..SCREEN_TRIANGLE.len() as u32, 0..1);
        Ok(())
    }
}
