use crate::data_structures::texture::Texture;

/// Fixed-function state that differs between the viewer's programs.
#[derive(Copy, Clone, Debug)]
pub struct PipelineSettings {
    pub topology: wgpu::PrimitiveTopology,
    pub cull_mode: Option<wgpu::Face>,
    pub blend: Option<wgpu::BlendState>,
    pub depth_write_enabled: bool,
    pub depth_compare: wgpu::CompareFunction,
}

impl PipelineSettings {
    /// Opaque, depth tested triangles.
    pub const SOLID: Self = Self {
        topology: wgpu::PrimitiveTopology::TriangleList,
        cull_mode: Some(wgpu::Face::Back),
        blend: Some(wgpu::BlendState::REPLACE),
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
    };

    /// Lines drawn on top of already shaded geometry.
    pub const OVERLAY_LINES: Self = Self {
        topology: wgpu::PrimitiveTopology::LineList,
        cull_mode: None,
        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::LessEqual,
    };

    /// Screen space quad/triangle that ignores the depth buffer.
    pub const FULLSCREEN: Self = Self {
        topology: wgpu::PrimitiveTopology::TriangleList,
        cull_mode: None,
        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::Always,
    };
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: &wgpu::ShaderModule,
    settings: PipelineSettings,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: settings.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: settings.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: settings.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: Some(settings.depth_write_enabled),
            depth_compare: Some(settings.depth_compare),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
