//! The render context: the one owner of GPU state shared by every renderer.
//!
//! Shader programs, the full-screen triangle and the default textures live
//! here instead of in process-wide statics. Programs and the triangle are
//! built on first use; the textures are loaded up front.

use std::{cell::OnceCell, path::PathBuf};

use wgpu::util::DeviceExt;

use crate::{
    camera::Camera,
    data_structures::texture::Texture,
    pipelines::{
        layouts::Layouts,
        shader::{ProgramKind, ShaderCache, ShaderProgram},
    },
    render::{Renderable, texture::SCREEN_TRIANGLE},
    resources::DefaultTextures,
    settings::RenderSettings,
};

/// Environment variable that overrides [`ViewerConfig::asset_root`].
pub const ASSET_ROOT_ENV: &str = "VIEWER_ASSET_ROOT";

/// Where the viewer finds its assets.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub asset_root: PathBuf,
    /// Relative to `asset_root`.
    pub shader_dir: PathBuf,
    /// Relative to `asset_root`.
    pub texture_dir: PathBuf,
    pub clear_colour: wgpu::Color,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            shader_dir: PathBuf::from("Shaders"),
            texture_dir: PathBuf::from("DefaultTextures"),
            clear_colour: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
        }
    }
}

impl ViewerConfig {
    pub fn with_asset_root(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            ..Default::default()
        }
    }

    /// Defaults, with the asset root taken from `VIEWER_ASSET_ROOT` when set.
    pub fn from_env() -> Self {
        match std::env::var_os(ASSET_ROOT_ENV) {
            Some(root) if !root.is_empty() => Self::with_asset_root(root),
            _ => Self::default(),
        }
    }

    pub fn shader_path(&self) -> PathBuf {
        self.asset_root.join(&self.shader_dir)
    }

    pub fn texture_path(&self) -> PathBuf {
        self.asset_root.join(&self.texture_dir)
    }
}

/// Initialises `env_logger` once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

pub struct RenderContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Format of every colour target the programs render into.
    pub color_format: wgpu::TextureFormat,
    pub config: ViewerConfig,
    /// Read by the renderers on every draw; change freely between frames.
    pub settings: RenderSettings,
    pub clear_colour: wgpu::Color,
    pub layouts: Layouts,
    /// Shown by texture renderers that have no texture.
    pub placeholder: Texture,
    pub defaults: DefaultTextures,
    shaders: ShaderCache,
    screen_triangle: OnceCell<wgpu::Buffer>,
}

impl RenderContext {
    /// Loads the default textures. A missing or malformed texture file fails
    /// the whole construction.
    pub async fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        config: ViewerConfig,
    ) -> anyhow::Result<Self> {
        log::warn!("Bind group layouts");
        let layouts = Layouts::new(&device);
        log::warn!("Default textures");
        let defaults = DefaultTextures::load(&device, &queue, &layouts, &config.texture_path()).await?;
        let placeholder = Texture::create_solid(&device, &queue, [0, 0, 0, 255], 1, 1, "placeholder");

        Ok(Self {
            clear_colour: config.clear_colour,
            device,
            queue,
            color_format,
            config,
            settings: RenderSettings::default(),
            layouts,
            placeholder,
            defaults,
            shaders: ShaderCache::default(),
            screen_triangle: OnceCell::new(),
        })
    }

    /// A context without a window, rendering into `Rgba8UnormSrgb` targets.
    ///
    /// BC texture compression is requested when the adapter has it.
    pub async fn headless(config: ViewerConfig) -> anyhow::Result<Self> {
        log::warn!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        log::warn!("device and queue");
        let required_features = adapter.features() & wgpu::Features::TEXTURE_COMPRESSION_BC;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("viewer device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await?;
        Self::new(device, queue, wgpu::TextureFormat::Rgba8UnormSrgb, config).await
    }

    pub fn shader_dir(&self) -> PathBuf {
        self.config.shader_path()
    }

    /// The program for `kind`, built on the first request.
    ///
    /// Fails only when a source file is missing. A program that failed to
    /// link is returned (and cached) all the same.
    pub fn program(&self, kind: ProgramKind) -> anyhow::Result<&ShaderProgram> {
        self.shaders.get_or_build(kind, || {
            ShaderProgram::build(
                &self.device,
                &self.layouts,
                self.color_format,
                &self.shader_dir(),
                kind,
            )
        })
    }

    /// The shared full-screen triangle vertex buffer.
    pub fn screen_triangle(&self) -> &wgpu::Buffer {
        self.screen_triangle.get_or_init(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Screen Triangle Vertex Buffer"),
                contents: bytemuck::cast_slice(&SCREEN_TRIANGLE),
                usage: wgpu::BufferUsages::VERTEX,
            })
        })
    }

    /// Clears `target` and `depth`, then renders every renderable in order
    /// in a single pass.
    pub fn render_frame(
        &self,
        target: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        renderables: &mut [&mut dyn Renderable],
        camera: &Camera,
    ) -> anyhow::Result<()> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            for renderable in renderables.iter_mut() {
                renderable.render(self, &mut render_pass, camera)?;
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
