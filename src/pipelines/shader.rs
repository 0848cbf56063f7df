//! Shader programs assembled from WGSL source files.
//!
//! A program is the concatenation of several files from the shader directory
//! (shared declarations, one vertex stage, helper libraries, one fragment
//! stage), mirroring how a GL program links several shader objects. "Linking"
//! is naga parsing and validating the combined module; a program that fails
//! keeps its error log and no pipeline, and callers skip drawing with it.

use std::{cell::OnceCell, path::Path};

use anyhow::Context as _;

use crate::{
    data_structures::model::{ModelVertex, Vertex},
    pipelines::{
        builder::{PipelineSettings, mk_render_pipeline},
        layouts::Layouts,
    },
    render::texture::ScreenVertex,
    settings::ShaderVariant,
};

/// Every program the viewer can build.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Model(ShaderVariant),
    /// Edge overlay, either over the shaded model or over its UV layout.
    Wireframe { uv_space: bool },
    TexturePreview,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 6] = [
        ProgramKind::Model(ShaderVariant::Standard),
        ProgramKind::Model(ShaderVariant::UvDebug),
        ProgramKind::Model(ShaderVariant::FlatDebug),
        ProgramKind::Wireframe { uv_space: false },
        ProgramKind::Wireframe { uv_space: true },
        ProgramKind::TexturePreview,
    ];

    fn index(self) -> usize {
        match self {
            ProgramKind::Model(ShaderVariant::Standard) => 0,
            ProgramKind::Model(ShaderVariant::UvDebug) => 1,
            ProgramKind::Model(ShaderVariant::FlatDebug) => 2,
            ProgramKind::Wireframe { uv_space: false } => 3,
            ProgramKind::Wireframe { uv_space: true } => 4,
            ProgramKind::TexturePreview => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProgramKind::Model(ShaderVariant::Standard) => "Model Shader",
            ProgramKind::Model(ShaderVariant::UvDebug) => "Model UV Shader",
            ProgramKind::Model(ShaderVariant::FlatDebug) => "Model Debug Shader",
            ProgramKind::Wireframe { uv_space: false } => "Wireframe Shader",
            ProgramKind::Wireframe { uv_space: true } => "UV Wireframe Shader",
            ProgramKind::TexturePreview => "Texture Shader",
        }
    }

    /// Files, relative to the shader directory, concatenated in this order.
    pub fn source_files(self) -> &'static [&'static str] {
        match self {
            ProgramKind::Model(ShaderVariant::Standard) => &[
                "model_common.wgsl",
                "model.vert.wgsl",
                "gamma.wgsl",
                "normal_map.wgsl",
                "model.frag.wgsl",
            ],
            ProgramKind::Model(ShaderVariant::UvDebug) => &[
                "model_common.wgsl",
                "model_uv.vert.wgsl",
                "normal_map.wgsl",
                "model_uv.frag.wgsl",
            ],
            ProgramKind::Model(ShaderVariant::FlatDebug) => &[
                "model_common.wgsl",
                "model.vert.wgsl",
                "gamma.wgsl",
                "normal_map.wgsl",
                "model_debug.frag.wgsl",
            ],
            ProgramKind::Wireframe { uv_space: false } => &[
                "model_common.wgsl",
                "model.vert.wgsl",
                "wireframe.frag.wgsl",
            ],
            ProgramKind::Wireframe { uv_space: true } => &[
                "model_common.wgsl",
                "model_uv.vert.wgsl",
                "wireframe.frag.wgsl",
            ],
            ProgramKind::TexturePreview => {
                &["texture.vert.wgsl", "gamma.wgsl", "texture.frag.wgsl"]
            }
        }
    }

    fn settings(self) -> PipelineSettings {
        match self {
            ProgramKind::Model(ShaderVariant::UvDebug) => PipelineSettings {
                cull_mode: None,
                ..PipelineSettings::SOLID
            },
            ProgramKind::Model(_) => PipelineSettings::SOLID,
            ProgramKind::Wireframe { .. } => PipelineSettings::OVERLAY_LINES,
            ProgramKind::TexturePreview => PipelineSettings::FULLSCREEN,
        }
    }
}

/// Reads every source file of `kind` from `shader_dir`.
pub fn read_sources(shader_dir: &Path, kind: ProgramKind) -> anyhow::Result<Vec<(String, String)>> {
    kind.source_files()
        .iter()
        .map(|file| {
            let path = shader_dir.join(file);
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read shader source {}", path.display()))?;
            Ok((file.to_string(), text))
        })
        .collect()
}

/// Concatenates `sources` and validates the result.
///
/// Returns the combined WGSL on success, or the diagnostic log on failure.
pub fn link(sources: &[(String, String)]) -> Result<String, String> {
    let mut combined = String::new();
    for (name, text) in sources {
        combined.push_str(&format!("// ---- {} ----\n", name));
        combined.push_str(text);
        combined.push('\n');
    }
    let module = naga::front::wgsl::parse_str(&combined).map_err(|e| e.emit_to_string(&combined))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|e| e.emit_to_string(&combined))?;
    Ok(combined)
}

#[derive(Debug)]
pub struct ShaderProgram {
    kind: ProgramKind,
    pipeline: Option<wgpu::RenderPipeline>,
    error_log: Option<String>,
}

impl ShaderProgram {
    /// Fails only when a source file cannot be read. Link failures produce a
    /// program whose [`link_status_ok`](Self::link_status_ok) is `false`.
    pub fn build(
        device: &wgpu::Device,
        layouts: &Layouts,
        color_format: wgpu::TextureFormat,
        shader_dir: &Path,
        kind: ProgramKind,
    ) -> anyhow::Result<Self> {
        let sources = read_sources(shader_dir, kind)?;
        let combined = match link(&sources) {
            Ok(combined) => combined,
            Err(log) => {
                log::error!("{} failed to link:\n{}", kind.label(), log);
                return Ok(Self {
                    kind,
                    pipeline: None,
                    error_log: Some(log),
                });
            }
        };

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kind.label()),
            source: wgpu::ShaderSource::Wgsl(combined.into()),
        });
        let bind_group_layouts: Vec<Option<&wgpu::BindGroupLayout>> = match kind {
            ProgramKind::Model(_) => vec![
                Some(&layouts.frame),
                Some(&layouts.environment),
                Some(&layouts.material),
            ],
            ProgramKind::Wireframe { .. } => vec![Some(&layouts.frame)],
            ProgramKind::TexturePreview => vec![Some(&layouts.preview)],
        };
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(kind.label()),
            bind_group_layouts: &bind_group_layouts,
            immediate_size: 0,
        });
        let vertex_layouts = match kind {
            ProgramKind::TexturePreview => [ScreenVertex::desc()],
            _ => [ModelVertex::desc()],
        };
        let pipeline = mk_render_pipeline(
            device,
            kind.label(),
            &layout,
            color_format,
            &vertex_layouts,
            &shader,
            kind.settings(),
        );
        log::info!("Built {}", kind.label());

        Ok(Self {
            kind,
            pipeline: Some(pipeline),
            error_log: None,
        })
    }

    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    pub fn link_status_ok(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn pipeline(&self) -> Option<&wgpu::RenderPipeline> {
        self.pipeline.as_ref()
    }

    pub fn error_log(&self) -> Option<&str> {
        self.error_log.as_deref()
    }
}

/// One lazily built slot per [`ProgramKind`]. A slot is filled at most once,
/// even when the program failed to link.
#[derive(Debug, Default)]
pub struct ShaderCache {
    programs: [OnceCell<ShaderProgram>; 6],
}

impl ShaderCache {
    pub fn get(&self, kind: ProgramKind) -> Option<&ShaderProgram> {
        self.programs[kind.index()].get()
    }

    pub fn get_or_build(
        &self,
        kind: ProgramKind,
        build: impl FnOnce() -> anyhow::Result<ShaderProgram>,
    ) -> anyhow::Result<&ShaderProgram> {
        let slot = &self.programs[kind.index()];
        if let Some(program) = slot.get() {
            return Ok(program);
        }
        let program = build()?;
        Ok(slot.get_or_init(|| program))
    }
}
