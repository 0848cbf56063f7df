//! Viewer render settings.
//!
//! [`RenderSettings`] is the set of toggles the viewer UI flips between frames:
//! which debug channel to show, which lighting terms contribute and whether the
//! model is drawn in UV space. The renderers read it every frame from the
//! [`RenderContext`](crate::context::RenderContext) that owns it.

/// Channel shown by the debug shading program.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShadingMode {
    #[default]
    Shaded = 0,
    BaseColor = 1,
    Normals = 2,
    Tangents = 3,
    TexCoords = 4,
    VertexColor = 5,
    Metalness = 6,
    Roughness = 7,
    AmbientOcclusion = 8,
}

/// Material transition blended in by `transition_factor`.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransitionEffect {
    #[default]
    Ditto = 0,
    Ink = 1,
    Gold = 2,
    Metal = 3,
}

/// The model program family a frame is drawn with.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShaderVariant {
    Standard,
    UvDebug,
    FlatDebug,
}

impl ShaderVariant {
    pub const ALL: [ShaderVariant; 3] = [
        ShaderVariant::Standard,
        ShaderVariant::UvDebug,
        ShaderVariant::FlatDebug,
    ];

    /// UV rendering wins over debug shading, which wins over the standard program.
    pub fn select(settings: &RenderSettings) -> Self {
        if settings.render_uvs {
            ShaderVariant::UvDebug
        } else if settings.use_debug_shading {
            ShaderVariant::FlatDebug
        } else {
            ShaderVariant::Standard
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    /// Per-channel mask applied to the final colour (r, g, b, a).
    pub render_channels: [f32; 4],
    pub shading_mode: ShadingMode,
    pub transition_effect: TransitionEffect,
    /// Blend factor towards `transition_effect`; clamped to `0.0..=1.0` on upload.
    pub transition_factor: f32,

    pub enable_diffuse: bool,
    pub enable_specular: bool,
    pub enable_emission: bool,
    pub enable_rim_lighting: bool,
    pub render_normal_maps: bool,
    pub render_vertex_color: bool,
    pub enable_wireframe: bool,

    /// Draw the mesh flattened into texture space.
    pub render_uvs: bool,
    pub use_debug_shading: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            render_channels: [1.0; 4],
            shading_mode: ShadingMode::default(),
            transition_effect: TransitionEffect::default(),
            transition_factor: 0.0,
            enable_diffuse: true,
            enable_specular: true,
            enable_emission: true,
            enable_rim_lighting: true,
            render_normal_maps: true,
            render_vertex_color: true,
            enable_wireframe: false,
            render_uvs: false,
            use_debug_shading: false,
        }
    }
}

impl RenderSettings {
    pub fn variant(&self) -> ShaderVariant {
        ShaderVariant::select(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_standard_program() {
        assert_eq!(RenderSettings::default().variant(), ShaderVariant::Standard);
    }

    #[test]
    fn debug_shading_selects_flat_debug() {
        let settings = RenderSettings {
            use_debug_shading: true,
            ..Default::default()
        };
        assert_eq!(settings.variant(), ShaderVariant::FlatDebug);
    }

    #[test]
    fn uv_rendering_takes_priority_over_debug_shading() {
        let mut settings = RenderSettings {
            render_uvs: true,
            use_debug_shading: true,
            ..Default::default()
        };
        assert_eq!(settings.variant(), ShaderVariant::UvDebug);

        settings.use_debug_shading = false;
        assert_eq!(settings.variant(), ShaderVariant::UvDebug);

        settings.render_uvs = false;
        settings.use_debug_shading = true;
        assert_eq!(settings.variant(), ShaderVariant::FlatDebug);
    }

    #[test]
    fn enum_discriminants_match_shader_constants() {
        assert_eq!(ShadingMode::AmbientOcclusion as i32, 8);
        assert_eq!(TransitionEffect::Metal as i32, 3);
    }
}
