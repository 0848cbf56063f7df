//! Per-frame uniforms and draw calls of a skinned [`Model`].

use cgmath::Matrix4;

use crate::{
    camera::{Camera, OPENGL_TO_WGPU_MATRIX},
    context::RenderContext,
    data_structures::{
        model::{DrawModel, Model},
        skeleton::Skeleton,
    },
    pipelines::shader::ProgramKind,
    render::Renderable,
    settings::{RenderSettings, ShaderVariant},
};

/// Mirror of `ModelUniforms` in `model_common.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub mvp: [[f32; 4]; 4],
    pub view_vector: [f32; 4],
    pub render_channels: [f32; 4],
    pub render_mode: i32,
    pub transition_effect: i32,
    pub transition_factor: f32,
    pub render_diffuse: i32,
    pub render_specular: i32,
    pub render_emission: i32,
    pub render_rim_lighting: i32,
    pub render_normal_maps: i32,
    pub render_vertex_color: i32,
    pub render_wireframe: i32,
    _padding: [i32; 2],
}

/// Texture space projection used while drawing UVs. Flips V so the layout
/// matches the texture image.
pub fn uv_projection() -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * cgmath::ortho(-2.0, 2.0, 2.0, -2.0, -2.0, 2.0)
}

impl ModelUniform {
    pub fn new(settings: &RenderSettings, camera: &Camera) -> Self {
        let mvp = if settings.render_uvs {
            uv_projection()
        } else {
            camera.mvp_matrix()
        };
        Self {
            mvp: mvp.into(),
            view_vector: camera.view_vector().extend(0.0).into(),
            render_channels: settings.render_channels,
            render_mode: settings.shading_mode as i32,
            transition_effect: settings.transition_effect as i32,
            transition_factor: settings.transition_factor.clamp(0.0, 1.0),
            render_diffuse: settings.enable_diffuse as i32,
            render_specular: settings.enable_specular as i32,
            render_emission: settings.enable_emission as i32,
            render_rim_lighting: settings.enable_rim_lighting as i32,
            render_normal_maps: settings.render_normal_maps as i32,
            render_vertex_color: settings.render_vertex_color as i32,
            render_wireframe: settings.enable_wireframe as i32,
            _padding: [0; 2],
        }
    }
}

impl Model {
    /// Draws every mesh of the model with the program selected by the
    /// context's settings.
    ///
    /// With a skeleton the bone palette is refreshed from its current pose,
    /// otherwise the last uploaded palette is reused.
    pub fn render(
        &mut self,
        ctx: &RenderContext,
        pass: &mut wgpu::RenderPass<'_>,
        camera: &Camera,
        skeleton: Option<&Skeleton>,
    ) -> anyhow::Result<()> {
        // every variant is built on the first render so a broken program is
        // reported before it is selected
        for variant in ShaderVariant::ALL {
            ctx.program(ProgramKind::Model(variant))?;
        }
        let settings = &ctx.settings;
        let variant = settings.variant();
        let program = ctx.program(ProgramKind::Model(variant))?;
        let Some(pipeline) = program.pipeline() else {
            return Ok(());
        };

        self.bone_palette.refresh(skeleton);
        ctx.queue
            .write_buffer(&self.bone_buffer, 0, self.bone_palette.as_bytes());
        let uniform = ModelUniform::new(settings, camera);
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        pass.set_bind_group(1, &ctx.defaults.environment, &[]);
        for mesh in &self.meshes {
            let material = self
                .materials
                .get(mesh.material)
                .unwrap_or(&ctx.defaults.default_material);
            pass.draw_mesh(mesh, material);
        }

        if settings.enable_wireframe {
            let uv_space = variant == ShaderVariant::UvDebug;
            let overlay = ctx.program(ProgramKind::Wireframe { uv_space })?;
            if let Some(pipeline) = overlay.pipeline() {
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.frame_bind_group, &[]);
                for mesh in &self.meshes {
                    pass.draw_mesh_edges(mesh);
                }
            }
        }
        Ok(())
    }
}

impl Renderable for Model {
    fn render(
        &mut self,
        ctx: &RenderContext,
        pass: &mut wgpu::RenderPass<'_>,
        camera: &Camera,
    ) -> anyhow::Result<()> {
        Model::render(self, ctx, pass, camera, None)
    }
}

/// A model posed by a skeleton it does not own.
pub struct Posed<'a> {
    pub model: &'a mut Model,
    pub skeleton: &'a Skeleton,
}

impl Renderable for Posed<'_> {
    fn render(
        &mut self,
        ctx: &RenderContext,
        pass: &mut wgpu::RenderPass<'_>,
        camera: &Camera,
    ) -> anyhow::Result<()> {
        self.model.render(ctx, pass, camera, Some(self.skeleton))
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, SquareMatrix, Vector4};

    use super::*;
    use crate::{
        camera::Projection,
        settings::{ShadingMode, TransitionEffect},
    };

    fn camera() -> Camera {
        Camera::new(
            (0.0, 1.0, 5.0),
            Deg(-90.0),
            Deg(0.0),
            Projection::new(800, 600, Deg(45.0), 0.1, 100.0),
        )
    }

    #[test]
    fn uniform_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<ModelUniform>(), 144);
    }

    #[test]
    fn camera_mvp_outside_uv_mode() {
        let camera = camera();
        let uniform = ModelUniform::new(&RenderSettings::default(), &camera);
        let expected: [[f32; 4]; 4] = camera.mvp_matrix().into();
        assert_eq!(uniform.mvp, expected);
        assert_eq!(uniform.view_vector[3], 0.0);
    }

    #[test]
    fn uv_mode_uploads_fixed_projection() {
        let settings = RenderSettings {
            render_uvs: true,
            ..Default::default()
        };
        let uniform = ModelUniform::new(&settings, &camera());
        let expected: [[f32; 4]; 4] = uv_projection().into();
        assert_eq!(uniform.mvp, expected);

        // origin maps to the centre, +v maps downwards
        let projection = uv_projection();
        let origin = projection * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!((origin.x, origin.y), (0.0, 0.0));
        let down = projection * Vector4::new(0.0, 1.0, 0.0, 1.0);
        assert!(down.y < 0.0);
        assert!(projection.invert().is_some());
    }

    #[test]
    fn toggles_and_modes_are_packed() {
        let settings = RenderSettings {
            shading_mode: ShadingMode::Roughness,
            transition_effect: TransitionEffect::Gold,
            transition_factor: 3.5,
            enable_specular: false,
            enable_wireframe: true,
            render_channels: [1.0, 0.0, 0.0, 1.0],
            ..Default::default()
        };
        let uniform = ModelUniform::new(&settings, &camera());
        assert_eq!(uniform.render_mode, 7);
        assert_eq!(uniform.transition_effect, 2);
        assert_eq!(uniform.transition_factor, 1.0);
        assert_eq!(uniform.render_diffuse, 1);
        assert_eq!(uniform.render_specular, 0);
        assert_eq!(uniform.render_wireframe, 1);
        assert_eq!(uniform.render_channels, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn negative_transition_factor_is_clamped() {
        let settings = RenderSettings {
            transition_factor: -1.0,
            ..Default::default()
        };
        assert_eq!(ModelUniform::new(&settings, &camera()).transition_factor, 0.0);
    }
}
