#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod model_render {
    use cgmath::{Matrix4, SquareMatrix, Vector3, Vector4};
    use rig_viewer::{
        ViewerConfig,
        data_structures::{
            model::{Mesh, Model},
            skeleton::{Bone, Skeleton},
            transform::Transform,
        },
        pipelines::shader::ProgramKind,
        render::model::Posed,
        settings::{ShaderVariant, ShadingMode},
        wgpu,
    };

    use crate::common::test_utils::{
        PATTERN_COLOUR, assert_close, centre, corner, fixture_assets, headless_context, quad_model, render,
    };

    fn skeleton(offset: [f32; 3]) -> Skeleton {
        Skeleton::new(vec![Bone {
            name: "root".to_string(),
            parent: None,
            local: Transform::from(Vector3::from(offset)),
            inverse_bind: Matrix4::identity(),
        }])
        .unwrap()
    }

    #[tokio::test]
    async fn should_draw_the_model_over_the_clear_colour() {
        let assets = fixture_assets();
        let mut ctx = headless_context(ViewerConfig::with_asset_root(assets.path())).await;
        ctx.clear_colour = wgpu::Color::WHITE;
        let mut model = quad_model(&ctx);

        // black environment lighting leaves the lit quad dark
        let img = render(&ctx, &mut [&mut model]).await.unwrap();
        assert_close(centre(&img), [0, 0, 0, 255], 8);
        assert_eq!(corner(&img), [255, 255, 255, 255]);
        assert!(ctx.program(ProgramKind::Model(ShaderVariant::Standard)).unwrap().link_status_ok());
    }

    #[tokio::test]
    async fn should_show_base_colour_in_debug_shading() {
        let assets = fixture_assets();
        let mut ctx = headless_context(ViewerConfig::with_asset_root(assets.path())).await;
        ctx.clear_colour = wgpu::Color::BLACK;
        ctx.settings.use_debug_shading = true;
        ctx.settings.shading_mode = ShadingMode::BaseColor;
        let mut model = quad_model(&ctx);

        let img = render(&ctx, &mut [&mut model]).await.unwrap();
        assert_eq!(centre(&img), [255, 255, 255, 255]);
        assert_eq!(corner(&img), [0, 0, 0, 255]);
    }

    #[tokio::test]
    async fn should_mask_render_channels() {
        let assets = fixture_assets();
        let mut ctx = headless_context(ViewerConfig::with_asset_root(assets.path())).await;
        ctx.clear_colour = wgpu::Color::BLACK;
        ctx.settings.use_debug_shading = true;
        ctx.settings.shading_mode = ShadingMode::BaseColor;
        ctx.settings.render_channels = [0.0, 1.0, 0.0, 1.0];
        let mut model = quad_model(&ctx);

        let img = render(&ctx, &mut [&mut model]).await.unwrap();
        assert_eq!(centre(&img), [0, 255, 0, 255]);
    }

    #[tokio::test]
    async fn should_draw_the_uv_layout_with_the_pattern() {
        let assets = fixture_assets();
        let mut ctx = headless_context(ViewerConfig::with_asset_root(assets.path())).await;
        ctx.clear_colour = wgpu::Color::BLACK;
        ctx.settings.render_uvs = true;
        // UV mode wins over debug shading
        ctx.settings.use_debug_shading = true;
        let mut model = quad_model(&ctx);

        let img = render(&ctx, &mut [&mut model]).await.unwrap();
        assert_eq!(centre(&img), PATTERN_COLOUR);
        // the unit UV square covers the middle half of the viewport only
        assert_eq!(corner(&img), [0, 0, 0, 255]);
        assert!(ctx.program(ProgramKind::Model(ShaderVariant::UvDebug)).unwrap().link_status_ok());
    }

    #[tokio::test]
    async fn should_pose_the_model_with_the_latest_skeleton() {
        let assets = fixture_assets();
        let mut ctx = headless_context(ViewerConfig::with_asset_root(assets.path())).await;
        ctx.clear_colour = wgpu::Color::BLACK;
        ctx.settings.use_debug_shading = true;
        ctx.settings.shading_mode = ShadingMode::BaseColor;
        let mut model = quad_model(&ctx);
        let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        assert_eq!(model.bone_palette().matrices()[0], identity);

        // moving the only bone far to the side leaves the centre empty
        let moved = skeleton([10.0, 0.0, 0.0]);
        let img = render(&ctx, &mut [&mut Posed { model: &mut model, skeleton: &moved }])
            .await
            .unwrap();
        assert_eq!(centre(&img), [0, 0, 0, 255]);
        let expected: [[f32; 4]; 4] = Matrix4::from_translation(Vector3::new(10.0, 0.0, 0.0)).into();
        assert_eq!(model.bone_palette().matrices()[0], expected);

        // without a skeleton the last palette stays in place
        let img = render(&ctx, &mut [&mut model]).await.unwrap();
        assert_eq!(centre(&img), [0, 0, 0, 255]);
        assert_eq!(model.bone_palette().matrices()[0], expected);

        let home = skeleton([0.0, 0.0, 0.0]);
        let img = render(&ctx, &mut [&mut Posed { model: &mut model, skeleton: &home }])
            .await
            .unwrap();
        assert_eq!(centre(&img), [255, 255, 255, 255]);
    }

    #[tokio::test]
    async fn should_draw_the_wireframe_overlay() {
        let assets = fixture_assets();
        let mut ctx = headless_context(ViewerConfig::with_asset_root(assets.path())).await;
        ctx.settings.enable_wireframe = true;
        let mut model = quad_model(&ctx);

        render(&ctx, &mut [&mut model]).await.unwrap();
        assert!(ctx.program(ProgramKind::Wireframe { uv_space: false }).unwrap().link_status_ok());
        assert_eq!(model.meshes[0].num_edge_elements, 5 * 2);
    }

    #[tokio::test]
    async fn should_skip_silently_when_linking_fails() {
        let assets = fixture_assets();
        std::fs::write(
            assets.path().join("Shaders").join("model.frag.wgsl"),
            "fn fs_main() -> @location(0) vec4<f32> { return missing; }",
        )
        .unwrap();
        let mut ctx = headless_context(ViewerConfig::with_asset_root(assets.path())).await;
        ctx.clear_colour = wgpu::Color::BLACK;
        let mut model = quad_model(&ctx);

        let img = render(&ctx, &mut [&mut model]).await.unwrap();
        assert_eq!(centre(&img), [0, 0, 0, 255]);
        let program = ctx.program(ProgramKind::Model(ShaderVariant::Standard)).unwrap();
        assert!(!program.link_status_ok());
        assert!(program.error_log().unwrap().contains("missing"));

        // the other variants are unaffected
        ctx.settings.use_debug_shading = true;
        ctx.settings.shading_mode = ShadingMode::BaseColor;
        let img = render(&ctx, &mut [&mut model]).await.unwrap();
        assert_eq!(centre(&img), [255, 255, 255, 255]);
    }

    #[tokio::test]
    async fn should_fail_when_shader_sources_are_missing() {
        let assets = fixture_assets();
        std::fs::remove_file(assets.path().join("Shaders").join("model.vert.wgsl")).unwrap();
        let ctx = headless_context(ViewerConfig::with_asset_root(assets.path())).await;
        let mut model = quad_model(&ctx);

        let err = render(&ctx, &mut [&mut model]).await.unwrap_err();
        assert!(format!("{:#}", err).contains("model.vert.wgsl"));
    }

    #[tokio::test]
    async fn should_build_every_model_variant_on_first_render() {
        let assets = fixture_assets();
        std::fs::remove_file(assets.path().join("Shaders").join("model_uv.vert.wgsl")).unwrap();
        let ctx = headless_context(ViewerConfig::with_asset_root(assets.path())).await;
        assert_eq!(ctx.settings.variant(), ShaderVariant::Standard);
        let mut model = quad_model(&ctx);

        let err = render(&ctx, &mut [&mut model]).await.unwrap_err();
        assert!(format!("{:#}", err).contains("model_uv.vert.wgsl"), "{:#}", err);
    }

    #[tokio::test]
    async fn should_skip_meshes_without_geometry() {
        let assets = fixture_assets();
        let mut ctx = headless_context(ViewerConfig::with_asset_root(assets.path())).await;
        ctx.clear_colour = wgpu::Color::BLACK;
        ctx.settings.enable_wireframe = true;
        let empty = Mesh::new(&ctx.device, "empty", &[], &[], 0);
        let mut model = Model::new(&ctx, vec![empty], vec![], Vector4::new(0.0, 0.0, 0.0, 0.0));

        let img = render(&ctx, &mut [&mut model]).await.unwrap();
        assert_eq!(centre(&img), [0, 0, 0, 255]);
    }
}
