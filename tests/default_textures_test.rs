#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod default_textures {
    use rig_viewer::{RenderContext, ViewerConfig, resources::default_textures::SPECULAR_PBR, wgpu};

    use crate::common::test_utils::{fixture_assets, headless_context};

    #[tokio::test]
    async fn should_load_every_default_texture() {
        let assets = fixture_assets();
        let ctx = headless_context(ViewerConfig::with_asset_root(assets.path())).await;
        let defaults = &ctx.defaults;
        assert_eq!(defaults.uv_pattern.texture.width(), 4);
        assert_eq!(defaults.black_cube.texture.width(), 8);
        assert_eq!(defaults.black_cube.texture.depth_or_array_layers(), 6);
        assert_eq!(defaults.diffuse_pbr.texture.width(), 128);
        assert_eq!(defaults.diffuse_pbr.texture.mip_level_count(), 1);
        assert_eq!(defaults.specular_pbr.texture.width(), 512);
        assert_eq!(defaults.specular_pbr.texture.mip_level_count(), SPECULAR_PBR.mip_count);

        let bc = ctx.device.features().contains(wgpu::Features::TEXTURE_COMPRESSION_BC);
        let expected = if bc {
            wgpu::TextureFormat::Bc1RgbaUnorm
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        assert_eq!(defaults.specular_pbr.texture.format(), expected);
    }

    async fn expect_load_failure(missing: &str) {
        let assets = fixture_assets();
        std::fs::remove_file(assets.path().join("DefaultTextures").join(missing)).unwrap();
        let err = match RenderContext::headless(ViewerConfig::with_asset_root(assets.path())).await {
            Ok(_) => panic!("construction must fail without {}", missing),
            Err(err) => format!("{:#}", err),
        };
        assert!(err.contains(missing), "{}", err);
    }

    #[tokio::test]
    async fn should_fail_on_a_missing_blob() {
        expect_load_failure("specularSdr49.bin").await;
    }

    #[tokio::test]
    async fn should_fail_on_a_missing_texture() {
        expect_load_failure("default_Params.tif").await;
    }

    #[tokio::test]
    async fn should_fail_on_a_truncated_blob() {
        let assets = fixture_assets();
        std::fs::write(assets.path().join("DefaultTextures").join("diffuseSdr20.bin"), [0u8; 8]).unwrap();
        let Err(err) = RenderContext::headless(ViewerConfig::with_asset_root(assets.path())).await else {
            panic!("construction must fail with a truncated blob");
        };
        assert!(format!("{:#}", err).contains("diffuseSdr20.bin"));
    }
}
