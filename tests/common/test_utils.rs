use std::path::{Path, PathBuf};

use cgmath::{Deg, Vector4};
use fs_extra::dir::CopyOptions;
use image::{Rgba, RgbaImage};
use rig_viewer::{
    RenderContext, Renderable, ViewerConfig,
    camera::{Camera, Projection},
    capture::capture,
    data_structures::model::{Mesh, Model, ModelVertex},
    resources::default_textures::{CubeBlobs, DIFFUSE_PBR, SPECULAR_PBR, bc1_size, blob_name, mip_extent},
};

pub(crate) const SIZE: u32 = 64;
pub(crate) const PATTERN_COLOUR: [u8; 4] = [255, 0, 0, 255];

fn save(dir: &Path, file: &str, width: u32, height: u32, rgba: [u8; 4]) {
    RgbaImage::from_pixel(width, height, Rgba(rgba))
        .save(dir.join(file))
        .unwrap();
}

fn write_cube(dir: &Path, blobs: CubeBlobs) {
    for face in 0..6 {
        for mip in 0..blobs.mip_count {
            let extent = mip_extent(blobs.face_size, mip);
            // all-zero BC1 blocks decode to opaque black
            std::fs::write(
                dir.join(blob_name(blobs.kind, face, mip)),
                vec![0u8; bc1_size(extent, extent)],
            )
            .unwrap();
        }
    }
}

/// An asset root with the shipped shaders and a minimal default texture set.
pub(crate) fn fixture_assets() -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    let mut options = CopyOptions::new();
    options.overwrite = true;
    let shaders = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets").join("Shaders");
    fs_extra::copy_items(&[shaders], root.path(), &options).unwrap();

    let textures = root.path().join("DefaultTextures");
    std::fs::create_dir_all(&textures).unwrap();
    save(&textures, "UVPattern.png", 4, 4, PATTERN_COLOUR);
    save(&textures, "default_White.png", 2, 2, [255, 255, 255, 255]);
    save(&textures, "default_Params.tif", 2, 2, [0, 255, 255, 128]);
    save(&textures, "default_normal.png", 2, 2, [128, 128, 255, 255]);
    save(&textures, "default_black.png", 2, 2, [0, 0, 0, 255]);
    save(&textures, "ibl_brdf_lut.png", 4, 4, [0, 0, 0, 255]);
    save(&textures, "default_cube_black.png", 2, 2, [0, 0, 0, 255]);
    write_cube(&textures, DIFFUSE_PBR);
    write_cube(&textures, SPECULAR_PBR);
    root
}

/// A headless context over the fixture assets. The integration tests are
/// only built with `integration-tests`, which requires a usable adapter.
pub(crate) async fn headless_context(config: ViewerConfig) -> RenderContext {
    rig_viewer::init_logging();
    RenderContext::headless(config)
        .await
        .expect("integration tests need a wgpu adapter")
}

pub(crate) fn camera() -> Camera {
    Camera::new(
        (0.0, 0.0, 3.0),
        Deg(-90.0),
        Deg(0.0),
        Projection::new(SIZE, SIZE, Deg(45.0), 0.1, 100.0),
    )
}

/// A 2x2 quad at z = 0 facing +z, fully weighted to bone 0.
pub(crate) fn quad_model(ctx: &RenderContext) -> Model {
    let corners = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
    let vertices: Vec<ModelVertex> = corners
        .iter()
        .map(|&[x, y]| ModelVertex {
            position: [x, y, 0.0],
            normal: [0.0, 0.0, 1.0],
            tangent: [1.0, 0.0, 0.0, 1.0],
            tex_coords: [(x + 1.0) / 2.0, (1.0 - y) / 2.0],
            color: [1.0; 4],
            bone_indices: [0; 4],
            bone_weights: [1.0, 0.0, 0.0, 0.0],
        })
        .collect();
    let mesh = Mesh::new(&ctx.device, "quad", &vertices, &[0, 1, 2, 0, 2, 3], 0);
    // no materials: the mesh falls back to the default material
    Model::new(ctx, vec![mesh], vec![], Vector4::new(0.0, 0.0, 0.0, 2.0f32.sqrt()))
}

pub(crate) async fn render(
    ctx: &RenderContext,
    renderables: &mut [&mut dyn Renderable],
) -> anyhow::Result<RgbaImage> {
    capture(ctx, SIZE, SIZE, renderables, &camera()).await
}

pub(crate) fn centre(img: &RgbaImage) -> [u8; 4] {
    img.get_pixel(img.width() / 2, img.height() / 2).0
}

pub(crate) fn corner(img: &RgbaImage) -> [u8; 4] {
    img.get_pixel(0, 0).0
}

pub(crate) fn assert_close(actual: [u8; 4], expected: [u8; 4], tolerance: u8) {
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!(
            a.abs_diff(*e) <= tolerance,
            "pixel {:?} differs from {:?}",
            actual,
            expected
        );
    }
}
