//! Placeholder textures and the pre-baked image based lighting cubes.
//!
//! Everything here is loaded once when the render context is created and
//! never changes afterwards. A missing or malformed file aborts the load.
//!
//! The IBL cubes are stored as raw BC1 (DXT1) blobs, one file per face and
//! mip level, named `<kind><face><mip>.bin`.

use std::path::Path;

use anyhow::{Context as _, bail};

use crate::{
    data_structures::{
        model::Material,
        texture::{SamplerKind, Texture},
    },
    pipelines::layouts::Layouts,
    resources::texture::{load_binary, load_image, load_texture},
};

/// Bytes per 4x4 BC1 block.
const BC1_BLOCK_SIZE: usize = 8;
const BLACK_CUBE_FACE_SIZE: u32 = 8;

/// Where to find one cube map's blobs and how large it is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CubeBlobs {
    pub kind: &'static str,
    pub face_size: u32,
    pub mip_count: u32,
}

pub const DIFFUSE_PBR: CubeBlobs = CubeBlobs {
    kind: "diffuseSdr",
    face_size: 128,
    mip_count: 1,
};

pub const SPECULAR_PBR: CubeBlobs = CubeBlobs {
    kind: "specularSdr",
    face_size: 512,
    mip_count: 10,
};

pub fn blob_name(kind: &str, face: u32, mip: u32) -> String {
    format!("{kind}{face}{mip}.bin")
}

/// Edge length of `mip` for a level 0 edge of `size`.
pub fn mip_extent(size: u32, mip: u32) -> u32 {
    (size >> mip).max(1)
}

/// Size of a BC1 image; partial blocks at the edges still take a full block.
pub fn bc1_size(width: u32, height: u32) -> usize {
    width.div_ceil(4) as usize * height.div_ceil(4) as usize * BC1_BLOCK_SIZE
}

fn rgb565(color: u16) -> [u8; 3] {
    let r = ((color >> 11) & 0x1f) as u8;
    let g = ((color >> 5) & 0x3f) as u8;
    let b = (color & 0x1f) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

fn blend(a: [u8; 3], b: [u8; 3], wa: u16, wb: u16) -> [u8; 4] {
    let mix = |x: u8, y: u8| ((x as u16 * wa + y as u16 * wb) / (wa + wb)) as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2]), 255]
}

/// Decodes a BC1 image into tightly packed RGBA8.
pub fn decode_bc1(data: &[u8], width: u32, height: u32) -> anyhow::Result<Vec<u8>> {
    let expected = bc1_size(width, height);
    if data.len() != expected {
        bail!(
            "BC1 data for {}x{} must be {} bytes, got {}",
            width,
            height,
            expected,
            data.len()
        );
    }
    let (width, height) = (width as usize, height as usize);
    let blocks_x = width.div_ceil(4);
    let mut rgba = vec![0u8; width * height * 4];

    for (block_idx, block) in data.chunks_exact(BC1_BLOCK_SIZE).enumerate() {
        let c0 = u16::from_le_bytes([block[0], block[1]]);
        let c1 = u16::from_le_bytes([block[2], block[3]]);
        let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);
        let (a, b) = (rgb565(c0), rgb565(c1));
        let palette = if c0 > c1 {
            [
                [a[0], a[1], a[2], 255],
                [b[0], b[1], b[2], 255],
                blend(a, b, 2, 1),
                blend(a, b, 1, 2),
            ]
        } else {
            [
                [a[0], a[1], a[2], 255],
                [b[0], b[1], b[2], 255],
                blend(a, b, 1, 1),
                [0, 0, 0, 0],
            ]
        };

        let origin_x = (block_idx % blocks_x) * 4;
        let origin_y = (block_idx / blocks_x) * 4;
        for texel in 0..16 {
            let (x, y) = (origin_x + texel % 4, origin_y + texel / 4);
            if x >= width || y >= height {
                continue;
            }
            let color = palette[((indices >> (2 * texel)) & 0b11) as usize];
            let offset = (y * width + x) * 4;
            rgba[offset..offset + 4].copy_from_slice(&color);
        }
    }
    Ok(rgba)
}

/// Reads every blob of `blobs` from `dir` into one layer-major buffer
/// (all mips of face 0, then face 1, ...), checking each blob's size.
///
/// With `decode` the blobs are expanded to RGBA8 for devices without BC
/// texture support.
pub async fn load_cube_blobs(dir: &Path, blobs: CubeBlobs, decode: bool) -> anyhow::Result<Vec<u8>> {
    let mut data = Vec::new();
    for face in 0..Texture::CUBE_FACES {
        for mip in 0..blobs.mip_count {
            let path = dir.join(blob_name(blobs.kind, face, mip));
            let blob = load_binary(&path).await?;
            let extent = mip_extent(blobs.face_size, mip);
            let expected = bc1_size(extent, extent);
            if blob.len() != expected {
                bail!(
                    "{} has {} bytes, expected {} for a {}x{} BC1 mip",
                    path.display(),
                    blob.len(),
                    expected,
                    extent,
                    extent
                );
            }
            if decode {
                data.extend(decode_bc1(&blob, extent, extent)?);
            } else {
                data.extend(blob);
            }
        }
    }
    Ok(data)
}

async fn load_2d(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    dir: &Path,
    file: &str,
    linear: bool,
    sampler: SamplerKind,
) -> anyhow::Result<Texture> {
    load_texture(device, queue, &dir.join(file), linear, sampler).await
}

async fn load_ibl_cube(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    dir: &Path,
    blobs: CubeBlobs,
    sampler: SamplerKind,
) -> anyhow::Result<Texture> {
    let compressed = device
        .features()
        .contains(wgpu::Features::TEXTURE_COMPRESSION_BC);
    if !compressed {
        log::warn!("{}: no BC texture support, decoding on the CPU", blobs.kind);
    }
    let data = load_cube_blobs(dir, blobs, !compressed).await?;
    let format = if compressed {
        wgpu::TextureFormat::Bc1RgbaUnorm
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    };
    Ok(Texture::cube_from_layer_major(
        device,
        queue,
        &data,
        blobs.face_size,
        blobs.mip_count,
        format,
        sampler,
        blobs.kind,
    ))
}

pub struct DefaultTextures {
    pub uv_pattern: Texture,
    pub default_white: Texture,
    pub default_prm: Texture,
    pub default_normal: Texture,
    pub default_black: Texture,
    pub ibl_lut: Texture,
    pub black_cube: Texture,
    pub diffuse_pbr: Texture,
    pub specular_pbr: Texture,
    /// Group 1 of every model program.
    pub environment: wgpu::BindGroup,
    /// Bound for meshes whose material index has no material.
    pub default_material: Material,
}

impl DefaultTextures {
    pub async fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &Layouts,
        dir: &Path,
    ) -> anyhow::Result<Self> {
        log::warn!("Loading default textures from {}", dir.display());
        let uv_pattern = load_2d(device, queue, dir, "UVPattern.png", false, SamplerKind::Repeat).await?;
        let default_white =
            load_2d(device, queue, dir, "default_White.png", false, SamplerKind::Repeat).await?;
        let default_prm =
            load_2d(device, queue, dir, "default_Params.tif", true, SamplerKind::Repeat).await?;
        let default_normal =
            load_2d(device, queue, dir, "default_normal.png", true, SamplerKind::Repeat).await?;
        let default_black =
            load_2d(device, queue, dir, "default_black.png", false, SamplerKind::Repeat).await?;
        let ibl_lut =
            load_2d(device, queue, dir, "ibl_brdf_lut.png", true, SamplerKind::ClampToEdge).await?;
        let black_cube_image = load_image(&dir.join("default_cube_black.png")).await?;
        let black_cube = Texture::cube_from_image(
            device,
            queue,
            &black_cube_image,
            BLACK_CUBE_FACE_SIZE,
            "default_cube_black",
        );
        let diffuse_pbr = load_ibl_cube(device, queue, dir, DIFFUSE_PBR, SamplerKind::ClampNoMips)
            .await
            .context("Failed to load the diffuse IBL cube")?;
        let specular_pbr = load_ibl_cube(device, queue, dir, SPECULAR_PBR, SamplerKind::ClampToEdge)
            .await
            .context("Failed to load the specular IBL cube")?;

        let environment = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.environment,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_pbr.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&specular_pbr.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&ibl_lut.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&uv_pattern.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&specular_pbr.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&uv_pattern.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::Sampler(&diffuse_pbr.sampler),
                },
            ],
            label: Some("environment_bind_group"),
        });
        let default_material = Material::new(
            device,
            &layouts.material,
            "default_material",
            &default_white,
            &default_normal,
            &default_prm,
            &default_black,
        );
        log::info!("Default textures loaded");

        Ok(Self {
            uv_pattern,
            default_white,
            default_prm,
            default_normal,
            default_black,
            ibl_lut,
            black_cube,
            diffuse_pbr,
            specular_pbr,
            environment,
            default_material,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_cube(dir: &Path, blobs: CubeBlobs) {
        for face in 0..Texture::CUBE_FACES {
            for mip in 0..blobs.mip_count {
                let extent = mip_extent(blobs.face_size, mip);
                std::fs::write(
                    dir.join(blob_name(blobs.kind, face, mip)),
                    vec![0u8; bc1_size(extent, extent)],
                )
                .unwrap();
            }
        }
    }

    #[test]
    fn blob_names_have_no_separator() {
        assert_eq!(blob_name("diffuseSdr", 0, 0), "diffuseSdr00.bin");
        assert_eq!(blob_name("specularSdr", 5, 9), "specularSdr59.bin");
    }

    #[test]
    fn bc1_sizes_round_up_to_blocks() {
        assert_eq!(bc1_size(128, 128), 32 * 32 * 8);
        assert_eq!(bc1_size(2, 2), 8);
        assert_eq!(bc1_size(1, 1), 8);
        assert_eq!(bc1_size(5, 4), 16);
    }

    #[test]
    fn specular_chain_ends_at_one_texel() {
        assert_eq!(mip_extent(SPECULAR_PBR.face_size, 0), 512);
        assert_eq!(mip_extent(SPECULAR_PBR.face_size, SPECULAR_PBR.mip_count - 1), 1);
        assert_eq!(mip_extent(4, 7), 1);
    }

    #[test]
    fn decodes_opaque_block() {
        // c0 = pure red, c1 = pure blue, texel 0 uses c0, texel 1 uses c1,
        // texel 2 the 2/3 blend, texel 3 the 1/3 blend, the rest c0
        let block = [0x00, 0xf8, 0x1f, 0x00, 0b1110_0100, 0, 0, 0];
        let rgba = decode_bc1(&block, 4, 4).unwrap();
        assert_eq!(rgba.len(), 64);
        assert_eq!(&rgba[0..4], &[255, 0, 0, 255]);
        assert_eq!(&rgba[4..8], &[0, 0, 255, 255]);
        assert_eq!(&rgba[8..12], &[170, 0, 85, 255]);
        assert_eq!(&rgba[12..16], &[85, 0, 170, 255]);
        assert_eq!(&rgba[60..64], &[255, 0, 0, 255]);
    }

    #[test]
    fn decodes_punch_through_alpha() {
        // c0 <= c1 switches to three colours plus transparent black
        let block = [0x00, 0x00, 0xff, 0xff, 0b1111_1110, 0, 0, 0];
        let rgba = decode_bc1(&block, 4, 4).unwrap();
        assert_eq!(&rgba[0..4], &[127, 127, 127, 255]);
        assert_eq!(&rgba[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn small_mips_crop_their_block() {
        let block = [0xff, 0xff, 0x00, 0x00, 0, 0, 0, 0];
        let rgba = decode_bc1(&block, 1, 1).unwrap();
        assert_eq!(rgba, vec![255, 255, 255, 255]);
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(decode_bc1(&[0u8; 7], 4, 4).is_err());
    }

    #[tokio::test]
    async fn loads_layer_major_chain() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = CubeBlobs {
            kind: "testCube",
            face_size: 8,
            mip_count: 4,
        };
        write_cube(dir.path(), blobs);

        let compressed = load_cube_blobs(dir.path(), blobs, false).await.unwrap();
        // 8x8 is four blocks, every smaller mip is a single block
        let per_face = bc1_size(8, 8) + 3 * 8;
        assert_eq!(compressed.len(), 6 * per_face);

        let decoded = load_cube_blobs(dir.path(), blobs, true).await.unwrap();
        let per_face = (8 * 8 + 4 * 4 + 2 * 2 + 1) * 4;
        assert_eq!(decoded.len(), 6 * per_face);
    }

    #[tokio::test]
    async fn truncated_blob_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write_cube(dir.path(), DIFFUSE_PBR);
        std::fs::write(dir.path().join("diffuseSdr30.bin"), [0u8; 16]).unwrap();
        let err = load_cube_blobs(dir.path(), DIFFUSE_PBR, false)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("diffuseSdr30.bin"));
    }

    #[tokio::test]
    async fn missing_blob_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_cube_blobs(dir.path(), DIFFUSE_PBR, false)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("diffuseSdr00.bin"));
    }
}
