use std::path::Path;

use anyhow::Context as _;

use crate::data_structures::texture::{SamplerKind, Texture};

pub async fn load_string(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

pub async fn load_binary(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Decodes an image file into a 2D texture. The file extension picks the decoder.
pub async fn load_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
    linear: bool,
    sampler: SamplerKind,
) -> anyhow::Result<Texture> {
    let data = load_binary(path).await?;
    let label = path.display().to_string();
    let extension = path.extension().and_then(|ext| ext.to_str());
    Texture::from_bytes(device, queue, &data, &label, extension, linear, sampler)
        .with_context(|| format!("Failed to decode {}", path.display()))
}

pub async fn load_image(path: &Path) -> anyhow::Result<image::DynamicImage> {
    let data = load_binary(path).await?;
    image::load_from_memory(&data).with_context(|| format!("Failed to decode {}", path.display()))
}
