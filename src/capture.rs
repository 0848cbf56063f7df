//! Offscreen rendering into an [`image::RgbaImage`], for thumbnails and
//! screenshot export.

use std::time::Duration;

use anyhow::{Context as _, bail};
use image::RgbaImage;

use crate::{
    camera::Camera, context::RenderContext, data_structures::texture::Texture, render::Renderable,
};

const READBACK_TIMEOUT: Duration = Duration::from_secs(3);

/// Rows of a texture-to-buffer copy must start on 256 byte boundaries.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drops the row padding and brings BGRA data into RGBA order.
pub fn unpad_rows(data: &[u8], width: u32, height: u32, bgra: bool) -> Vec<u8> {
    let padded = padded_bytes_per_row(width) as usize;
    let unpadded = width as usize * 4;
    let mut pixels = Vec::with_capacity(unpadded * height as usize);
    for row in data.chunks(padded).take(height as usize) {
        pixels.extend_from_slice(&row[..unpadded]);
    }
    if bgra {
        pixels.chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
    }
    pixels
}

/// Renders `renderables` into a `width` x `height` offscreen target and reads
/// the result back.
pub async fn capture(
    ctx: &RenderContext,
    width: u32,
    height: u32,
    renderables: &mut [&mut dyn Renderable],
    camera: &Camera,
) -> anyhow::Result<RgbaImage> {
    let bgra = match ctx.color_format {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => false,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => true,
        other => bail!("Cannot capture {:?} targets", other),
    };
    let (width, height) = (width.max(1), height.max(1));
    let extent = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let target = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Capture Output Texture"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ctx.color_format,
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth = Texture::create_depth_texture(&ctx.device, [width, height], "Capture Depth Texture");
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    ctx.render_frame(&view, &depth.view, renderables, camera)?;

    let bytes_per_row = padded_bytes_per_row(width);
    let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Capture Output Buffer"),
        size: (bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Capture Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &target,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        extent,
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    // the mapping has to be requested before polling
    let buffer_slice = output_buffer.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: Some(READBACK_TIMEOUT),
    })?;
    rx.receive()
        .await
        .context("Capture buffer mapping was dropped")??;

    let pixels = {
        let data = buffer_slice.get_mapped_range();
        unpad_rows(&data, width, height, bgra)
    };
    output_buffer.unmap();
    RgbaImage::from_raw(width, height, pixels).context("Captured pixel data has the wrong size")
}
