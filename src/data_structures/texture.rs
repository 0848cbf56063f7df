//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources,
//! with helpers for depth targets, solid placeholder colours, decoded images
//! and cube maps assembled from per-face mip chains.

use anyhow::*;
use image::{GenericImageView, ImageFormat, imageops::FilterType, load_from_memory_with_format};
use wgpu::util::DeviceExt;

/// A GPU texture with its default view and the sampler it is meant to be read with.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// How a texture is addressed outside `0..1` and whether its mips are sampled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SamplerKind {
    Repeat,
    ClampToEdge,
    /// Linear min/mag filtering that ignores every mip past the base level.
    ClampNoMips,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Faces of a cube map, in +X, -X, +Y, -Y, +Z, -Z order.
    pub const CUBE_FACES: u32 = 6;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// A `width` x `height` texture filled with one RGBA colour.
    ///
    /// Used for placeholders so pipelines never have to change when a material
    /// slot is empty.
    pub fn create_solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        width: u32,
        height: u32,
        label: &str,
    ) -> Texture {
        let data: Vec<u8> = rgba
            .iter()
            .cycle()
            .take(width as usize * height as usize * 4)
            .copied()
            .collect();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device, SamplerKind::Repeat);
        Texture {
            texture,
            view,
            sampler,
        }
    }

    /// Load a texture from encoded image bytes (PNG, TIFF, ...).
    ///
    /// * `format` is an optional file extension hint (e.g. "png"). If None, auto-detect.
    /// * `linear` selects `Rgba8Unorm` for data textures (normals, params, LUTs)
    ///   instead of `Rgba8UnormSrgb`
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        linear: bool,
        sampler: SamplerKind,
    ) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => load_from_memory_with_format(bytes, fmt)?,
        };
        Self::from_image(device, queue, &img, Some(label), linear, sampler)
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        linear: bool,
        sampler: SamplerKind,
    ) -> Result<Self> {
        let dimensions = img.dimensions();
        let rgba = img.to_rgba8();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let format = if linear {
            wgpu::TextureFormat::Rgba8Unorm
        } else {
            wgpu::TextureFormat::Rgba8UnormSrgb
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device, sampler);

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }

    /// Cube map with the same image on all six faces, resized to `face_size`.
    pub fn cube_from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        face_size: u32,
        label: &str,
    ) -> Texture {
        let face = img
            .resize_exact(face_size, face_size, FilterType::Triangle)
            .to_rgba8();
        let data: Vec<u8> = (0..Self::CUBE_FACES)
            .flat_map(|_| face.as_raw().iter().copied())
            .collect();
        Self::cube_from_layer_major(
            device,
            queue,
            &data,
            face_size,
            1,
            wgpu::TextureFormat::Rgba8Unorm,
            SamplerKind::ClampToEdge,
            label,
        )
    }

    /// Cube map from tightly packed data: every mip of face 0, then every mip
    /// of face 1 and so on. Block-compressed formats are accepted as long as
    /// the device supports them.
    #[allow(clippy::too_many_arguments)]
    pub fn cube_from_layer_major(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        face_size: u32,
        mip_level_count: u32,
        format: wgpu::TextureFormat,
        sampler: SamplerKind,
        label: &str,
    ) -> Texture {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: face_size,
                    height: face_size,
                    depth_or_array_layers: Self::CUBE_FACES,
                },
                mip_level_count,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = create_sampler(device, sampler);
        Texture {
            texture,
            view,
            sampler,
        }
    }
}

pub fn create_sampler(device: &wgpu::Device, kind: SamplerKind) -> wgpu::Sampler {
    let (address_mode, lod_max_clamp) = match kind {
        SamplerKind::Repeat => (wgpu::AddressMode::Repeat, 32.0),
        SamplerKind::ClampToEdge => (wgpu::AddressMode::ClampToEdge, 32.0),
        SamplerKind::ClampNoMips => (wgpu::AddressMode::ClampToEdge, 0.0),
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        lod_min_clamp: 0.0,
        lod_max_clamp,
        ..Default::default()
    })
}
