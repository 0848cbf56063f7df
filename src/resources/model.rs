//! glTF models: meshes, materials and the first skin.
//!
//! Materials are converted to the viewer's texture set. The glTF
//! metallic-roughness and occlusion maps are repacked into one params map
//! (r metalness, g roughness, b ambient occlusion, a specular).

use std::{borrow::Cow, collections::HashMap, path::Path};

use anyhow::{Context as _, bail};
use cgmath::{Matrix, Matrix3, Matrix4, Quaternion, SquareMatrix, Vector3, Vector4};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops::FilterType};

use crate::{
    context::RenderContext,
    data_structures::{
        model::{Material, Mesh, Model, ModelVertex, bounding_sphere},
        skeleton::{Bone, Skeleton},
        texture::{SamplerKind, Texture},
        transform::Transform,
    },
    resources::texture::{load_binary, load_image},
};

/// Specular value used when the material has none (0.5 maps to an F0 of 0.04).
const DEFAULT_SPECULAR: u8 = 128;

/// Builds a params map from the glTF metallic-roughness (b metal, g rough)
/// and occlusion (r) maps. Missing maps fall back to the factors alone.
pub fn pack_prm(
    metal_rough: Option<&RgbaImage>,
    occlusion: Option<&RgbaImage>,
    metallic_factor: f32,
    roughness_factor: f32,
) -> RgbaImage {
    let (width, height) = metal_rough
        .or(occlusion)
        .map(|img| img.dimensions())
        .unwrap_or((1, 1));
    let occlusion = occlusion.map(|img| {
        if img.dimensions() == (width, height) {
            Cow::Borrowed(img)
        } else {
            Cow::Owned(image::imageops::resize(img, width, height, FilterType::Triangle))
        }
    });
    let metallic_factor = metallic_factor.clamp(0.0, 1.0);
    let roughness_factor = roughness_factor.clamp(0.0, 1.0);

    RgbaImage::from_fn(width, height, |x, y| {
        let (metal, rough) = match metal_rough {
            Some(img) => {
                let texel = img.get_pixel(x, y);
                (texel[2] as f32, texel[1] as f32)
            }
            None => (255.0, 255.0),
        };
        let ambient_occlusion = occlusion.as_ref().map_or(255, |img| img.get_pixel(x, y)[0]);
        Rgba([
            (metal * metallic_factor).round() as u8,
            (rough * roughness_factor).round() as u8,
            ambient_occlusion,
            DEFAULT_SPECULAR,
        ])
    })
}

fn factor_to_rgba(factor: [f32; 4]) -> [u8; 4] {
    factor.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

async fn load_buffers(gltf: &gltf::Gltf, base: &Path) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffers.push(blob.to_vec()),
                None => bail!("Buffer {} refers to a missing GLB chunk", buffer.index()),
            },
            gltf::buffer::Source::Uri(uri) => {
                if uri.starts_with("data:") {
                    bail!("Embedded data URIs are not supported (buffer {})", buffer.index());
                }
                buffers.push(load_binary(&base.join(uri)).await?);
            }
        }
    }
    Ok(buffers)
}

async fn load_gltf_image(
    gltf_image: gltf::Image<'_>,
    buffers: &[Vec<u8>],
    base: &Path,
) -> anyhow::Result<DynamicImage> {
    match gltf_image.source() {
        gltf::image::Source::View { view, mime_type } => {
            let buffer = &buffers[view.buffer().index()];
            let bytes = buffer
                .get(view.offset()..view.offset() + view.length())
                .with_context(|| format!("Image {} lies outside its buffer", gltf_image.index()))?;
            let format = mime_type
                .split('/')
                .next_back()
                .and_then(ImageFormat::from_extension);
            let img = match format {
                Some(format) => image::load_from_memory_with_format(bytes, format)?,
                None => image::load_from_memory(bytes)?,
            };
            Ok(img)
        }
        gltf::image::Source::Uri { uri, .. } => {
            if uri.starts_with("data:") {
                bail!("Embedded data URIs are not supported (image {})", gltf_image.index());
            }
            load_image(&base.join(uri)).await
        }
    }
}

async fn load_material(
    ctx: &RenderContext,
    material: gltf::Material<'_>,
    buffers: &[Vec<u8>],
    base: &Path,
) -> anyhow::Result<Material> {
    let name = material.name().unwrap_or("unnamed_material").to_string();
    let device = &ctx.device;
    let queue = &ctx.queue;
    let pbr = material.pbr_metallic_roughness();

    let col = match pbr.base_color_texture() {
        Some(info) => {
            let img = load_gltf_image(info.texture().source(), buffers, base).await?;
            Texture::from_image(device, queue, &img, Some(name.as_str()), false, SamplerKind::Repeat)?
        }
        None => Texture::create_solid(
            device,
            queue,
            factor_to_rgba(pbr.base_color_factor()),
            1,
            1,
            &name,
        ),
    };

    let nor = match material.normal_texture() {
        Some(info) => {
            let img = load_gltf_image(info.texture().source(), buffers, base).await?;
            Some(Texture::from_image(device, queue, &img, Some(name.as_str()), true, SamplerKind::Repeat)?)
        }
        None => None,
    };

    let metal_rough = match pbr.metallic_roughness_texture() {
        Some(info) => Some(load_gltf_image(info.texture().source(), buffers, base).await?.to_rgba8()),
        None => None,
    };
    let occlusion = match material.occlusion_texture() {
        Some(info) => Some(load_gltf_image(info.texture().source(), buffers, base).await?.to_rgba8()),
        None => None,
    };
    let prm = pack_prm(
        metal_rough.as_ref(),
        occlusion.as_ref(),
        pbr.metallic_factor(),
        pbr.roughness_factor(),
    );
    let prm = Texture::from_image(
        device,
        queue,
        &DynamicImage::ImageRgba8(prm),
        Some(name.as_str()),
        true,
        SamplerKind::Repeat,
    )?;

    let emissive_factor = material.emissive_factor();
    let emi = match material.emissive_texture() {
        Some(info) => {
            let img = load_gltf_image(info.texture().source(), buffers, base).await?;
            Some(Texture::from_image(device, queue, &img, Some(name.as_str()), false, SamplerKind::Repeat)?)
        }
        None if emissive_factor != [0.0; 3] => {
            let [r, g, b] = emissive_factor;
            Some(Texture::create_solid(device, queue, factor_to_rgba([r, g, b, 1.0]), 1, 1, &name))
        }
        None => None,
    };

    let defaults = &ctx.defaults;
    Ok(Material::new(
        device,
        &ctx.layouts.material,
        &name,
        &col,
        nor.as_ref().unwrap_or(&defaults.default_normal),
        &prm,
        emi.as_ref().unwrap_or(&defaults.default_black),
    ))
}

fn node_transform(node: &gltf::Node<'_>) -> Transform {
    let (translation, rotation, scale) = node.transform().decomposed();
    Transform {
        translation: translation.into(),
        rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    }
}

/// Every node of the scene with its model-space matrix.
fn flatten_scene<'a>(scene: gltf::Scene<'a>) -> Vec<(gltf::Node<'a>, Matrix4<f32>)> {
    let mut nodes = Vec::new();
    let mut stack: Vec<(gltf::Node<'a>, Matrix4<f32>)> =
        scene.nodes().map(|node| (node, Matrix4::identity())).collect();
    while let Some((node, parent)) = stack.pop() {
        let world = parent * node_transform(&node).to_matrix();
        stack.extend(node.children().map(|child| (child, world)));
        nodes.push((node, world));
    }
    nodes
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[Vec<u8>],
    world: Option<Matrix4<f32>>,
) -> Option<(Vec<ModelVertex>, Vec<u32>)> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let positions = reader.read_positions()?;
    let mut vertices: Vec<ModelVertex> = positions
        .map(|position| ModelVertex {
            position,
            tangent: [1.0, 0.0, 0.0, 1.0],
            color: [1.0; 4],
            ..Default::default()
        })
        .collect();

    if let Some(normals) = reader.read_normals() {
        vertices.iter_mut().zip(normals).for_each(|(v, n)| v.normal = n);
    }
    if let Some(tangents) = reader.read_tangents() {
        vertices.iter_mut().zip(tangents).for_each(|(v, t)| v.tangent = t);
    }
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        vertices
            .iter_mut()
            .zip(tex_coords.into_f32())
            .for_each(|(v, uv)| v.tex_coords = uv);
    }
    if let Some(colors) = reader.read_colors(0) {
        vertices
            .iter_mut()
            .zip(colors.into_rgba_f32())
            .for_each(|(v, c)| v.color = c);
    }
    if let Some(joints) = reader.read_joints(0) {
        vertices
            .iter_mut()
            .zip(joints.into_u16())
            .for_each(|(v, j)| v.bone_indices = j.map(u32::from));
    }
    if let Some(weights) = reader.read_weights(0) {
        vertices
            .iter_mut()
            .zip(weights.into_f32())
            .for_each(|(v, w)| v.bone_weights = w);
    }

    if let Some(world) = world {
        let normal_matrix = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate())
            .invert()
            .map(|m| m.transpose())
            .unwrap_or_else(Matrix3::identity);
        for v in &mut vertices {
            let p = world * Vector4::new(v.position[0], v.position[1], v.position[2], 1.0);
            v.position = p.truncate().into();
            v.normal = (normal_matrix * Vector3::from(v.normal)).into();
            let t = world * Vector4::new(v.tangent[0], v.tangent[1], v.tangent[2], 0.0);
            v.tangent = [t.x, t.y, t.z, v.tangent[3]];
        }
    }

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    Some((vertices, indices))
}

/// Parent node index of every node that is some node's child.
fn node_parents(document: &gltf::Document) -> HashMap<usize, usize> {
    let mut parents = HashMap::new();
    for node in document.nodes() {
        for child in node.children() {
            parents.insert(child.index(), node.index());
        }
    }
    parents
}

/// The joints of `skin` as bones. Each bone's parent is its nearest joint
/// ancestor; the transforms of non-joint nodes in between (an armature node,
/// for example) are folded into the bone's local pose.
fn read_skeleton(
    document: &gltf::Document,
    skin: gltf::Skin<'_>,
    buffers: &[Vec<u8>],
) -> anyhow::Result<Skeleton> {
    let nodes: Vec<gltf::Node<'_>> = document.nodes().collect();
    let node_parents = node_parents(document);
    let joints: Vec<gltf::Node<'_>> = skin.joints().collect();
    let joint_of_node: HashMap<usize, usize> = joints
        .iter()
        .enumerate()
        .map(|(joint, node)| (node.index(), joint))
        .collect();

    let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let mut inverse_binds: Vec<Matrix4<f32>> = reader
        .read_inverse_bind_matrices()
        .map(|matrices| matrices.map(Matrix4::from).collect())
        .unwrap_or_default();
    inverse_binds.resize(joints.len(), Matrix4::identity());

    let mut bones = Vec::with_capacity(joints.len());
    for (node, inverse_bind) in joints.iter().zip(inverse_binds) {
        let mut local = node_transform(node);
        let mut parent = None;
        let mut ancestor = node_parents.get(&node.index()).copied();
        let mut steps = 0;
        while let Some(idx) = ancestor {
            if let Some(&joint) = joint_of_node.get(&idx) {
                parent = Some(joint);
                break;
            }
            steps += 1;
            if steps > nodes.len() {
                bail!("Node {} is part of a parent cycle", node.index());
            }
            if let Some(ancestor_node) = nodes.get(idx) {
                local = &node_transform(ancestor_node) * &local;
            }
            ancestor = node_parents.get(&idx).copied();
        }
        bones.push(Bone {
            name: node
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("joint_{}", node.index())),
            parent,
            local,
            inverse_bind,
        });
    }
    Skeleton::new(bones)
}

/// Loads a `.gltf` or `.glb` file. Returns the skeleton of the first skin, if any.
///
/// Skinned meshes stay in bind pose model space; other meshes are baked with
/// their node transforms.
pub async fn load_model_gltf(
    ctx: &RenderContext,
    path: &Path,
) -> anyhow::Result<(Model, Option<Skeleton>)> {
    let data = load_binary(path).await?;
    let gltf = gltf::Gltf::from_slice(&data)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let base = path.parent().unwrap_or(Path::new("."));
    let buffers = load_buffers(&gltf, base).await?;

    let mut materials = Vec::new();
    for material in gltf.materials() {
        materials.push(load_material(ctx, material, &buffers, base).await?);
    }

    let Some(scene) = gltf.default_scene().or_else(|| gltf.scenes().next()) else {
        bail!("{} contains no scene", path.display());
    };
    let mut meshes = Vec::new();
    let mut positions: Vec<[f32; 3]> = Vec::new();
    for (node, world) in flatten_scene(scene) {
        let Some(mesh) = node.mesh() else {
            continue;
        };
        let bake = node.skin().is_none().then_some(world);
        let name = mesh.name().unwrap_or("unnamed_mesh");
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!("Skipping {:?} primitive of mesh {}", primitive.mode(), name);
                continue;
            }
            let Some((vertices, indices)) = read_primitive(&primitive, &buffers, bake) else {
                log::warn!("Mesh {} has a primitive without positions", name);
                continue;
            };
            positions.extend(vertices.iter().map(|v| v.position));
            // primitives without a material use the context's default material
            let material = primitive.material().index().unwrap_or(materials.len());
            meshes.push(Mesh::new(&ctx.device, name, &vertices, &indices, material));
        }
    }

    let skeleton = match gltf.skins().next() {
        Some(skin) => Some(read_skeleton(&gltf, skin, &buffers)?),
        None => None,
    };
    log::info!(
        "Loaded {}: {} meshes, {} materials, {} bones",
        path.display(),
        meshes.len(),
        materials.len(),
        skeleton.as_ref().map_or(0, Skeleton::len)
    );

    let sphere = bounding_sphere(positions.iter());
    Ok((Model::new(ctx, meshes, materials, sphere), skeleton))
}
