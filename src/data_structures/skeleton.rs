//! Bone hierarchies and the fixed-size bone palette uploaded for skinning.

use anyhow::bail;
use cgmath::{Matrix4, SquareMatrix};

use crate::data_structures::transform::Transform;

/// Capacity of the `Bones` uniform block. Must match `MAX_BONES` in `model_common.wgsl`.
pub const MAX_BONES: usize = 200;

#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    /// Pose relative to the parent bone.
    pub local: Transform,
    /// Maps model space into this bone's bind space.
    pub inverse_bind: Matrix4<f32>,
}

/// A bone hierarchy. Bones may be stored in any order; parents are resolved by index.
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl Skeleton {
    /// Fails if a parent index is out of range or the hierarchy contains a cycle.
    pub fn new(bones: Vec<Bone>) -> anyhow::Result<Self> {
        for (idx, bone) in bones.iter().enumerate() {
            let mut steps = 0;
            let mut current = bone.parent;
            while let Some(parent) = current {
                if parent >= bones.len() {
                    bail!(
                        "Bone {} ({}) references parent {} but the skeleton has {} bones",
                        idx,
                        bone.name,
                        parent,
                        bones.len()
                    );
                }
                steps += 1;
                if steps > bones.len() {
                    bail!("Bone {} ({}) is part of a parent cycle", idx, bone.name);
                }
                current = bones[parent].parent;
            }
        }
        Ok(Self { bones })
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }

    /// Returns `false` if `idx` is out of range.
    pub fn set_local_transform(&mut self, idx: usize, transform: Transform) -> bool {
        match self.bones.get_mut(idx) {
            Some(bone) => {
                bone.local = transform;
                true
            }
            None => {
                log::warn!(
                    "Tried to pose bone {} but the skeleton only has {} bones.",
                    idx,
                    self.bones.len()
                );
                false
            }
        }
    }

    /// Model-space transform of every bone, in storage order.
    pub fn world_transforms(&self) -> Vec<Matrix4<f32>> {
        let mut resolved: Vec<Option<Matrix4<f32>>> = vec![None; self.bones.len()];
        for idx in 0..self.bones.len() {
            // Walk up until a resolved ancestor (or the root), then resolve back down.
            let mut chain = vec![idx];
            let mut current = self.bones[idx].parent;
            while let Some(parent) = current {
                if resolved[parent].is_some() {
                    break;
                }
                chain.push(parent);
                current = self.bones[parent].parent;
            }
            for &bone_idx in chain.iter().rev() {
                if resolved[bone_idx].is_some() {
                    continue;
                }
                let local = self.bones[bone_idx].local.to_matrix();
                let world = match self.bones[bone_idx].parent {
                    Some(parent) => resolved[parent].unwrap_or_else(Matrix4::identity) * local,
                    None => local,
                };
                resolved[bone_idx] = Some(world);
            }
        }
        resolved
            .into_iter()
            .map(|world| world.unwrap_or_else(Matrix4::identity))
            .collect()
    }

    /// Skinning matrices: `world * inverse_bind` for every bone.
    pub fn animation_transforms(&self) -> Vec<Matrix4<f32>> {
        self.world_transforms()
            .into_iter()
            .zip(self.bones.iter())
            .map(|(world, bone)| world * bone.inverse_bind)
            .collect()
    }
}

/// Exactly [`MAX_BONES`] column-major matrices, laid out for the `Bones` uniform block.
#[derive(Clone, Debug, PartialEq)]
pub struct BonePalette {
    matrices: Vec<[[f32; 4]; 4]>,
}

impl BonePalette {
    pub fn identity() -> Self {
        Self {
            matrices: vec![Matrix4::<f32>::identity().into(); MAX_BONES],
        }
    }

    /// Pads with identity matrices; bones past [`MAX_BONES`] are dropped.
    pub fn from_matrices(transforms: &[Matrix4<f32>]) -> Self {
        if transforms.len() > MAX_BONES {
            log::warn!(
                "Skeleton has {} bones but only {} fit into the bone buffer. The rest are ignored.",
                transforms.len(),
                MAX_BONES
            );
        }
        let mut palette = Self::identity();
        for (slot, transform) in palette.matrices.iter_mut().zip(transforms.iter()) {
            *slot = (*transform).into();
        }
        palette
    }

    /// Rebuilds the palette from the current pose of `skeleton`. Without a
    /// skeleton the last palette is kept.
    pub fn refresh(&mut self, skeleton: Option<&Skeleton>) {
        if let Some(skeleton) = skeleton {
            *self = Self::from(skeleton);
        }
    }

    pub fn matrices(&self) -> &[[[f32; 4]; 4]] {
        &self.matrices
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.matrices)
    }

    pub const SIZE: wgpu::BufferAddress =
        (MAX_BONES * std::mem::size_of::<[[f32; 4]; 4]>()) as wgpu::BufferAddress;
}

impl Default for BonePalette {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<&Skeleton> for BonePalette {
    fn from(skeleton: &Skeleton) -> Self {
        Self::from_matrices(&skeleton.animation_transforms())
    }
}
