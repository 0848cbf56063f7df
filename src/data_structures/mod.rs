//! Viewer data structures: models, skeletons, textures and transforms.
//!
//! - `model` contains mesh, material and model definitions with their GPU buffers
//! - `skeleton` holds bone hierarchies and the bone palette uploaded for skinning
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `transform` holds decomposed translation / rotation / scale transforms

pub mod model;
pub mod skeleton;
pub mod texture;
pub mod transform;
