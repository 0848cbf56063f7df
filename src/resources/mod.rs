//! Loading of everything the viewer reads from disk: default textures,
//! image based lighting blobs and glTF models.

pub mod default_textures;
pub mod model;
pub mod texture;

pub use default_textures::DefaultTextures;
pub use model::load_model_gltf;
pub use texture::{load_binary, load_string, load_texture};
