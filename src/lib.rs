//! rig-viewer
//!
//! A wgpu renderer for asset tools that preview skinned character models.
//! It draws models with image based lighting and a set of debug views, and
//! previews single textures full screen.
//!
//! High-level modules
//! - `camera`: camera and projection producing the model-view-projection matrix
//! - `capture`: offscreen rendering into an image
//! - `context`: the render context that owns device, queue, programs and default textures
//! - `data_structures`: models, skeletons, textures and transforms
//! - `pipelines`: bind group layouts, pipeline builder and shader programs
//! - `render`: the model and texture renderers
//! - `resources`: loading of default textures, IBL blobs and glTF models
//! - `settings`: per-frame render toggles
//!

pub mod camera;
pub mod capture;
pub mod context;
pub mod data_structures;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod settings;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use context::{RenderContext, ViewerConfig, init_logging};
pub use render::Renderable;
pub use settings::RenderSettings;
pub use wgpu;
