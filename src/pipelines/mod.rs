//! Render pipelines: shared bind group layouts, the pipeline builder and
//! the lazily linked shader programs.

pub mod builder;
pub mod layouts;
pub mod shader;
