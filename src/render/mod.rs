//! Drawing into an already begun render pass.
//!
//! Both renderers follow the same contract: build whatever program they need
//! on first use through the [`RenderContext`], upload their uniforms and
//! record draw calls. A program that failed to link is skipped without an
//! error; only a missing shader source fails the call.

pub mod model;
pub mod texture;

use crate::{camera::Camera, context::RenderContext};

pub trait Renderable {
    fn render(
        &mut self,
        ctx: &RenderContext,
        pass: &mut wgpu::RenderPass<'_>,
        camera: &Camera,
    ) -> anyhow::Result<()>;
}
