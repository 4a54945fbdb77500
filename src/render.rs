//! Render composition.
//!
//! Flows describe what they want drawn each frame as a [`Render`]. The engine
//! flattens every flow's render into one batch of opaque instanced draws and
//! issues them with the basic pipeline.

use crate::data_structures::model::{DrawModel, Model};

/// A model together with the instance buffer it is drawn with.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
}

/// Specifies how a flow's objects should be rendered.
///
/// - `Defaults(Vec<Instanced>)` renders a batch of opaque instanced objects
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
pub enum Render<'a> {
    Defaults(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    /// Flatten this render into `basics`.
    pub fn collect(self, basics: &mut Vec<Instanced<'a>>) {
        match self {
            Render::Defaults(mut vec) => basics.append(&mut vec),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.collect(basics)),
        }
    }
}

/// Issue one instanced draw per batch entry. The pipeline must already be set.
pub fn draw_instanced(
    render_pass: &mut wgpu::RenderPass<'_>,
    basics: &[Instanced<'_>],
    camera_bind_group: &wgpu::BindGroup,
    light_bind_group: &wgpu::BindGroup,
) {
    for instanced in basics {
        if instanced.amount == 0 || instanced.instance.size() == 0 {
            log::warn!("skipping a render with zero instances");
            continue;
        }
        render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
        render_pass.draw_model_instanced(
            instanced.model,
            0..instanced.amount as u32,
            camera_bind_group,
            light_bind_group,
        );
    }
}
