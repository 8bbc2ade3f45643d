use crate::camera::Camera;
use crate::command::RenderCommand;
use crate::context::RenderContext;
use crate::mesh::Mesh;
use crate::programs::params;
use crate::resource::RasterState;
use crate::shader::ShaderProgram;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Gradient colors of the background.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyColors {
    pub zenith: Vec3,
    pub horizon: Vec3,
    pub ground: Vec3,
}

impl Default for SkyColors {
    fn default() -> Self {
        Self {
            zenith: Vec3::new(0.01, 0.01, 0.04),
            horizon: Vec3::new(0.06, 0.04, 0.12),
            ground: Vec3::new(0.0, 0.0, 0.01),
        }
    }
}

/// Background drawn after opaque geometry, pinned to the far plane.
#[derive(Debug, Clone)]
pub struct Sky {
    mesh: Mesh,
    vertex_program: Rc<ShaderProgram>,
    pixel_program: Rc<ShaderProgram>,
    colors: SkyColors,
}

impl Sky {
    pub fn new(
        mesh: Mesh,
        vertex_program: Rc<ShaderProgram>,
        pixel_program: Rc<ShaderProgram>,
        colors: SkyColors,
    ) -> Self {
        Self {
            mesh,
            vertex_program,
            pixel_program,
            colors,
        }
    }

    pub fn colors(&self) -> SkyColors {
        self.colors
    }

    pub fn set_colors(&mut self, colors: SkyColors) {
        self.colors = colors;
    }

    pub fn draw<C: RenderContext + ?Sized>(&self, ctx: &mut C, camera: &Camera) {
        ctx.record(RenderCommand::SetRasterState(RasterState::Background));

        let vs = &self.vertex_program;
        let ps = &self.pixel_program;
        vs.activate(ctx);
        ps.activate(ctx);

        vs.set_matrix4x4(params::VIEW, camera.view());
        vs.set_matrix4x4(params::PROJECTION, camera.projection());
        vs.copy_all_buffer_data(ctx);

        ps.set_float3(params::ZENITH_COLOR, self.colors.zenith);
        ps.set_float3(params::HORIZON_COLOR, self.colors.horizon);
        ps.set_float3(params::GROUND_COLOR, self.colors.ground);
        ps.copy_all_buffer_data(ctx);

        self.mesh.draw(ctx);

        ctx.record(RenderCommand::SetRasterState(RasterState::Opaque));
    }
}
