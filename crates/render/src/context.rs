use crate::command::RenderCommand;
use crate::error::RenderError;
use crate::mesh::{Mesh, MeshData};
use crate::resource::{OffscreenTarget, SamplerDesc, SamplerId, TargetDesc, TextureData, TextureId};
use crate::shader::{ProgramDesc, ShaderProgram};
use std::rc::Rc;

/// Sink for the per-frame command stream.
///
/// Materials, meshes and shader programs only ever see this trait, so they
/// cannot create or destroy resources while drawing.
pub trait RenderContext {
    fn record(&mut self, command: RenderCommand);
}

/// Window/device collaborator: owns GPU resources and the presentation surface.
///
/// All creation calls are synchronous. Handles returned here stay owned by
/// the device; callers hold plain ids.
pub trait RenderDevice: RenderContext {
    /// Current backbuffer size in pixels.
    fn viewport(&self) -> (u32, u32);

    /// Reconfigure the backbuffer and the primary depth buffer.
    fn resize_backbuffer(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    /// Acquire the next backbuffer image and start a new command stream.
    fn begin_frame(&mut self) -> Result<(), RenderError>;

    /// Submit the recorded stream and present the backbuffer.
    fn present(&mut self) -> Result<(), RenderError>;

    fn create_offscreen_target(
        &mut self,
        desc: &TargetDesc,
    ) -> Result<OffscreenTarget, RenderError>;

    fn release_target(&mut self, target: &OffscreenTarget);

    fn create_mesh(&mut self, data: &MeshData) -> Result<Mesh, RenderError>;

    fn create_texture(&mut self, data: &TextureData) -> Result<TextureId, RenderError>;

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId, RenderError>;

    fn create_program(&mut self, desc: ProgramDesc) -> Result<Rc<ShaderProgram>, RenderError>;
}
