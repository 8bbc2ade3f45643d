use crate::resource::{DepthId, MeshId, ProgramId, RasterState, SamplerId, TargetId, TextureId};
use crate::shader::ShaderStage;

/// One entry of a frame's command stream.
///
/// Everything the scene, materials and pipeline do to the GPU goes through
/// this enum, so a backend only has to interpret a flat list.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Bind color targets (in slot order) and an optional depth buffer.
    SetRenderTargets {
        colors: Vec<TargetId>,
        depth: Option<DepthId>,
    },
    ClearTarget {
        target: TargetId,
        color: [f32; 4],
    },
    ClearDepth {
        depth: DepthId,
        value: f32,
    },
    SetRasterState(RasterState),
    SetProgram {
        stage: ShaderStage,
        program: ProgramId,
    },
    /// Snapshot of a program's whole uniform block.
    CommitUniforms {
        program: ProgramId,
        stage: ShaderStage,
        data: Vec<u8>,
    },
    BindTexture {
        stage: ShaderStage,
        slot: u32,
        texture: TextureId,
    },
    BindSampler {
        stage: ShaderStage,
        slot: u32,
        sampler: SamplerId,
    },
    /// Drop every texture and sampler bound to the stage.
    UnbindShaderResources { stage: ShaderStage },
    DrawIndexed { mesh: MeshId, index_count: u32 },
    /// Non-indexed draw with no vertex buffer bound.
    Draw { vertex_count: u32 },
}

impl RenderCommand {
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            RenderCommand::Draw { .. } | RenderCommand::DrawIndexed { .. }
        )
    }
}
