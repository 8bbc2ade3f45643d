use crate::command::RenderCommand;
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::resource::{ProgramId, SamplerId, TextureId};
use crate::uniforms::{UniformBlock, UniformKind, UniformLayout, UniformWrite};
use glam::{Mat4, Vec2, Vec3, Vec4};
use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

/// What a vertex program pulls from the input assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexInput {
    /// Interleaved [`crate::mesh::Vertex`] buffer.
    Mesh,
    /// Nothing bound; positions derive from the vertex index.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Texture { filterable: bool },
    Sampler,
}

/// A named texture or sampler slot. Slot numbers are the index in
/// [`ProgramDesc::resources`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSlot {
    pub name: String,
    pub kind: ResourceKind,
}

impl ResourceSlot {
    pub fn texture(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ResourceKind::Texture { filterable: true },
        }
    }

    /// A texture read with `textureLoad` only (e.g. 32-bit float targets).
    pub fn unfilterable_texture(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ResourceKind::Texture { filterable: false },
        }
    }

    pub fn sampler(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ResourceKind::Sampler,
        }
    }
}

/// Everything a device needs to build one shader program.
#[derive(Debug, Clone)]
pub struct ProgramDesc {
    pub label: String,
    pub stage: ShaderStage,
    /// WGSL source.
    pub source: String,
    pub entry_point: String,
    pub uniforms: UniformLayout,
    pub resources: Vec<ResourceSlot>,
    pub vertex_input: VertexInput,
}

impl ProgramDesc {
    /// Reject descriptions no device can build.
    pub fn validate(&self) -> Result<(), RenderError> {
        let fail = |reason: &str| RenderError::ProgramCreation {
            label: self.label.clone(),
            reason: reason.to_string(),
        };
        if self.entry_point.is_empty() {
            return Err(fail("empty entry point"));
        }
        if self.stage == ShaderStage::Vertex && !self.resources.is_empty() {
            return Err(fail("vertex programs cannot bind textures or samplers"));
        }
        if self.stage == ShaderStage::Pixel && self.vertex_input != VertexInput::None {
            return Err(fail("pixel programs have no vertex input"));
        }
        Ok(())
    }
}

/// One compiled shader stage with named parameters.
///
/// Parameter writes land in a staging block and reach the device only on
/// [`ShaderProgram::copy_all_buffer_data`]. Writes to names the program does
/// not declare are ignored and reported through the `bool` return.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    desc: ProgramDesc,
    staging: RefCell<UniformBlock>,
}

impl ShaderProgram {
    pub fn new(id: ProgramId, desc: ProgramDesc) -> Self {
        let staging = RefCell::new(UniformBlock::new(desc.uniforms.clone()));
        Self { id, desc, staging }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.desc.label
    }

    pub fn stage(&self) -> ShaderStage {
        self.desc.stage
    }

    pub fn desc(&self) -> &ProgramDesc {
        &self.desc
    }

    pub fn activate<C: RenderContext + ?Sized>(&self, ctx: &mut C) {
        ctx.record(RenderCommand::SetProgram {
            stage: self.desc.stage,
            program: self.id,
        });
    }

    fn write(&self, name: &str, kind: UniformKind, data: &[u8]) -> bool {
        let outcome = self.staging.borrow_mut().write(name, kind, data);
        self.report(name, outcome)
    }

    fn report(&self, name: &str, outcome: UniformWrite) -> bool {
        match outcome {
            UniformWrite::Written => true,
            UniformWrite::UnknownName => {
                tracing::trace!(program = %self.desc.label, name, "ignoring unknown uniform");
                false
            }
            UniformWrite::KindMismatch => {
                tracing::trace!(program = %self.desc.label, name, "ignoring uniform of wrong type");
                false
            }
        }
    }

    pub fn set_float(&self, name: &str, value: f32) -> bool {
        self.write(name, UniformKind::Float, bytemuck::bytes_of(&value))
    }

    pub fn set_int(&self, name: &str, value: i32) -> bool {
        self.write(name, UniformKind::Int, bytemuck::bytes_of(&value))
    }

    pub fn set_float2(&self, name: &str, value: Vec2) -> bool {
        self.write(name, UniformKind::Float2, bytemuck::bytes_of(&value))
    }

    pub fn set_float3(&self, name: &str, value: Vec3) -> bool {
        self.write(name, UniformKind::Float3, bytemuck::bytes_of(&value))
    }

    pub fn set_float4(&self, name: &str, value: Vec4) -> bool {
        self.write(name, UniformKind::Float4, bytemuck::bytes_of(&value))
    }

    pub fn set_matrix4x4(&self, name: &str, value: Mat4) -> bool {
        self.write(name, UniformKind::Matrix4, bytemuck::bytes_of(&value))
    }

    /// Copy raw bytes into the start of a member (e.g. a light array).
    pub fn set_data(&self, name: &str, data: &[u8]) -> bool {
        let outcome = self.staging.borrow_mut().write_raw(name, data);
        self.report(name, outcome)
    }

    fn slot(&self, name: &str, sampler: bool) -> Option<u32> {
        self.desc
            .resources
            .iter()
            .position(|slot| {
                slot.name == name && matches!(slot.kind, ResourceKind::Sampler) == sampler
            })
            .map(|index| index as u32)
    }

    pub fn has_texture(&self, name: &str) -> bool {
        self.slot(name, false).is_some()
    }

    pub fn set_texture<C: RenderContext + ?Sized>(
        &self,
        ctx: &mut C,
        name: &str,
        texture: TextureId,
    ) -> bool {
        let Some(slot) = self.slot(name, false) else {
            tracing::trace!(program = %self.desc.label, name, "ignoring unknown texture slot");
            return false;
        };
        ctx.record(RenderCommand::BindTexture {
            stage: self.desc.stage,
            slot,
            texture,
        });
        true
    }

    pub fn set_sampler<C: RenderContext + ?Sized>(
        &self,
        ctx: &mut C,
        name: &str,
        sampler: SamplerId,
    ) -> bool {
        let Some(slot) = self.slot(name, true) else {
            tracing::trace!(program = %self.desc.label, name, "ignoring unknown sampler slot");
            return false;
        };
        ctx.record(RenderCommand::BindSampler {
            stage: self.desc.stage,
            slot,
            sampler,
        });
        true
    }

    /// Commit the whole staging block. Members never written keep their
    /// previous value (zero on first commit).
    pub fn copy_all_buffer_data<C: RenderContext + ?Sized>(&self, ctx: &mut C) {
        ctx.record(RenderCommand::CommitUniforms {
            program: self.id,
            stage: self.desc.stage,
            data: self.staging.borrow().bytes().to_vec(),
        });
    }

    /// Current staged bytes of one member.
    pub fn staged(&self, name: &str) -> Option<Vec<u8>> {
        self.staging.borrow().read(name).map(<[u8]>::to_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log(Vec<RenderCommand>);

    impl RenderContext for Log {
        fn record(&mut self, command: RenderCommand) {
            self.0.push(command);
        }
    }

    fn program() -> ShaderProgram {
        ShaderProgram::new(
            ProgramId(4),
            ProgramDesc {
                label: "test_ps".into(),
                stage: ShaderStage::Pixel,
                source: String::new(),
                entry_point: "fs_main".into(),
                uniforms: UniformLayout::new().float3("tint").float("rough"),
                resources: vec![ResourceSlot::texture("albedo"), ResourceSlot::sampler("samp")],
                vertex_input: VertexInput::None,
            },
        )
    }

    #[test]
    fn unknown_names_are_ignored() {
        let p = program();
        let mut log = Log::default();
        assert!(!p.set_float("missing", 1.0));
        assert!(!p.set_texture(&mut log, "missing", TextureId(1)));
        assert!(!p.set_sampler(&mut log, "albedo", SamplerId(1)));
        assert!(log.0.is_empty());
    }

    #[test]
    fn wrong_type_is_ignored() {
        let p = program();
        assert!(!p.set_int("rough", 3));
        assert_eq!(p.staged("rough").unwrap(), vec![0; 4]);
    }

    #[test]
    fn commit_snapshots_staging() {
        let p = program();
        let mut log = Log::default();
        assert!(p.set_float3("tint", Vec3::new(1.0, 0.5, 0.25)));
        assert!(p.set_float("rough", 0.8));
        p.copy_all_buffer_data(&mut log);
        p.set_float("rough", 0.1);

        let RenderCommand::CommitUniforms { data, program, stage } = &log.0[0] else {
            panic!("expected a commit");
        };
        assert_eq!(*program, ProgramId(4));
        assert_eq!(*stage, ShaderStage::Pixel);
        assert_eq!(data.len(), 16);
        let floats: Vec<f32> = bytemuck::pod_collect_to_vec(data);
        assert_eq!(floats, vec![1.0, 0.5, 0.25, 0.8]);
    }

    #[test]
    fn validate_rejects_vertex_resources() {
        let mut desc = program().desc().clone();
        assert!(desc.validate().is_ok());
        desc.stage = ShaderStage::Vertex;
        assert!(matches!(
            desc.validate(),
            Err(RenderError::ProgramCreation { .. })
        ));
        desc.resources.clear();
        assert!(desc.validate().is_ok());
        desc.entry_point.clear();
        assert!(desc.validate().is_err());
    }

    #[test]
    fn resources_bind_by_slot_index() {
        let p = program();
        let mut log = Log::default();
        assert!(p.set_texture(&mut log, "albedo", TextureId(9)));
        assert!(p.set_sampler(&mut log, "samp", SamplerId(2)));
        assert_eq!(
            log.0,
            vec![
                RenderCommand::BindTexture {
                    stage: ShaderStage::Pixel,
                    slot: 0,
                    texture: TextureId(9)
                },
                RenderCommand::BindSampler {
                    stage: ShaderStage::Pixel,
                    slot: 1,
                    sampler: SamplerId(2)
                },
            ]
        );
    }
}
