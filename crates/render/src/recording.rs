//! A device that records commands instead of drawing them.
//!
//! Used for headless runs and tests: every resource gets a fresh id and the
//! command stream is kept for inspection.

use crate::command::RenderCommand;
use crate::context::{RenderContext, RenderDevice};
use crate::error::RenderError;
use crate::mesh::{Mesh, MeshData};
use crate::resource::{
    MeshId, OffscreenTarget, ProgramId, SamplerDesc, SamplerId, TargetDesc, TargetId, TextureData,
    TextureId,
};
use crate::shader::{ProgramDesc, ShaderProgram};
use std::collections::BTreeSet;
use std::rc::Rc;

#[derive(Debug)]
pub struct RecordingDevice {
    viewport: (u32, u32),
    commands: Vec<RenderCommand>,
    present_marks: Vec<usize>,
    in_frame: bool,
    next_id: u32,
    live_targets: BTreeSet<TargetId>,
    /// Remaining successful target creations before failures start.
    target_budget: Option<usize>,
}

impl RecordingDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: (width, height),
            commands: Vec::new(),
            present_marks: Vec::new(),
            in_frame: false,
            // Id 0 is reserved for the backbuffer and primary depth.
            next_id: 1,
            live_targets: BTreeSet::new(),
            target_budget: None,
        }
    }

    fn issue(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Every command recorded since the last [`Self::take_commands`].
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<RenderCommand> {
        self.present_marks.clear();
        std::mem::take(&mut self.commands)
    }

    /// Command-stream positions at which `present` was called.
    pub fn present_marks(&self) -> &[usize] {
        &self.present_marks
    }

    pub fn presented_frames(&self) -> usize {
        self.present_marks.len()
    }

    pub fn is_live(&self, target: TargetId) -> bool {
        self.live_targets.contains(&target)
    }

    pub fn live_target_count(&self) -> usize {
        self.live_targets.len()
    }

    /// Let `successes` more offscreen targets be created, then fail.
    pub fn fail_target_creation_after(&mut self, successes: usize) {
        self.target_budget = Some(successes);
    }

    pub fn clear_failure_injection(&mut self) {
        self.target_budget = None;
    }
}

impl RenderContext for RecordingDevice {
    fn record(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }
}

impl RenderDevice for RecordingDevice {
    fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    fn resize_backbuffer(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTargetSize { width, height });
        }
        self.viewport = (width, height);
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.in_frame = true;
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        if !self.in_frame {
            return Err(RenderError::Backend("present without begin_frame".into()));
        }
        self.in_frame = false;
        self.present_marks.push(self.commands.len());
        Ok(())
    }

    fn create_offscreen_target(
        &mut self,
        desc: &TargetDesc,
    ) -> Result<OffscreenTarget, RenderError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::InvalidTargetSize {
                width: desc.width,
                height: desc.height,
            });
        }
        if let Some(budget) = self.target_budget.as_mut() {
            if *budget == 0 {
                return Err(RenderError::TargetCreation {
                    label: desc.label.clone(),
                    width: desc.width,
                    height: desc.height,
                    reason: "injected failure".into(),
                });
            }
            *budget -= 1;
        }
        let target = TargetId(self.issue());
        let texture = TextureId(self.issue());
        self.live_targets.insert(target);
        Ok(OffscreenTarget {
            target,
            texture,
            width: desc.width,
            height: desc.height,
            format: desc.format,
        })
    }

    fn release_target(&mut self, target: &OffscreenTarget) {
        self.live_targets.remove(&target.target);
    }

    fn create_mesh(&mut self, data: &MeshData) -> Result<Mesh, RenderError> {
        if data.indices.iter().any(|&i| i as usize >= data.vertices.len()) {
            return Err(RenderError::ResourceCreation {
                kind: "mesh",
                label: data.label.clone(),
                reason: "index out of range".into(),
            });
        }
        Ok(Mesh {
            id: MeshId(self.issue()),
            vertex_count: data.vertices.len() as u32,
            index_count: data.indices.len() as u32,
        })
    }

    fn create_texture(&mut self, data: &TextureData) -> Result<TextureId, RenderError> {
        let expected = data.width as usize * data.height as usize * 4;
        if data.width == 0 || data.height == 0 || data.pixels.len() != expected {
            return Err(RenderError::ResourceCreation {
                kind: "texture",
                label: data.label.clone(),
                reason: format!("expected {expected} bytes, got {}", data.pixels.len()),
            });
        }
        Ok(TextureId(self.issue()))
    }

    fn create_sampler(&mut self, _desc: &SamplerDesc) -> Result<SamplerId, RenderError> {
        Ok(SamplerId(self.issue()))
    }

    fn create_program(&mut self, desc: ProgramDesc) -> Result<Rc<ShaderProgram>, RenderError> {
        desc.validate()?;
        let id = ProgramId(self.issue());
        Ok(Rc::new(ShaderProgram::new(id, desc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::TargetFormat;

    fn desc(width: u32, height: u32) -> TargetDesc {
        TargetDesc {
            label: "t".into(),
            width,
            height,
            format: TargetFormat::Rgba8Unorm,
        }
    }

    #[test]
    fn ids_never_collide_with_backbuffer() {
        let mut device = RecordingDevice::new(4, 4);
        let target = device.create_offscreen_target(&desc(4, 4)).unwrap();
        assert_ne!(target.target, TargetId::BACKBUFFER);
        assert_ne!(target.texture.0, target.target.0);
    }

    #[test]
    fn zero_sized_targets_are_rejected() {
        let mut device = RecordingDevice::new(4, 4);
        assert!(matches!(
            device.create_offscreen_target(&desc(0, 4)),
            Err(RenderError::InvalidTargetSize { .. })
        ));
        assert!(device.resize_backbuffer(4, 0).is_err());
        assert_eq!(device.viewport(), (4, 4));
    }

    #[test]
    fn injected_failures_count_down() {
        let mut device = RecordingDevice::new(4, 4);
        device.fail_target_creation_after(2);
        assert!(device.create_offscreen_target(&desc(4, 4)).is_ok());
        assert!(device.create_offscreen_target(&desc(4, 4)).is_ok());
        assert!(device.create_offscreen_target(&desc(4, 4)).is_err());
        device.clear_failure_injection();
        assert!(device.create_offscreen_target(&desc(4, 4)).is_ok());
        assert_eq!(device.live_target_count(), 3);
    }

    #[test]
    fn texture_size_must_match_pixels() {
        let mut device = RecordingDevice::new(4, 4);
        let mut data = TextureData::solid("x", [1, 2, 3, 4], false);
        assert!(device.create_texture(&data).is_ok());
        data.width = 2;
        assert!(device.create_texture(&data).is_err());
    }

    #[test]
    fn present_requires_begin() {
        let mut device = RecordingDevice::new(4, 4);
        assert!(device.present().is_err());
        device.begin_frame().unwrap();
        device.record(RenderCommand::Draw { vertex_count: 3 });
        device.present().unwrap();
        assert_eq!(device.present_marks(), &[1]);
    }
}
