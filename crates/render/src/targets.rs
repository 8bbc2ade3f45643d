use crate::context::RenderDevice;
use crate::error::RenderError;
use crate::resource::{OffscreenTarget, TargetDesc, TargetFormat};

/// The three offscreen targets written by the geometry pass and read by the
/// composite pass. Always created and replaced as a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxiliaryTargets {
    pub color: OffscreenTarget,
    pub normals: OffscreenTarget,
    pub depth: OffscreenTarget,
}

impl AuxiliaryTargets {
    const LAYOUT: [(&'static str, TargetFormat); 3] = [
        ("aux_color", TargetFormat::Rgba8Unorm),
        ("aux_normals", TargetFormat::Rgba16Float),
        ("aux_depth", TargetFormat::R32Float),
    ];

    /// Create all three targets or none: a failure releases whatever was
    /// already created before returning the error.
    pub fn create<D: RenderDevice>(
        device: &mut D,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTargetSize { width, height });
        }

        let mut created: Vec<OffscreenTarget> = Vec::with_capacity(3);
        for (label, format) in Self::LAYOUT {
            let desc = TargetDesc {
                label: label.to_string(),
                width,
                height,
                format,
            };
            match device.create_offscreen_target(&desc) {
                Ok(target) => created.push(target),
                Err(err) => {
                    for target in &created {
                        device.release_target(target);
                    }
                    return Err(err);
                }
            }
        }

        tracing::debug!(width, height, "created auxiliary targets");
        Ok(Self {
            color: created[0],
            normals: created[1],
            depth: created[2],
        })
    }

    pub fn release<D: RenderDevice>(&self, device: &mut D) {
        for target in self.all() {
            device.release_target(&target);
        }
    }

    pub fn all(&self) -> [OffscreenTarget; 3] {
        [self.color, self.normals, self.depth]
    }

    pub fn size(&self) -> (u32, u32) {
        (self.color.width, self.color.height)
    }
}
