use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Upper bound of the light array in the lit pixel program.
pub const MAX_LIGHTS: usize = 8;

/// Byte stride of one [`Light`] in the uniform light array.
pub const LIGHT_STRIDE: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

impl LightKind {
    pub fn tag(self) -> i32 {
        match self {
            LightKind::Directional => 0,
            LightKind::Point => 1,
            LightKind::Spot => 2,
        }
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(LightKind::Directional),
            1 => Some(LightKind::Point),
            2 => Some(LightKind::Spot),
            _ => None,
        }
    }
}

/// One light as laid out in the pixel program's uniform array.
///
/// Field order matches the WGSL struct: every `vec3` starts on a 16-byte
/// boundary and the following scalar fills its fourth lane.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Light {
    pub direction: [f32; 3],
    pub kind: i32,
    pub position: [f32; 3],
    pub range: f32,
    pub color: [f32; 3],
    pub intensity: f32,
    pub spot_falloff: f32,
    pub _pad: [f32; 3],
}

impl Light {
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.to_array(),
            kind: LightKind::Directional.tag(),
            color: color.to_array(),
            intensity,
            ..Self::zeroed()
        }
    }

    pub fn point(position: Vec3, range: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            position: position.to_array(),
            kind: LightKind::Point.tag(),
            range,
            color: color.to_array(),
            intensity,
            ..Self::zeroed()
        }
    }

    pub fn spot(
        position: Vec3,
        direction: Vec3,
        range: f32,
        spot_falloff: f32,
        color: Vec3,
        intensity: f32,
    ) -> Self {
        Self {
            direction: direction.to_array(),
            kind: LightKind::Spot.tag(),
            position: position.to_array(),
            range,
            color: color.to_array(),
            intensity,
            spot_falloff,
            _pad: [0.0; 3],
        }
    }

    pub fn light_kind(&self) -> Option<LightKind> {
        LightKind::from_tag(self.kind)
    }
}
