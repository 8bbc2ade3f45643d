use serde::{Deserialize, Serialize};

/// Device-issued handle of a shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Device-issued handle of a shader-readable texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Device-issued handle of a sampler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerId(pub u32);

/// Device-issued handle of uploaded geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// Handle of a color render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u32);

impl TargetId {
    /// The swapchain image of the current frame.
    pub const BACKBUFFER: TargetId = TargetId(0);
}

/// Handle of a depth buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepthId(pub u32);

impl DepthId {
    /// The depth buffer shared by the backbuffer and the geometry pass.
    pub const PRIMARY: DepthId = DepthId(0);
}

/// Pixel formats available for offscreen targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    Rgba8Unorm,
    Rgba16Float,
    R32Float,
}

impl TargetFormat {
    /// True if shaders may read the target through a filtering sampler.
    pub fn is_filterable(self) -> bool {
        !matches!(self, TargetFormat::R32Float)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TargetFormat,
}

/// A render target together with the texture that reads it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffscreenTarget {
    pub target: TargetId,
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
    pub format: TargetFormat,
}

/// RGBA8 pixels for a 2D texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    /// Color data is stored sRGB-encoded; data maps (normals, roughness) are linear.
    pub srgb: bool,
}

impl TextureData {
    /// A texture where every texel has the same color.
    pub fn solid(label: &str, rgba: [u8; 4], srgb: bool) -> Self {
        Self {
            label: label.to_string(),
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
            srgb,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressMode {
    Wrap,
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDesc {
    pub label: String,
    pub address: AddressMode,
    pub filter: FilterMode,
    /// 1 disables anisotropic filtering.
    pub anisotropy: u16,
}

impl SamplerDesc {
    pub fn wrap_anisotropic(label: &str, anisotropy: u16) -> Self {
        Self {
            label: label.to_string(),
            address: AddressMode::Wrap,
            filter: FilterMode::Linear,
            anisotropy,
        }
    }

    pub fn clamp(label: &str) -> Self {
        Self {
            label: label.to_string(),
            address: AddressMode::Clamp,
            filter: FilterMode::Linear,
            anisotropy: 1,
        }
    }
}

/// Fixed-function state for the draws that follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterState {
    /// Depth test and write, no culling.
    Opaque,
    /// Depth test less-or-equal without depth writes, for geometry at the far plane.
    Background,
    /// No depth, single full-screen triangle.
    FullScreen,
}
