//! The renderer's standard shader programs and their parameter names.

use crate::context::RenderDevice;
use crate::error::RenderError;
use crate::light::{LIGHT_STRIDE, MAX_LIGHTS};
use crate::shader::{ProgramDesc, ResourceSlot, ShaderProgram, ShaderStage, VertexInput};
use crate::uniforms::UniformLayout;
use std::rc::Rc;

/// Uniform and resource names shared by the CPU side and the WGSL sources.
pub mod params {
    pub const WORLD: &str = "world";
    pub const VIEW: &str = "view";
    pub const PROJECTION: &str = "projection";
    pub const WORLD_INV_TRANSPOSE: &str = "world_inv_transpose";

    pub const COLOR_TINT: &str = "color_tint";
    pub const ROUGHNESS: &str = "roughness";
    pub const CAMERA_POSITION: &str = "camera_position";
    pub const TIME: &str = "time";
    pub const AMBIENT: &str = "ambient";
    pub const LIGHT_COUNT: &str = "light_count";
    pub const UV_SCALE: &str = "uv_scale";
    pub const UV_OFFSET: &str = "uv_offset";
    pub const LIGHTS: &str = "lights";

    pub const ALBEDO: &str = "albedo";
    pub const NORMAL_MAP: &str = "normal_map";
    pub const ROUGHNESS_MAP: &str = "roughness_map";
    pub const SURFACE_SAMPLER: &str = "surface_sampler";

    pub const ZENITH_COLOR: &str = "zenith_color";
    pub const HORIZON_COLOR: &str = "horizon_color";
    pub const GROUND_COLOR: &str = "ground_color";

    pub const PIXELS: &str = "pixels";
    pub const NORMALS: &str = "normals";
    pub const DEPTH: &str = "depth";
    pub const CLAMP_SAMPLER: &str = "clamp_sampler";
    pub const INV_WIDTH: &str = "inv_width";
    pub const INV_HEIGHT: &str = "inv_height";
    pub const NORMAL_STRENGTH: &str = "normal_strength";
    pub const DEPTH_STRENGTH: &str = "depth_strength";
}

/// Uniform layouts of the standard programs, mirroring the WGSL structs.
pub struct StandardLayouts;

impl StandardLayouts {
    pub fn geometry_vertex() -> UniformLayout {
        UniformLayout::new()
            .matrix4(params::WORLD)
            .matrix4(params::VIEW)
            .matrix4(params::PROJECTION)
            .matrix4(params::WORLD_INV_TRANSPOSE)
    }

    pub fn lit_pixel() -> UniformLayout {
        UniformLayout::new()
            .float3(params::COLOR_TINT)
            .float(params::ROUGHNESS)
            .float3(params::CAMERA_POSITION)
            .float(params::TIME)
            .float3(params::AMBIENT)
            .int(params::LIGHT_COUNT)
            .float2(params::UV_SCALE)
            .float2(params::UV_OFFSET)
            .array(params::LIGHTS, LIGHT_STRIDE, MAX_LIGHTS as u32)
    }

    pub fn sky_vertex() -> UniformLayout {
        UniformLayout::new()
            .matrix4(params::VIEW)
            .matrix4(params::PROJECTION)
    }

    pub fn sky_pixel() -> UniformLayout {
        UniformLayout::new()
            .float3(params::ZENITH_COLOR)
            .float3(params::HORIZON_COLOR)
            .float3(params::GROUND_COLOR)
    }

    pub fn fullscreen_vertex() -> UniformLayout {
        UniformLayout::new()
    }

    pub fn composite_pixel() -> UniformLayout {
        UniformLayout::new()
            .float(params::INV_WIDTH)
            .float(params::INV_HEIGHT)
            .float(params::NORMAL_STRENGTH)
            .float(params::DEPTH_STRENGTH)
    }
}

/// WGSL source of each standard program. Backends that do not compile
/// shaders pass [`ShaderSources::default`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderSources {
    pub geometry_vertex: &'static str,
    pub lit_pixel: &'static str,
    pub sky_vertex: &'static str,
    pub sky_pixel: &'static str,
    pub fullscreen_vertex: &'static str,
    pub composite_pixel: &'static str,
}

/// The programs every scene draws with.
#[derive(Debug, Clone)]
pub struct StandardPrograms {
    pub geometry_vertex: Rc<ShaderProgram>,
    pub lit_pixel: Rc<ShaderProgram>,
    pub sky_vertex: Rc<ShaderProgram>,
    pub sky_pixel: Rc<ShaderProgram>,
    pub fullscreen_vertex: Rc<ShaderProgram>,
    pub composite_pixel: Rc<ShaderProgram>,
}

impl StandardPrograms {
    pub fn create<D: RenderDevice>(
        device: &mut D,
        sources: &ShaderSources,
    ) -> Result<Self, RenderError> {
        let geometry_vertex = device.create_program(ProgramDesc {
            label: "geometry_vs".into(),
            stage: ShaderStage::Vertex,
            source: sources.geometry_vertex.into(),
            entry_point: "vs_main".into(),
            uniforms: StandardLayouts::geometry_vertex(),
            resources: Vec::new(),
            vertex_input: VertexInput::Mesh,
        })?;
        let lit_pixel = device.create_program(ProgramDesc {
            label: "lit_ps".into(),
            stage: ShaderStage::Pixel,
            source: sources.lit_pixel.into(),
            entry_point: "fs_main".into(),
            uniforms: StandardLayouts::lit_pixel(),
            resources: vec![
                ResourceSlot::texture(params::ALBEDO),
                ResourceSlot::texture(params::NORMAL_MAP),
                ResourceSlot::texture(params::ROUGHNESS_MAP),
                ResourceSlot::sampler(params::SURFACE_SAMPLER),
            ],
            vertex_input: VertexInput::None,
        })?;
        let sky_vertex = device.create_program(ProgramDesc {
            label: "sky_vs".into(),
            stage: ShaderStage::Vertex,
            source: sources.sky_vertex.into(),
            entry_point: "vs_sky".into(),
            uniforms: StandardLayouts::sky_vertex(),
            resources: Vec::new(),
            vertex_input: VertexInput::Mesh,
        })?;
        let sky_pixel = device.create_program(ProgramDesc {
            label: "sky_ps".into(),
            stage: ShaderStage::Pixel,
            source: sources.sky_pixel.into(),
            entry_point: "fs_sky".into(),
            uniforms: StandardLayouts::sky_pixel(),
            resources: Vec::new(),
            vertex_input: VertexInput::None,
        })?;
        let fullscreen_vertex = device.create_program(ProgramDesc {
            label: "fullscreen_vs".into(),
            stage: ShaderStage::Vertex,
            source: sources.fullscreen_vertex.into(),
            entry_point: "vs_fullscreen".into(),
            uniforms: StandardLayouts::fullscreen_vertex(),
            resources: Vec::new(),
            vertex_input: VertexInput::None,
        })?;
        let composite_pixel = device.create_program(ProgramDesc {
            label: "composite_ps".into(),
            stage: ShaderStage::Pixel,
            source: sources.composite_pixel.into(),
            entry_point: "fs_composite".into(),
            uniforms: StandardLayouts::composite_pixel(),
            resources: vec![
                ResourceSlot::texture(params::PIXELS),
                ResourceSlot::texture(params::NORMALS),
                ResourceSlot::unfilterable_texture(params::DEPTH),
                ResourceSlot::sampler(params::CLAMP_SAMPLER),
            ],
            vertex_input: VertexInput::None,
        })?;

        Ok(Self {
            geometry_vertex,
            lit_pixel,
            sky_vertex,
            sky_pixel,
            fullscreen_vertex,
            composite_pixel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lit_pixel_layout_offsets() {
        let layout = StandardLayouts::lit_pixel();
        let offset = |name| layout.field(name).unwrap().offset;
        assert_eq!(offset(params::COLOR_TINT), 0);
        assert_eq!(offset(params::ROUGHNESS), 12);
        assert_eq!(offset(params::CAMERA_POSITION), 16);
        assert_eq!(offset(params::TIME), 28);
        assert_eq!(offset(params::AMBIENT), 32);
        assert_eq!(offset(params::LIGHT_COUNT), 44);
        assert_eq!(offset(params::UV_SCALE), 48);
        assert_eq!(offset(params::UV_OFFSET), 56);
        assert_eq!(offset(params::LIGHTS), 64);
        assert_eq!(layout.size(), 64 + 64 * MAX_LIGHTS as u32);
    }

    #[test]
    fn vertex_layouts_are_matrix_rows() {
        assert_eq!(StandardLayouts::geometry_vertex().size(), 256);
        assert_eq!(StandardLayouts::sky_vertex().size(), 128);
        assert_eq!(StandardLayouts::composite_pixel().size(), 16);
        assert_eq!(StandardLayouts::fullscreen_vertex().size(), 16);
    }
}
