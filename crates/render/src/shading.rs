//! CPU evaluation of the lit and composite pixel programs.
//!
//! Mirrors the WGSL in the wgpu backend closely enough to check committed
//! uniform blocks and expected pixel values without a GPU.

use crate::light::{Light, LightKind, MAX_LIGHTS};
use crate::pipeline::PostSettings;
use crate::programs::{StandardLayouts, params};
use crate::uniforms::UniformLayout;
use bytemuck::Pod;
use glam::{Vec2, Vec3};

/// Decoded contents of a committed lit pixel uniform block.
#[derive(Debug, Clone, PartialEq)]
pub struct LitUniforms {
    pub color_tint: Vec3,
    pub roughness: f32,
    pub camera_position: Vec3,
    pub time: f32,
    pub ambient: Vec3,
    pub uv_scale: Vec2,
    pub uv_offset: Vec2,
    /// The first `light_count` lights of the block.
    pub lights: Vec<Light>,
}

fn read<T: Pod>(layout: &UniformLayout, bytes: &[u8], name: &str) -> Option<T> {
    let offset = layout.field(name)?.offset as usize;
    let end = offset + std::mem::size_of::<T>();
    bytes.get(offset..end).map(bytemuck::pod_read_unaligned)
}

impl LitUniforms {
    /// `None` if the block is shorter than the lit layout.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let layout = StandardLayouts::lit_pixel();
        if bytes.len() < layout.size() as usize {
            return None;
        }
        let count = read::<i32>(&layout, bytes, params::LIGHT_COUNT)?.clamp(0, MAX_LIGHTS as i32);
        let lights_at = layout.field(params::LIGHTS)?.offset as usize;
        let lights = (0..count as usize)
            .map(|i| {
                let start = lights_at + i * std::mem::size_of::<Light>();
                bytemuck::pod_read_unaligned(&bytes[start..start + std::mem::size_of::<Light>()])
            })
            .collect();

        Some(Self {
            color_tint: Vec3::from_array(read(&layout, bytes, params::COLOR_TINT)?),
            roughness: read(&layout, bytes, params::ROUGHNESS)?,
            camera_position: Vec3::from_array(read(&layout, bytes, params::CAMERA_POSITION)?),
            time: read(&layout, bytes, params::TIME)?,
            ambient: Vec3::from_array(read(&layout, bytes, params::AMBIENT)?),
            uv_scale: Vec2::from_array(read(&layout, bytes, params::UV_SCALE)?),
            uv_offset: Vec2::from_array(read(&layout, bytes, params::UV_OFFSET)?),
            lights,
        })
    }
}

/// Interpolated surface attributes at one pixel, after texture sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub albedo: Vec3,
    /// World-space normal.
    pub normal: Vec3,
    /// Roughness map sample; multiplied by the material roughness.
    pub roughness: f32,
    pub position: Vec3,
}

fn attenuation(light: &Light, distance: f32) -> f32 {
    if light.range <= 0.0 {
        return 0.0;
    }
    let falloff = (1.0 - (distance * distance) / (light.range * light.range)).clamp(0.0, 1.0);
    falloff * falloff
}

/// Color of one lit pixel: ambient plus Lambert diffuse and Phong
/// specular per active light.
pub fn shade(uniforms: &LitUniforms, surface: &SurfaceSample) -> Vec3 {
    let base = surface.albedo * uniforms.color_tint;
    let normal = surface.normal.normalize_or_zero();
    let to_camera = (uniforms.camera_position - surface.position).normalize_or_zero();
    let roughness = (uniforms.roughness * surface.roughness).clamp(0.0, 1.0);
    let exponent = 64.0 * (1.0 - roughness);

    let mut color = uniforms.ambient * base;
    for light in &uniforms.lights {
        if light.intensity <= 0.0 {
            continue;
        }
        let direction = Vec3::from_array(light.direction).normalize_or_zero();
        let (to_light, strength) = match light.light_kind() {
            Some(LightKind::Directional) => (-direction, 1.0),
            Some(kind @ (LightKind::Point | LightKind::Spot)) => {
                let offset = Vec3::from_array(light.position) - surface.position;
                let to_light = offset.normalize_or_zero();
                let mut strength = attenuation(light, offset.length());
                if kind == LightKind::Spot {
                    strength *= (-to_light).dot(direction).max(0.0).powf(light.spot_falloff);
                }
                (to_light, strength)
            }
            None => continue,
        };

        let diffuse = normal.dot(to_light).max(0.0);
        let specular = if diffuse > 0.0 {
            let reflected = 2.0 * diffuse * normal - to_light;
            reflected.dot(to_camera).max(0.0).powf(exponent) * (1.0 - roughness)
        } else {
            0.0
        };
        let light_color = Vec3::from_array(light.color) * light.intensity * strength;
        color += (base * diffuse + Vec3::splat(specular)) * light_color;
    }
    color
}

/// One texel from each auxiliary target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GBufferTexel {
    pub color: Vec3,
    pub normal: Vec3,
    pub depth: f32,
}

/// A pixel and its four direct neighbours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbourhood {
    pub center: GBufferTexel,
    pub left: GBufferTexel,
    pub right: GBufferTexel,
    pub up: GBufferTexel,
    pub down: GBufferTexel,
}

impl Neighbourhood {
    pub fn uniform(color: Vec3, normal: Vec3, depth: f32) -> Self {
        let texel = GBufferTexel {
            color,
            normal,
            depth,
        };
        Self {
            center: texel,
            left: texel,
            right: texel,
            up: texel,
            down: texel,
        }
    }

    fn neighbours(&self) -> [GBufferTexel; 4] {
        [self.left, self.right, self.up, self.down]
    }
}

/// Outline strength in `[0, 1]` from normal and depth discontinuities.
pub fn edge_factor(n: &Neighbourhood, post: &PostSettings) -> f32 {
    let center = n.center;
    let mut normal_edge = 0.0;
    let mut depth_edge = 0.0;
    for texel in n.neighbours() {
        normal_edge += 1.0 - center.normal.dot(texel.normal);
        depth_edge += (center.depth - texel.depth).abs();
    }
    normal_edge *= 0.25;
    depth_edge *= 0.25 / center.depth.max(1e-4);
    (normal_edge * post.normal_strength + depth_edge * post.depth_strength).clamp(0.0, 1.0)
}

/// Final backbuffer color of one pixel.
pub fn composite(n: &Neighbourhood, post: &PostSettings) -> Vec3 {
    n.center.color * (1.0 - edge_factor(n, post))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::UniformBlock;

    fn uniforms(lights: Vec<Light>) -> LitUniforms {
        LitUniforms {
            color_tint: Vec3::ONE,
            roughness: 1.0,
            camera_position: Vec3::new(0.0, 0.0, -10.0),
            time: 0.0,
            ambient: Vec3::ZERO,
            uv_scale: Vec2::ONE,
            uv_offset: Vec2::ZERO,
            lights,
        }
    }

    fn facing_up() -> SurfaceSample {
        SurfaceSample {
            albedo: Vec3::ONE,
            normal: Vec3::Y,
            roughness: 1.0,
            position: Vec3::ZERO,
        }
    }

    #[test]
    fn decodes_committed_block() {
        let mut block = UniformBlock::new(StandardLayouts::lit_pixel());
        let light = Light::point(Vec3::new(1.0, 2.0, 3.0), 10.0, Vec3::X, 2.0);
        block.write_raw(params::AMBIENT, bytemuck::bytes_of(&[0.25f32; 3]));
        block.write_raw(params::LIGHT_COUNT, bytemuck::bytes_of(&1i32));
        block.write_raw(params::LIGHTS, bytemuck::bytes_of(&light));
        block.write_raw(params::TIME, bytemuck::bytes_of(&3.5f32));

        let decoded = LitUniforms::from_bytes(block.bytes()).unwrap();
        assert_eq!(decoded.ambient, Vec3::splat(0.25));
        assert_eq!(decoded.time, 3.5);
        assert_eq!(decoded.lights, vec![light]);
        assert!(LitUniforms::from_bytes(&block.bytes()[..32]).is_none());
    }

    #[test]
    fn overhead_directional_light_is_full_lambert() {
        let u = uniforms(vec![Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0)]);
        let color = shade(&u, &facing_up());
        assert!(color.abs_diff_eq(Vec3::ONE, 1e-6));
    }

    #[test]
    fn lights_behind_the_surface_add_nothing() {
        let u = uniforms(vec![Light::directional(Vec3::Y, Vec3::ONE, 1.0)]);
        assert_eq!(shade(&u, &facing_up()), Vec3::ZERO);
    }

    #[test]
    fn point_light_fades_to_zero_at_range() {
        let near = uniforms(vec![Light::point(Vec3::new(0.0, 1.0, 0.0), 2.0, Vec3::ONE, 1.0)]);
        let at_range = uniforms(vec![Light::point(Vec3::new(0.0, 2.0, 0.0), 2.0, Vec3::ONE, 1.0)]);
        let no_range = uniforms(vec![Light::point(Vec3::new(0.0, 1.0, 0.0), 0.0, Vec3::ONE, 1.0)]);
        // (1 - 1/4)^2
        assert!((shade(&near, &facing_up()).x - 0.5625).abs() < 1e-6);
        assert_eq!(shade(&at_range, &facing_up()), Vec3::ZERO);
        assert_eq!(shade(&no_range, &facing_up()), Vec3::ZERO);
    }

    #[test]
    fn spot_cone_narrows_with_falloff() {
        let spot = |falloff| {
            uniforms(vec![Light::spot(
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::NEG_Y,
                10.0,
                falloff,
                Vec3::ONE,
                1.0,
            )])
        };
        let wide = shade(&spot(1.0), &facing_up()).x;
        let narrow = shade(&spot(16.0), &facing_up()).x;
        assert!(wide > narrow);
        assert!(narrow > 0.0);
    }

    #[test]
    fn smooth_surfaces_gain_a_highlight() {
        let mut u = uniforms(vec![Light::directional(Vec3::new(0.0, -1.0, 1.0), Vec3::ONE, 1.0)]);
        let rough = shade(&u, &facing_up());
        u.roughness = 0.0;
        u.camera_position = Vec3::new(0.0, 10.0, 10.0);
        let smooth = shade(&u, &facing_up());
        assert!(smooth.x > rough.x);
    }

    #[test]
    fn edges_darken_at_discontinuities() {
        let post = PostSettings::default();
        let flat = Neighbourhood::uniform(Vec3::ONE, Vec3::Y, 5.0);
        assert_eq!(edge_factor(&flat, &post), 0.0);
        assert_eq!(composite(&flat, &post), Vec3::ONE);

        let mut crease = flat;
        crease.left.normal = Vec3::X;
        assert!(edge_factor(&crease, &post) > 0.0);

        let mut silhouette = flat;
        silhouette.right.depth = 100.0;
        assert_eq!(composite(&silhouette, &post), Vec3::ZERO);
    }
}
