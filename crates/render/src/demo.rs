//! The planetary demo: a sun and four planets built from procedural assets.

use crate::config::SceneConfig;
use crate::context::RenderDevice;
use crate::entity::Entity;
use crate::error::RenderError;
use crate::material::Material;
use crate::mesh::MeshData;
use crate::programs::{StandardPrograms, params};
use crate::resource::{SamplerDesc, TextureData};
use crate::scene::Scene;
use crate::sky::Sky;
use glam::{Vec2, Vec3};
use orrery_common::MaterialHandle;

const TEXTURE_WIDTH: u32 = 128;
const TEXTURE_HEIGHT: u32 = 64;

struct Body {
    name: &'static str,
    bands: [[u8; 3]; 2],
    band_count: u32,
    scale: f32,
    position: Vec3,
}

#[rustfmt::skip]
const BODIES: [Body; 5] = [
    Body { name: "sun",     bands: [[255, 196, 64],  [255, 128, 32]],  band_count: 3,  scale: 10.0, position: Vec3::ZERO },
    Body { name: "planet1", bands: [[150, 140, 130], [96, 90, 84]],    band_count: 5,  scale: 1.2,  position: Vec3::new(15.0, 0.0, 0.0) },
    Body { name: "planet2", bands: [[214, 168, 110], [170, 120, 80]],  band_count: 9,  scale: 5.0,  position: Vec3::new(20.0, 0.0, 0.0) },
    Body { name: "planet3", bands: [[60, 110, 200],  [40, 150, 80]],   band_count: 4,  scale: 1.0,  position: Vec3::new(30.0, 0.0, 0.0) },
    Body { name: "planet4", bands: [[190, 80, 60],   [120, 50, 40]],   band_count: 7,  scale: 3.0,  position: Vec3::new(50.0, 0.0, 0.0) },
];

/// Latitude bands alternating smoothly between two colors.
pub fn banded_albedo(label: &str, bands: [[u8; 3]; 2], band_count: u32) -> TextureData {
    let mut pixels = Vec::with_capacity((TEXTURE_WIDTH * TEXTURE_HEIGHT * 4) as usize);
    for y in 0..TEXTURE_HEIGHT {
        let v = y as f32 / TEXTURE_HEIGHT as f32;
        let t = 0.5 + 0.5 * (v * band_count as f32 * std::f32::consts::TAU).sin();
        let texel: [u8; 3] =
            std::array::from_fn(|c| (bands[0][c] as f32 * t + bands[1][c] as f32 * (1.0 - t)) as u8);
        for _ in 0..TEXTURE_WIDTH {
            pixels.extend_from_slice(&[texel[0], texel[1], texel[2], 255]);
        }
    }
    TextureData {
        label: label.to_string(),
        width: TEXTURE_WIDTH,
        height: TEXTURE_HEIGHT,
        pixels,
        srgb: true,
    }
}

/// Tangent-space normal map pointing straight out of the surface.
pub fn flat_normal_map(label: &str) -> TextureData {
    TextureData::solid(label, [128, 128, 255, 255], false)
}

/// Roughness varying with a cheap integer hash of the texel position.
pub fn speckled_roughness(label: &str, seed: u32) -> TextureData {
    let mut pixels = Vec::with_capacity((TEXTURE_WIDTH * TEXTURE_HEIGHT * 4) as usize);
    for y in 0..TEXTURE_HEIGHT {
        for x in 0..TEXTURE_WIDTH {
            let mut h = x.wrapping_mul(374_761_393) ^ y.wrapping_mul(668_265_263) ^ seed;
            h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
            let r = 192 + (h >> 26) as u8;
            pixels.extend_from_slice(&[r, r, r, 255]);
        }
    }
    TextureData {
        label: label.to_string(),
        width: TEXTURE_WIDTH,
        height: TEXTURE_HEIGHT,
        pixels,
        srgb: false,
    }
}

/// Build the demo scene from `config` on `device`.
///
/// Entity 0 is the sun; entities 1 to 4 are the planets the default orbit
/// settings move.
pub fn build_scene<D: RenderDevice>(
    device: &mut D,
    programs: &StandardPrograms,
    config: &SceneConfig,
) -> Result<Scene, RenderError> {
    let surface_sampler = device.create_sampler(&SamplerDesc::wrap_anisotropic("surface", 16))?;
    let clamp_sampler = device.create_sampler(&SamplerDesc::clamp("clamp"))?;

    let sphere = device.create_mesh(&MeshData::sphere("sphere", 1.0, 32, 16))?;
    let cube = device.create_mesh(&MeshData::cube("sky_cube", 2.0))?;
    let normal_map = device.create_texture(&flat_normal_map("flat_normal"))?;

    let mut scene = Scene::new(config.ambient);
    let sphere = scene.assets_mut().add_mesh(sphere);

    for (seed, body) in (0u32..).zip(BODIES.iter()) {
        let albedo = device.create_texture(&banded_albedo(
            &format!("{}_albedo", body.name),
            body.bands,
            body.band_count,
        ))?;
        let roughness =
            device.create_texture(&speckled_roughness(&format!("{}_roughness", body.name), seed))?;

        let mut material = Material::new(
            body.name,
            Vec3::ONE,
            0.8,
            programs.geometry_vertex.clone(),
            programs.lit_pixel.clone(),
        )
        .with_uv(Vec2::ONE, Vec2::ZERO);
        material.add_texture(params::ALBEDO, albedo);
        material.add_texture(params::NORMAL_MAP, normal_map);
        material.add_texture(params::ROUGHNESS_MAP, roughness);
        material.add_sampler(params::SURFACE_SAMPLER, surface_sampler);
        material.add_sampler(params::CLAMP_SAMPLER, clamp_sampler);
        let material: MaterialHandle = scene.assets_mut().add_material(material);

        let mut entity = Entity::new(sphere, material);
        entity.transform.scale_by(Vec3::splat(body.scale));
        entity.transform.move_absolute(body.position);
        scene.add_entity(entity);
    }

    for light in &config.lights {
        scene.add_light(light.to_light());
    }
    scene.set_active_light_count(config.active_lights);

    scene.set_sky(Sky::new(
        cube,
        programs.sky_vertex.clone(),
        programs.sky_pixel.clone(),
        config.sky,
    ));

    tracing::info!(
        entities = scene.entities().len(),
        lights = scene.active_light_count(),
        "built demo scene"
    );
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::ShaderSources;
    use crate::recording::RecordingDevice;

    fn demo() -> (RecordingDevice, Scene) {
        let mut device = RecordingDevice::new(320, 240);
        let programs = StandardPrograms::create(&mut device, &ShaderSources::default()).unwrap();
        let scene = build_scene(&mut device, &programs, &SceneConfig::default()).unwrap();
        (device, scene)
    }

    #[test]
    fn planets_share_one_sphere() {
        let (_, scene) = demo();
        assert_eq!(scene.entities().len(), 5);
        assert_eq!(scene.assets().mesh_count(), 1);
        assert_eq!(scene.assets().material_count(), 5);
        assert!(scene.entities().iter().all(|e| e.mesh == scene.entities()[0].mesh));
        assert!(scene.sky().is_some());
        assert_eq!(scene.active_light_count(), 5);
    }

    #[test]
    fn bodies_start_scaled_and_placed() {
        let (_, scene) = demo();
        let sun = &scene.entities()[0].transform;
        assert_eq!(sun.scale(), Vec3::splat(10.0));
        let second = &scene.entities()[2].transform;
        assert_eq!(second.scale(), Vec3::splat(5.0));
        assert_eq!(second.position(), Vec3::new(20.0, 0.0, 0.0));
    }

    #[test]
    fn materials_bind_all_surface_maps() {
        let (_, scene) = demo();
        let material = scene.assets().material(MaterialHandle(3)).unwrap();
        assert!(material.texture(params::ALBEDO).is_some());
        assert!(material.texture(params::NORMAL_MAP).is_some());
        assert!(material.texture(params::ROUGHNESS_MAP).is_some());
        assert_eq!(
            material.sampler(params::SURFACE_SAMPLER),
            scene
                .assets()
                .material(MaterialHandle(0))
                .unwrap()
                .sampler(params::SURFACE_SAMPLER)
        );
    }

    #[test]
    fn procedural_textures_fill_every_texel() {
        let albedo = banded_albedo("a", [[255, 0, 0], [0, 0, 255]], 2);
        assert_eq!(albedo.pixels.len(), (TEXTURE_WIDTH * TEXTURE_HEIGHT * 4) as usize);
        let rough = speckled_roughness("r", 7);
        assert!(rough.pixels.chunks(4).all(|p| p[0] >= 192 && p[3] == 255));
    }
}
