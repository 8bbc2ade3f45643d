use crate::camera::Camera;
use crate::context::RenderContext;
use crate::entity::Entity;
use crate::light::{Light, MAX_LIGHTS};
use crate::material::Material;
use crate::mesh::Mesh;
use crate::programs::params;
use crate::shader::ShaderProgram;
use crate::sky::Sky;
use glam::Vec3;
use orrery_common::{MaterialHandle, MeshHandle};

/// Append-only arena of meshes and materials shared by entities.
#[derive(Debug, Clone, Default)]
pub struct SceneAssets {
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
}

impl SceneAssets {
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshHandle {
        self.meshes.push(mesh);
        MeshHandle((self.meshes.len() - 1) as u32)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.push(material);
        MaterialHandle((self.materials.len() - 1) as u32)
    }

    pub fn mesh(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(handle.index())
    }

    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle.index())
    }

    /// Changes are seen by every entity sharing the material.
    pub fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(handle.index())
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}

/// Entities, lights, ambient term and background of one scene.
///
/// Entities draw in insertion order; nothing sorts them.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    assets: SceneAssets,
    entities: Vec<Entity>,
    lights: Vec<Light>,
    active_lights: usize,
    ambient: Vec3,
    sky: Option<Sky>,
}

impl Scene {
    pub fn new(ambient: Vec3) -> Self {
        Self {
            ambient,
            ..Self::default()
        }
    }

    pub fn assets(&self) -> &SceneAssets {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut SceneAssets {
        &mut self.assets
    }

    pub fn add_entity(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entities.get_mut(index)
    }

    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn light_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.lights.get_mut(index)
    }

    /// Number of leading lights the shaders evaluate. Clamped to the light
    /// list and to [`MAX_LIGHTS`].
    pub fn set_active_light_count(&mut self, count: usize) {
        let clamped = count.min(self.lights.len()).min(MAX_LIGHTS);
        if clamped != count {
            tracing::warn!(requested = count, active = clamped, "clamped active light count");
        }
        self.active_lights = clamped;
    }

    pub fn active_light_count(&self) -> usize {
        self.active_lights
    }

    /// Bytes of the active lights, one [`crate::light::LIGHT_STRIDE`] each.
    pub fn light_block(&self) -> &[u8] {
        bytemuck::cast_slice(&self.lights[..self.active_lights])
    }

    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    pub fn set_ambient(&mut self, ambient: Vec3) {
        self.ambient = ambient;
    }

    pub fn sky(&self) -> Option<&Sky> {
        self.sky.as_ref()
    }

    pub fn set_sky(&mut self, sky: Sky) {
        self.sky = Some(sky);
    }

    /// Stage the per-frame globals in a lit pixel program.
    pub fn push_frame_uniforms(&self, program: &ShaderProgram, time: f32) {
        program.set_float(params::TIME, time);
        program.set_float3(params::AMBIENT, self.ambient);
        program.set_int(params::LIGHT_COUNT, self.active_lights as i32);
        program.set_data(params::LIGHTS, self.light_block());
    }

    /// Draw every entity in insertion order, then the sky.
    pub fn draw_geometry<C: RenderContext + ?Sized>(
        &self,
        ctx: &mut C,
        camera: &Camera,
        time: f32,
    ) {
        for entity in &self.entities {
            if let Some(material) = self.assets.material(entity.material) {
                self.push_frame_uniforms(material.pixel_program(), time);
            }
            entity.draw(ctx, camera, &self.assets);
        }
        if let Some(sky) = &self.sky {
            sky.draw(ctx, camera);
        }
    }
}
