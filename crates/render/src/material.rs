use crate::camera::Camera;
use crate::context::RenderContext;
use crate::programs::params;
use crate::resource::{SamplerId, TextureId};
use crate::shader::ShaderProgram;
use glam::{Vec2, Vec3};
use orrery_common::Transform;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Surface description: shader pair, scalar parameters and named resources.
///
/// Texture and sampler names are a contract with the pixel program; names the
/// program does not declare are skipped when binding.
#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    color_tint: Vec3,
    roughness: f32,
    uv_scale: Vec2,
    uv_offset: Vec2,
    vertex_program: Rc<ShaderProgram>,
    pixel_program: Rc<ShaderProgram>,
    textures: BTreeMap<String, TextureId>,
    samplers: BTreeMap<String, SamplerId>,
}

impl Material {
    pub fn new(
        name: &str,
        color_tint: Vec3,
        roughness: f32,
        vertex_program: Rc<ShaderProgram>,
        pixel_program: Rc<ShaderProgram>,
    ) -> Self {
        Self {
            name: name.to_string(),
            color_tint,
            roughness,
            uv_scale: Vec2::ONE,
            uv_offset: Vec2::ZERO,
            vertex_program,
            pixel_program,
            textures: BTreeMap::new(),
            samplers: BTreeMap::new(),
        }
    }

    pub fn with_uv(mut self, scale: Vec2, offset: Vec2) -> Self {
        self.uv_scale = scale;
        self.uv_offset = offset;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color_tint(&self) -> Vec3 {
        self.color_tint
    }

    pub fn set_color_tint(&mut self, tint: Vec3) {
        self.color_tint = tint;
    }

    pub fn roughness(&self) -> f32 {
        self.roughness
    }

    pub fn set_roughness(&mut self, roughness: f32) {
        self.roughness = roughness;
    }

    pub fn uv_scale(&self) -> Vec2 {
        self.uv_scale
    }

    pub fn uv_offset(&self) -> Vec2 {
        self.uv_offset
    }

    pub fn vertex_program(&self) -> &Rc<ShaderProgram> {
        &self.vertex_program
    }

    pub fn pixel_program(&self) -> &Rc<ShaderProgram> {
        &self.pixel_program
    }

    pub fn set_vertex_program(&mut self, program: Rc<ShaderProgram>) {
        self.vertex_program = program;
    }

    pub fn set_pixel_program(&mut self, program: Rc<ShaderProgram>) {
        self.pixel_program = program;
    }

    /// Register a texture, replacing any previous one with the same name.
    pub fn add_texture(&mut self, name: &str, texture: TextureId) -> Option<TextureId> {
        self.textures.insert(name.to_string(), texture)
    }

    /// Register a sampler, replacing any previous one with the same name.
    pub fn add_sampler(&mut self, name: &str, sampler: SamplerId) -> Option<SamplerId> {
        self.samplers.insert(name.to_string(), sampler)
    }

    pub fn remove_texture(&mut self, name: &str) -> Option<TextureId> {
        self.textures.remove(name)
    }

    pub fn remove_sampler(&mut self, name: &str) -> Option<SamplerId> {
        self.samplers.remove(name)
    }

    pub fn texture(&self, name: &str) -> Option<TextureId> {
        self.textures.get(name).copied()
    }

    pub fn sampler(&self, name: &str) -> Option<SamplerId> {
        self.samplers.get(name).copied()
    }

    pub fn textures(&self) -> impl Iterator<Item = (&str, TextureId)> {
        self.textures.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn samplers(&self) -> impl Iterator<Item = (&str, SamplerId)> {
        self.samplers.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Activate both programs, upload per-object and material parameters,
    /// commit them and bind every registered texture and sampler.
    pub fn set_up_shaders<C: RenderContext + ?Sized>(
        &self,
        ctx: &mut C,
        transform: &Transform,
        camera: &Camera,
    ) {
        let vs = &self.vertex_program;
        let ps = &self.pixel_program;
        vs.activate(ctx);
        ps.activate(ctx);

        let matrices = transform.matrices();
        vs.set_matrix4x4(params::WORLD, matrices.world);
        vs.set_matrix4x4(params::VIEW, camera.view());
        vs.set_matrix4x4(params::PROJECTION, camera.projection());
        vs.set_matrix4x4(params::WORLD_INV_TRANSPOSE, matrices.world_inverse_transpose);
        vs.copy_all_buffer_data(ctx);

        ps.set_float(params::ROUGHNESS, self.roughness);
        ps.set_float3(params::COLOR_TINT, self.color_tint);
        ps.set_float3(params::CAMERA_POSITION, camera.position());
        ps.set_float2(params::UV_SCALE, self.uv_scale);
        ps.set_float2(params::UV_OFFSET, self.uv_offset);
        ps.copy_all_buffer_data(ctx);

        for (name, texture) in &self.textures {
            ps.set_texture(ctx, name, *texture);
        }
        for (name, sampler) in &self.samplers {
            ps.set_sampler(ctx, name, *sampler);
        }
    }
}
