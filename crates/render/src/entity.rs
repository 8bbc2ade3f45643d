use crate::camera::Camera;
use crate::context::RenderContext;
use crate::scene::SceneAssets;
use orrery_common::{MaterialHandle, MeshHandle, Transform};

/// A drawable object: its own transform plus shared mesh and material.
#[derive(Debug, Clone)]
pub struct Entity {
    pub transform: Transform,
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
}

impl Entity {
    pub fn new(mesh: MeshHandle, material: MaterialHandle) -> Self {
        Self {
            transform: Transform::default(),
            mesh,
            material,
        }
    }

    /// Bind the material for this entity's transform and draw its mesh.
    ///
    /// Returns false (and draws nothing) if a handle does not resolve.
    pub fn draw<C: RenderContext + ?Sized>(
        &self,
        ctx: &mut C,
        camera: &Camera,
        assets: &SceneAssets,
    ) -> bool {
        let (Some(mesh), Some(material)) = (assets.mesh(self.mesh), assets.material(self.material))
        else {
            tracing::warn!(mesh = ?self.mesh, material = ?self.material, "skipping entity with dangling handle");
            return false;
        };
        material.set_up_shaders(ctx, &self.transform, camera);
        mesh.draw(ctx);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraSettings;
    use crate::command::RenderCommand;
    use crate::material::Material;
    use crate::mesh::Mesh;
    use crate::programs::{ShaderSources, StandardPrograms};
    use crate::recording::RecordingDevice;
    use crate::resource::MeshId;
    use glam::Vec3;

    fn assets(device: &mut RecordingDevice) -> SceneAssets {
        let programs = StandardPrograms::create(device, &ShaderSources::default()).unwrap();
        let mut assets = SceneAssets::default();
        assets.add_mesh(Mesh {
            id: MeshId(40),
            vertex_count: 24,
            index_count: 36,
        });
        assets.add_material(Material::new(
            "stone",
            Vec3::ONE,
            0.5,
            programs.geometry_vertex.clone(),
            programs.lit_pixel.clone(),
        ));
        assets
    }

    #[test]
    fn draw_binds_material_then_draws_mesh() {
        let mut device = RecordingDevice::new(64, 64);
        let assets = assets(&mut device);
        let camera = Camera::new(&CameraSettings::default(), 1.0);
        device.take_commands();

        let entity = Entity::new(MeshHandle(0), MaterialHandle(0));
        assert!(entity.draw(&mut device, &camera, &assets));
        assert_eq!(
            device.commands().last(),
            Some(&RenderCommand::DrawIndexed {
                mesh: MeshId(40),
                index_count: 36,
            })
        );
        assert!(
            device
                .commands()
                .iter()
                .any(|c| matches!(c, RenderCommand::CommitUniforms { .. }))
        );
    }

    #[test]
    fn dangling_handles_draw_nothing() {
        let mut device = RecordingDevice::new(64, 64);
        let assets = assets(&mut device);
        let camera = Camera::new(&CameraSettings::default(), 1.0);
        device.take_commands();

        let missing_material = Entity::new(MeshHandle(0), MaterialHandle(3));
        assert!(!missing_material.draw(&mut device, &camera, &assets));
        let missing_mesh = Entity::new(MeshHandle(9), MaterialHandle(0));
        assert!(!missing_mesh.draw(&mut device, &camera, &assets));
        assert!(device.commands().is_empty());
    }
}
