//! Frame sequencing: clear, geometry, composite, present.

use crate::camera::Camera;
use crate::command::RenderCommand;
use crate::context::{RenderContext, RenderDevice};
use crate::error::RenderError;
use crate::programs::{StandardPrograms, params};
use crate::resource::{DepthId, RasterState, SamplerDesc, SamplerId, TargetId};
use crate::scene::Scene;
use crate::shader::{ShaderProgram, ShaderStage};
use crate::targets::AuxiliaryTargets;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Where the pipeline is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramePhase {
    /// Between frames.
    Idle,
    /// Targets cleared, nothing drawn yet.
    Cleared,
    /// Geometry pass recorded into the auxiliary targets.
    Geometry,
    /// Composite recorded into the backbuffer; ready to present.
    Composited,
}

/// Post-process constants and clear color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostSettings {
    pub clear_color: [f32; 4],
    pub normal_strength: f32,
    pub depth_strength: f32,
}

impl Default for PostSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            normal_strength: 5.0,
            depth_strength: 5.0,
        }
    }
}

/// Drives one frame at a time through the four phases in order.
pub struct FramePipeline {
    phase: FramePhase,
    targets: AuxiliaryTargets,
    fullscreen_vertex: Rc<ShaderProgram>,
    composite_pixel: Rc<ShaderProgram>,
    clamp_sampler: SamplerId,
    post: PostSettings,
}

impl FramePipeline {
    /// Create the auxiliary targets at the device's current viewport size.
    pub fn new<D: RenderDevice>(
        device: &mut D,
        programs: &StandardPrograms,
        post: PostSettings,
    ) -> Result<Self, RenderError> {
        let (width, height) = device.viewport();
        let targets = AuxiliaryTargets::create(device, width, height)?;
        let clamp_sampler = device.create_sampler(&SamplerDesc::clamp("composite_clamp"))?;
        Ok(Self {
            phase: FramePhase::Idle,
            targets,
            fullscreen_vertex: programs.fullscreen_vertex.clone(),
            composite_pixel: programs.composite_pixel.clone(),
            clamp_sampler,
            post,
        })
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn targets(&self) -> &AuxiliaryTargets {
        &self.targets
    }

    pub fn post_settings(&self) -> PostSettings {
        self.post
    }

    pub fn set_post_settings(&mut self, post: PostSettings) {
        self.post = post;
    }

    fn expect_phase(&self, expected: FramePhase) -> Result<(), RenderError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(RenderError::PhaseOrder {
                expected,
                found: self.phase,
            })
        }
    }

    /// Acquire the frame and clear the backbuffer, depth and auxiliary targets.
    pub fn begin_frame<D: RenderDevice>(&mut self, device: &mut D) -> Result<(), RenderError> {
        self.expect_phase(FramePhase::Idle)?;
        let viewport = device.viewport();
        if self.targets.size() != viewport {
            return Err(RenderError::TargetsOutOfDate {
                targets: self.targets.size(),
                viewport,
            });
        }
        device.begin_frame()?;

        let color = self.post.clear_color;
        device.record(RenderCommand::ClearTarget {
            target: TargetId::BACKBUFFER,
            color,
        });
        device.record(RenderCommand::ClearDepth {
            depth: DepthId::PRIMARY,
            value: 1.0,
        });
        for target in self.targets.all() {
            device.record(RenderCommand::ClearTarget {
                target: target.target,
                color,
            });
        }
        self.phase = FramePhase::Cleared;
        Ok(())
    }

    /// Draw the scene into the auxiliary targets, sky last.
    pub fn geometry_pass<C: RenderContext + ?Sized>(
        &mut self,
        ctx: &mut C,
        scene: &Scene,
        camera: &Camera,
        time: f32,
    ) -> Result<(), RenderError> {
        self.expect_phase(FramePhase::Cleared)?;
        ctx.record(RenderCommand::SetRenderTargets {
            colors: self.targets.all().map(|t| t.target).to_vec(),
            depth: Some(DepthId::PRIMARY),
        });
        ctx.record(RenderCommand::SetRasterState(RasterState::Opaque));
        scene.draw_geometry(ctx, camera, time);
        self.phase = FramePhase::Geometry;
        Ok(())
    }

    /// Resolve the auxiliary targets into the backbuffer with one
    /// full-screen triangle, then unbind them.
    pub fn composite<C: RenderContext + ?Sized>(&mut self, ctx: &mut C) -> Result<(), RenderError> {
        self.expect_phase(FramePhase::Geometry)?;
        ctx.record(RenderCommand::SetRenderTargets {
            colors: vec![TargetId::BACKBUFFER],
            depth: None,
        });
        ctx.record(RenderCommand::SetRasterState(RasterState::FullScreen));

        let vs = &self.fullscreen_vertex;
        let ps = &self.composite_pixel;
        vs.activate(ctx);
        ps.activate(ctx);

        ps.set_texture(ctx, params::PIXELS, self.targets.color.texture);
        ps.set_texture(ctx, params::NORMALS, self.targets.normals.texture);
        ps.set_texture(ctx, params::DEPTH, self.targets.depth.texture);
        ps.set_sampler(ctx, params::CLAMP_SAMPLER, self.clamp_sampler);

        let (width, height) = self.targets.size();
        ps.set_float(params::INV_WIDTH, 1.0 / width as f32);
        ps.set_float(params::INV_HEIGHT, 1.0 / height as f32);
        ps.set_float(params::NORMAL_STRENGTH, self.post.normal_strength);
        ps.set_float(params::DEPTH_STRENGTH, self.post.depth_strength);
        vs.copy_all_buffer_data(ctx);
        ps.copy_all_buffer_data(ctx);

        ctx.record(RenderCommand::Draw { vertex_count: 3 });
        ctx.record(RenderCommand::UnbindShaderResources {
            stage: ShaderStage::Pixel,
        });
        self.phase = FramePhase::Composited;
        Ok(())
    }

    /// Present, then bind the backbuffer and depth buffer again.
    pub fn present<D: RenderDevice>(&mut self, device: &mut D) -> Result<(), RenderError> {
        self.expect_phase(FramePhase::Composited)?;
        let presented = device.present();
        // The frame is over whether or not presentation succeeded.
        self.phase = FramePhase::Idle;
        presented?;
        // Immediate-mode devices keep this binding between frames. The wgpu
        // device replays per frame and drops it at the next `begin_frame`.
        device.record(RenderCommand::SetRenderTargets {
            colors: vec![TargetId::BACKBUFFER],
            depth: Some(DepthId::PRIMARY),
        });
        Ok(())
    }

    /// Run all four phases.
    pub fn render_frame<D: RenderDevice>(
        &mut self,
        device: &mut D,
        scene: &Scene,
        camera: &Camera,
        time: f32,
    ) -> Result<(), RenderError> {
        self.render_frame_with(device, scene, camera, time, |_| Ok(()))
    }

    /// Run all four phases; `overlay` runs between composite and present
    /// and may draw on top of the composited backbuffer.
    pub fn render_frame_with<D, F>(
        &mut self,
        device: &mut D,
        scene: &Scene,
        camera: &Camera,
        time: f32,
        overlay: F,
    ) -> Result<(), RenderError>
    where
        D: RenderDevice,
        F: FnOnce(&mut D) -> Result<(), RenderError>,
    {
        let result = self
            .begin_frame(device)
            .and_then(|()| self.geometry_pass(device, scene, camera, time))
            .and_then(|()| self.composite(device))
            .and_then(|()| overlay(device))
            .and_then(|()| self.present(device));
        if result.is_err() {
            self.phase = FramePhase::Idle;
        }
        result
    }

    /// Resize the backbuffer and regenerate the auxiliary targets, then
    /// update the camera projection. Returns `Ok(false)` for a zero size.
    ///
    /// On failure the previous targets stay in place and the camera is not
    /// touched; `begin_frame` refuses to run until a resize succeeds.
    pub fn resize<D: RenderDevice>(
        &mut self,
        device: &mut D,
        camera: &mut Camera,
        width: u32,
        height: u32,
    ) -> Result<bool, RenderError> {
        if self.phase != FramePhase::Idle {
            return Err(RenderError::ResizeDuringFrame(self.phase));
        }
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "ignoring zero-sized resize");
            return Ok(false);
        }

        device.resize_backbuffer(width, height)?;
        let targets = AuxiliaryTargets::create(device, width, height)?;
        self.targets.release(device);
        self.targets = targets;
        camera.update_projection_matrix(width as f32 / height as f32);
        tracing::debug!(width, height, "resized frame pipeline");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraSettings;
    use crate::entity::Entity;
    use crate::light::Light;
    use crate::material::Material;
    use crate::mesh::MeshData;
    use crate::programs::ShaderSources;
    use crate::recording::RecordingDevice;
    use crate::resource::{MeshId, TextureData};
    use crate::shading::{self, LitUniforms, SurfaceSample};
    use glam::Vec3;

    struct Fixture {
        device: RecordingDevice,
        programs: StandardPrograms,
        pipeline: FramePipeline,
        camera: Camera,
    }

    fn fixture(width: u32, height: u32) -> Fixture {
        let mut device = RecordingDevice::new(width, height);
        let programs = StandardPrograms::create(&mut device, &ShaderSources::default()).unwrap();
        let pipeline = FramePipeline::new(&mut device, &programs, PostSettings::default()).unwrap();
        let camera = Camera::new(&CameraSettings::default(), width as f32 / height as f32);
        Fixture {
            device,
            programs,
            pipeline,
            camera,
        }
    }

    fn material(f: &mut Fixture, name: &str) -> Material {
        let white = f
            .device
            .create_texture(&TextureData::solid("white", [255; 4], true))
            .unwrap();
        let mut m = Material::new(
            name,
            Vec3::ONE,
            0.5,
            f.programs.geometry_vertex.clone(),
            f.programs.lit_pixel.clone(),
        );
        m.add_texture(params::ALBEDO, white);
        m
    }

    fn scene_with_entities(f: &mut Fixture, count: usize) -> (Scene, Vec<MeshId>) {
        let mut scene = Scene::new(Vec3::splat(0.5));
        let mat = material(f, "m");
        let mat = scene.assets_mut().add_material(mat);
        let mut ids = Vec::new();
        for i in 0..count {
            let mesh = f
                .device
                .create_mesh(&MeshData::cube(&format!("cube{i}"), 1.0))
                .unwrap();
            ids.push(mesh.id);
            let handle = scene.assets_mut().add_mesh(mesh);
            scene.add_entity(Entity::new(handle, mat));
        }
        (scene, ids)
    }

    #[test]
    fn phases_must_run_in_order() {
        let mut f = fixture(64, 32);
        let scene = Scene::default();

        let err = f.pipeline.composite(&mut f.device).unwrap_err();
        assert!(matches!(
            err,
            RenderError::PhaseOrder {
                expected: FramePhase::Geometry,
                found: FramePhase::Idle
            }
        ));
        assert!(f.pipeline.present(&mut f.device).is_err());

        f.pipeline.begin_frame(&mut f.device).unwrap();
        assert!(f.pipeline.begin_frame(&mut f.device).is_err());
        assert!(f.pipeline.composite(&mut f.device).is_err());
        f.pipeline
            .geometry_pass(&mut f.device, &scene, &f.camera, 0.0)
            .unwrap();
        f.pipeline.composite(&mut f.device).unwrap();
        assert_eq!(f.pipeline.phase(), FramePhase::Composited);
        f.pipeline.present(&mut f.device).unwrap();
        assert_eq!(f.pipeline.phase(), FramePhase::Idle);
    }

    #[test]
    fn entities_draw_in_insertion_order_every_frame() {
        let mut f = fixture(64, 32);
        let (scene, ids) = scene_with_entities(&mut f, 3);
        for _ in 0..3 {
            f.device.take_commands();
            f.pipeline
                .render_frame(&mut f.device, &scene, &f.camera, 0.0)
                .unwrap();
            let drawn: Vec<MeshId> = f
                .device
                .commands()
                .iter()
                .filter_map(|c| match c {
                    RenderCommand::DrawIndexed { mesh, .. } => Some(*mesh),
                    _ => None,
                })
                .collect();
            assert_eq!(drawn, ids);
        }
    }

    #[test]
    fn clear_covers_backbuffer_depth_and_aux_targets() {
        let mut f = fixture(64, 32);
        f.device.take_commands();
        f.pipeline.begin_frame(&mut f.device).unwrap();
        let clears: Vec<&RenderCommand> = f.device.commands().iter().collect();
        assert_eq!(clears.len(), 5);
        assert!(matches!(
            clears[0],
            RenderCommand::ClearTarget {
                target: TargetId::BACKBUFFER,
                ..
            }
        ));
        assert!(matches!(clears[1], RenderCommand::ClearDepth { .. }));
        for (cmd, aux) in clears[2..].iter().zip(f.pipeline.targets().all()) {
            assert_eq!(
                **cmd,
                RenderCommand::ClearTarget {
                    target: aux.target,
                    color: [0.0, 0.0, 0.0, 1.0]
                }
            );
        }
    }

    #[test]
    fn geometry_pass_binds_aux_targets_with_depth() {
        let mut f = fixture(64, 32);
        let (scene, _) = scene_with_entities(&mut f, 1);
        f.pipeline.begin_frame(&mut f.device).unwrap();
        f.device.take_commands();
        f.pipeline
            .geometry_pass(&mut f.device, &scene, &f.camera, 1.5)
            .unwrap();
        let expected: Vec<TargetId> = f.pipeline.targets().all().map(|t| t.target).to_vec();
        assert_eq!(
            f.device.commands()[0],
            RenderCommand::SetRenderTargets {
                colors: expected,
                depth: Some(DepthId::PRIMARY)
            }
        );
        let lit = &f.programs.lit_pixel;
        assert_eq!(lit.staged(params::TIME).unwrap(), 1.5f32.to_le_bytes().to_vec());
    }

    #[test]
    fn composite_draws_one_triangle_then_unbinds() {
        let mut f = fixture(200, 100);
        let scene = Scene::default();
        f.pipeline.begin_frame(&mut f.device).unwrap();
        f.pipeline
            .geometry_pass(&mut f.device, &scene, &f.camera, 0.0)
            .unwrap();
        f.device.take_commands();
        f.pipeline.composite(&mut f.device).unwrap();

        let cmds = f.device.commands();
        assert_eq!(
            cmds[0],
            RenderCommand::SetRenderTargets {
                colors: vec![TargetId::BACKBUFFER],
                depth: None
            }
        );
        let n = cmds.len();
        assert_eq!(cmds[n - 2], RenderCommand::Draw { vertex_count: 3 });
        assert_eq!(
            cmds[n - 1],
            RenderCommand::UnbindShaderResources {
                stage: ShaderStage::Pixel
            }
        );
        assert!(!cmds.iter().any(|c| matches!(c, RenderCommand::DrawIndexed { .. })));

        let bound: Vec<_> = cmds
            .iter()
            .filter_map(|c| match c {
                RenderCommand::BindTexture { texture, .. } => Some(*texture),
                _ => None,
            })
            .collect();
        let targets = f.pipeline.targets();
        assert_eq!(
            bound,
            vec![
                targets.color.texture,
                targets.normals.texture,
                targets.depth.texture
            ]
        );

        let ps = &f.programs.composite_pixel;
        assert_eq!(ps.staged(params::INV_WIDTH).unwrap(), (1.0f32 / 200.0).to_le_bytes().to_vec());
        assert_eq!(ps.staged(params::NORMAL_STRENGTH).unwrap(), 5.0f32.to_le_bytes().to_vec());
    }

    #[test]
    fn present_rebinds_backbuffer_and_depth() {
        let mut f = fixture(64, 32);
        let scene = Scene::default();
        f.pipeline
            .render_frame(&mut f.device, &scene, &f.camera, 0.0)
            .unwrap();
        assert_eq!(f.device.presented_frames(), 1);
        let present_at = f.device.present_marks()[0];
        let cmds = f.device.commands();
        assert_eq!(cmds.len(), present_at + 1);
        assert_eq!(
            cmds[present_at],
            RenderCommand::SetRenderTargets {
                colors: vec![TargetId::BACKBUFFER],
                depth: Some(DepthId::PRIMARY)
            }
        );
    }

    #[test]
    fn resize_recreates_targets_and_projection_together() {
        let mut f = fixture(1280, 720);
        let scene = Scene::default();
        let old = *f.pipeline.targets();

        assert!(f
            .pipeline
            .resize(&mut f.device, &mut f.camera, 800, 600)
            .unwrap());
        assert_eq!(f.camera.aspect_ratio(), 800.0 / 600.0);
        let new = *f.pipeline.targets();
        for target in new.all() {
            assert_eq!((target.width, target.height), (800, 600));
        }
        for target in old.all() {
            assert!(!f.device.is_live(target.target));
        }
        assert_eq!(f.device.live_target_count(), 3);

        f.device.take_commands();
        f.pipeline
            .render_frame(&mut f.device, &scene, &f.camera, 0.0)
            .unwrap();
        let composite_inputs: Vec<_> = f
            .device
            .commands()
            .iter()
            .filter_map(|c| match c {
                RenderCommand::BindTexture { texture, .. } => Some(*texture),
                _ => None,
            })
            .collect();
        assert_eq!(
            composite_inputs,
            vec![new.color.texture, new.normals.texture, new.depth.texture]
        );
        assert_eq!(
            f.programs.composite_pixel.staged(params::INV_HEIGHT).unwrap(),
            (1.0f32 / 600.0).to_le_bytes().to_vec()
        );
    }

    #[test]
    fn failed_resize_keeps_previous_targets() {
        let mut f = fixture(1280, 720);
        let before = *f.pipeline.targets();
        let aspect = f.camera.aspect_ratio();

        // Allow one creation, fail the second.
        f.device.fail_target_creation_after(1);
        let err = f
            .pipeline
            .resize(&mut f.device, &mut f.camera, 800, 600)
            .unwrap_err();
        assert!(matches!(err, RenderError::TargetCreation { .. }));
        assert_eq!(*f.pipeline.targets(), before);
        assert_eq!(f.camera.aspect_ratio(), aspect);
        // The partial set was released; only the old three remain.
        assert_eq!(f.device.live_target_count(), 3);

        // Mismatched targets block the next frame until a retry succeeds.
        let scene = Scene::default();
        assert!(matches!(
            f.pipeline.render_frame(&mut f.device, &scene, &f.camera, 0.0),
            Err(RenderError::TargetsOutOfDate { .. })
        ));
        assert_eq!(f.pipeline.phase(), FramePhase::Idle);

        f.device.clear_failure_injection();
        assert!(f
            .pipeline
            .resize(&mut f.device, &mut f.camera, 800, 600)
            .unwrap());
        f.pipeline
            .render_frame(&mut f.device, &scene, &f.camera, 0.0)
            .unwrap();
    }

    #[test]
    fn zero_size_resize_is_ignored() {
        let mut f = fixture(640, 480);
        let before = *f.pipeline.targets();
        assert!(!f.pipeline.resize(&mut f.device, &mut f.camera, 0, 480).unwrap());
        assert_eq!(*f.pipeline.targets(), before);
        assert_eq!(f.device.viewport(), (640, 480));
    }

    #[test]
    fn resize_mid_frame_is_rejected() {
        let mut f = fixture(640, 480);
        f.pipeline.begin_frame(&mut f.device).unwrap();
        assert!(matches!(
            f.pipeline.resize(&mut f.device, &mut f.camera, 320, 240),
            Err(RenderError::ResizeDuringFrame(FramePhase::Cleared))
        ));
    }

    #[test]
    fn overlay_runs_between_composite_and_present() {
        let mut f = fixture(64, 32);
        let scene = Scene::default();
        let mut seen = None;
        f.pipeline
            .render_frame_with(&mut f.device, &scene, &f.camera, 0.0, |device| {
                seen = Some((device.presented_frames(), device.commands().len()));
                Ok(())
            })
            .unwrap();
        let (presented_before, len) = seen.unwrap();
        assert_eq!(presented_before, 0);
        assert!(matches!(
            f.device.commands()[len - 1],
            RenderCommand::UnbindShaderResources { .. }
        ));
    }

    #[test]
    fn ambient_only_scene_shades_to_ambient() {
        let mut f = fixture(64, 64);
        let mut scene = Scene::new(Vec3::splat(0.5));
        let mat = material(&mut f, "plain");
        let mat = scene.assets_mut().add_material(mat);
        let mesh = f.device.create_mesh(&MeshData::cube("cube", 1.0)).unwrap();
        let mesh = scene.assets_mut().add_mesh(mesh);
        scene.add_entity(Entity::new(mesh, mat));
        scene.add_light(Light::directional(Vec3::NEG_Y, Vec3::ONE, 0.0));
        scene.set_active_light_count(1);

        f.pipeline
            .render_frame(&mut f.device, &scene, &f.camera, 0.0)
            .unwrap();

        let lit_id = f.programs.lit_pixel.id();
        let committed = f
            .device
            .commands()
            .iter()
            .find_map(|c| match c {
                RenderCommand::CommitUniforms { program, data, .. } if *program == lit_id => {
                    Some(data.clone())
                }
                _ => None,
            })
            .unwrap();
        let uniforms = LitUniforms::from_bytes(&committed).unwrap();
        assert_eq!(uniforms.ambient, Vec3::splat(0.5));
        assert_eq!(uniforms.lights.len(), 1);

        // The white albedo texture under the entity, facing the light.
        let surface = SurfaceSample {
            albedo: Vec3::ONE,
            normal: Vec3::Y,
            roughness: 0.5,
            position: Vec3::ZERO,
        };
        let color = shading::shade(&uniforms, &surface);
        assert!(color.abs_diff_eq(Vec3::splat(0.5), 1e-6));

        // Interior pixels have identical neighbours, so the composite keeps them.
        let neighbourhood = shading::Neighbourhood::uniform(color, Vec3::Y, 10.0);
        let out = shading::composite(&neighbourhood, &f.pipeline.post_settings());
        assert!(out.abs_diff_eq(Vec3::splat(0.5), 1e-6));
    }
}
