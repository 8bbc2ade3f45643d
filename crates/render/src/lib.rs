//! Backend-agnostic scene rendering.
//!
//! Scene code records [`RenderCommand`]s into a [`RenderContext`]; a
//! [`RenderDevice`] owns GPU resources and replays the stream.
//!
//! # Invariants
//! - A frame runs clear, geometry, composite, present in that order.
//! - Entities draw in insertion order, each with its own transform and
//!   shared mesh and material.
//! - The three auxiliary targets always match the viewport size when a
//!   frame starts, and are replaced only as a complete set.
//! - Shader parameters reach the device only when a program commits them.

pub mod camera;
pub mod command;
pub mod config;
pub mod context;
pub mod demo;
pub mod entity;
pub mod error;
pub mod light;
pub mod material;
pub mod mesh;
pub mod orbit;
pub mod pipeline;
pub mod programs;
pub mod recording;
pub mod resource;
pub mod scene;
pub mod shader;
pub mod shading;
pub mod sky;
pub mod targets;
pub mod uniforms;

pub use camera::{Camera, CameraSettings, Projection};
pub use command::RenderCommand;
pub use config::{ConfigError, SceneConfig};
pub use context::{RenderContext, RenderDevice};
pub use entity::Entity;
pub use error::RenderError;
pub use light::{Light, LightKind, MAX_LIGHTS};
pub use material::Material;
pub use mesh::{Mesh, MeshData, Vertex};
pub use orbit::{OrbitSettings, OrbitSystem};
pub use pipeline::{FramePhase, FramePipeline, PostSettings};
pub use programs::{ShaderSources, StandardLayouts, StandardPrograms};
pub use recording::RecordingDevice;
pub use scene::{Scene, SceneAssets};
pub use shader::{ProgramDesc, ShaderProgram, ShaderStage};
pub use sky::{Sky, SkyColors};
pub use targets::AuxiliaryTargets;
pub use uniforms::{UniformBlock, UniformLayout};

pub fn crate_info() -> &'static str {
    "orrery-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
