//! wgpu backend for the orrery renderer.
//!
//! [`WgpuDevice`] implements `RenderDevice` by replaying the recorded
//! command stream into wgpu render passes at present time.
//!
//! # Invariants
//! - Bind group 0 carries vertex uniforms, group 1 pixel uniforms and
//!   group 2 pixel textures and samplers.
//! - Uniform blocks reach the GPU only through committed snapshots.
//! - A clear never overwrites draws recorded before it.

mod gpu;
mod pipelines;
pub mod shaders;

pub use gpu::WgpuDevice;
