//! Shared types for the orrery renderer.
//!
//! # Invariants
//! - A derived transform quantity is recomputed iff its cache is stale.
//! - Position/scale changes stale the matrices only; rotation changes stale
//!   the matrices and the orientation basis.
//! - Mesh and material handles are plain indices; the arena that issued them
//!   owns the resource.

mod cache;
mod handle;
mod transform;

pub use cache::{CacheCell, Cached};
pub use handle::{MaterialHandle, MeshHandle};
pub use transform::{Basis, Transform, WorldMatrices};

pub fn crate_info() -> &'static str {
    "orrery-common v0.1.0"
}
