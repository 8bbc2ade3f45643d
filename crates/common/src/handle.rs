use serde::{Deserialize, Serialize};

/// A handle referencing a mesh in a scene's asset arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshHandle(pub u32);

/// A handle referencing a material in a scene's asset arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialHandle(pub u32);

impl MeshHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl MaterialHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
