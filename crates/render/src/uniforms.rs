//! CPU-side mirror of WGSL uniform structs.
//!
//! Offsets follow the WGSL uniform address space rules: scalars align to 4,
//! `vec2` to 8, `vec3`/`vec4`/`mat4x4`/arrays to 16. A `vec3` occupies 12
//! bytes, so a following scalar packs into its fourth lane.

/// Type of one uniform member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    Float2,
    Float3,
    Float4,
    Matrix4,
    /// Array of `len` elements, each `stride` bytes (a multiple of 16).
    Array { stride: u32, len: u32 },
}

impl UniformKind {
    pub fn align(self) -> u32 {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Float2 => 8,
            UniformKind::Float3
            | UniformKind::Float4
            | UniformKind::Matrix4
            | UniformKind::Array { .. } => 16,
        }
    }

    pub fn size(self) -> u32 {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Float2 => 8,
            UniformKind::Float3 => 12,
            UniformKind::Float4 => 16,
            UniformKind::Matrix4 => 64,
            UniformKind::Array { stride, len } => stride * len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: u32,
}

/// Named, ordered members of one uniform block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    end: u32,
}

fn align_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a member at the next offset its alignment allows.
    pub fn with(mut self, name: &str, kind: UniformKind) -> Self {
        let offset = align_up(self.end, kind.align());
        self.end = offset + kind.size();
        self.fields.push(UniformField {
            name: name.to_string(),
            kind,
            offset,
        });
        self
    }

    pub fn float(self, name: &str) -> Self {
        self.with(name, UniformKind::Float)
    }

    pub fn int(self, name: &str) -> Self {
        self.with(name, UniformKind::Int)
    }

    pub fn float2(self, name: &str) -> Self {
        self.with(name, UniformKind::Float2)
    }

    pub fn float3(self, name: &str) -> Self {
        self.with(name, UniformKind::Float3)
    }

    pub fn float4(self, name: &str) -> Self {
        self.with(name, UniformKind::Float4)
    }

    pub fn matrix4(self, name: &str) -> Self {
        self.with(name, UniformKind::Matrix4)
    }

    pub fn array(self, name: &str, stride: u32, len: u32) -> Self {
        self.with(name, UniformKind::Array { stride, len })
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    /// Block size in bytes, rounded up to 16 and never zero.
    pub fn size(&self) -> u32 {
        align_up(self.end, 16).max(16)
    }
}

/// Staging bytes for one uniform block.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    layout: UniformLayout,
    bytes: Vec<u8>,
}

/// Outcome of a write into a [`UniformBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformWrite {
    Written,
    UnknownName,
    KindMismatch,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let bytes = vec![0; layout.size() as usize];
        Self { layout, bytes }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write a value whose kind must match the member exactly.
    pub fn write(&mut self, name: &str, kind: UniformKind, data: &[u8]) -> UniformWrite {
        let Some(field) = self.layout.field(name) else {
            return UniformWrite::UnknownName;
        };
        if field.kind != kind {
            return UniformWrite::KindMismatch;
        }
        let start = field.offset as usize;
        self.bytes[start..start + data.len()].copy_from_slice(data);
        UniformWrite::Written
    }

    /// Write raw bytes at the start of a member. Longer data is truncated to
    /// the member size; shorter data leaves the tail untouched.
    pub fn write_raw(&mut self, name: &str, data: &[u8]) -> UniformWrite {
        let Some(field) = self.layout.field(name) else {
            return UniformWrite::UnknownName;
        };
        let start = field.offset as usize;
        let len = data.len().min(field.kind.size() as usize);
        self.bytes[start..start + len].copy_from_slice(&data[..len]);
        UniformWrite::Written
    }

    /// Read back a member's bytes.
    pub fn read(&self, name: &str) -> Option<&[u8]> {
        let field = self.layout.field(name)?;
        let start = field.offset as usize;
        Some(&self.bytes[start..start + field.kind.size() as usize])
    }
}
