use crate::pipeline::FramePhase;

/// Errors from render resource management and frame sequencing.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create {label} target ({width}x{height}): {reason}")]
    TargetCreation {
        label: String,
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("render target size must be non-zero, got {width}x{height}")]
    InvalidTargetSize { width: u32, height: u32 },
    #[error("frame phase out of order: expected {expected:?}, found {found:?}")]
    PhaseOrder {
        expected: FramePhase,
        found: FramePhase,
    },
    #[error("cannot resize during the {0:?} phase of a frame")]
    ResizeDuringFrame(FramePhase),
    #[error("auxiliary targets are {targets:?} but the viewport is {viewport:?}")]
    TargetsOutOfDate {
        targets: (u32, u32),
        viewport: (u32, u32),
    },
    #[error("presentation surface lost")]
    SurfaceLost,
    #[error("failed to create shader program {label}: {reason}")]
    ProgramCreation { label: String, reason: String },
    #[error("failed to create {kind} {label}: {reason}")]
    ResourceCreation {
        kind: &'static str,
        label: String,
        reason: String,
    },
    #[error("render backend error: {0}")]
    Backend(String),
}
