//! Error taxonomy for the flowline solver.
//!
//! Every variant is fatal for the step that raised it. The simulation loop
//! never retries; it stops and reports the last committed state.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowlineError {
    /// The profile is grounded everywhere or floating everywhere.
    #[error("no grounding line found: ice never drops to flotation thickness along the flowline")]
    NoGroundingLineFound,

    /// Ice and flotation lines are parallel across the bracketing cells.
    #[error("ambiguous grounding-line crossing at cell {index}: ice and flotation slopes are parallel")]
    AmbiguousCrossing { index: usize },

    #[error("diffusion step solve failed: {reason}")]
    StepSolveFailed { reason: String },

    /// A value array does not match the length of the mesh it is placed on.
    #[error("projection domain mismatch: mesh has {expected} cells, field has {found} values")]
    ProjectionDomainMismatch { expected: usize, found: usize },

    #[error("fields '{left}' and '{right}' live on different meshes")]
    MeshMismatch { left: String, right: String },

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowlineError>;
