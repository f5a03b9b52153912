//! Marine-terminating glacier flowline with a moving grounding line.
//!
//! Ice thickness along a 1-D flowline evolves under shallow-ice nonlinear
//! diffusion. Every step the mesh is re-anchored so the grounding line sits on
//! a cell face:
//!
//! ```text
//! locate grounding line ─► anchor mesh ─► reproject ─► clamp floating ice
//!        ▲                                                   │
//!        └──── map back to canonical mesh ◄── diffuse ◄──────┘
//! ```
pub mod clamp;
pub mod config;
pub mod diffusion;
pub mod error;
pub mod field;
pub mod grounding_line;
pub mod mesh;
pub mod metrics;
pub mod profile;
pub mod rebalance;
pub mod simulation;
pub mod tridiagonal;

pub use config::{ClampPolicy, DownstreamBoundary, SimulationConfig};
pub use error::{FlowlineError, Result};
pub use field::Field;
pub use grounding_line::{GroundingLine, GroundingLineLocator};
pub use mesh::Mesh;
pub use metrics::Misfit;
pub use profile::ProfileSet;
pub use simulation::{SimulationFailure, SimulationLoop, SimulationReport, SimulationState, StepRecord};
