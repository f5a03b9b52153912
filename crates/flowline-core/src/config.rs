//! Run configuration: physical constants plus discretization and policy knobs.
//!
//! The config is an immutable value handed to the simulation loop; nothing in
//! the solver reads ambient state.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FlowlineError, Result};

/// Which crossing index the flotation clamp uses after the mesh shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampPolicy {
    /// Re-locate the bracket next to the anchored face on the shifted fields
    /// and clamp from there, or from the anchored face if none is left.
    #[default]
    Relocated,
    /// Clamp from the crossing index located on the canonical mesh at the
    /// start of the previous step.
    PreShift,
}

/// Condition on the downstream (seaward) face of the flowline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DownstreamBoundary {
    /// Zero diffusive flux through the last face.
    #[default]
    Natural,
    /// Thickness held at a fixed value on the last face.
    FixedThickness { thickness: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Gravitational acceleration `g`.
    pub gravity: f64,
    /// `c = (ρ_w - ρ_ice) / ρ_ice`; flotation thickness is `c·b`.
    pub density_ratio: f64,
    /// Effective ice viscosity parameter `ν`.
    pub viscosity: f64,
    /// Uniform surface mass balance `a0` (thickness per unit time).
    pub surface_mass_balance: f64,
    /// `dt`.
    pub time_step: f64,
    /// Target time horizon `T`.
    pub horizon: f64,
    /// Length of the canonical mesh, starting at the first profile distance.
    pub domain_length: f64,
    pub cell_count: usize,
    pub clamp_policy: ClampPolicy,
    pub downstream_boundary: DownstreamBoundary,
    /// Relative ∞-norm residual the per-step linear solve must reach.
    pub solver_tolerance: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            density_ratio: (1028.0 - 917.0) / 917.0,
            viscosity: 1.0e3,
            surface_mass_balance: 0.3,
            time_step: 1.0,
            horizon: 100.0,
            domain_length: 50_000.0,
            cell_count: 100,
            clamp_policy: ClampPolicy::default(),
            downstream_boundary: DownstreamBoundary::default(),
            solver_tolerance: 1e-9,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// `D0 = g / (3ν)`.
    pub fn diffusivity_scale(&self) -> f64 {
        self.gravity / (3.0 * self.viscosity)
    }

    /// `ceil(T / dt)`.
    pub fn step_count(&self) -> usize {
        (self.horizon / self.time_step).ceil() as usize
    }

    pub fn cell_width(&self) -> f64 {
        self.domain_length / self.cell_count as f64
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("gravity", self.gravity),
            ("viscosity", self.viscosity),
            ("time_step", self.time_step),
            ("horizon", self.horizon),
            ("domain_length", self.domain_length),
            ("solver_tolerance", self.solver_tolerance),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(FlowlineError::InvalidConfig(format!("{name} must be positive and finite, got {v}")));
            }
        }
        if !(self.density_ratio > 0.0 && self.density_ratio < 1.0) {
            return Err(FlowlineError::InvalidConfig(format!(
                "density_ratio must lie in (0, 1), got {}",
                self.density_ratio
            )));
        }
        if !self.surface_mass_balance.is_finite() {
            return Err(FlowlineError::InvalidConfig("surface_mass_balance must be finite".into()));
        }
        if self.cell_count < 2 {
            return Err(FlowlineError::InvalidConfig(format!(
                "cell_count must be at least 2 to bracket a grounding line, got {}",
                self.cell_count
            )));
        }
        if let DownstreamBoundary::FixedThickness { thickness } = self.downstream_boundary {
            if !thickness.is_finite() {
                return Err(FlowlineError::InvalidConfig("fixed downstream thickness must be finite".into()));
            }
        }
        Ok(())
    }
}
