//! Time-stepping driver.
//!
//! The loop owns the canonical mesh and the canonical ice field. Every step it
//! locates the grounding line, anchors a transient mesh on it, clamps floating
//! ice, diffuses, and maps the result back onto the canonical mesh. A step
//! that fails commits nothing: the canonical field stays at the last good
//! state and the run stops.
//!
//! ```text
//! Initializing ──► Stepping ──► Done
//!                     │
//!                     └──────► Failed
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::clamp::clamp_to_flotation;
use crate::config::{ClampPolicy, SimulationConfig};
use crate::diffusion::DiffusionStepper;
use crate::error::{FlowlineError, Result};
use crate::field::Field;
use crate::grounding_line::{GroundingLine, GroundingLineLocator};
use crate::mesh::Mesh;
use crate::metrics::Misfit;
use crate::profile::ProfileSet;
use crate::rebalance::rebalance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimulationState {
    /// Fields placed on the canonical mesh; no step attempted yet.
    Initializing,
    /// `step` is the index of the next step to run.
    Stepping { step: usize },
    Done,
    /// `step` is the index of the step that failed.
    Failed { step: usize },
}

/// Diagnostics for one committed step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepRecord {
    pub step: usize,
    /// Model time at the end of the step.
    pub time: f64,
    /// Grounding line located at the start of the step on the canonical mesh.
    pub grounding_line: GroundingLine,
    /// First cell of the shifted mesh the flotation clamp applied to.
    pub clamp_index: usize,
    /// Canonical ice volume after the step.
    pub volume: f64,
    pub clamped_cells: usize,
}

/// A fatal step failure together with the last committed state.
#[derive(Debug, Error)]
#[error("simulation failed at step {step}: {source}")]
pub struct SimulationFailure {
    pub step: usize,
    /// Canonical ice field as it stood before the failing step.
    pub last_valid: Field,
    #[source]
    pub source: FlowlineError,
}

/// Terminal output of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub mesh: Mesh,
    pub final_thickness: Vec<f64>,
    pub steps_completed: usize,
    pub time: f64,
    pub history: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub misfit: Option<Misfit>,
}

pub struct SimulationLoop {
    config: SimulationConfig,
    mesh: Mesh,
    ice: Field,
    bedrock: Field,
    target: Option<Field>,
    locator: GroundingLineLocator,
    stepper: DiffusionStepper,
    state: SimulationState,
    total_steps: usize,
    history: Vec<StepRecord>,
}

impl SimulationLoop {
    /// Build the canonical mesh from the first profile distance, the
    /// configured domain length and cell count, and interpolate the profile
    /// onto it.
    pub fn new(config: SimulationConfig, profile: &ProfileSet) -> Result<Self> {
        config.validate()?;
        profile.validate()?;
        let mesh = Mesh::spanning(profile.distance[0], config.domain_length, config.cell_count)?;
        let ice = profile.initial_thickness_on(mesh)?;
        let bedrock = profile.bedrock_on(mesh)?;
        let target = profile.target_thickness_on(mesh)?;
        Self::from_fields(config, ice, bedrock, target)
    }

    /// Start from fields already placed on a canonical mesh.
    pub fn from_fields(config: SimulationConfig, ice: Field, bedrock: Field, target: Option<Field>) -> Result<Self> {
        config.validate()?;
        ice.ensure_same_mesh(&bedrock)?;
        if let Some(t) = &target {
            ice.ensure_same_mesh(t)?;
        }
        let sim = Self {
            mesh: *ice.mesh(),
            locator: GroundingLineLocator::new(config.density_ratio),
            stepper: DiffusionStepper::from_config(&config),
            total_steps: config.step_count(),
            state: SimulationState::Initializing,
            history: Vec::new(),
            config,
            ice,
            bedrock,
            target,
        };
        log::info!(
            "flowline ready: {} cells of {:.1} from x = {:.1}, {} steps of dt = {}",
            sim.mesh.cell_count(),
            sim.mesh.cell_width(),
            sim.mesh.x0(),
            sim.total_steps,
            sim.config.time_step
        );
        Ok(sim)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Canonical ice thickness: the last committed state.
    pub fn ice(&self) -> &Field {
        &self.ice
    }

    pub fn bedrock(&self) -> &Field {
        &self.bedrock
    }

    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn steps_completed(&self) -> usize {
        self.history.len()
    }

    /// Run one step. Returns `Ok(None)` once the loop is in a terminal state.
    pub fn advance(&mut self) -> std::result::Result<Option<StepRecord>, SimulationFailure> {
        if self.state == SimulationState::Initializing {
            self.state = if self.total_steps == 0 { SimulationState::Done } else { SimulationState::Stepping { step: 0 } };
        }
        let SimulationState::Stepping { step } = self.state else {
            return Ok(None);
        };
        match self.step_once(step) {
            Ok((next, record)) => {
                log::debug!(
                    "step {step}: grounding line at {:.3} (cell {}), volume {:.4e}, {} cells clamped",
                    record.grounding_line.x,
                    record.grounding_line.index,
                    record.volume,
                    record.clamped_cells
                );
                self.ice = next;
                self.history.push(record);
                self.state = if step + 1 >= self.total_steps {
                    log::info!("flowline run done after {} steps", step + 1);
                    SimulationState::Done
                } else {
                    SimulationState::Stepping { step: step + 1 }
                };
                Ok(Some(record))
            }
            Err(source) => {
                log::warn!("step {step} failed, keeping the last committed state: {source}");
                self.state = SimulationState::Failed { step };
                Err(SimulationFailure { step, last_valid: self.ice.clone(), source })
            }
        }
    }

    /// Run up to `max_steps` further steps, stopping early at a terminal state.
    /// Returns the number of steps committed by this call.
    pub fn run_for(&mut self, max_steps: usize) -> std::result::Result<usize, SimulationFailure> {
        let mut done = 0;
        while done < max_steps && self.advance()?.is_some() {
            done += 1;
        }
        Ok(done)
    }

    /// Run every remaining step and produce the report.
    pub fn run(mut self) -> std::result::Result<SimulationReport, SimulationFailure> {
        while self.advance()?.is_some() {}
        Ok(self.report())
    }

    /// Snapshot of the committed state.
    pub fn report(&self) -> SimulationReport {
        // Target and ice share the canonical mesh, checked at construction.
        let misfit = self.target.as_ref().map(|t| Misfit::of_values(self.ice.values(), t.values()));
        SimulationReport {
            mesh: self.mesh,
            final_thickness: self.ice.values().to_vec(),
            steps_completed: self.steps_completed(),
            time: self.history.last().map_or(0.0, |r| r.time),
            history: self.history.clone(),
            misfit,
        }
    }

    /// Locate → anchor → clamp → diffuse → map back. Pure with respect to
    /// `self`: nothing is committed here.
    fn step_once(&self, step: usize) -> Result<(Field, StepRecord)> {
        let grounding_line = self.locator.locate(&self.ice, &self.bedrock)?;
        let shifted = rebalance(&self.ice, &self.bedrock, grounding_line)?;

        let clamp_index = match self.config.clamp_policy {
            // Crossing located at the start of the previous committed step.
            ClampPolicy::PreShift => self.history.last().map_or(grounding_line.index, |r| r.grounding_line.index),
            // Resampling can move the bracket by a cell or erase it; without a
            // bracket next to the anchored face, clamp from that face.
            ClampPolicy::Relocated => self
                .locator
                .crossing_near(&shifted.ice, &shifted.bedrock, grounding_line.index)?
                .unwrap_or(grounding_line.index),
        };
        let clamped = clamp_to_flotation(&shifted.ice, &shifted.bedrock, self.config.density_ratio, clamp_index)?;

        let stepped = self.stepper.step(&clamped.ice, &shifted.bedrock)?;
        let canonical = stepped.project_onto(&self.mesh);

        let record = StepRecord {
            step,
            time: (step + 1) as f64 * self.config.time_step,
            grounding_line,
            clamp_index,
            volume: canonical.volume(),
            clamped_cells: clamped.cells,
        };
        Ok((canonical, record))
    }
}
