//! Semi-implicit nonlinear diffusion of ice thickness.
//!
//! ```text
//! ∂h/∂t = ∂/∂x [ D(h, b) ∂h/∂x ] + a0,     D(h, b) = (D0 / dt) · (h + b)^3
//! ```
//!
//! Finite-volume, backward Euler. `D` is evaluated once from the thickness at
//! the start of the step and frozen, leaving one tridiagonal solve per step.
//! Cell rows read
//!
//! ```text
//! (w/dt + K_w + K_e)·h'_i − K_w·h'_{i-1} − K_e·h'_{i+1} = (w/dt)·h_i + a0·w
//! ```
//!
//! with face conductance `K = D_face / w` and `D_face` the arithmetic mean of
//! the adjacent cell diffusivities.

use crate::config::{DownstreamBoundary, SimulationConfig};
use crate::error::{FlowlineError, Result};
use crate::field::Field;
use crate::tridiagonal::Tridiagonal;

#[derive(Debug, Clone, Copy)]
pub struct DiffusionStepper {
    /// `D0 = g / (3ν)`.
    diffusivity_scale: f64,
    time_step: f64,
    surface_mass_balance: f64,
    downstream: DownstreamBoundary,
    tolerance: f64,
}

impl DiffusionStepper {
    pub fn new(
        diffusivity_scale: f64,
        time_step: f64,
        surface_mass_balance: f64,
        downstream: DownstreamBoundary,
        tolerance: f64,
    ) -> Self {
        Self { diffusivity_scale, time_step, surface_mass_balance, downstream, tolerance }
    }

    pub fn from_config(cfg: &SimulationConfig) -> Self {
        Self::new(
            cfg.diffusivity_scale(),
            cfg.time_step,
            cfg.surface_mass_balance,
            cfg.downstream_boundary,
            cfg.solver_tolerance,
        )
    }

    /// Cell diffusivity `(D0/dt)·(h+b)^3`. The total `h+b` is floored at zero
    /// so the coefficient never turns negative.
    #[inline]
    pub fn cell_diffusivity(&self, ice: f64, bedrock: f64) -> f64 {
        let total = (ice + bedrock).max(0.0);
        self.diffusivity_scale / self.time_step * total * total * total
    }

    /// Assemble the step system for the current `ice` on its own mesh.
    pub fn assemble(&self, ice: &Field, bedrock: &Field) -> Result<(Tridiagonal, Vec<f64>)> {
        ice.ensure_same_mesh(bedrock)?;
        let n = ice.len();
        let w = ice.mesh().cell_width();
        let capacity = w / self.time_step;

        let d: Vec<f64> = ice
            .values()
            .iter()
            .zip(bedrock.values())
            .map(|(&h, &b)| self.cell_diffusivity(h, b))
            .collect();

        let mut m = Tridiagonal::zeros(n);
        let mut rhs = vec![0.0; n];

        for i in 0..n {
            m.diag[i] += capacity;
            rhs[i] += capacity * ice.get(i) + self.surface_mass_balance * w;
        }

        // Interior faces. Face 0 (upstream) carries no flux.
        for i in 1..n {
            let k = 0.5 * (d[i - 1] + d[i]) / w;
            m.diag[i - 1] += k;
            m.diag[i] += k;
            m.upper[i - 1] -= k;
            m.lower[i] -= k;
        }

        match self.downstream {
            DownstreamBoundary::Natural => {}
            DownstreamBoundary::FixedThickness { thickness } => {
                // Half-cell distance from the last center to the outer face.
                let k = d[n - 1] / (0.5 * w);
                m.diag[n - 1] += k;
                rhs[n - 1] += k * thickness;
            }
        }

        Ok((m, rhs))
    }

    /// Advance `ice` by one time step. The result lives on the same mesh.
    pub fn step(&self, ice: &Field, bedrock: &Field) -> Result<Field> {
        let (system, rhs) = self.assemble(ice, bedrock)?;
        let next = system.solve(&rhs)?;
        let residual = system.relative_residual(&next, &rhs);
        if !(residual <= self.tolerance) {
            return Err(FlowlineError::StepSolveFailed {
                reason: format!("relative residual {residual:e} exceeds tolerance {:e}", self.tolerance),
            });
        }
        ice.with_values(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn stepper(a0: f64, downstream: DownstreamBoundary) -> DiffusionStepper {
        DiffusionStepper::new(0.01, 1.0, a0, downstream, 1e-9)
    }

    fn bump(n: usize) -> (Field, Field) {
        let mesh = Mesh::new(0.0, 1.0, n).unwrap();
        let ice: Vec<f64> = (0..n)
            .map(|i| {
                let x = i as f64 - n as f64 / 2.0;
                10.0 + 5.0 * (-x * x / 8.0).exp()
            })
            .collect();
        (Field::new("ice", mesh, ice).unwrap(), Field::constant("bed", mesh, 2.0))
    }

    #[test]
    fn diffusivity_grows_with_cube_and_floors_at_zero() {
        let s = stepper(0.0, DownstreamBoundary::Natural);
        assert_relative_eq!(s.cell_diffusivity(1.0, 1.0), 0.08);
        assert_relative_eq!(s.cell_diffusivity(3.0, 1.0), 0.64);
        assert_eq!(s.cell_diffusivity(1.0, -5.0), 0.0);
    }

    #[test]
    fn no_source_no_flux_does_not_create_volume() {
        let (h, b) = bump(30);
        let s = stepper(0.0, DownstreamBoundary::Natural);
        let mut cur = h.clone();
        for _ in 0..20 {
            let next = s.step(&cur, &b).unwrap();
            assert!(next.volume() <= cur.volume() * (1.0 + 1e-12), "volume grew");
            cur = next;
        }
        assert_relative_eq!(cur.volume(), h.volume(), max_relative = 1e-10);
    }

    #[test]
    fn diffusion_flattens_a_bump() {
        let (h, b) = bump(30);
        let s = stepper(0.0, DownstreamBoundary::Natural);
        let next = s.step(&h, &b).unwrap();
        let peak = |f: &Field| f.values().iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(peak(&next) < peak(&h));
        assert_eq!(next.mesh(), h.mesh());
    }

    #[test]
    fn uniform_source_adds_a0_dt_everywhere_on_flat_ice() {
        let mesh = Mesh::new(0.0, 2.0, 8).unwrap();
        let h = Field::constant("ice", mesh, 50.0);
        let b = Field::constant("bed", mesh, 0.0);
        let next = stepper(0.3, DownstreamBoundary::Natural).step(&h, &b).unwrap();
        for &v in next.values() {
            assert_abs_diff_eq!(v, 50.3, epsilon = 1e-10);
        }
    }

    #[test]
    fn fixed_downstream_thickness_pulls_last_cell() {
        let mesh = Mesh::new(0.0, 1.0, 10).unwrap();
        let h = Field::constant("ice", mesh, 20.0);
        let b = Field::constant("bed", mesh, 0.0);
        let s = stepper(0.0, DownstreamBoundary::FixedThickness { thickness: 5.0 });
        let next = s.step(&h, &b).unwrap();
        assert!(next.get(9) < 20.0);
        assert!(next.get(9) > 5.0);
        assert!(next.volume() < h.volume());
        // Upstream end feels it least.
        assert!(next.get(0) >= next.get(9));
    }

    #[test]
    fn nan_thickness_fails_the_solve() {
        let mesh = Mesh::new(0.0, 1.0, 4).unwrap();
        let h = Field::new("ice", mesh, vec![1.0, f64::NAN, 1.0, 1.0]).unwrap();
        let b = Field::constant("bed", mesh, 1.0);
        let err = stepper(0.0, DownstreamBoundary::Natural).step(&h, &b).unwrap_err();
        assert!(matches!(err, FlowlineError::StepSolveFailed { .. }));
    }
}
