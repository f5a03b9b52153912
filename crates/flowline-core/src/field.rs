use serde::Serialize;

use crate::error::{FlowlineError, Result};
use crate::mesh::Mesh;

/// Above this many cells, reprojection is spread over the rayon pool when the
/// `threading` feature is enabled.
#[cfg(feature = "threading")]
const PARALLEL_PROJECTION_MIN_CELLS: usize = 4096;

/// A named scalar sampled at the cell centers of exactly one [`Mesh`].
///
/// Fields are immutable: every operation that changes values or moves the
/// field to another mesh returns a new `Field`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    name: String,
    mesh: Mesh,
    values: Vec<f64>,
}

impl Field {
    /// Wrap `values` as a field on `mesh`. The length must equal the cell count.
    pub fn new(name: impl Into<String>, mesh: Mesh, values: Vec<f64>) -> Result<Self> {
        if values.len() != mesh.cell_count() {
            return Err(FlowlineError::ProjectionDomainMismatch {
                expected: mesh.cell_count(),
                found: values.len(),
            });
        }
        Ok(Self { name: name.into(), mesh, values })
    }

    /// Uniform field.
    pub fn constant(name: impl Into<String>, mesh: Mesh, value: f64) -> Self {
        Self { name: name.into(), mesh, values: vec![value; mesh.cell_count()] }
    }

    /// Interpolate raw `(xs, ys)` samples onto the cell centers of `mesh`.
    ///
    /// `xs` must be strictly increasing. Centers outside `[xs[0], xs[n-1]]`
    /// take the nearest end sample.
    pub fn from_samples(name: impl Into<String>, mesh: Mesh, xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(FlowlineError::ProjectionDomainMismatch { expected: xs.len(), found: ys.len() });
        }
        if xs.is_empty() {
            return Err(FlowlineError::InvalidProfile("cannot interpolate from zero samples".into()));
        }
        let values = project_values(xs, ys, &mesh);
        Ok(Self { name: name.into(), mesh, values })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        self.values[i]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Same name and mesh, new values.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        Self::new(self.name.clone(), self.mesh, values)
    }

    /// Piecewise-linear value at `x`, clamped to the end cells outside the
    /// range of cell centers.
    pub fn sample(&self, x: f64) -> f64 {
        interp_clamped(&self.mesh.centers(), &self.values, x)
    }

    /// Resample onto the centers of `target` by piecewise-linear interpolation
    /// over this field's cell-center samples. No extrapolation: queries beyond
    /// the outermost centers take the boundary value.
    pub fn project_onto(&self, target: &Mesh) -> Self {
        if *target == self.mesh {
            return self.clone();
        }
        let values = project_values(&self.mesh.centers(), &self.values, target);
        Self { name: self.name.clone(), mesh: *target, values }
    }

    /// Integral over the mesh: `Σ v[i]·w`.
    pub fn volume(&self) -> f64 {
        self.values.iter().sum::<f64>() * self.mesh.cell_width()
    }

    /// Fails unless both fields live on the same mesh.
    pub fn ensure_same_mesh(&self, other: &Field) -> Result<()> {
        if self.mesh != other.mesh {
            return Err(FlowlineError::MeshMismatch {
                left: self.name.clone(),
                right: other.name.clone(),
            });
        }
        if self.values.len() != other.values.len() {
            return Err(FlowlineError::ProjectionDomainMismatch {
                expected: self.values.len(),
                found: other.values.len(),
            });
        }
        Ok(())
    }
}

#[cfg(not(feature = "threading"))]
fn project_values(xs: &[f64], ys: &[f64], target: &Mesh) -> Vec<f64> {
    (0..target.cell_count())
        .map(|i| interp_clamped(xs, ys, target.center(i)))
        .collect()
}

#[cfg(feature = "threading")]
fn project_values(xs: &[f64], ys: &[f64], target: &Mesh) -> Vec<f64> {
    use rayon::prelude::*;
    if target.cell_count() < PARALLEL_PROJECTION_MIN_CELLS {
        return (0..target.cell_count())
            .map(|i| interp_clamped(xs, ys, target.center(i)))
            .collect();
    }
    (0..target.cell_count())
        .into_par_iter()
        .map(|i| interp_clamped(xs, ys, target.center(i)))
        .collect()
}

/// Linear interpolation of `(xs, ys)` at `x` with constant extension past
/// either end. `xs` must be strictly increasing and non-empty; every caller
/// passes a mesh's centers or samples already checked by `from_samples`.
fn interp_clamped(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    debug_assert!(n > 0 && ys.len() == n);
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    // First index with xs[hi] > x; 1 <= hi <= n-1 here.
    let hi = xs.partition_point(|&v| v <= x);
    let lo = hi - 1;
    let t = (x - xs[lo]) / (xs[hi] - xs[lo]);
    ys[lo] + t * (ys[hi] - ys[lo])
}
