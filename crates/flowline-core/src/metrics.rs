//! Comparison of a modelled thickness profile against a target profile.

use serde::Serialize;

use crate::error::Result;
use crate::field::Field;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Misfit {
    pub rmse: f64,
    pub max_abs: f64,
    /// Mean of `model - target`; positive means the model is too thick.
    pub bias: f64,
}

impl Misfit {
    pub fn between(model: &Field, target: &Field) -> Result<Self> {
        model.ensure_same_mesh(target)?;
        Ok(Self::of_values(model.values(), target.values()))
    }

    /// Pairwise misfit of two equally long, non-empty slices.
    pub(crate) fn of_values(model: &[f64], target: &[f64]) -> Self {
        let n = model.len() as f64;
        let (mut sq, mut max_abs, mut sum) = (0.0, 0.0_f64, 0.0);
        for (&m, &t) in model.iter().zip(target) {
            let d = m - t;
            sq += d * d;
            sum += d;
            max_abs = max_abs.max(d.abs());
        }
        Self { rmse: (sq / n).sqrt(), max_abs, bias: sum / n }
    }
}
