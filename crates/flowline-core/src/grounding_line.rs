//! Grounding-line localization.
//!
//! The grounding line sits where ice thickness drops to the flotation
//! thickness `c·b`. The search brackets the first such drop between two cell
//! centers, then intersects the two local linear profiles (ice and flotation
//! threshold) to place the line between them.

use serde::Serialize;

use crate::error::{FlowlineError, Result};
use crate::field::Field;

/// Relative threshold below which the ice and flotation slopes count as parallel.
const PARALLEL_SLOPE_TOLERANCE: f64 = 1e-12;

/// Flotation thickness for bedrock value `b` under density ratio `c`.
#[inline]
pub fn flotation_thickness(density_ratio: f64, bedrock: f64) -> f64 {
    density_ratio * bedrock
}

/// Located grounding line: the bracketing cell index and the crossing coordinate.
///
/// `index` is the first cell at or below flotation; `x` lies between the
/// centers of cells `index - 1` and `index`, so face `index` is the face the
/// mesh gets anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroundingLine {
    pub index: usize,
    pub x: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct GroundingLineLocator {
    density_ratio: f64,
}

impl GroundingLineLocator {
    pub fn new(density_ratio: f64) -> Self {
        Self { density_ratio }
    }

    pub fn density_ratio(&self) -> f64 {
        self.density_ratio
    }

    /// First index `i >= 1` with `h[i-1] > c·b[i-1]` and `h[i] <= c·b[i]`,
    /// scanning from the upstream end.
    pub fn crossing_index(&self, ice: &Field, bedrock: &Field) -> Result<usize> {
        ice.ensure_same_mesh(bedrock)?;
        let c = self.density_ratio;
        let h = ice.values();
        let b = bedrock.values();
        (1..h.len())
            .find(|&i| h[i - 1] > flotation_thickness(c, b[i - 1]) && h[i] <= flotation_thickness(c, b[i]))
            .ok_or(FlowlineError::NoGroundingLineFound)
    }

    /// Crossing bracket among the cells next to `around` only: bracket indices
    /// `around - 1 ..= around + 1`. `None` when resampling erased the bracket.
    pub fn crossing_near(&self, ice: &Field, bedrock: &Field, around: usize) -> Result<Option<usize>> {
        ice.ensure_same_mesh(bedrock)?;
        let c = self.density_ratio;
        let h = ice.values();
        let b = bedrock.values();
        let lo = around.saturating_sub(1).max(1);
        let hi = (around + 1).min(h.len().saturating_sub(1));
        Ok((lo..=hi).find(|&i| h[i - 1] > flotation_thickness(c, b[i - 1]) && h[i] <= flotation_thickness(c, b[i])))
    }

    /// Bracket the crossing and interpolate its exact position.
    pub fn locate(&self, ice: &Field, bedrock: &Field) -> Result<GroundingLine> {
        let index = self.crossing_index(ice, bedrock)?;
        let mesh = ice.mesh();
        let c = self.density_ratio;
        let w = mesh.cell_width();
        let x_up = mesh.center(index - 1);

        let (h0, h1) = (ice.get(index - 1), ice.get(index));
        let (f0, f1) = (
            flotation_thickness(c, bedrock.get(index - 1)),
            flotation_thickness(c, bedrock.get(index)),
        );

        // Lines in local coordinates s = x - x_up: h(s) = h0 + m_h·s, f(s) = f0 + m_f·s.
        let m_h = (h1 - h0) / w;
        let m_f = (f1 - f0) / w;
        let denom = m_h - m_f;
        let scale = m_h.abs().max(m_f.abs());
        if !denom.is_finite() || denom.abs() <= PARALLEL_SLOPE_TOLERANCE * scale {
            return Err(FlowlineError::AmbiguousCrossing { index });
        }
        let x = x_up + (f0 - h0) / denom;

        log::trace!("grounding line bracket [{}, {}] at x = {:.3}", index - 1, index, x);
        Ok(GroundingLine { index, x })
    }
}
