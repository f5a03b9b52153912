use serde::Serialize;

use crate::error::{FlowlineError, Result};

/// A uniform 1-D finite-volume mesh along the flowline.
///
/// Cell `i` spans `[x0 + i·w, x0 + (i+1)·w]`. Face `i` is the boundary between
/// cells `i-1` and `i`, so faces run `0..=cell_count`.
/// A mesh is a plain value: rebuilding it yields a new mesh, never a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Mesh {
    x0: f64,
    cell_width: f64,
    cell_count: usize,
}

impl Mesh {
    pub fn new(x0: f64, cell_width: f64, cell_count: usize) -> Result<Self> {
        if !x0.is_finite() {
            return Err(FlowlineError::InvalidMesh(format!("origin must be finite, got {x0}")));
        }
        if !(cell_width.is_finite() && cell_width > 0.0) {
            return Err(FlowlineError::InvalidMesh(format!(
                "cell width must be positive and finite, got {cell_width}"
            )));
        }
        if cell_count == 0 {
            return Err(FlowlineError::InvalidMesh("cell count must be at least 1".into()));
        }
        Ok(Self { x0, cell_width, cell_count })
    }

    /// Mesh of `cell_count` equal cells covering `[x0, x0 + length]`.
    pub fn spanning(x0: f64, length: f64, cell_count: usize) -> Result<Self> {
        if cell_count == 0 {
            return Err(FlowlineError::InvalidMesh("cell count must be at least 1".into()));
        }
        Self::new(x0, length / cell_count as f64, cell_count)
    }

    #[inline]
    pub fn x0(&self) -> f64 {
        self.x0
    }

    #[inline]
    pub fn cell_width(&self) -> f64 {
        self.cell_width
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    pub fn length(&self) -> f64 {
        self.cell_width * self.cell_count as f64
    }

    /// Downstream end of the mesh (the last face).
    pub fn x_end(&self) -> f64 {
        self.face(self.cell_count)
    }

    #[inline]
    pub fn center(&self, i: usize) -> f64 {
        self.x0 + (i as f64 + 0.5) * self.cell_width
    }

    #[inline]
    pub fn face(&self, i: usize) -> f64 {
        self.x0 + i as f64 * self.cell_width
    }

    pub fn centers(&self) -> Vec<f64> {
        (0..self.cell_count).map(|i| self.center(i)).collect()
    }

    pub fn faces(&self) -> Vec<f64> {
        (0..=self.cell_count).map(|i| self.face(i)).collect()
    }

    /// Rigidly translate the mesh so that face `face_index` lands on `x`.
    ///
    /// Width and count are preserved: `new.x0 = x0 + (x - face(face_index))`.
    pub fn shifted_to_face(&self, face_index: usize, x: f64) -> Result<Self> {
        if face_index > self.cell_count {
            return Err(FlowlineError::InvalidMesh(format!(
                "face index {face_index} out of range (mesh has {} faces)",
                self.cell_count + 1
            )));
        }
        Self::new(self.x0 + (x - self.face(face_index)), self.cell_width, self.cell_count)
    }
}
