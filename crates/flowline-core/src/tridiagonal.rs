use crate::error::{FlowlineError, Result};

/// Pivots smaller than this (relative to the row scale) are treated as singular.
const PIVOT_EPSILON: f64 = 1e-300;

/// Tridiagonal system `lower[i]·x[i-1] + diag[i]·x[i] + upper[i]·x[i+1] = rhs[i]`.
///
/// `lower[0]` and `upper[n-1]` are ignored.
#[derive(Debug, Clone)]
pub struct Tridiagonal {
    pub lower: Vec<f64>,
    pub diag: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Tridiagonal {
    pub fn zeros(n: usize) -> Self {
        Self { lower: vec![0.0; n], diag: vec![0.0; n], upper: vec![0.0; n] }
    }

    pub fn len(&self) -> usize {
        self.diag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diag.is_empty()
    }

    /// `A·x`.
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        let n = self.len();
        (0..n)
            .map(|i| {
                let mut sum = self.diag[i] * x[i];
                if i > 0 {
                    sum += self.lower[i] * x[i - 1];
                }
                if i + 1 < n {
                    sum += self.upper[i] * x[i + 1];
                }
                sum
            })
            .collect()
    }

    /// Largest row residual of `A·x - rhs`, relative to the magnitude of the
    /// terms in that row.
    pub fn relative_residual(&self, x: &[f64], rhs: &[f64]) -> f64 {
        let n = self.len();
        let ax = self.apply(x);
        let mut worst: f64 = 0.0;
        for i in 0..n {
            let mut scale = (self.diag[i] * x[i]).abs() + rhs[i].abs();
            if i > 0 {
                scale += (self.lower[i] * x[i - 1]).abs();
            }
            if i + 1 < n {
                scale += (self.upper[i] * x[i + 1]).abs();
            }
            let r = (ax[i] - rhs[i]).abs() / scale.max(f64::MIN_POSITIVE);
            worst = worst.max(r);
        }
        worst
    }

    /// Thomas algorithm. Fails on a vanishing pivot or a non-finite result.
    pub fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>> {
        let n = self.len();
        if rhs.len() != n {
            return Err(FlowlineError::StepSolveFailed {
                reason: format!("right-hand side has {} rows, matrix has {n}", rhs.len()),
            });
        }
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut b = self.diag.clone();
        let mut d = rhs.to_vec();

        // Forward sweep
        for i in 1..n {
            let pivot = b[i - 1];
            if !pivot.is_finite() || pivot.abs() < PIVOT_EPSILON {
                return Err(FlowlineError::StepSolveFailed {
                    reason: format!("singular pivot {pivot:e} at row {}", i - 1),
                });
            }
            let w = self.lower[i] / pivot;
            b[i] -= w * self.upper[i - 1];
            d[i] -= w * d[i - 1];
        }

        // Back substitution
        if !b[n - 1].is_finite() || b[n - 1].abs() < PIVOT_EPSILON {
            return Err(FlowlineError::StepSolveFailed {
                reason: format!("singular pivot {:e} at row {}", b[n - 1], n - 1),
            });
        }
        d[n - 1] /= b[n - 1];
        for i in (0..n - 1).rev() {
            d[i] = (d[i] - self.upper[i] * d[i + 1]) / b[i];
        }

        if let Some(i) = d.iter().position(|v| !v.is_finite()) {
            return Err(FlowlineError::StepSolveFailed { reason: format!("non-finite solution at row {i}") });
        }
        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn solves_known_system() {
        // [ 2 -1  0 ] [1]   [0]
        // [-1  2 -1 ] [2] = [0]
        // [ 0 -1  2 ] [3]   [4]
        let m = Tridiagonal {
            lower: vec![0.0, -1.0, -1.0],
            diag: vec![2.0, 2.0, 2.0],
            upper: vec![-1.0, -1.0, 0.0],
        };
        let x = m.solve(&[0.0, 0.0, 4.0]).unwrap();
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(x[2], 3.0, epsilon = 1e-14);
        assert!(m.relative_residual(&x, &[0.0, 0.0, 4.0]) < 1e-14);
    }

    #[test]
    fn single_row() {
        let m = Tridiagonal { lower: vec![0.0], diag: vec![4.0], upper: vec![0.0] };
        assert_eq!(m.solve(&[2.0]).unwrap(), vec![0.5]);
    }

    #[test]
    fn zero_pivot_fails() {
        let m = Tridiagonal::zeros(3);
        let err = m.solve(&[1.0, 1.0, 1.0]).unwrap_err();
        assert!(matches!(err, FlowlineError::StepSolveFailed { .. }));
    }

    #[test]
    fn nan_coefficients_fail() {
        let mut m = Tridiagonal::zeros(2);
        m.diag = vec![1.0, f64::NAN];
        assert!(m.solve(&[1.0, 1.0]).is_err());
    }

    #[test]
    fn rhs_length_is_checked() {
        let m = Tridiagonal { lower: vec![0.0; 2], diag: vec![1.0; 2], upper: vec![0.0; 2] };
        assert!(m.solve(&[1.0]).is_err());
    }
}
