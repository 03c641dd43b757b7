//! Dense Cholesky factorization for small symmetric positive-definite systems
//!
//! Sized for GP training sets of a few hundred points; storage is a flat
//! row-major lower triangle.

use crate::config::defaults::{CHOLESKY_JITTER_GROWTH, CHOLESKY_JITTER_START, CHOLESKY_MAX_RETRIES};
use tracing::debug;

/// Failure of a numerical kernel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NumericalError {
    #[error("matrix not positive definite after {retries} jitter retries (last jitter {jitter:e})")]
    NotPositiveDefinite { retries: usize, jitter: f64 },
    #[error("non-finite {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Lower-triangular factor `L` with `A + jitter·I = L·Lᵀ`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cholesky {
    n: usize,
    l: Vec<f64>,
    jitter: f64,
}

impl Cholesky {
    /// Factor a symmetric matrix given row-major as `n × n`.
    ///
    /// On failure the diagonal is regularized with a jitter that starts at
    /// `CHOLESKY_JITTER_START × mean(diag)` and grows geometrically.
    pub fn factor(a: &[f64], n: usize) -> Result<Self, NumericalError> {
        if a.len() != n * n {
            return Err(NumericalError::DimensionMismatch {
                expected: n * n,
                got: a.len(),
            });
        }
        if let Some(bad) = a.iter().find(|v| !v.is_finite()) {
            return Err(NumericalError::NonFinite {
                what: "matrix entry",
                value: *bad,
            });
        }

        if let Some(l) = try_factor(a, n, 0.0) {
            return Ok(Self { n, l, jitter: 0.0 });
        }

        let mean_diag = if n == 0 {
            1.0
        } else {
            (0..n).map(|i| a[i * n + i].abs()).sum::<f64>() / n as f64
        };
        let mut jitter = CHOLESKY_JITTER_START * mean_diag.max(f64::MIN_POSITIVE);
        for attempt in 1..=CHOLESKY_MAX_RETRIES {
            if let Some(l) = try_factor(a, n, jitter) {
                debug!(attempt, jitter, "Cholesky succeeded with diagonal jitter");
                return Ok(Self { n, l, jitter });
            }
            if attempt < CHOLESKY_MAX_RETRIES {
                jitter *= CHOLESKY_JITTER_GROWTH;
            }
        }
        Err(NumericalError::NotPositiveDefinite {
            retries: CHOLESKY_MAX_RETRIES,
            jitter,
        })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    /// Diagonal regularization that was needed (0 when none).
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    fn at(&self, i: usize, j: usize) -> f64 {
        self.l[i * self.n + j]
    }

    /// Solve `L·y = b`.
    pub fn forward(&self, b: &[f64]) -> Vec<f64> {
        let mut y = vec![0.0; self.n];
        for i in 0..self.n {
            let s: f64 = (0..i).map(|k| self.at(i, k) * y[k]).sum();
            y[i] = (b[i] - s) / self.at(i, i);
        }
        y
    }

    /// Solve `Lᵀ·x = y`.
    pub fn backward(&self, y: &[f64]) -> Vec<f64> {
        let mut x = vec![0.0; self.n];
        for i in (0..self.n).rev() {
            let s: f64 = (i + 1..self.n).map(|k| self.at(k, i) * x[k]).sum();
            x[i] = (y[i] - s) / self.at(i, i);
        }
        x
    }

    /// Solve `A·x = b`.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>, NumericalError> {
        if b.len() != self.n {
            return Err(NumericalError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }
        Ok(self.backward(&self.forward(b)))
    }
}

fn try_factor(a: &[f64], n: usize, jitter: f64) -> Option<Vec<f64>> {
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let s: f64 = (0..j).map(|k| l[i * n + k] * l[j * n + k]).sum();
            if i == j {
                let d = a[i * n + i] + jitter - s;
                if d <= 0.0 || !d.is_finite() {
                    return None;
                }
                l[i * n + j] = d.sqrt();
            } else {
                l[i * n + j] = (a[i * n + j] - s) / l[j * n + j];
            }
        }
    }
    Some(l)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_spd_system() {
        // A = [[4, 2], [2, 3]], b = [2, 1] → x = [0.5, 0]
        let chol = Cholesky::factor(&[4.0, 2.0, 2.0, 3.0], 2).unwrap();
        assert_eq!(chol.jitter(), 0.0);
        let x = chol.solve(&[2.0, 1.0]).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
    }

    #[test]
    fn singular_matrix_gets_jitter() {
        // Rank one: [[1, 1], [1, 1]]
        let chol = Cholesky::factor(&[1.0, 1.0, 1.0, 1.0], 2).unwrap();
        assert!(chol.jitter() > 0.0);
    }

    #[test]
    fn indefinite_matrix_is_reported() {
        let err = Cholesky::factor(&[1.0, 0.0, 0.0, -5.0], 2).unwrap_err();
        assert!(matches!(err, NumericalError::NotPositiveDefinite { .. }));
    }

    #[test]
    fn non_finite_entries_are_rejected() {
        let err = Cholesky::factor(&[1.0, f64::NAN, f64::NAN, 1.0], 2).unwrap_err();
        assert!(matches!(err, NumericalError::NonFinite { .. }));
    }
}
