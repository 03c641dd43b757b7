//! Gaussian-Process regressor: cutting speed → observed tool life
//!
//! RBF kernel `k(x, x') = σf²·exp(−(x − x')² / (2ℓ²))` with fixed
//! hyperparameters and a constant prior mean equal to the mean of the
//! training targets. The Cholesky factor of `K + σn²·I` is cached and
//! dropped whenever a pair is added.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::OnceLock;
use tracing::debug;

use super::linalg::{Cholesky, NumericalError};
use crate::config::defaults::Z_95;
use crate::config::GpConfig;
use crate::types::GpPrediction;

#[derive(Debug, Clone)]
struct Fitted {
    chol: Cholesky,
    alpha: Vec<f64>,
    prior_mean: f64,
}

/// Bounded-window GP over `(speed, tool_life)` pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianProcess {
    config: GpConfig,
    observations: VecDeque<(f64, f64)>,
    #[serde(skip)]
    fitted: OnceLock<Result<Fitted, NumericalError>>,
}

impl GaussianProcess {
    pub fn new(config: GpConfig) -> Self {
        Self {
            config,
            observations: VecDeque::new(),
            fitted: OnceLock::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.observations.iter()
    }

    /// Append a pair, evicting the oldest beyond the window.
    ///
    /// Non-finite pairs are rejected so they cannot poison the factor.
    pub fn add_observation(&mut self, x: f64, y: f64) -> Result<(), NumericalError> {
        if !x.is_finite() {
            return Err(NumericalError::NonFinite { what: "speed", value: x });
        }
        if !y.is_finite() {
            return Err(NumericalError::NonFinite { what: "tool life", value: y });
        }
        self.observations.push_back((x, y));
        while self.observations.len() > self.config.max_observations.max(1) {
            self.observations.pop_front();
        }
        self.fitted = OnceLock::new();
        Ok(())
    }

    fn kernel(&self, a: f64, b: f64) -> f64 {
        let l = self.config.length_scale;
        self.config.signal_variance * (-(a - b).powi(2) / (2.0 * l * l)).exp()
    }

    fn fit(&self) -> Result<Fitted, NumericalError> {
        let n = self.observations.len();
        let prior_mean = self.observations.iter().map(|(_, y)| y).sum::<f64>() / n as f64;

        let mut k = vec![0.0; n * n];
        for (i, (xi, _)) in self.observations.iter().enumerate() {
            for (j, (xj, _)) in self.observations.iter().enumerate() {
                k[i * n + j] = self.kernel(*xi, *xj);
            }
            k[i * n + i] += self.config.noise_variance;
        }
        let chol = Cholesky::factor(&k, n)?;
        let centered: Vec<f64> = self.observations.iter().map(|(_, y)| y - prior_mean).collect();
        let alpha = chol.solve(&centered)?;
        debug!(n, jitter = chol.jitter(), "GP factor recomputed");
        Ok(Fitted {
            chol,
            alpha,
            prior_mean,
        })
    }

    /// Posterior mean and variance of tool life at `speed`.
    ///
    /// With no data the prior (mean 0, variance σf²) is returned.
    pub fn predict(&self, speed: f64) -> Result<GpPrediction, NumericalError> {
        if self.observations.is_empty() {
            return Ok(prediction(0.0, self.config.signal_variance));
        }
        let fitted = self.fitted.get_or_init(|| self.fit()).as_ref().map_err(Clone::clone)?;

        let k_star: Vec<f64> = self.observations.iter().map(|(x, _)| self.kernel(speed, *x)).collect();
        let mean = fitted.prior_mean
            + k_star.iter().zip(&fitted.alpha).map(|(k, a)| k * a).sum::<f64>();
        let v = fitted.chol.forward(&k_star);
        let variance = self.config.signal_variance - v.iter().map(|x| x * x).sum::<f64>();

        if !mean.is_finite() {
            return Err(NumericalError::NonFinite {
                what: "GP mean",
                value: mean,
            });
        }
        Ok(prediction(mean, variance))
    }
}

fn prediction(mean: f64, variance: f64) -> GpPrediction {
    let variance = if variance.is_finite() { variance.max(0.0) } else { 0.0 };
    let std_dev = variance.sqrt();
    GpPrediction {
        mean,
        variance,
        std_dev,
        confidence_95: Z_95 * std_dev,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> GaussianProcess {
        let mut gp = GaussianProcess::new(GpConfig::default());
        for (x, y) in [(100.0, 60.0), (150.0, 35.0), (200.0, 20.0)] {
            gp.add_observation(x, y).unwrap();
        }
        gp
    }

    #[test]
    fn interpolates_between_observations() {
        let p = history().predict(175.0).unwrap();
        assert!(p.mean > 20.0 && p.mean < 35.0, "mean {}", p.mean);
        assert!(p.variance > 0.0);
        assert!((p.confidence_95 - Z_95 * p.std_dev).abs() < 1e-12);
    }

    #[test]
    fn variance_never_negative() {
        let mut gp = GaussianProcess::new(GpConfig {
            noise_variance: 1e-12,
            ..GpConfig::default()
        });
        for i in 0..20 {
            gp.add_observation(100.0 + f64::from(i) * 0.01, 30.0).unwrap();
        }
        for x in [50.0, 100.0, 100.1, 150.0, 400.0] {
            assert!(gp.predict(x).unwrap().variance >= 0.0);
        }
    }

    #[test]
    fn far_from_data_reverts_to_prior() {
        let gp = history();
        let p = gp.predict(1_000.0).unwrap();
        let mean_y = (60.0 + 35.0 + 20.0) / 3.0;
        assert!((p.mean - mean_y).abs() < 1e-6);
        assert!((p.variance - 400.0).abs() < 1e-6);
    }

    #[test]
    fn window_evicts_oldest() {
        let mut gp = GaussianProcess::new(GpConfig {
            max_observations: 3,
            ..GpConfig::default()
        });
        for i in 0..5 {
            gp.add_observation(f64::from(i), f64::from(i)).unwrap();
        }
        assert_eq!(gp.len(), 3);
        assert_eq!(gp.observations().next(), Some(&(2.0, 2.0)));
    }

    #[test]
    fn adding_data_refreshes_the_fit() {
        let mut gp = history();
        let before = gp.predict(175.0).unwrap();
        gp.add_observation(175.0, 28.0).unwrap();
        let after = gp.predict(175.0).unwrap();
        assert!(after.variance < before.variance);
    }

    #[test]
    fn rejects_non_finite_pairs() {
        let mut gp = GaussianProcess::new(GpConfig::default());
        assert!(gp.add_observation(f64::NAN, 1.0).is_err());
        assert!(gp.is_empty());
    }

    #[test]
    fn survives_json_roundtrip() {
        let gp = history();
        let json = serde_json::to_string(&gp).unwrap();
        let restored: GaussianProcess = serde_json::from_str(&json).unwrap();
        let a = gp.predict(120.0).unwrap();
        let b = restored.predict(120.0).unwrap();
        assert!((a.mean - b.mean).abs() < 1e-9);
    }
}
