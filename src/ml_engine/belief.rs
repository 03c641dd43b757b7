//! Conjugate Gaussian beliefs over per-parameter correction multipliers
//!
//! A multiplier of 1.0 means "the physics baseline was right". Operators
//! report what they actually ran; the ratio `actual / recommended` is a noisy
//! observation of the multiplier and is folded in with the Gaussian-Gaussian
//! conjugate update. Variance never grows.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::BayesConfig;
use crate::types::{AdaptedParameter, Candidate, FeedbackOutcome, Gaussian, ParameterConfidence};

/// Rejected feedback.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedbackError {
    #[error("recommended {parameter} must be finite and > 0 (got {value})")]
    InvalidRecommended { parameter: AdaptedParameter, value: f64 },
    #[error("actual {parameter} must be finite and > 0 (got {value})")]
    InvalidActual { parameter: AdaptedParameter, value: f64 },
    #[error("observation variance must be finite and > 0 (got {0})")]
    InvalidObservationVariance(f64),
}

/// One operator report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub parameter: AdaptedParameter,
    pub recommended: f64,
    pub actual_used: f64,
    pub outcome: FeedbackOutcome,
    pub recorded_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(
        parameter: AdaptedParameter,
        recommended: f64,
        actual_used: f64,
        outcome: FeedbackOutcome,
    ) -> Self {
        Self {
            parameter,
            recommended,
            actual_used,
            outcome,
            recorded_at: Utc::now(),
        }
    }
}

/// Posterior per adapted parameter, owned by one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefState {
    beliefs: BTreeMap<AdaptedParameter, Gaussian>,
    #[serde(default)]
    observations: u64,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl Default for BeliefState {
    fn default() -> Self {
        Self::new(&BayesConfig::default())
    }
}

impl BeliefState {
    /// Every parameter starts at the configured prior.
    pub fn new(config: &BayesConfig) -> Self {
        let prior = Gaussian {
            mean: config.prior_mean,
            variance: config.prior_variance,
        };
        Self {
            beliefs: AdaptedParameter::ALL.iter().map(|p| (*p, prior)).collect(),
            observations: 0,
            updated_at: None,
        }
    }

    pub fn get(&self, parameter: AdaptedParameter) -> Gaussian {
        self.beliefs.get(&parameter).copied().unwrap_or(Gaussian {
            mean: 1.0,
            variance: 0.0,
        })
    }

    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Conjugate update with a direct multiplier observation.
    pub fn observe(
        &mut self,
        parameter: AdaptedParameter,
        observed: f64,
        obs_variance: f64,
    ) -> Result<Gaussian, FeedbackError> {
        if !obs_variance.is_finite() || obs_variance <= 0.0 {
            return Err(FeedbackError::InvalidObservationVariance(obs_variance));
        }
        let prior = self.get(parameter);
        let gain = prior.variance / (prior.variance + obs_variance);
        let posterior = Gaussian {
            mean: prior.mean + gain * (observed - prior.mean),
            variance: (1.0 - gain) * prior.variance,
        };
        self.beliefs.insert(parameter, posterior);
        self.observations += 1;
        self.updated_at = Some(Utc::now());
        debug!(
            %parameter,
            observed,
            gain,
            mean = posterior.mean,
            variance = posterior.variance,
            "Belief updated"
        );
        Ok(posterior)
    }

    /// Fold in one operator report.
    ///
    /// Failed cuts use a wider observation variance and shrink the observed
    /// ratio: the operator's value did not work, so the truth lies lower.
    pub fn update(
        &mut self,
        config: &BayesConfig,
        parameter: AdaptedParameter,
        recommended: f64,
        actual_used: f64,
        outcome: FeedbackOutcome,
    ) -> Result<Gaussian, FeedbackError> {
        if !recommended.is_finite() || recommended <= 0.0 {
            return Err(FeedbackError::InvalidRecommended {
                parameter,
                value: recommended,
            });
        }
        if !actual_used.is_finite() || actual_used <= 0.0 {
            return Err(FeedbackError::InvalidActual {
                parameter,
                value: actual_used,
            });
        }
        let ratio = actual_used / recommended;
        let (observed, obs_variance) = match outcome {
            FeedbackOutcome::Success => (ratio, config.obs_variance_success),
            FeedbackOutcome::Acceptable => (ratio, config.obs_variance_acceptable),
            FeedbackOutcome::ToolBreakage | FeedbackOutcome::Chatter | FeedbackOutcome::PoorFinish => {
                (ratio * config.failure_shrink, config.obs_variance_failure)
            }
        };
        self.observe(parameter, observed, obs_variance)
    }

    /// Scale a baseline by the posterior means.
    ///
    /// Returns the raw scaled position; callers re-clamp it to the envelope.
    pub fn adjust_recommendation(&self, baseline: &Candidate) -> ([f64; 4], Vec<ParameterConfidence>) {
        let speed = self.get(AdaptedParameter::Speed).mean;
        let feed = self.get(AdaptedParameter::Feed).mean;
        let doc = self.get(AdaptedParameter::Doc).mean;
        let position = [
            baseline.vc * speed,
            baseline.fz * feed,
            baseline.ap * doc,
            baseline.ae,
        ];
        (position, self.confidence())
    }

    /// Scale a baseline by one posterior draw per parameter.
    ///
    /// Confidence entries carry the drawn multiplier instead of the mean.
    pub fn explore_recommendation<R: Rng + ?Sized>(
        &self,
        baseline: &Candidate,
        rng: &mut R,
    ) -> ([f64; 4], Vec<ParameterConfidence>) {
        let draws = self.thompson_sample(rng);
        let draw = |p: AdaptedParameter| draws.get(&p).copied().unwrap_or(1.0).max(0.0);
        let position = [
            baseline.vc * draw(AdaptedParameter::Speed),
            baseline.fz * draw(AdaptedParameter::Feed),
            baseline.ap * draw(AdaptedParameter::Doc),
            baseline.ae,
        ];
        let confidence = self
            .confidence()
            .into_iter()
            .map(|c| ParameterConfidence {
                multiplier: draw(c.parameter),
                ..c
            })
            .collect();
        (position, confidence)
    }

    /// `1 − sqrt(variance)` per parameter, clamped to [0, 1].
    pub fn confidence(&self) -> Vec<ParameterConfidence> {
        AdaptedParameter::ALL
            .iter()
            .map(|p| {
                let g = self.get(*p);
                ParameterConfidence {
                    parameter: *p,
                    multiplier: g.mean,
                    confidence: (1.0 - g.variance.max(0.0).sqrt()).clamp(0.0, 1.0),
                }
            })
            .collect()
    }

    /// Draw one multiplier per parameter from the posterior.
    pub fn thompson_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BTreeMap<AdaptedParameter, f64> {
        AdaptedParameter::ALL
            .iter()
            .map(|p| {
                let g = self.get(*p);
                let draw = Normal::new(g.mean, g.variance.max(0.0).sqrt())
                    .map_or(g.mean, |n| n.sample(rng));
                (*p, draw)
            })
            .collect()
    }
}
