//! Bayesian Adaptation Layer
//!
//! Learns from operator feedback and cutting history.
//!
//! ## Architecture
//! - `belief`: conjugate Gaussian posteriors over speed/feed/doc multipliers
//! - `gaussian_process`: RBF GP regressor from cutting speed to tool life
//! - `linalg`: Cholesky factorization with jitter retries
//!
//! State objects are plain data: the service keeps one per session behind a
//! lock, and this layer only reads or mutates what it is handed.

pub mod belief;
pub mod gaussian_process;
pub mod linalg;

pub use belief::{BeliefState, FeedbackError, FeedbackRecord};
pub use gaussian_process::GaussianProcess;
pub use linalg::{Cholesky, NumericalError};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{BayesConfig, GpConfig};
use crate::types::{Candidate, Gaussian, ParameterConfidence};

/// Posterior-scaled candidate position plus its confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    /// `[Vc, fz, ap, ae]` before re-clamping
    pub position: [f64; 4],
    pub confidence: Vec<ParameterConfidence>,
}

/// Seam for the orchestrator and the feedback path.
pub trait AdaptationModel: Send + Sync {
    fn new_beliefs(&self) -> BeliefState;
    fn new_history(&self) -> GaussianProcess;
    fn adjust(&self, beliefs: &BeliefState, baseline: &Candidate) -> Adjustment;
    /// Like `adjust`, but scaled by a seeded posterior draw.
    fn explore(&self, beliefs: &BeliefState, baseline: &Candidate, seed: u64) -> Adjustment;
    fn record(&self, beliefs: &mut BeliefState, feedback: &FeedbackRecord) -> Result<Gaussian, FeedbackError>;
}

/// Conjugate beliefs plus a fixed-hyperparameter GP.
#[derive(Debug, Clone, Default)]
pub struct BayesianAdapter {
    bayes: BayesConfig,
    gp: GpConfig,
}

impl BayesianAdapter {
    pub fn new(bayes: BayesConfig, gp: GpConfig) -> Self {
        Self { bayes, gp }
    }
}

impl AdaptationModel for BayesianAdapter {
    fn new_beliefs(&self) -> BeliefState {
        BeliefState::new(&self.bayes)
    }

    fn new_history(&self) -> GaussianProcess {
        GaussianProcess::new(self.gp.clone())
    }

    fn adjust(&self, beliefs: &BeliefState, baseline: &Candidate) -> Adjustment {
        let (position, confidence) = beliefs.adjust_recommendation(baseline);
        Adjustment {
            position,
            confidence,
        }
    }

    fn explore(&self, beliefs: &BeliefState, baseline: &Candidate, seed: u64) -> Adjustment {
        let mut rng = StdRng::seed_from_u64(seed);
        let (position, confidence) = beliefs.explore_recommendation(baseline, &mut rng);
        Adjustment {
            position,
            confidence,
        }
    }

    fn record(&self, beliefs: &mut BeliefState, feedback: &FeedbackRecord) -> Result<Gaussian, FeedbackError> {
        beliefs.update(
            &self.bayes,
            feedback.parameter,
            feedback.recommended,
            feedback.actual_used,
            feedback.outcome,
        )
    }
}
