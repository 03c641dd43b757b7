//! Pipeline Orchestration
//!
//! ## Layers
//!
//! ```text
//! CuttingService          per-session beliefs/GP, wear filters, persistence
//!   └─ RecommendationPipeline   stateless stage composition
//!        ├─ ConstraintAggregator
//!        ├─ ParameterOptimizer
//!        ├─ AdaptationModel
//!        ├─ RiskSimulator
//!        └─ WearEstimator
//! ```
//!
//! Profiles come from a `ProfileCatalog`; learned state optionally goes to a
//! `StateStore`.

mod catalog;
mod orchestrator;
mod service;

pub use catalog::{CatalogError, InMemoryCatalog, ProfileCatalog};
pub use orchestrator::{baseline_seed, PipelineInput, RecommendationPipeline};
pub use service::{CuttingService, RecommendRequest};

use crate::constraints::ConstraintError;
use crate::ml_engine::{FeedbackError, NumericalError};
use crate::storage::StorageError;
use crate::types::InfeasibleEnvelope;
use crate::wear::WearError;

/// Everything a service call can fail with.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Infeasible(#[from] InfeasibleEnvelope),
    #[error("invalid tool geometry for '{tool_id}': {reason}")]
    InvalidGeometry { tool_id: String, reason: String },
    #[error("{kind} profile '{id}' not found")]
    ProfileNotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Numerical(#[from] NumericalError),
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
    #[error(transparent)]
    Wear(#[from] WearError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("session state lock poisoned")]
    LockPoisoned,
}

impl From<ConstraintError> for PipelineError {
    fn from(e: ConstraintError) -> Self {
        match e {
            ConstraintError::Infeasible(inner) => PipelineError::Infeasible(inner),
            ConstraintError::InvalidGeometry { tool_id, reason } => {
                PipelineError::InvalidGeometry { tool_id, reason }
            }
        }
    }
}
