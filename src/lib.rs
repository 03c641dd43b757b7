//! cutwise: Machining Parameter Intelligence
//!
//! Recommends spindle speed, feed and engagement for a material / tool /
//! machine combination and keeps refining them from shop-floor outcomes.
//!
//! ## Architecture
//!
//! - **Constraint Engine**: one feasible envelope from every collaborator's limits
//! - **Physics Engine**: Kienzle forces, extended Taylor life, finish, stability lobes
//! - **Optimization**: particle swarm search inside the envelope
//! - **ML Engine**: conjugate Bayesian corrections and a tool-life Gaussian process
//! - **Risk**: Monte Carlo failure probabilities and outcome distributions
//! - **Wear**: per-tool Kalman wear filter and remaining life
//! - **Pipeline**: stage composition plus the session-aware `CuttingService`

pub mod config;
pub mod constraints;
pub mod ml_engine;
pub mod optimization;
pub mod physics_engine;
pub mod pipeline;
pub mod risk;
pub mod storage;
pub mod types;
pub mod wear;

// Re-export configuration
pub use config::{ConfigError, EngineConfig};

// Re-export the service surface
pub use pipeline::{
    CuttingService, InMemoryCatalog, PipelineError, ProfileCatalog, RecommendRequest,
    RecommendationPipeline,
};

// Re-export component seams
pub use constraints::{ConstraintAggregator, ConstraintEngine};
pub use ml_engine::{AdaptationModel, BayesianAdapter};
pub use optimization::{ParameterOptimizer, ParticleSwarm};
pub use risk::{MonteCarloSimulator, RiskSimulator};
pub use wear::{WearEstimator, WearTracker};

// Re-export storage
pub use storage::{InMemoryStore, SledStore, StateStore, StorageError};

// Re-export commonly used types
pub use types::{
    AdaptedParameter, ConstraintEnvelope, FeedbackOutcome, MachiningMode, ObjectivePreset,
    RecommendationDocument, RiskBand, RiskReport, WearEstimate,
};
