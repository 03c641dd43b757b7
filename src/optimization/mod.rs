//! Metaheuristic Parameter Search
//!
//! Finds the `[Vc, fz, ap, ae]` point inside a constraint envelope that
//! maximizes a weighted productivity / tool-life / finish objective.
//! Entirely deterministic for a given seed.

mod objective;
mod pso;

pub use objective::{FitnessBreakdown, Objective};
pub use pso::ParticleSwarm;

use crate::config::PhysicsConfig;
use crate::physics_engine::CuttingContext;
use crate::types::{Candidate, ConstraintEnvelope, ObjectiveWeights};

/// Everything one search needs.
#[derive(Debug, Clone, Copy)]
pub struct SearchProblem<'a> {
    pub envelope: &'a ConstraintEnvelope,
    pub context: &'a CuttingContext,
    pub weights: ObjectiveWeights,
    pub physics: &'a PhysicsConfig,
    /// Optional starting particle, e.g. the physics baseline
    pub seed: Option<Candidate>,
}

/// Outcome of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmResult {
    pub best: Candidate,
    pub fitness: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Seam for the orchestrator.
pub trait ParameterOptimizer: Send + Sync {
    /// Search the envelope. `iterations` overrides the configured budget,
    /// capped at the configured maximum.
    fn optimize(&self, problem: &SearchProblem<'_>, iterations: Option<usize>) -> SwarmResult;
}
