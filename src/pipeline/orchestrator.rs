//! Recommendation Pipeline - one call from profiles to a finished document
//!
//! ```text
//! STAGE 1: Constraint aggregation (abort on an empty envelope)
//! STAGE 2: Physics baseline seed (nominal Vc, mid chip load, mode engagement)
//! STAGE 3: Particle swarm search inside the envelope
//! STAGE 4: Bayesian correction from the session's beliefs, re-clamped
//! STAGE 5: Monte Carlo risk on the corrected candidate
//! STAGE 6: Predictions (Taylor + GP life, finish, stability, spreads, wear)
//! STAGE 7: Document assembly
//! ```
//!
//! Every stage is a trait object handed in at construction, so tests and
//! embedders can swap any of them.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::PipelineError;
use crate::config::{EngineConfig, PhysicsConfig};
use crate::constraints::{strategy_limits, Aggregation, ConstraintAggregator, ConstraintEngine};
use crate::ml_engine::{AdaptationModel, BayesianAdapter, BeliefState, GaussianProcess};
use crate::optimization::{ParameterOptimizer, ParticleSwarm, SearchProblem};
use crate::physics_engine::CuttingContext;
use crate::risk::{ChatterExposure, MonteCarloSimulator, RiskLimits, RiskScenario, RiskSimulator};
use crate::types::{
    Candidate, ConstraintEnvelope, EngineeringValues, MachiningMode, MaterialProfile,
    ObjectivePreset, Predictions, ProfileSet, ProfileWarning, RecommendationDocument,
    StabilityAssessment, Subsystem, ToolProfile,
};
use crate::wear::{WearEstimator, WearTracker};

/// Inputs for one recommendation; profiles are already resolved.
#[derive(Debug, Clone, Copy)]
pub struct PipelineInput<'a> {
    pub profiles: ProfileSet<'a>,
    pub material: &'a MaterialProfile,
    pub tool: &'a ToolProfile,
    pub machine_id: &'a str,
    pub objective: ObjectivePreset,
    /// Snapshot of the session's beliefs
    pub beliefs: &'a BeliefState,
    /// Speed/tool-life history, when the session has any
    pub history: Option<&'a GaussianProcess>,
    pub tool_instance_id: Option<&'a str>,
    /// Enables the cycle-time and tool-life distributions
    pub cut_length_mm: Option<f64>,
    /// Scale by a posterior draw with this seed instead of the posterior mean
    pub exploration_seed: Option<u64>,
}

/// The stage components.
pub struct RecommendationPipeline {
    aggregator: Box<dyn ConstraintAggregator>,
    optimizer: Box<dyn ParameterOptimizer>,
    risk: Box<dyn RiskSimulator>,
    adaptation: Arc<dyn AdaptationModel>,
    wear: Arc<dyn WearEstimator>,
    physics: PhysicsConfig,
    max_surface_roughness_um: f64,
}

impl std::fmt::Debug for RecommendationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationPipeline")
            .field("physics", &self.physics)
            .field("max_surface_roughness_um", &self.max_surface_roughness_um)
            .finish_non_exhaustive()
    }
}

impl RecommendationPipeline {
    /// Default components built from configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        info!("Initializing recommendation pipeline");
        Self {
            aggregator: Box::new(ConstraintEngine::new(config.fallback.clone())),
            optimizer: Box::new(ParticleSwarm::new(config.pso.clone())),
            risk: Box::new(MonteCarloSimulator::new(config.monte_carlo.clone())),
            adaptation: Arc::new(BayesianAdapter::new(config.bayes.clone(), config.gp.clone())),
            wear: Arc::new(WearTracker::new(config.kalman.clone())),
            physics: config.physics.clone(),
            max_surface_roughness_um: config.monte_carlo.max_surface_roughness_um,
        }
    }

    pub fn with_aggregator(mut self, aggregator: Box<dyn ConstraintAggregator>) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_optimizer(mut self, optimizer: Box<dyn ParameterOptimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_risk(mut self, risk: Box<dyn RiskSimulator>) -> Self {
        self.risk = risk;
        self
    }

    pub fn with_adaptation(mut self, adaptation: Arc<dyn AdaptationModel>) -> Self {
        self.adaptation = adaptation;
        self
    }

    pub fn with_wear(mut self, wear: Arc<dyn WearEstimator>) -> Self {
        self.wear = wear;
        self
    }

    pub fn adaptation(&self) -> &Arc<dyn AdaptationModel> {
        &self.adaptation
    }

    pub fn wear(&self) -> &Arc<dyn WearEstimator> {
        &self.wear
    }

    /// Run all stages.
    pub fn recommend(&self, input: &PipelineInput<'_>) -> Result<RecommendationDocument, PipelineError> {
        let start = Instant::now();
        let mode = input.profiles.mode.unwrap_or_default();
        let mut subsystems = vec![Subsystem::ConstraintEngine, Subsystem::PhysicsBaseline];

        // STAGE 1: Constraint aggregation
        let Aggregation {
            envelope,
            mut warnings,
        } = self.aggregator.aggregate(&input.profiles).map_err(|e| {
            warn!(tool = %input.tool.id, material = %input.material.id, error = %e, "Constraint aggregation failed");
            PipelineError::from(e)
        })?;

        let (context, context_warnings) = CuttingContext::new(input.tool, input.material);
        warnings.extend(context_warnings);

        // STAGE 2: Physics baseline
        let baseline = baseline_seed(&envelope, &context, mode);
        debug!(
            vc = baseline.vc,
            fz = baseline.fz,
            ap = baseline.ap,
            ae = baseline.ae,
            "Physics baseline seeded"
        );

        // STAGE 3: Swarm search
        let problem = SearchProblem {
            envelope: &envelope,
            context: &context,
            weights: input.objective.weights(),
            physics: &self.physics,
            seed: Some(baseline),
        };
        let swarm = self.optimizer.optimize(&problem, None);
        subsystems.push(Subsystem::ParticleSwarm);

        // STAGE 4: Bayesian correction
        let adjustment = match input.exploration_seed {
            Some(seed) => {
                debug!(seed, "Exploring with a posterior draw");
                self.adaptation.explore(input.beliefs, &swarm.best, seed)
            }
            None => self.adaptation.adjust(input.beliefs, &swarm.best),
        };
        let candidate = Candidate::clamped(adjustment.position, &envelope, &context.geometry);
        if input.beliefs.observations() > 0 || input.exploration_seed.is_some() {
            subsystems.push(Subsystem::BayesianAdaptation);
        }

        // STAGE 5: Monte Carlo risk
        let lobe_limit_mm = context.lobe_limit(&candidate, &self.physics);
        let scenario = RiskScenario {
            candidate: &candidate,
            context: &context,
            limits: RiskLimits {
                max_rpm: envelope.rpm.max,
                max_vc: envelope.vc.max,
                max_force_n: context.max_force_n,
                max_ra_um: self.max_surface_roughness_um,
            },
            exposure: ChatterExposure {
                composite_rigidity: envelope.composite_rigidity,
                lobe_limit_mm,
            },
        };
        let risk = self.risk.simulate_risk(&scenario, None);
        subsystems.push(Subsystem::MonteCarlo);

        // STAGE 6: Predictions
        let tool_life_min = context.tool_life(&candidate);

        let tool_life_gp = match input.history.filter(|h| !h.is_empty()) {
            Some(history) => match history.predict(candidate.vc) {
                Ok(prediction) => {
                    subsystems.push(Subsystem::GaussianProcess);
                    Some(prediction)
                }
                Err(e) => {
                    warn!(error = %e, "Tool-life GP prediction skipped");
                    warnings.push(ProfileWarning::new("gaussian_process", e.to_string()));
                    None
                }
            },
            None => None,
        };

        let stability = context.assess_stability(&candidate, &self.physics);
        subsystems.push(match stability {
            StabilityAssessment::Lobes { .. } => Subsystem::StabilityLobes,
            StabilityAssessment::Heuristic { .. } => Subsystem::StabilityHeuristic,
        });

        let distributions = input
            .cut_length_mm
            .filter(|l| l.is_finite() && *l > 0.0 && candidate.feed_rate > 0.0)
            .map(|length| {
                self.risk.simulate_distributions(
                    length / candidate.feed_rate,
                    tool_life_min,
                    &context.material.taylor,
                    None,
                )
            });

        let remaining_wear_life = input
            .tool_instance_id
            .and_then(|id| self.wear.estimate(id))
            .map(|estimate| estimate.remaining_life);
        if remaining_wear_life.is_some() {
            subsystems.push(Subsystem::WearEstimator);
        }

        // STAGE 7: Document
        let metrics = context.evaluate_cut(&candidate);
        let values = EngineeringValues {
            rpm: candidate.rpm,
            feed_rate_mm_min: candidate.feed_rate,
            vc_m_min: candidate.vc,
            fz_mm: candidate.fz,
            ap_mm: candidate.ap,
            ae_mm: candidate.ae,
            mrr_cm3_min: metrics.mrr_cm3_min,
            cutting_force_n: metrics.cutting_force_n,
            power_kw: metrics.power_kw,
            torque_nm: metrics.torque_nm,
        };

        dedup_warnings(&mut warnings);
        for w in &warnings {
            debug!(source = %w.source, message = %w.message, "Profile fallback");
        }

        info!(
            material = %input.material.id,
            tool = %input.tool.id,
            %mode,
            rpm = values.rpm,
            feed_rate = values.feed_rate_mm_min,
            ap = values.ap_mm,
            ae = values.ae_mm,
            tool_life_min,
            risk = %risk.band,
            swarm_evaluations = swarm.evaluations,
            warnings = warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Recommendation generated"
        );

        Ok(RecommendationDocument {
            generated_at: Utc::now(),
            material_id: input.material.id.clone(),
            tool_id: input.tool.id.clone(),
            machine_id: input.machine_id.to_string(),
            mode,
            objective: input.objective,
            values,
            predictions: Predictions {
                tool_life_min,
                tool_life_gp,
                surface_roughness_ra_um: context.surface_roughness(&candidate),
                stability,
                distributions,
                remaining_wear_life,
            },
            confidence: adjustment.confidence,
            exploration_seed: input.exploration_seed,
            risk,
            subsystems,
            warnings,
            envelope,
        })
    }
}

/// Starting particle: nominal speed, mid chip load, the mode's default engagement.
pub fn baseline_seed(envelope: &ConstraintEnvelope, context: &CuttingContext, mode: MachiningMode) -> Candidate {
    let limits = strategy_limits(mode);
    let d = context.geometry.diameter_mm;
    let fz = 0.5 * (envelope.feed.min + envelope.feed.max);
    Candidate::clamped(
        [
            context.material.vc_nominal,
            fz,
            limits.seed_doc_ratio * d,
            limits.seed_woc_ratio * d,
        ],
        envelope,
        &context.geometry,
    )
}

/// Aggregation and context resolution can both report the same gap.
fn dedup_warnings(warnings: &mut Vec<ProfileWarning>) {
    let mut seen = HashSet::new();
    warnings.retain(|w| seen.insert((w.source.clone(), w.message.clone())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, MonteCarloConfig, PsoConfig};
    use crate::ml_engine::FeedbackRecord;
    use crate::optimization::test_support;
    use crate::types::{AdaptedParameter, DynamicsProfile, FeedbackOutcome, MachineProfile};

    fn quick_config() -> EngineConfig {
        EngineConfig {
            pso: PsoConfig {
                particles: 12,
                iterations: 20,
                ..PsoConfig::default()
            },
            monte_carlo: MonteCarloConfig {
                trials: 400,
                ..MonteCarloConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    fn input<'a>(
        machine: &'a MachineProfile,
        tool: &'a ToolProfile,
        material: &'a MaterialProfile,
        beliefs: &'a BeliefState,
    ) -> PipelineInput<'a> {
        PipelineInput {
            profiles: ProfileSet {
                machine: Some(machine),
                tool: Some(tool),
                holder: None,
                workholding: None,
                material: Some(material),
                mode: Some(MachiningMode::Roughing),
                thin_wall: false,
            },
            material,
            tool,
            machine_id: &machine.id,
            objective: ObjectivePreset::Balanced,
            beliefs,
            history: None,
            tool_instance_id: None,
            cut_length_mm: None,
            exploration_seed: None,
        }
    }

    #[test]
    fn recommendation_lies_inside_envelope() {
        let pipeline = RecommendationPipeline::from_config(&quick_config());
        let (machine, tool, material) = (test_support::machine(), test_support::tool(), test_support::material());
        let beliefs = BeliefState::default();
        let doc = pipeline.recommend(&input(&machine, &tool, &material, &beliefs)).unwrap();

        let env = &doc.envelope;
        let v = &doc.values;
        assert!(env.rpm.contains(v.rpm));
        assert!(env.vc.contains(v.vc_m_min));
        assert!(env.feed.contains(v.fz_mm));
        assert!(env.doc.contains(v.ap_mm));
        assert!(env.woc.contains(v.ae_mm));
        assert!(doc.predictions.tool_life_min > 0.0);
        assert!(doc.predictions.tool_life_gp.is_none());
        assert!(doc.predictions.distributions.is_none());
        assert!((0.0..=1.0).contains(&doc.risk.failure_rate));
        assert!(doc.subsystems.contains(&Subsystem::StabilityHeuristic));
        assert!(!doc.subsystems.contains(&Subsystem::BayesianAdaptation));
    }

    #[test]
    fn infeasible_envelope_aborts() {
        let pipeline = RecommendationPipeline::from_config(&quick_config());
        let machine = MachineProfile {
            min_rpm: Some(20000.0),
            max_rpm: Some(24000.0),
            ..test_support::machine()
        };
        let mut tool = test_support::tool();
        tool.max_rpm = Some(10000.0);
        let material = test_support::material();
        let beliefs = BeliefState::default();
        let err = pipeline.recommend(&input(&machine, &tool, &material, &beliefs)).unwrap_err();
        assert!(matches!(err, PipelineError::Infeasible(_)));
    }

    #[test]
    fn optional_stages_switch_on_with_their_inputs() {
        let config = quick_config();
        let pipeline = RecommendationPipeline::from_config(&config);
        let machine = test_support::machine();
        let mut tool = test_support::tool();
        tool.dynamics = Some(DynamicsProfile {
            natural_frequency_hz: 900.0,
            damping_ratio: 0.03,
            stiffness_n_per_m: 2.0e7,
        });
        let material = test_support::material();

        let adapter = BayesianAdapter::new(config.bayes.clone(), config.gp.clone());
        let mut beliefs = adapter.new_beliefs();
        adapter
            .record(
                &mut beliefs,
                &FeedbackRecord::new(AdaptedParameter::Speed, 300.0, 270.0, FeedbackOutcome::Acceptable),
            )
            .unwrap();

        let mut history = adapter.new_history();
        for (vc, life) in [(200.0, 90.0), (300.0, 55.0), (400.0, 30.0)] {
            history.add_observation(vc, life).unwrap();
        }

        pipeline.wear().record_measurement("T-7", 0.05).unwrap();

        let mut inp = input(&machine, &tool, &material, &beliefs);
        inp.history = Some(&history);
        inp.tool_instance_id = Some("T-7");
        inp.cut_length_mm = Some(1500.0);
        let doc = pipeline.recommend(&inp).unwrap();

        assert!(doc.subsystems.contains(&Subsystem::BayesianAdaptation));
        assert!(doc.subsystems.contains(&Subsystem::GaussianProcess));
        assert!(doc.subsystems.contains(&Subsystem::StabilityLobes));
        assert!(doc.subsystems.contains(&Subsystem::WearEstimator));
        let gp = doc.predictions.tool_life_gp.unwrap();
        assert!(gp.variance >= 0.0);
        let dist = doc.predictions.distributions.unwrap();
        assert!(dist.cycle_time.mean > 0.0);
        assert!(doc.predictions.remaining_wear_life.unwrap() > 0.0);
        assert!(doc.confidence.iter().any(|c| c.parameter == AdaptedParameter::Speed));
    }

    #[test]
    fn exploration_draws_a_seeded_candidate_inside_the_envelope() {
        let pipeline = RecommendationPipeline::from_config(&quick_config());
        let (machine, tool, material) = (test_support::machine(), test_support::tool(), test_support::material());
        let beliefs = BeliefState::default();
        let base = input(&machine, &tool, &material, &beliefs);
        let mean = pipeline.recommend(&base).unwrap();

        let mut exploring = base;
        exploring.exploration_seed = Some(21);
        let a = pipeline.recommend(&exploring).unwrap();
        let b = pipeline.recommend(&exploring).unwrap();

        assert_eq!(a.values, b.values);
        assert_eq!(a.exploration_seed, Some(21));
        assert!(a.subsystems.contains(&Subsystem::BayesianAdaptation));
        assert!(a.envelope.vc.contains(a.values.vc_m_min));
        assert!(a.envelope.feed.contains(a.values.fz_mm));
        assert!(a.envelope.doc.contains(a.values.ap_mm));
        let multipliers = |d: &RecommendationDocument| d.confidence.iter().map(|c| c.multiplier).collect::<Vec<_>>();
        assert!(multipliers(&mean).iter().all(|m| *m == 1.0));
        assert!(multipliers(&a).iter().any(|m| *m != 1.0));
    }

    #[test]
    fn baseline_seed_is_clamped_into_envelope() {
        let ctx = test_support::context();
        let env = test_support::envelope(&ctx);
        for mode in [MachiningMode::Roughing, MachiningMode::Slotting, MachiningMode::Adaptive] {
            let seed = baseline_seed(&env, &ctx, mode);
            assert!(seed.is_within(&env, &ctx.geometry), "{mode}");
        }
    }

    #[test]
    fn duplicate_warnings_collapse() {
        let mut w = vec![
            ProfileWarning::new("material", "no Taylor coefficients"),
            ProfileWarning::new("material", "no Taylor coefficients"),
            ProfileWarning::new("tool", "no stickout"),
        ];
        dedup_warnings(&mut w);
        assert_eq!(w.len(), 2);
    }
}
