//! Monte Carlo failure-risk simulation for one candidate
//!
//! Each trial perturbs `Vc`, `fz` and `ap` by independent uniform
//! multiplicative noise and checks four failure modes: overspeed, breakage,
//! chatter and surface quality. A trial draws every random number it needs
//! up front from its own seeded stream, so trials are independent of
//! scheduling and of the limits being checked.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::defaults::{CHATTER_BASE_PROBABILITY, RISK_WEIGHTS, STREAM_INCREMENT};
use crate::config::MonteCarloConfig;
use crate::physics_engine::CuttingContext;
use crate::types::{Candidate, OutcomeDistributions, RiskBand, RiskReport, TaylorCoefficients};

/// Ceilings a trial is checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLimits {
    pub max_rpm: f64,
    pub max_vc: f64,
    /// Force the tool tolerates; breakage trips at `breakage_force_factor` × this
    pub max_force_n: f64,
    pub max_ra_um: f64,
}

/// Setup context that shapes the chatter probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatterExposure {
    pub composite_rigidity: f64,
    /// Limiting depth from the stability lobes at the programmed speed
    pub lobe_limit_mm: Option<f64>,
}

impl Default for ChatterExposure {
    fn default() -> Self {
        Self {
            composite_rigidity: 1.0,
            lobe_limit_mm: None,
        }
    }
}

/// One simulation request.
#[derive(Debug, Clone, Copy)]
pub struct RiskScenario<'a> {
    pub candidate: &'a Candidate,
    pub context: &'a CuttingContext,
    pub limits: RiskLimits,
    pub exposure: ChatterExposure,
}

/// Seam for the orchestrator.
pub trait RiskSimulator: Send + Sync {
    fn simulate_risk(&self, scenario: &RiskScenario<'_>, trials: Option<usize>) -> RiskReport;

    /// Cycle-time and tool-life spreads around deterministic estimates.
    fn simulate_distributions(
        &self,
        nominal_minutes: f64,
        baseline_life_minutes: f64,
        taylor: &TaylorCoefficients,
        trials: Option<usize>,
    ) -> OutcomeDistributions;
}

#[derive(Debug, Clone, Copy)]
struct TrialDraws {
    speed: f64,
    feed: f64,
    depth: f64,
    chatter: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct TrialOutcome {
    overspeed: bool,
    breakage: bool,
    chatter: bool,
    quality: bool,
}

impl TrialOutcome {
    fn any(&self) -> bool {
        self.overspeed || self.breakage || self.chatter || self.quality
    }
}

/// Independent RNG stream for one trial.
pub(crate) fn trial_rng(seed: u64, trial: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add((trial as u64).wrapping_mul(STREAM_INCREMENT)))
}

/// Default simulator.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloSimulator {
    config: MonteCarloConfig,
}

impl MonteCarloSimulator {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Requested trial count, capped at the configured maximum.
    pub(crate) fn trial_budget(&self, requested: Option<usize>) -> usize {
        let wanted = requested.unwrap_or(self.config.trials);
        let trials = wanted.clamp(1, self.config.max_trials.max(1));
        if trials < wanted {
            warn!(requested = wanted, max = self.config.max_trials, "Monte Carlo trial request clamped");
        }
        trials
    }

    fn draw(&self, trial: usize) -> TrialDraws {
        let mut rng = trial_rng(self.config.seed, trial);
        let p = self.config.perturbation;
        let mut factor = || 1.0 + p * (2.0 * rng.gen::<f64>() - 1.0);
        let speed = factor();
        let feed = factor();
        let depth = factor();
        TrialDraws {
            speed,
            feed,
            depth,
            chatter: rng.gen(),
        }
    }

    fn evaluate(&self, scenario: &RiskScenario<'_>, draws: TrialDraws) -> TrialOutcome {
        let base = scenario.candidate;
        let ctx = scenario.context;
        let perturbed = Candidate::from_position(
            [base.vc * draws.speed, base.fz * draws.feed, base.ap * draws.depth, base.ae],
            &ctx.geometry,
        );
        let limits = &scenario.limits;

        let force = ctx.evaluate_cut(&perturbed).cutting_force_n;
        let p_chatter = chatter_probability(ctx, &perturbed, &scenario.exposure);

        TrialOutcome {
            overspeed: perturbed.rpm > limits.max_rpm || perturbed.vc > limits.max_vc,
            breakage: force > self.config.breakage_force_factor * limits.max_force_n,
            chatter: draws.chatter < p_chatter,
            quality: ctx.surface_roughness(&perturbed) > limits.max_ra_um,
        }
    }
}

impl RiskSimulator for MonteCarloSimulator {
    fn simulate_risk(&self, scenario: &RiskScenario<'_>, trials: Option<usize>) -> RiskReport {
        let trials = self.trial_budget(trials);

        let outcomes: Vec<TrialOutcome> = (0..trials)
            .into_par_iter()
            .map(|t| self.evaluate(scenario, self.draw(t)))
            .collect();

        let n = trials as f64;
        let rate = |f: fn(&TrialOutcome) -> bool| outcomes.iter().filter(|o| f(o)).count() as f64 / n;
        let tool_breakage_risk = rate(|o| o.breakage);
        let chatter_risk = rate(|o| o.chatter);
        let quality_risk = rate(|o| o.quality);
        let overspeed_risk = rate(|o| o.overspeed);
        let failure_rate = rate(TrialOutcome::any);

        let [w_break, w_chatter, w_quality, w_fail] = RISK_WEIGHTS;
        let combined_score = w_break * tool_breakage_risk
            + w_chatter * chatter_risk
            + w_quality * quality_risk
            + w_fail * failure_rate;
        let band = RiskBand::from_score(combined_score);

        debug!(
            trials,
            failure_rate,
            tool_breakage_risk,
            chatter_risk,
            quality_risk,
            overspeed_risk,
            combined_score,
            %band,
            "Monte Carlo risk simulated"
        );

        RiskReport {
            trials,
            failure_rate,
            tool_breakage_risk,
            chatter_risk,
            quality_risk,
            overspeed_risk,
            combined_score,
            band,
        }
    }

    fn simulate_distributions(
        &self,
        nominal_minutes: f64,
        baseline_life_minutes: f64,
        taylor: &TaylorCoefficients,
        trials: Option<usize>,
    ) -> OutcomeDistributions {
        self.simulate_outcomes(nominal_minutes, baseline_life_minutes, taylor, trials)
    }
}

/// Per-trial chatter probability.
///
/// Base rate plus overhang and depth terms, scaled down by setup rigidity.
/// With a lobe limit the verdict dominates: past the limit chatter is likely,
/// under it the base risk halves.
pub fn chatter_probability(ctx: &CuttingContext, c: &Candidate, exposure: &ChatterExposure) -> f64 {
    let d = ctx.geometry.diameter_mm.max(1e-6);
    let overhang = ctx.stickout_mm / d;
    let depth = c.ap / d;

    let mut p = CHATTER_BASE_PROBABILITY
        + 0.03 * (overhang - 3.0).max(0.0)
        + 0.10 * (depth - 1.0).max(0.0);
    p /= exposure.composite_rigidity.clamp(0.25, 2.0);

    if let Some(limit) = exposure.lobe_limit_mm.filter(|l| *l > 0.0) {
        if c.ap > limit {
            p += 0.5 + 0.5 * (c.ap / limit - 1.0).min(1.0);
        } else {
            p *= 0.5;
        }
    }
    p.clamp(0.0, 1.0)
}
