//! Cycle-time and tool-life distributions
//!
//! Same per-trial stream discipline as the risk simulation: each trial seeds
//! its own RNG, so the parallel map is reproducible.

use rand::Rng;
use rand_distr::{Distribution, Normal, Weibull};
use rayon::prelude::*;
use statrs::statistics::{Data, OrderStatistics, Statistics};
use tracing::debug;

use super::monte_carlo::{trial_rng, MonteCarloSimulator};
use crate::types::{DistributionSummary, OutcomeDistributions, TaylorCoefficients};

/// Offsets the distribution streams from the risk streams.
const CYCLE_STREAM: u64 = 0xC1C1_E000;
const LIFE_STREAM: u64 = 0x71FE_0000;

/// Floor on sampled speed/feed ratios so the Taylor adjustment stays finite.
const MIN_DEVIATION: f64 = 0.5;

impl MonteCarloSimulator {
    /// Minutes per part around a deterministic machining time.
    ///
    /// Gaussian process and handling noise plus discrete tool-change and
    /// chip-clearing delays.
    pub fn simulate_cycle_time(&self, nominal_minutes: f64, trials: Option<usize>) -> DistributionSummary {
        let cfg = self.config();
        let trials = self.trial_budget(trials);
        let process = Normal::new(0.0, cfg.process_sigma).ok();
        let handling = Normal::new(0.0, cfg.handling_sigma).ok();

        let samples: Vec<f64> = (0..trials)
            .into_par_iter()
            .map(|t| {
                let mut rng = trial_rng(cfg.seed ^ CYCLE_STREAM, t);
                let e_process = process.map_or(0.0, |n| n.sample(&mut rng));
                let e_handling = handling.map_or(0.0, |n| n.sample(&mut rng));
                let u_change: f64 = rng.gen();
                let u_chips: f64 = rng.gen();

                let mut minutes = nominal_minutes * (1.0 + e_process).max(0.0) * (1.0 + e_handling).max(0.0);
                if u_change < cfg.tool_change_probability {
                    minutes += cfg.tool_change_delay_min;
                }
                if u_chips < cfg.chip_clearing_probability {
                    minutes += cfg.chip_clearing_delay_min;
                }
                minutes.max(0.0)
            })
            .collect();

        summarize(samples)
    }

    /// Minutes of cutting per edge around a deterministic Taylor life.
    ///
    /// Weibull scatter with scale `baseline × weibull_scale_factor`, adjusted
    /// for the actual speed and feed deviating from the programmed values
    /// through the Taylor exponents.
    pub fn simulate_tool_life(
        &self,
        baseline_minutes: f64,
        taylor: &TaylorCoefficients,
        trials: Option<usize>,
    ) -> DistributionSummary {
        let cfg = self.config();
        let trials = self.trial_budget(trials);
        let scale = (baseline_minutes * cfg.weibull_scale_factor).max(f64::MIN_POSITIVE);
        let weibull = Weibull::new(scale, cfg.weibull_shape).ok();
        let speed = Normal::new(1.0, cfg.life_speed_sigma).ok();
        let feed = Normal::new(1.0, cfg.life_feed_sigma).ok();
        let n = taylor.n.max(1e-6);

        let samples: Vec<f64> = (0..trials)
            .into_par_iter()
            .map(|t| {
                let mut rng = trial_rng(cfg.seed ^ LIFE_STREAM, t);
                let base = weibull.map_or(baseline_minutes, |w| w.sample(&mut rng));
                let s = speed.map_or(1.0, |d| d.sample(&mut rng)).max(MIN_DEVIATION);
                let q = feed.map_or(1.0, |d| d.sample(&mut rng)).max(MIN_DEVIATION);
                base * (1.0 / s).powf(1.0 / n) * (1.0 / q).powf(taylor.a / n)
            })
            .collect();

        summarize(samples)
    }

    /// Both distributions; the tool-change interval is the 10th percentile of life.
    pub fn simulate_outcomes(
        &self,
        nominal_minutes: f64,
        baseline_life_minutes: f64,
        taylor: &TaylorCoefficients,
        trials: Option<usize>,
    ) -> OutcomeDistributions {
        let cycle_time = self.simulate_cycle_time(nominal_minutes, trials);
        let tool_life = self.simulate_tool_life(baseline_life_minutes, taylor, trials);
        debug!(
            cycle_p50 = cycle_time.p50,
            life_p10 = tool_life.p10,
            life_p50 = tool_life.p50,
            "Outcome distributions simulated"
        );
        OutcomeDistributions {
            tool_change_interval_min: tool_life.p10,
            cycle_time,
            tool_life,
        }
    }
}

/// Descriptive statistics and percentiles of a sample.
pub fn summarize(samples: Vec<f64>) -> DistributionSummary {
    let count = samples.len();
    if count == 0 {
        return DistributionSummary {
            samples: 0,
            mean: f64::NAN,
            std_dev: f64::NAN,
            p10: f64::NAN,
            p50: f64::NAN,
            p90: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        };
    }
    let mean = samples.iter().mean();
    let std_dev = if count > 1 { samples.iter().std_dev() } else { 0.0 };
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut data = Data::new(samples);
    DistributionSummary {
        samples: count,
        mean,
        std_dev,
        p10: data.percentile(10),
        p50: data.percentile(50),
        p90: data.percentile(90),
        min,
        max,
    }
}
