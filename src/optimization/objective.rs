//! Fitness function for the parameter search
//!
//! Weighted sum of three normalized terms, each in [0, 1]:
//! - MRR relative to the largest removal rate the envelope admits
//! - tool life as `T / (T + T_ref)`
//! - finish as `Ra_ref / (Ra + Ra_ref)`
//!
//! minus `overload_penalty` times the relative excess over the power, torque
//! and tool-force limits. Infeasible loads are scored, never rejected.

use crate::config::PhysicsConfig;
use crate::physics_engine::{CutMetrics, CuttingContext};
use crate::types::{Candidate, ConstraintEnvelope, ObjectiveWeights};

/// Evaluates candidates for one envelope and tool/material pairing.
#[derive(Debug, Clone)]
pub struct Objective<'a> {
    context: &'a CuttingContext,
    envelope: &'a ConstraintEnvelope,
    weights: ObjectiveWeights,
    physics: &'a PhysicsConfig,
    mrr_scale: f64,
}

/// Fitness and the terms behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessBreakdown {
    pub fitness: f64,
    pub mrr_term: f64,
    pub life_term: f64,
    pub finish_term: f64,
    pub overload: f64,
}

impl<'a> Objective<'a> {
    pub fn new(
        context: &'a CuttingContext,
        envelope: &'a ConstraintEnvelope,
        weights: ObjectiveWeights,
        physics: &'a PhysicsConfig,
    ) -> Self {
        Self {
            context,
            envelope,
            weights,
            physics,
            mrr_scale: max_removal_rate(envelope, context),
        }
    }

    pub fn fitness(&self, c: &Candidate) -> f64 {
        self.breakdown(c).fitness
    }

    pub fn breakdown(&self, c: &Candidate) -> FitnessBreakdown {
        let metrics = self.context.evaluate_cut(c);

        let mrr_term = (metrics.mrr_cm3_min / self.mrr_scale).clamp(0.0, 1.0);

        let life = self.context.tool_life(c);
        let t_ref = self.physics.reference_tool_life_min;
        let life_term = if life.is_infinite() { 1.0 } else { life / (life + t_ref) };

        let ra = self.context.surface_roughness(c);
        let ra_ref = self.physics.reference_roughness_um;
        let finish_term = if ra.is_finite() { ra_ref / (ra + ra_ref) } else { 0.0 };

        let overload = self.overload(&metrics);

        let w = &self.weights;
        let fitness = w.mrr * mrr_term + w.tool_life * life_term + w.surface_finish * finish_term
            - self.physics.overload_penalty * overload;

        FitnessBreakdown {
            fitness: if fitness.is_finite() { fitness } else { f64::MIN },
            mrr_term,
            life_term,
            finish_term,
            overload,
        }
    }

    /// Sum of relative excess over each finite load limit.
    fn overload(&self, m: &CutMetrics) -> f64 {
        let excess = |value: f64, limit: f64| {
            if limit.is_finite() && limit > 0.0 {
                (value / limit - 1.0).max(0.0)
            } else {
                0.0
            }
        };
        excess(m.power_kw, self.envelope.power_limit_kw)
            + excess(m.torque_nm, self.envelope.torque_limit_nm)
            + excess(m.cutting_force_n, self.context.max_force_n)
    }
}

/// Largest MRR inside the envelope, ignoring load limits.
fn max_removal_rate(envelope: &ConstraintEnvelope, context: &CuttingContext) -> f64 {
    let g = &context.geometry;
    let rpm_max = envelope.rpm.max.min(g.rpm_for_vc(envelope.vc.max));
    let feed_rate = (envelope.feed.max * g.teeth() * rpm_max).min(envelope.feed_rate_limit_mm_min);
    let mrr = envelope.doc.max * envelope.woc.max * feed_rate / 1_000.0;
    if mrr.is_finite() && mrr > 0.0 {
        mrr
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::test_support::{context, envelope};
    use crate::types::ObjectivePreset;

    #[test]
    fn terms_stay_normalized() {
        let ctx = context();
        let env = envelope(&ctx);
        let physics = PhysicsConfig::default();
        let obj = Objective::new(&ctx, &env, ObjectivePreset::Balanced.weights(), &physics);
        for pos in [[200.0, 0.05, 2.0, 2.0], [450.0, 0.15, 18.0, 6.0]] {
            let c = Candidate::clamped(pos, &env, &ctx.geometry);
            let b = obj.breakdown(&c);
            for term in [b.mrr_term, b.life_term, b.finish_term] {
                assert!((0.0..=1.0).contains(&term), "{b:?}");
            }
        }
    }

    #[test]
    fn overload_is_penalized() {
        let ctx = context();
        let mut env = envelope(&ctx);
        let physics = PhysicsConfig::default();
        let c = Candidate::clamped([400.0, 0.15, 18.0, 6.0], &env, &ctx.geometry);
        let unlimited = Objective::new(&ctx, &env, ObjectivePreset::Productivity.weights(), &physics)
            .breakdown(&c);
        env.power_limit_kw = 0.1;
        let limited = Objective::new(&ctx, &env, ObjectivePreset::Productivity.weights(), &physics)
            .breakdown(&c);
        assert!(limited.overload > unlimited.overload);
        assert!(limited.fitness < unlimited.fitness);
    }
}
