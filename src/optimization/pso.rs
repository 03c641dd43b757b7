//! Particle swarm search over `[Vc, fz, ap, ae]`
//!
//! Standard global-best PSO with linearly decaying inertia. Every position is
//! projected back into the envelope after each move, so every candidate the
//! swarm evaluates is feasible. Random draws happen on one seeded `StdRng`
//! in a fixed order; only the pure fitness evaluation fans out over rayon,
//! so a given seed always returns the same candidate.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, warn};

use super::objective::Objective;
use super::{ParameterOptimizer, SearchProblem, SwarmResult};
use crate::config::PsoConfig;
use crate::types::{clamp_between, Candidate};

const DIMS: usize = 4;

/// PSO with a fixed iteration budget.
#[derive(Debug, Clone, Default)]
pub struct ParticleSwarm {
    config: PsoConfig,
}

#[derive(Debug, Clone)]
struct Particle {
    position: [f64; DIMS],
    velocity: [f64; DIMS],
    best_position: [f64; DIMS],
    best_fitness: f64,
}

impl ParticleSwarm {
    pub fn new(config: PsoConfig) -> Self {
        Self { config }
    }

    fn budget(&self, requested: Option<usize>) -> (usize, usize) {
        let particles = self.config.particles.clamp(1, self.config.max_particles.max(1));
        let wanted = requested.unwrap_or(self.config.iterations);
        let iterations = wanted.min(self.config.max_iterations);
        if iterations < wanted {
            warn!(
                requested = wanted,
                max = self.config.max_iterations,
                "PSO iteration request clamped"
            );
        }
        (particles, iterations)
    }

    /// Run the swarm, reporting every evaluated candidate to `observer`.
    pub fn optimize_observed(
        &self,
        problem: &SearchProblem<'_>,
        iterations: Option<usize>,
        observer: &mut dyn FnMut(&Candidate),
    ) -> SwarmResult {
        let (particle_count, iterations) = self.budget(iterations);
        let geometry = problem.context.geometry;
        let objective = Objective::new(
            problem.context,
            problem.envelope,
            problem.weights,
            problem.physics,
        );
        let (lo, hi) = search_bounds(problem);
        let v_max: [f64; DIMS] =
            std::array::from_fn(|d| (hi[d] - lo[d]).max(0.0) * self.config.velocity_clamp_fraction);

        let mut rng = StdRng::seed_from_u64(self.config.seed);

        // Initial positions
        let mut candidates: Vec<Candidate> = (0..particle_count)
            .map(|i| {
                let raw = match (i, problem.seed) {
                    (0, Some(seed)) => seed.position(),
                    _ => std::array::from_fn(|d| lo[d] + rng.gen::<f64>() * (hi[d] - lo[d]).max(0.0)),
                };
                Candidate::clamped(raw, problem.envelope, &geometry)
            })
            .collect();
        let velocities: Vec<[f64; DIMS]> = (0..particle_count)
            .map(|_| std::array::from_fn(|d| (rng.gen::<f64>() * 2.0 - 1.0) * v_max[d]))
            .collect();

        let fitness = evaluate(&objective, &candidates, observer);
        let mut swarm: Vec<Particle> = candidates
            .iter()
            .zip(velocities)
            .zip(&fitness)
            .map(|((c, velocity), f)| Particle {
                position: c.position(),
                velocity,
                best_position: c.position(),
                best_fitness: *f,
            })
            .collect();

        let (mut global_best, mut global_fitness) = best_of(&candidates, &fitness);
        let mut evaluations = candidates.len();

        let c1 = self.config.cognitive;
        let c2 = self.config.social;
        let span = iterations.saturating_sub(1).max(1) as f64;

        for t in 0..iterations {
            let inertia = self.config.inertia_start
                - (self.config.inertia_start - self.config.inertia_end) * t as f64 / span;
            let g = global_best.position();

            for (particle, candidate) in swarm.iter_mut().zip(candidates.iter_mut()) {
                for d in 0..DIMS {
                    let r1: f64 = rng.gen();
                    let r2: f64 = rng.gen();
                    let v = inertia * particle.velocity[d]
                        + c1 * r1 * (particle.best_position[d] - particle.position[d])
                        + c2 * r2 * (g[d] - particle.position[d]);
                    particle.velocity[d] = clamp_between(v, -v_max[d], v_max[d]);
                    particle.position[d] += particle.velocity[d];
                }
                *candidate = Candidate::clamped(particle.position, problem.envelope, &geometry);
                particle.position = candidate.position();
            }

            let fitness = evaluate(&objective, &candidates, observer);
            evaluations += candidates.len();

            for ((particle, candidate), f) in swarm.iter_mut().zip(&candidates).zip(&fitness) {
                if *f > particle.best_fitness {
                    particle.best_fitness = *f;
                    particle.best_position = candidate.position();
                }
                if *f > global_fitness {
                    global_fitness = *f;
                    global_best = *candidate;
                }
            }
        }

        debug!(
            particles = particle_count,
            iterations,
            evaluations,
            fitness = global_fitness,
            vc = global_best.vc,
            fz = global_best.fz,
            ap = global_best.ap,
            ae = global_best.ae,
            "PSO finished"
        );

        SwarmResult {
            best: global_best,
            fitness: global_fitness,
            iterations,
            evaluations,
        }
    }
}

impl ParameterOptimizer for ParticleSwarm {
    fn optimize(&self, problem: &SearchProblem<'_>, iterations: Option<usize>) -> SwarmResult {
        self.optimize_observed(problem, iterations, &mut |_| {})
    }
}

/// Per-dimension search box, with Vc already intersected with the rpm axis.
fn search_bounds(problem: &SearchProblem<'_>) -> ([f64; DIMS], [f64; DIMS]) {
    let env = problem.envelope;
    let g = &problem.context.geometry;
    let vc_lo = env.vc.min.max(g.vc_for_rpm(env.rpm.min));
    let vc_hi = env.vc.max.min(g.vc_for_rpm(env.rpm.max));
    let lo = [vc_lo, env.feed.min, env.doc.min, env.woc.min];
    let hi = [vc_hi, env.feed.max, env.doc.max, env.woc.max];
    let finite = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
    (
        std::array::from_fn(|d| finite(lo[d], 0.0)),
        std::array::from_fn(|d| finite(hi[d], finite(lo[d], 0.0))),
    )
}

fn evaluate(
    objective: &Objective<'_>,
    candidates: &[Candidate],
    observer: &mut dyn FnMut(&Candidate),
) -> Vec<f64> {
    for c in candidates {
        observer(c);
    }
    candidates.par_iter().map(|c| objective.fitness(c)).collect()
}

fn best_of(candidates: &[Candidate], fitness: &[f64]) -> (Candidate, f64) {
    let mut best = (candidates[0], fitness[0]);
    for (c, f) in candidates.iter().zip(fitness).skip(1) {
        if *f > best.1 {
            best = (*c, *f);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::optimization::test_support::{context, envelope};
    use crate::types::{Axis, ObjectivePreset};

    fn small_swarm() -> ParticleSwarm {
        ParticleSwarm::new(PsoConfig {
            particles: 12,
            iterations: 40,
            ..PsoConfig::default()
        })
    }

    #[test]
    fn every_candidate_stays_inside_envelope() {
        let ctx = context();
        let env = envelope(&ctx);
        let physics = PhysicsConfig::default();
        let problem = SearchProblem {
            envelope: &env,
            context: &ctx,
            weights: ObjectivePreset::Productivity.weights(),
            physics: &physics,
            seed: None,
        };
        let mut seen = 0usize;
        let mut outside = 0usize;
        let result = small_swarm().optimize_observed(&problem, None, &mut |c| {
            seen += 1;
            if !c.is_within(&env, &ctx.geometry) {
                outside += 1;
            }
        });
        assert_eq!(seen, result.evaluations);
        assert_eq!(seen, 12 * 41);
        assert_eq!(outside, 0);
        assert!(result.best.is_within(&env, &ctx.geometry));
    }

    #[test]
    fn same_seed_same_answer() {
        let ctx = context();
        let env = envelope(&ctx);
        let physics = PhysicsConfig::default();
        let problem = SearchProblem {
            envelope: &env,
            context: &ctx,
            weights: ObjectivePreset::Balanced.weights(),
            physics: &physics,
            seed: None,
        };
        let a = small_swarm().optimize(&problem, None);
        let b = small_swarm().optimize(&problem, None);
        assert_eq!(a.best, b.best);
    }

    #[test]
    fn zero_width_axis_degenerates_to_a_point() {
        let ctx = context();
        let mut env = envelope(&ctx);
        env.intersect(Axis::Woc, 12.0, 12.0, "strategy_woc");
        env.intersect(Axis::Doc, 3.0, 3.0, "test");
        let physics = PhysicsConfig::default();
        let problem = SearchProblem {
            envelope: &env,
            context: &ctx,
            weights: ObjectivePreset::Balanced.weights(),
            physics: &physics,
            seed: None,
        };
        let result = small_swarm().optimize(&problem, Some(10));
        assert_eq!(result.best.ae, 12.0);
        assert_eq!(result.best.ap, 3.0);
        assert_eq!(result.iterations, 10);
    }

    #[test]
    fn objective_preset_moves_the_answer() {
        let ctx = context();
        let env = envelope(&ctx);
        let physics = PhysicsConfig::default();
        let run = |preset: ObjectivePreset| {
            let problem = SearchProblem {
                envelope: &env,
                context: &ctx,
                weights: preset.weights(),
                physics: &physics,
                seed: None,
            };
            let best = small_swarm().optimize(&problem, None).best;
            ctx.evaluate_cut(&best).mrr_cm3_min
        };
        assert!(run(ObjectivePreset::Productivity) > run(ObjectivePreset::SurfaceFinish));
    }

    #[test]
    fn iteration_request_is_capped() {
        let ctx = context();
        let env = envelope(&ctx);
        let physics = PhysicsConfig::default();
        let problem = SearchProblem {
            envelope: &env,
            context: &ctx,
            weights: ObjectivePreset::Balanced.weights(),
            physics: &physics,
            seed: None,
        };
        let swarm = ParticleSwarm::new(PsoConfig {
            particles: 4,
            max_iterations: 5,
            ..PsoConfig::default()
        });
        assert_eq!(swarm.optimize(&problem, Some(500)).iterations, 5);
    }

    #[test]
    fn seed_particle_is_never_beaten_by_worse() {
        let ctx = context();
        let env = envelope(&ctx);
        let physics = PhysicsConfig::default();
        let seed = Candidate::clamped([300.0, 0.08, 6.0, 4.0], &env, &ctx.geometry);
        let problem = SearchProblem {
            envelope: &env,
            context: &ctx,
            weights: ObjectivePreset::Balanced.weights(),
            physics: &physics,
            seed: Some(seed),
        };
        let objective = Objective::new(&ctx, &env, problem.weights, &physics);
        let result = small_swarm().optimize(&problem, None);
        assert!(result.fitness >= objective.fitness(&seed));
    }
}
