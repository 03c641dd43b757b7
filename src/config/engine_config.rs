//! Engine Configuration - optimizer, simulator and filter tuning as TOML values
//!
//! Each section implements `Default` with the values the engine was tuned
//! with, so a missing or partial config file changes nothing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults::{CONFIG_ENV_VAR, LOCAL_CONFIG_FILE};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for the recommendation engine.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$CUTWISE_CONFIG` env var
/// 2. `./cutwise.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Particle swarm search
    #[serde(default)]
    pub pso: PsoConfig,

    /// Monte Carlo risk and distribution simulation
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,

    /// Conjugate multiplier beliefs
    #[serde(default)]
    pub bayes: BayesConfig,

    /// Tool-life Gaussian Process
    #[serde(default)]
    pub gp: GpConfig,

    /// Tool-wear Kalman filter
    #[serde(default)]
    pub kalman: KalmanConfig,

    /// Physics model constants
    #[serde(default)]
    pub physics: PhysicsConfig,

    /// Caps applied to axes no collaborator bounded
    #[serde(default)]
    pub fallback: FallbackLimits,
}

impl EngineConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./cutwise.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all sections for internal consistency.
    ///
    /// Every violation is collected so the operator sees the full list at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let p = &self.pso;
        if p.particles == 0 || p.particles > p.max_particles {
            errors.push(format!(
                "pso.particles ({}) must be in 1..={}",
                p.particles, p.max_particles
            ));
        }
        if p.iterations == 0 || p.iterations > p.max_iterations {
            errors.push(format!(
                "pso.iterations ({}) must be in 1..={}",
                p.iterations, p.max_iterations
            ));
        }
        if p.inertia_end > p.inertia_start {
            errors.push(format!(
                "pso.inertia_end ({:.2}) must be <= inertia_start ({:.2})",
                p.inertia_end, p.inertia_start
            ));
        }
        Self::check_positive(p.cognitive, "pso.cognitive", &mut errors);
        Self::check_positive(p.social, "pso.social", &mut errors);
        Self::check_fraction(p.velocity_clamp_fraction, "pso.velocity_clamp_fraction", &mut errors);

        let mc = &self.monte_carlo;
        if mc.trials == 0 || mc.trials > mc.max_trials {
            errors.push(format!(
                "monte_carlo.trials ({}) must be in 1..={}",
                mc.trials, mc.max_trials
            ));
        }
        Self::check_fraction(mc.perturbation, "monte_carlo.perturbation", &mut errors);
        if mc.breakage_force_factor < 1.0 {
            errors.push("monte_carlo.breakage_force_factor must be >= 1.0".to_string());
        }
        Self::check_positive(mc.max_surface_roughness_um, "monte_carlo.max_surface_roughness_um", &mut errors);
        Self::check_positive(mc.weibull_shape, "monte_carlo.weibull_shape", &mut errors);
        Self::check_positive(mc.weibull_scale_factor, "monte_carlo.weibull_scale_factor", &mut errors);
        Self::check_fraction(mc.tool_change_probability, "monte_carlo.tool_change_probability", &mut errors);
        Self::check_fraction(mc.chip_clearing_probability, "monte_carlo.chip_clearing_probability", &mut errors);

        let b = &self.bayes;
        Self::check_positive(b.prior_mean, "bayes.prior_mean", &mut errors);
        Self::check_positive(b.prior_variance, "bayes.prior_variance", &mut errors);
        Self::check_positive(b.obs_variance_success, "bayes.obs_variance_success", &mut errors);
        Self::check_positive(b.obs_variance_acceptable, "bayes.obs_variance_acceptable", &mut errors);
        Self::check_positive(b.obs_variance_failure, "bayes.obs_variance_failure", &mut errors);
        Self::check_fraction(b.failure_shrink, "bayes.failure_shrink", &mut errors);

        let g = &self.gp;
        Self::check_positive(g.length_scale, "gp.length_scale", &mut errors);
        Self::check_positive(g.signal_variance, "gp.signal_variance", &mut errors);
        Self::check_positive(g.noise_variance, "gp.noise_variance", &mut errors);
        if g.max_observations == 0 {
            errors.push("gp.max_observations must be > 0".to_string());
        }

        let k = &self.kalman;
        Self::check_positive(k.dt, "kalman.dt", &mut errors);
        Self::check_positive(k.measurement_noise, "kalman.measurement_noise", &mut errors);
        Self::check_positive(k.max_wear, "kalman.max_wear", &mut errors);
        if k.process_noise_wear < 0.0 || k.process_noise_rate < 0.0 {
            errors.push("kalman process noise must be >= 0".to_string());
        }

        let ph = &self.physics;
        Self::check_positive(ph.reference_tool_life_min, "physics.reference_tool_life_min", &mut errors);
        Self::check_positive(ph.reference_roughness_um, "physics.reference_roughness_um", &mut errors);
        if ph.stability_lobes == 0 || ph.stability_sweep_points < 2 {
            errors.push("physics.stability_lobes must be > 0 and stability_sweep_points >= 2".to_string());
        }

        let f = &self.fallback;
        for (name, value) in [
            ("fallback.max_rpm", f.max_rpm),
            ("fallback.max_vc", f.max_vc),
            ("fallback.max_fz", f.max_fz),
            ("fallback.max_doc", f.max_doc),
            ("fallback.max_woc", f.max_woc),
        ] {
            Self::check_positive(value, name, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
        // NaN comparisons silently pass, so check finiteness first
        if !value.is_finite() || value <= 0.0 {
            errors.push(format!("{name} must be a finite value > 0 (got {value})"));
        }
    }

    fn check_fraction(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            errors.push(format!("{name} must be within [0, 1] (got {value})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// PSO Config
// ============================================================================

/// Particle swarm tuning. Iterations are a fixed budget, not a convergence test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsoConfig {
    #[serde(default = "default_particles")]
    pub particles: usize,

    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Hard ceiling on per-request iteration overrides.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_max_particles")]
    pub max_particles: usize,

    /// Inertia weight at the first iteration; decays linearly to `inertia_end`.
    #[serde(default = "default_inertia_start")]
    pub inertia_start: f64,

    #[serde(default = "default_inertia_end")]
    pub inertia_end: f64,

    #[serde(default = "default_acceleration")]
    pub cognitive: f64,

    #[serde(default = "default_acceleration")]
    pub social: f64,

    /// Velocity limit per axis as a fraction of the axis width.
    #[serde(default = "default_velocity_clamp")]
    pub velocity_clamp_fraction: f64,

    #[serde(default = "default_pso_seed")]
    pub seed: u64,
}

fn default_particles() -> usize {
    30
}
fn default_iterations() -> usize {
    100
}
fn default_max_iterations() -> usize {
    1_000
}
fn default_max_particles() -> usize {
    200
}
fn default_inertia_start() -> f64 {
    0.9
}
fn default_inertia_end() -> f64 {
    0.4
}
fn default_acceleration() -> f64 {
    1.5
}
fn default_velocity_clamp() -> f64 {
    0.2
}
fn default_pso_seed() -> u64 {
    0x5EED_0001
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            particles: default_particles(),
            iterations: default_iterations(),
            max_iterations: default_max_iterations(),
            max_particles: default_max_particles(),
            inertia_start: default_inertia_start(),
            inertia_end: default_inertia_end(),
            cognitive: default_acceleration(),
            social: default_acceleration(),
            velocity_clamp_fraction: default_velocity_clamp(),
            seed: default_pso_seed(),
        }
    }
}

// ============================================================================
// Monte Carlo Config
// ============================================================================

/// Monte Carlo risk and distribution simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    #[serde(default = "default_trials")]
    pub trials: usize,

    /// Hard ceiling on per-request trial overrides.
    #[serde(default = "default_max_trials")]
    pub max_trials: usize,

    /// Symmetric multiplicative noise half-width on Vc, fz and ap.
    #[serde(default = "default_perturbation")]
    pub perturbation: f64,

    /// Breakage when cutting force exceeds this multiple of the allowed force.
    #[serde(default = "default_breakage_factor")]
    pub breakage_force_factor: f64,

    /// Quality failure above this roughness (µm Ra).
    #[serde(default = "default_max_ra")]
    pub max_surface_roughness_um: f64,

    #[serde(default = "default_mc_seed")]
    pub seed: u64,

    /// Relative σ of the machining portion of cycle time.
    #[serde(default = "default_process_sigma")]
    pub process_sigma: f64,

    /// Relative σ of handling/setup overhead.
    #[serde(default = "default_handling_sigma")]
    pub handling_sigma: f64,

    #[serde(default = "default_tool_change_probability")]
    pub tool_change_probability: f64,

    #[serde(default = "default_tool_change_delay")]
    pub tool_change_delay_min: f64,

    #[serde(default = "default_chip_clearing_probability")]
    pub chip_clearing_probability: f64,

    #[serde(default = "default_chip_clearing_delay")]
    pub chip_clearing_delay_min: f64,

    #[serde(default = "default_weibull_shape")]
    pub weibull_shape: f64,

    /// Weibull scale as a multiple of the deterministic tool life.
    #[serde(default = "default_weibull_scale_factor")]
    pub weibull_scale_factor: f64,

    /// Relative σ of actual speed and feed around the programmed values.
    #[serde(default = "default_life_sigma")]
    pub life_speed_sigma: f64,

    #[serde(default = "default_life_sigma")]
    pub life_feed_sigma: f64,
}

fn default_trials() -> usize {
    2_000
}
fn default_max_trials() -> usize {
    100_000
}
fn default_perturbation() -> f64 {
    0.2
}
fn default_breakage_factor() -> f64 {
    1.5
}
fn default_max_ra() -> f64 {
    3.2
}
fn default_mc_seed() -> u64 {
    0x5EED_0002
}
fn default_process_sigma() -> f64 {
    0.05
}
fn default_handling_sigma() -> f64 {
    0.02
}
fn default_tool_change_probability() -> f64 {
    0.05
}
fn default_tool_change_delay() -> f64 {
    2.0
}
fn default_chip_clearing_probability() -> f64 {
    0.02
}
fn default_chip_clearing_delay() -> f64 {
    5.0
}
fn default_weibull_shape() -> f64 {
    3.0
}
fn default_weibull_scale_factor() -> f64 {
    1.13
}
fn default_life_sigma() -> f64 {
    0.05
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            trials: default_trials(),
            max_trials: default_max_trials(),
            perturbation: default_perturbation(),
            breakage_force_factor: default_breakage_factor(),
            max_surface_roughness_um: default_max_ra(),
            seed: default_mc_seed(),
            process_sigma: default_process_sigma(),
            handling_sigma: default_handling_sigma(),
            tool_change_probability: default_tool_change_probability(),
            tool_change_delay_min: default_tool_change_delay(),
            chip_clearing_probability: default_chip_clearing_probability(),
            chip_clearing_delay_min: default_chip_clearing_delay(),
            weibull_shape: default_weibull_shape(),
            weibull_scale_factor: default_weibull_scale_factor(),
            life_speed_sigma: default_life_sigma(),
            life_feed_sigma: default_life_sigma(),
        }
    }
}

// ============================================================================
// Bayes Config
// ============================================================================

/// Conjugate Gaussian beliefs over correction multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesConfig {
    #[serde(default = "default_prior_mean")]
    pub prior_mean: f64,

    #[serde(default = "default_prior_variance")]
    pub prior_variance: f64,

    #[serde(default = "default_obs_success")]
    pub obs_variance_success: f64,

    #[serde(default = "default_obs_acceptable")]
    pub obs_variance_acceptable: f64,

    #[serde(default = "default_obs_failure")]
    pub obs_variance_failure: f64,

    /// Multiplier applied to the observed ratio when the cut failed.
    #[serde(default = "default_failure_shrink")]
    pub failure_shrink: f64,
}

fn default_prior_mean() -> f64 {
    1.0
}
fn default_prior_variance() -> f64 {
    0.04
}
fn default_obs_success() -> f64 {
    0.01
}
fn default_obs_acceptable() -> f64 {
    0.02
}
fn default_obs_failure() -> f64 {
    0.05
}
fn default_failure_shrink() -> f64 {
    0.9
}

impl Default for BayesConfig {
    fn default() -> Self {
        Self {
            prior_mean: default_prior_mean(),
            prior_variance: default_prior_variance(),
            obs_variance_success: default_obs_success(),
            obs_variance_acceptable: default_obs_acceptable(),
            obs_variance_failure: default_obs_failure(),
            failure_shrink: default_failure_shrink(),
        }
    }
}

// ============================================================================
// GP Config
// ============================================================================

/// Fixed RBF hyperparameters for the speed → tool-life regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpConfig {
    /// RBF length scale (m/min).
    #[serde(default = "default_length_scale")]
    pub length_scale: f64,

    /// Signal variance (min²).
    #[serde(default = "default_signal_variance")]
    pub signal_variance: f64,

    /// Observation noise variance (min²).
    #[serde(default = "default_noise_variance")]
    pub noise_variance: f64,

    /// Training window; oldest pairs are evicted beyond this.
    #[serde(default = "default_max_observations")]
    pub max_observations: usize,
}

fn default_length_scale() -> f64 {
    40.0
}
fn default_signal_variance() -> f64 {
    400.0
}
fn default_noise_variance() -> f64 {
    4.0
}
fn default_max_observations() -> usize {
    200
}

impl Default for GpConfig {
    fn default() -> Self {
        Self {
            length_scale: default_length_scale(),
            signal_variance: default_signal_variance(),
            noise_variance: default_noise_variance(),
            max_observations: default_max_observations(),
        }
    }
}

// ============================================================================
// Kalman Config
// ============================================================================

/// Two-state wear filter tuning. Wear in mm, time in filter steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KalmanConfig {
    #[serde(default = "default_dt")]
    pub dt: f64,

    /// Fractional growth of the wear rate per unit time.
    #[serde(default = "default_rate_growth")]
    pub wear_rate_growth: f64,

    #[serde(default = "default_q_wear")]
    pub process_noise_wear: f64,

    #[serde(default = "default_q_rate")]
    pub process_noise_rate: f64,

    #[serde(default = "default_r")]
    pub measurement_noise: f64,

    /// Flank wear at which the edge is considered worn out (mm).
    #[serde(default = "default_max_wear")]
    pub max_wear: f64,

    #[serde(default)]
    pub initial_wear: f64,

    #[serde(default = "default_initial_rate")]
    pub initial_rate: f64,

    #[serde(default = "default_initial_wear_variance")]
    pub initial_wear_variance: f64,

    #[serde(default = "default_initial_rate_variance")]
    pub initial_rate_variance: f64,
}

fn default_dt() -> f64 {
    1.0
}
fn default_rate_growth() -> f64 {
    0.01
}
fn default_q_wear() -> f64 {
    1e-5
}
fn default_q_rate() -> f64 {
    1e-8
}
fn default_r() -> f64 {
    1e-4
}
fn default_max_wear() -> f64 {
    0.3
}
fn default_initial_rate() -> f64 {
    0.001
}
fn default_initial_wear_variance() -> f64 {
    1e-3
}
fn default_initial_rate_variance() -> f64 {
    1e-6
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            wear_rate_growth: default_rate_growth(),
            process_noise_wear: default_q_wear(),
            process_noise_rate: default_q_rate(),
            measurement_noise: default_r(),
            max_wear: default_max_wear(),
            initial_wear: 0.0,
            initial_rate: default_initial_rate(),
            initial_wear_variance: default_initial_wear_variance(),
            initial_rate_variance: default_initial_rate_variance(),
        }
    }
}

// ============================================================================
// Physics Config
// ============================================================================

/// Physics and fitness normalization constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Tool life at which the life term of the fitness reaches 0.5 (min).
    #[serde(default = "default_reference_life")]
    pub reference_tool_life_min: f64,

    /// Roughness at which the finish term of the fitness reaches 0.5 (µm).
    #[serde(default = "default_reference_ra")]
    pub reference_roughness_um: f64,

    /// Fitness penalty per unit of relative power/torque overload.
    #[serde(default = "default_overload_penalty")]
    pub overload_penalty: f64,

    #[serde(default = "default_stability_lobes")]
    pub stability_lobes: usize,

    #[serde(default = "default_sweep_points")]
    pub stability_sweep_points: usize,
}

fn default_reference_life() -> f64 {
    30.0
}
fn default_reference_ra() -> f64 {
    1.6
}
fn default_overload_penalty() -> f64 {
    2.0
}
fn default_stability_lobes() -> usize {
    5
}
fn default_sweep_points() -> usize {
    400
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            reference_tool_life_min: default_reference_life(),
            reference_roughness_um: default_reference_ra(),
            overload_penalty: default_overload_penalty(),
            stability_lobes: default_stability_lobes(),
            stability_sweep_points: default_sweep_points(),
        }
    }
}

// ============================================================================
// Fallback Limits
// ============================================================================

/// Finite ceilings for axes that no collaborator bounded.
///
/// Tagged `engine_default` in the envelope provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackLimits {
    #[serde(default = "default_fb_rpm")]
    pub max_rpm: f64,

    #[serde(default = "default_fb_vc")]
    pub max_vc: f64,

    #[serde(default = "default_fb_fz")]
    pub max_fz: f64,

    #[serde(default = "default_fb_doc")]
    pub max_doc: f64,

    #[serde(default = "default_fb_woc")]
    pub max_woc: f64,
}

fn default_fb_rpm() -> f64 {
    12_000.0
}
fn default_fb_vc() -> f64 {
    400.0
}
fn default_fb_fz() -> f64 {
    0.2
}
fn default_fb_doc() -> f64 {
    25.0
}
fn default_fb_woc() -> f64 {
    25.0
}

impl Default for FallbackLimits {
    fn default() -> Self {
        Self {
            max_rpm: default_fb_rpm(),
            max_vc: default_fb_vc(),
            max_fz: default_fb_fz(),
            max_doc: default_fb_doc(),
            max_woc: default_fb_woc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: EngineConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.pso.particles, 30);
        assert_eq!(config.monte_carlo.perturbation, 0.2);
        assert_eq!(config.bayes.prior_variance, 0.04);
        assert_eq!(config.kalman.initial_rate, 0.001);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[pso]
iterations = 250

[gp]
length_scale = 55.0
"#;
        let config = EngineConfig::from_toml_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.pso.iterations, 250);
        assert_eq!(config.gp.length_scale, 55.0);
        // Non-overridden values retain defaults
        assert_eq!(config.pso.particles, 30);
        assert_eq!(config.gp.noise_variance, 4.0);
    }

    #[test]
    fn test_validation_collects_every_error() {
        let mut config = EngineConfig::default();
        config.pso.iterations = 0;
        config.bayes.prior_variance = -1.0;
        config.gp.length_scale = f64::NAN;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 3, "{errors:?}");
                assert!(errors.iter().any(|e| e.contains("pso.iterations")));
                assert!(errors.iter().any(|e| e.contains("gp.length_scale")));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_trials_above_ceiling_rejected() {
        let mut config = EngineConfig::default();
        config.monte_carlo.trials = config.monte_carlo.max_trials + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = EngineConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped = EngineConfig::from_toml_str(&toml_str).expect("deserialization should work");
        assert_eq!(original.pso.seed, roundtripped.pso.seed);
        assert_eq!(original.kalman.max_wear, roundtripped.kalman.max_wear);
    }
}
