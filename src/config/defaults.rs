//! System-wide default constants.
//!
//! Centralises magic numbers that are not worth exposing as config keys.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Config Loading
// ============================================================================

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CUTWISE_CONFIG";

/// Config file searched in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "cutwise.toml";

// ============================================================================
// Physics
// ============================================================================

/// Edge radius used by the finish model when a tool has a sharp corner (mm).
pub const SHARP_CORNER_EDGE_RADIUS_MM: f64 = 0.05;

/// Speed ratio below which built-up edge is expected on BUE-prone materials.
pub const BUE_SPEED_RATIO: f64 = 0.4;

/// Roughness multiplier when built-up edge is expected.
pub const BUE_ROUGHNESS_FACTOR: f64 = 2.0;

/// Chip thickness floor so Kienzle stays finite (mm).
pub const MIN_CHIP_THICKNESS_MM: f64 = 1e-4;

// ============================================================================
// Numerics
// ============================================================================

/// First diagonal jitter tried when a Cholesky factorization fails, relative
/// to the mean diagonal.
pub const CHOLESKY_JITTER_START: f64 = 1e-10;

/// Jitter grows by this factor on every retry.
pub const CHOLESKY_JITTER_GROWTH: f64 = 100.0;

/// Retries before the factorization is reported as unstable.
pub const CHOLESKY_MAX_RETRIES: usize = 6;

/// Two-sided 95% standard-normal quantile.
pub const Z_95: f64 = 1.959_963_984_540_054;

// ============================================================================
// Monte Carlo
// ============================================================================

/// Base chatter probability for any cut.
pub const CHATTER_BASE_PROBABILITY: f64 = 0.02;

/// Combined risk score weights: breakage, chatter, quality, any-failure.
pub const RISK_WEIGHTS: [f64; 4] = [0.35, 0.30, 0.15, 0.20];

/// Golden-ratio increment used to derive per-trial RNG streams.
pub const STREAM_INCREMENT: u64 = 0x9E37_79B9_7F4A_7C15;
