//! Config Validation Tests
//!
//! Exercises TOML loading, range validation and unknown-key detection
//! independently from the rest of the pipeline.

use cutwise::config::{validate_unknown_keys, ConfigError, EngineConfig};

// ============================================================================
// Unknown keys
// ============================================================================

#[test]
fn typo_in_monte_carlo_section_warns_with_suggestion() {
    let toml_str = r#"
[monte_carlo]
trails = 500
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert_eq!(warnings[0].field, "monte_carlo.trails");
    assert_eq!(warnings[0].suggestion.as_deref(), Some("monte_carlo.trials"));
}

#[test]
fn unknown_section_warns_without_breaking_load() {
    let toml_str = r#"
[telemetry]
enabled = true

[pso]
particles = 20
"#;
    assert!(!validate_unknown_keys(toml_str).is_empty());
    let config = EngineConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(config.pso.particles, 20);
}

// ============================================================================
// Range validation
// ============================================================================

#[test]
fn defaults_are_valid() {
    EngineConfig::default().validate().unwrap();
}

#[test]
fn partial_file_keeps_defaults_elsewhere() {
    let config = EngineConfig::from_toml_str("[kalman]\nmax_wear = 0.2\n").unwrap();
    assert_eq!(config.kalman.max_wear, 0.2);
    assert_eq!(config.pso, EngineConfig::default().pso);
}

#[test]
fn every_violation_is_reported_at_once() {
    let toml_str = r#"
[pso]
particles = 0

[gp]
length_scale = -1.0

[kalman]
measurement_noise = 0.0
"#;
    match EngineConfig::from_toml_str(toml_str) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 3, "{errors:?}");
            assert!(errors.iter().any(|e| e.contains("pso.particles")));
            assert!(errors.iter().any(|e| e.contains("gp.length_scale")));
            assert!(errors.iter().any(|e| e.contains("kalman.measurement_noise")));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn counts_above_their_maxima_are_rejected() {
    let toml_str = r#"
[monte_carlo]
trials = 500
max_trials = 100
"#;
    assert!(matches!(
        EngineConfig::from_toml_str(toml_str),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    assert!(matches!(
        EngineConfig::from_toml_str("[pso\nparticles = 3"),
        Err(ConfigError::Parse(..))
    ));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn round_trips_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cutwise.toml");

    let mut config = EngineConfig::default();
    config.pso.seed = 7;
    config.fallback.max_rpm = 9000.0;
    std::fs::write(&path, config.to_toml().unwrap()).unwrap();

    let loaded = EngineConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = EngineConfig::load_from_file(&dir.path().join("absent.toml"));
    match result {
        Err(e @ ConfigError::Io(..)) => assert!(e.to_string().contains("absent.toml")),
        other => panic!("expected I/O error, got {other:?}"),
    }
}
