//! Engine Configuration Module
//!
//! Provides optimizer, simulator, filter and physics tuning loaded from TOML,
//! replacing hardcoded constants with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `CUTWISE_CONFIG` environment variable (path to TOML file)
//! 2. `cutwise.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The config is loaded once by the caller and handed to the components that
//! need it; there is no process-wide config global.
//!
//! ```ignore
//! let config = EngineConfig::load();
//! let service = CuttingService::from_config(&config, catalog);
//! ```

pub mod defaults;
mod engine_config;
mod validation;

pub use engine_config::*;
pub use validation::{validate_unknown_keys, ValidationWarning};
