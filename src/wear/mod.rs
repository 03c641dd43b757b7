//! Online Tool-Wear Estimator
//!
//! Kalman-filtered flank wear per physical tool instance, fed by in-process
//! measurements, producing a remaining-life estimate for tool-change planning.

mod kalman;
mod tracker;

pub use kalman::{ToolWearFilter, ToolWearState};
pub use tracker::WearTracker;

use crate::ml_engine::NumericalError;
use crate::types::WearEstimate;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WearError {
    #[error("wear measurement must be finite and >= 0 (got {0})")]
    InvalidMeasurement(f64),
    #[error(transparent)]
    Numerical(#[from] NumericalError),
    #[error("wear tracker lock poisoned")]
    LockPoisoned,
}

/// Seam for the orchestrator and the measurement path.
pub trait WearEstimator: Send + Sync {
    /// Predict one step, then fold in the measurement.
    fn record_measurement(&self, tool_instance_id: &str, measured_wear: f64) -> Result<WearEstimate, WearError>;

    /// Current estimate, `None` for an untracked instance.
    fn estimate(&self, tool_instance_id: &str) -> Option<WearEstimate>;

    /// Fresh edge. Returns false when the instance was not tracked.
    fn reset(&self, tool_instance_id: &str) -> Result<bool, WearError>;

    /// Copy of one filter, for persistence.
    fn snapshot(&self, tool_instance_id: &str) -> Result<Option<ToolWearFilter>, WearError>;

    /// Install a previously saved filter.
    fn restore(&self, tool_instance_id: &str, filter: ToolWearFilter) -> Result<(), WearError>;
}
