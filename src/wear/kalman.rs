//! Two-state Kalman filter for flank wear
//!
//! State `x = [wear, rate]`, transition `F = [[1, dt], [0, 1 + g·dt]]` so the
//! rate itself creeps up as the edge degrades. Only wear is measured
//! (`H = [1, 0]`). The covariance update is the full `(I − K·H)·P`, then
//! re-symmetrized.

use serde::{Deserialize, Serialize};

use crate::config::KalmanConfig;
use crate::ml_engine::NumericalError;
use crate::types::WearEstimate;

/// Filter state: estimate plus 2x2 covariance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolWearState {
    pub wear_amount: f64,
    pub wear_rate: f64,
    pub covariance: [[f64; 2]; 2],
}

impl ToolWearState {
    pub fn initial(config: &KalmanConfig) -> Self {
        Self {
            wear_amount: config.initial_wear,
            wear_rate: config.initial_rate,
            covariance: [
                [config.initial_wear_variance, 0.0],
                [0.0, config.initial_rate_variance],
            ],
        }
    }

    pub fn trace(&self) -> f64 {
        self.covariance[0][0] + self.covariance[1][1]
    }
}

/// One filter per physical tool instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolWearFilter {
    config: KalmanConfig,
    state: ToolWearState,
    measurements: u64,
}

impl ToolWearFilter {
    pub fn new(config: KalmanConfig) -> Self {
        Self {
            state: ToolWearState::initial(&config),
            config,
            measurements: 0,
        }
    }

    pub fn state(&self) -> &ToolWearState {
        &self.state
    }

    pub fn measurements(&self) -> u64 {
        self.measurements
    }

    /// Advance one configured time step.
    pub fn predict(&mut self) {
        self.predict_by(self.config.dt);
    }

    /// `x = F·x`, `P = F·P·Fᵀ + Q·dt`.
    pub fn predict_by(&mut self, dt: f64) {
        let growth = 1.0 + self.config.wear_rate_growth * dt;
        let f = [[1.0, dt], [0.0, growth]];
        let s = &mut self.state;

        s.wear_amount += dt * s.wear_rate;
        s.wear_rate *= growth;

        let p = s.covariance;
        // F·P
        let fp = [
            [
                f[0][0] * p[0][0] + f[0][1] * p[1][0],
                f[0][0] * p[0][1] + f[0][1] * p[1][1],
            ],
            [f[1][1] * p[1][0], f[1][1] * p[1][1]],
        ];
        // (F·P)·Fᵀ
        let mut next = [
            [
                fp[0][0] * f[0][0] + fp[0][1] * f[0][1],
                fp[0][1] * f[1][1],
            ],
            [
                fp[1][0] * f[0][0] + fp[1][1] * f[0][1],
                fp[1][1] * f[1][1],
            ],
        ];
        next[0][0] += self.config.process_noise_wear * dt;
        next[1][1] += self.config.process_noise_rate * dt;
        s.covariance = symmetrized(next);
    }

    /// Fold in one wear measurement (mm).
    pub fn update(&mut self, measured_wear: f64) -> Result<(), NumericalError> {
        if !measured_wear.is_finite() {
            return Err(NumericalError::NonFinite {
                what: "wear measurement",
                value: measured_wear,
            });
        }
        let s = &mut self.state;
        let p = s.covariance;
        let innovation_var = p[0][0] + self.config.measurement_noise;
        if !innovation_var.is_finite() || innovation_var <= 0.0 {
            return Err(NumericalError::NonFinite {
                what: "innovation variance",
                value: innovation_var,
            });
        }

        let k = [p[0][0] / innovation_var, p[1][0] / innovation_var];
        let innovation = measured_wear - s.wear_amount;
        s.wear_amount += k[0] * innovation;
        s.wear_rate += k[1] * innovation;

        // (I − K·H)·P with H = [1, 0]
        let next = [
            [(1.0 - k[0]) * p[0][0], (1.0 - k[0]) * p[0][1]],
            [p[1][0] - k[1] * p[0][0], p[1][1] - k[1] * p[0][1]],
        ];
        s.covariance = symmetrized(next);
        self.measurements += 1;
        Ok(())
    }

    /// Steps until `max_wear`: infinite while the rate is non-positive, zero
    /// once the edge is already worn out.
    pub fn remaining_life(&self) -> f64 {
        let s = &self.state;
        if s.wear_rate <= 0.0 {
            f64::INFINITY
        } else if s.wear_amount >= self.config.max_wear {
            0.0
        } else {
            (self.config.max_wear - s.wear_amount) / s.wear_rate
        }
    }

    /// Back to the configured initial state (fresh edge).
    pub fn reset(&mut self) {
        self.state = ToolWearState::initial(&self.config);
        self.measurements = 0;
    }

    pub fn estimate(&self, tool_instance_id: &str) -> WearEstimate {
        WearEstimate {
            tool_instance_id: tool_instance_id.to_string(),
            wear_amount: self.state.wear_amount,
            wear_rate: self.state.wear_rate,
            remaining_life: self.remaining_life(),
            uncertainty: self.state.trace(),
            measurements: self.measurements,
        }
    }
}

fn symmetrized(p: [[f64; 2]; 2]) -> [[f64; 2]; 2] {
    let off = 0.5 * (p[0][1] + p[1][0]);
    [[p[0][0], off], [off, p[1][1]]]
}
