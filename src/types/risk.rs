//! Monte Carlo risk outputs

use serde::{Deserialize, Serialize};

/// Qualitative risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBand {
    Safe,
    Low,
    Moderate,
    High,
}

impl RiskBand {
    /// Band for a combined score in [0, 1].
    pub fn from_score(score: f64) -> Self {
        if score < 0.05 {
            RiskBand::Safe
        } else if score < 0.15 {
            RiskBand::Low
        } else if score < 0.35 {
            RiskBand::Moderate
        } else {
            RiskBand::High
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RiskBand::Safe => "SAFE",
            RiskBand::Low => "LOW",
            RiskBand::Moderate => "MODERATE",
            RiskBand::High => "HIGH",
        };
        write!(f, "{name}")
    }
}

/// Aggregate probabilities from one risk simulation. Produced fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub trials: usize,
    /// Fraction of trials with at least one failure event
    pub failure_rate: f64,
    pub tool_breakage_risk: f64,
    pub chatter_risk: f64,
    pub quality_risk: f64,
    /// Fraction of trials exceeding the spindle/surface-speed ceiling
    pub overspeed_risk: f64,
    /// Weighted combination that selects the band
    pub combined_score: f64,
    pub band: RiskBand,
}

/// Percentile summary of a simulated distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub samples: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
    pub min: f64,
    pub max: f64,
}

/// Cycle-time and tool-life spread for a recommended candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDistributions {
    /// Minutes per part
    pub cycle_time: DistributionSummary,
    /// Minutes of cutting per edge
    pub tool_life: DistributionSummary,
    /// Conservative tool-change interval (10th percentile of tool life)
    pub tool_change_interval_min: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_thresholds() {
        assert_eq!(RiskBand::from_score(0.0), RiskBand::Safe);
        assert_eq!(RiskBand::from_score(0.05), RiskBand::Low);
        assert_eq!(RiskBand::from_score(0.2), RiskBand::Moderate);
        assert_eq!(RiskBand::from_score(0.35), RiskBand::High);
    }

    #[test]
    fn band_serializes_upper_case() {
        let json = serde_json::to_string(&RiskBand::Moderate).unwrap();
        assert_eq!(json, "\"MODERATE\"");
    }
}
