//! Shared types for the adaptation layer and the wear estimator

use serde::{Deserialize, Serialize};

/// Parameters whose recommended values carry a learned correction multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptedParameter {
    /// Cutting speed
    Speed,
    /// Feed per tooth
    Feed,
    /// Axial depth of cut
    Doc,
}

impl AdaptedParameter {
    pub const ALL: [AdaptedParameter; 3] = [
        AdaptedParameter::Speed,
        AdaptedParameter::Feed,
        AdaptedParameter::Doc,
    ];
}

impl std::fmt::Display for AdaptedParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdaptedParameter::Speed => write!(f, "speed"),
            AdaptedParameter::Feed => write!(f, "feed"),
            AdaptedParameter::Doc => write!(f, "doc"),
        }
    }
}

impl std::str::FromStr for AdaptedParameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "speed" | "vc" | "rpm" => Ok(AdaptedParameter::Speed),
            "feed" | "fz" => Ok(AdaptedParameter::Feed),
            "doc" | "ap" => Ok(AdaptedParameter::Doc),
            other => Err(format!("unknown parameter: {other}")),
        }
    }
}

/// How the cut went when the operator ran their own value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    Success,
    Acceptable,
    ToolBreakage,
    Chatter,
    PoorFinish,
}

impl FeedbackOutcome {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            FeedbackOutcome::ToolBreakage | FeedbackOutcome::Chatter | FeedbackOutcome::PoorFinish
        )
    }
}

impl std::fmt::Display for FeedbackOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeedbackOutcome::Success => "success",
            FeedbackOutcome::Acceptable => "acceptable",
            FeedbackOutcome::ToolBreakage => "tool_breakage",
            FeedbackOutcome::Chatter => "chatter",
            FeedbackOutcome::PoorFinish => "poor_finish",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for FeedbackOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "success" => Ok(FeedbackOutcome::Success),
            "acceptable" => Ok(FeedbackOutcome::Acceptable),
            "tool_breakage" | "breakage" => Ok(FeedbackOutcome::ToolBreakage),
            "chatter" => Ok(FeedbackOutcome::Chatter),
            "poor_finish" => Ok(FeedbackOutcome::PoorFinish),
            other => Err(format!("unknown outcome: {other}")),
        }
    }
}

/// Normal distribution summarized by mean and variance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    pub mean: f64,
    pub variance: f64,
}

/// Per-parameter confidence reported alongside a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterConfidence {
    pub parameter: AdaptedParameter,
    /// Correction multiplier applied: the posterior mean, or a draw when exploring
    pub multiplier: f64,
    /// `1 - sqrt(posterior variance)`, clamped to [0, 1]
    pub confidence: f64,
}

/// Gaussian-Process tool-life prediction at one cutting speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpPrediction {
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    /// Half-width of the 95% interval around `mean`
    pub confidence_95: f64,
}

/// Filtered wear state for one physical tool instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearEstimate {
    pub tool_instance_id: String,
    /// Estimated flank wear (mm)
    pub wear_amount: f64,
    /// Estimated wear rate (mm per time step)
    pub wear_rate: f64,
    /// Time steps until `max_wear`; infinite while the rate is non-positive
    #[serde(with = "super::unbounded")]
    pub remaining_life: f64,
    /// Trace of the 2x2 state covariance
    pub uncertainty: f64,
    pub measurements: u64,
}
