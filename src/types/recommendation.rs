//! Recommendation document returned to downstream consumers

use super::{
    ConstraintEnvelope, GpPrediction, MachiningMode, ObjectivePreset, OutcomeDistributions,
    ParameterConfidence, ProfileWarning, RiskReport,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sub-systems that can contribute to a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    ConstraintEngine,
    PhysicsBaseline,
    ParticleSwarm,
    BayesianAdaptation,
    GaussianProcess,
    MonteCarlo,
    StabilityLobes,
    StabilityHeuristic,
    WearEstimator,
}

/// One point on a stability lobe: chatter-free up to `limiting_doc_mm`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LobePoint {
    pub spindle_speed_rpm: f64,
    pub limiting_doc_mm: f64,
}

/// Chatter stability verdict for the recommended candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum StabilityAssessment {
    /// Computed from the dynamic response.
    Lobes {
        /// Limiting depth at the recommended spindle speed
        limiting_doc_mm: f64,
        stable: bool,
        lobes: Vec<Vec<LobePoint>>,
    },
    /// Dynamic data unavailable; 0-100 heuristic score.
    Heuristic { risk_score: f64 },
}

/// Values a machinist or post-processor can program directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineeringValues {
    pub rpm: f64,
    pub feed_rate_mm_min: f64,
    pub vc_m_min: f64,
    pub fz_mm: f64,
    pub ap_mm: f64,
    pub ae_mm: f64,
    pub mrr_cm3_min: f64,
    pub cutting_force_n: f64,
    pub power_kw: f64,
    pub torque_nm: f64,
}

/// Model predictions for the recommended values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    /// Extended Taylor tool life (minutes)
    pub tool_life_min: f64,
    /// GP tool-life estimate when cutting history exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_life_gp: Option<GpPrediction>,
    pub surface_roughness_ra_um: f64,
    pub stability: StabilityAssessment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributions: Option<OutcomeDistributions>,
    /// Remaining life of the physical tool instance, from the wear filter
    #[serde(default, skip_serializing_if = "Option::is_none", with = "super::unbounded::option")]
    pub remaining_wear_life: Option<f64>,
}

/// Complete output of one `recommend` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationDocument {
    pub generated_at: DateTime<Utc>,
    pub material_id: String,
    pub tool_id: String,
    pub machine_id: String,
    pub mode: MachiningMode,
    pub objective: ObjectivePreset,
    pub values: EngineeringValues,
    pub predictions: Predictions,
    pub confidence: Vec<ParameterConfidence>,
    /// Set when the corrections came from a posterior draw
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploration_seed: Option<u64>,
    pub risk: RiskReport,
    pub subsystems: Vec<Subsystem>,
    pub warnings: Vec<ProfileWarning>,
    pub envelope: ConstraintEnvelope,
}
