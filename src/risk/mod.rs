//! Monte Carlo Risk Simulator
//!
//! - `monte_carlo`: failure probabilities and the combined risk band
//! - `distributions`: cycle-time and tool-life spreads for planning
//!
//! Trial counts come from `MonteCarloConfig` and are capped at its maximum.

mod distributions;
mod monte_carlo;

pub use distributions::summarize;
pub use monte_carlo::{
    chatter_probability, ChatterExposure, MonteCarloSimulator, RiskLimits, RiskScenario,
    RiskSimulator,
};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::physics_engine::CuttingContext;
    use crate::types::{
        Candidate, MaterialFamily, MaterialProfile, ToolMaterial, ToolProfile, ValueRange,
    };

    /// 10 mm four-flute in 1045 steel, stickout 3xD.
    pub fn context() -> CuttingContext {
        let tool = ToolProfile {
            id: "em10".into(),
            diameter_mm: 10.0,
            flute_count: 4,
            flute_length_mm: Some(22.0),
            stickout_mm: Some(30.0),
            corner_radius_mm: Some(0.5),
            tool_material: ToolMaterial::Carbide,
            max_rpm: None,
            fz_range: None,
            max_cutting_force_n: None,
            dynamics: None,
        };
        let material = MaterialProfile {
            id: "1045".into(),
            name: "AISI 1045".into(),
            family: MaterialFamily::Steel,
            hardness_hb: Some(200.0),
            kc1_1: Some(1800.0),
            mc: Some(0.26),
            vc_range: Some(ValueRange::new(120.0, 240.0)),
            vc_nominal: Some(180.0),
            fz_range: Some(ValueRange::new(0.04, 0.12)),
            max_doc_ratio: Some(1.5),
            taylor: None,
        };
        CuttingContext::new(&tool, &material).0
    }

    pub fn candidate(ctx: &CuttingContext) -> Candidate {
        Candidate::from_position([180.0, 0.06, 5.0, 3.0], &ctx.geometry)
    }
}
