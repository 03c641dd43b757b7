//! Physics Engine Module
//!
//! Deterministic machining calculations. All math here is closed-form
//! physics - no learned state.
//!
//! ## Models
//! - `cutting_models` - Kienzle force, power, torque, MRR, surface finish
//! - `taylor` - extended Taylor tool life and family fallback coefficients
//! - `stability` - SDOF stability lobes and the no-dynamics heuristic
//!
//! `CuttingContext` binds one tool/material pair so the optimizer and the
//! simulator can evaluate candidates without re-resolving profile fallbacks.

pub mod cutting_models;
pub mod stability;
pub mod taylor;

pub use cutting_models::{
    allowable_tool_force_n, built_up_edge_expected, cutting_force, cutting_power_kw,
    engagement_angle, material_removal_rate, mean_chip_thickness, specific_cutting_force,
    spindle_torque_nm, surface_roughness_um, teeth_in_cut,
};
pub use stability::{
    absolute_stability_limit, heuristic_chatter_risk, limiting_doc_at, stability_lobes,
    HeuristicInputs,
};
pub use taylor::{family_defaults, resolve_taylor, taylor_speed_for_life, taylor_tool_life, FamilyDefaults};

use crate::config::defaults::SHARP_CORNER_EDGE_RADIUS_MM;
use crate::config::PhysicsConfig;
use crate::types::{
    Candidate, DynamicsProfile, MaterialFamily, MaterialProfile, ProfileWarning,
    StabilityAssessment, TaylorCoefficients, ToolGeometry, ToolProfile,
};

// ============================================================================
// Resolved Material
// ============================================================================

/// Material coefficients with every gap filled from the family table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialModel {
    pub family: MaterialFamily,
    pub kc1_1: f64,
    pub mc: f64,
    pub taylor: TaylorCoefficients,
    pub vc_nominal: f64,
    pub hardness_hb: Option<f64>,
}

impl MaterialModel {
    /// Resolve a profile, reporting each fallback that changes numeric output.
    pub fn resolve(material: &MaterialProfile) -> (Self, Vec<ProfileWarning>) {
        let defaults = family_defaults(material.family);
        let mut warnings = Vec::new();

        let (taylor, taylor_warning) = resolve_taylor(material);
        warnings.extend(taylor_warning);

        let (kc1_1, mc) = match (material.kc1_1, material.mc) {
            (Some(kc), Some(mc)) if kc > 0.0 && mc >= 0.0 => (kc, mc),
            _ => {
                warnings.push(ProfileWarning::new(
                    "material",
                    format!(
                        "{}: no Kienzle coefficients, using {} defaults (kc1.1={}, mc={})",
                        material.id, material.family, defaults.kc1_1, defaults.mc
                    ),
                ));
                (defaults.kc1_1, defaults.mc)
            }
        };

        let vc_nominal = material
            .vc_nominal
            .filter(|v| *v > 0.0)
            .or_else(|| material.vc_range.map(|r| r.midpoint()))
            .unwrap_or_else(|| {
                warnings.push(ProfileWarning::new(
                    "material",
                    format!(
                        "{}: no nominal cutting speed, using {} default {} m/min",
                        material.id, material.family, defaults.vc_nominal
                    ),
                ));
                defaults.vc_nominal
            });

        (
            Self {
                family: material.family,
                kc1_1,
                mc,
                taylor,
                vc_nominal,
                hardness_hb: material.hardness_hb,
            },
            warnings,
        )
    }
}

// ============================================================================
// Cutting Context
// ============================================================================

/// Forces and derived loads for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutMetrics {
    /// Mean chip thickness (mm)
    pub chip_thickness_mm: f64,
    /// Specific cutting force at that thickness (N/mm²)
    pub specific_force_n_mm2: f64,
    /// Average engaged teeth
    pub teeth_in_cut: f64,
    /// Tangential force summed over engaged teeth (N)
    pub cutting_force_n: f64,
    pub power_kw: f64,
    pub torque_nm: f64,
    pub mrr_cm3_min: f64,
}

/// One tool/material pairing, ready to evaluate candidates.
#[derive(Debug, Clone)]
pub struct CuttingContext {
    pub geometry: ToolGeometry,
    pub material: MaterialModel,
    pub corner_radius_mm: f64,
    pub stickout_mm: f64,
    /// Force the tool tolerates before breakage checks trip (N)
    pub max_force_n: f64,
    pub dynamics: Option<DynamicsProfile>,
}

impl CuttingContext {
    pub fn new(tool: &ToolProfile, material: &MaterialProfile) -> (Self, Vec<ProfileWarning>) {
        let (material_model, mut warnings) = MaterialModel::resolve(material);

        let corner_radius_mm = match tool.corner_radius_mm {
            Some(r) if r > 0.0 => r,
            _ => SHARP_CORNER_EDGE_RADIUS_MM,
        };

        let stickout_mm = tool.stickout_mm.unwrap_or_else(|| {
            let assumed = 3.0 * tool.diameter_mm;
            warnings.push(ProfileWarning::new(
                "tool",
                format!("{}: no stickout, assuming 3xD = {assumed:.1} mm", tool.id),
            ));
            assumed
        });

        let max_force_n = tool
            .max_cutting_force_n
            .filter(|f| *f > 0.0)
            .unwrap_or_else(|| allowable_tool_force_n(tool.diameter_mm, stickout_mm));

        (
            Self {
                geometry: ToolGeometry {
                    diameter_mm: tool.diameter_mm,
                    flute_count: tool.flute_count,
                },
                material: material_model,
                corner_radius_mm,
                stickout_mm,
                max_force_n,
                dynamics: tool.dynamics,
            },
            warnings,
        )
    }

    /// Kienzle loads at a candidate.
    pub fn evaluate_cut(&self, c: &Candidate) -> CutMetrics {
        let d = self.geometry.diameter_mm;
        let h = mean_chip_thickness(c.fz, c.ae, d);
        let kc = specific_cutting_force(self.material.kc1_1, self.material.mc, h);
        let engaged = teeth_in_cut(self.geometry.flute_count, c.ae, d);
        let per_tooth = cutting_force(self.material.kc1_1, self.material.mc, c.ap, h);
        let force = per_tooth * engaged.max(1.0);
        CutMetrics {
            chip_thickness_mm: h,
            specific_force_n_mm2: kc,
            teeth_in_cut: engaged,
            cutting_force_n: force,
            power_kw: cutting_power_kw(force, c.vc),
            torque_nm: spindle_torque_nm(force, d),
            mrr_cm3_min: material_removal_rate(c.ap, c.ae, c.feed_rate),
        }
    }

    pub fn tool_life(&self, c: &Candidate) -> f64 {
        taylor_tool_life(&self.material.taylor, c.vc, c.fz, c.ap)
    }

    pub fn surface_roughness(&self, c: &Candidate) -> f64 {
        surface_roughness_um(
            c.fz,
            self.corner_radius_mm,
            c.vc,
            self.material.vc_nominal,
            self.material.family,
        )
    }

    /// Limiting depth from the lobes at this candidate's speed, when dynamics exist.
    pub fn lobe_limit(&self, c: &Candidate, physics: &PhysicsConfig) -> Option<f64> {
        let dynamics = self.dynamics.as_ref()?;
        let lobes = self.lobes(c, dynamics, physics);
        limiting_doc_at(&lobes, c.rpm)
    }

    /// Lobes when dynamics are present, the heuristic score otherwise.
    pub fn assess_stability(&self, c: &Candidate, physics: &PhysicsConfig) -> StabilityAssessment {
        if let Some(dynamics) = self.dynamics.as_ref() {
            let lobes = self.lobes(c, dynamics, physics);
            if let Some(limit) = limiting_doc_at(&lobes, c.rpm) {
                return StabilityAssessment::Lobes {
                    limiting_doc_mm: limit,
                    stable: c.ap <= limit,
                    lobes,
                };
            }
        }
        StabilityAssessment::Heuristic {
            risk_score: heuristic_chatter_risk(&self.heuristic_inputs(c)),
        }
    }

    pub fn heuristic_inputs(&self, c: &Candidate) -> HeuristicInputs {
        HeuristicInputs {
            diameter_mm: self.geometry.diameter_mm,
            stickout_mm: self.stickout_mm,
            doc_mm: c.ap,
            hardness_hb: self.material.hardness_hb,
            rpm: c.rpm,
        }
    }

    fn lobes(
        &self,
        c: &Candidate,
        dynamics: &DynamicsProfile,
        physics: &PhysicsConfig,
    ) -> Vec<Vec<crate::types::LobePoint>> {
        let d = self.geometry.diameter_mm;
        let h = mean_chip_thickness(c.fz, c.ae, d);
        let kc = specific_cutting_force(self.material.kc1_1, self.material.mc, h);
        stability_lobes(
            dynamics,
            kc,
            self.geometry.flute_count,
            teeth_in_cut(self.geometry.flute_count, c.ae, d),
            physics.stability_lobes,
            physics.stability_sweep_points,
        )
    }
}
