//! Cutting force, power and surface finish models
//!
//! All functions are pure. Units: mm, m/min, N, kW, N·m, µm.

use crate::config::defaults::{BUE_ROUGHNESS_FACTOR, BUE_SPEED_RATIO, MIN_CHIP_THICKNESS_MM};
use crate::types::MaterialFamily;
use std::f64::consts::PI;

// ============================================================================
// Kienzle
// ============================================================================

/// Mean chip thickness for peripheral milling: `h = fz·sqrt(ae/D)`, capped at `fz`.
pub fn mean_chip_thickness(fz: f64, ae: f64, diameter: f64) -> f64 {
    if diameter <= 0.0 || fz <= 0.0 {
        return 0.0;
    }
    let immersion = (ae / diameter).clamp(0.0, 1.0);
    (fz * immersion.sqrt()).min(fz)
}

/// Kienzle specific cutting force: `Kc = Kc1_1 × h^(−mc)` (N/mm²).
pub fn specific_cutting_force(kc1_1: f64, mc: f64, h: f64) -> f64 {
    kc1_1 * h.max(MIN_CHIP_THICKNESS_MM).powf(-mc)
}

/// Kienzle cutting force on one edge: `Fc = Kc × b × h` (N).
pub fn cutting_force(kc1_1: f64, mc: f64, b: f64, h: f64) -> f64 {
    if b <= 0.0 || h <= 0.0 {
        return 0.0;
    }
    specific_cutting_force(kc1_1, mc, h) * b * h
}

/// Engagement angle of the cutter in radians (π for a full slot).
pub fn engagement_angle(ae: f64, diameter: f64) -> f64 {
    if diameter <= 0.0 {
        return 0.0;
    }
    let ratio = (ae / diameter).clamp(0.0, 1.0);
    (1.0 - 2.0 * ratio).clamp(-1.0, 1.0).acos()
}

/// Average number of teeth in the cut.
pub fn teeth_in_cut(flute_count: u32, ae: f64, diameter: f64) -> f64 {
    f64::from(flute_count) * engagement_angle(ae, diameter) / (2.0 * PI)
}

// ============================================================================
// Power / Torque / MRR
// ============================================================================

/// Cutting power from tangential force and surface speed (kW).
pub fn cutting_power_kw(force_n: f64, vc: f64) -> f64 {
    force_n * vc / 60_000.0
}

/// Spindle torque from tangential force at the tool radius (N·m).
pub fn spindle_torque_nm(force_n: f64, diameter: f64) -> f64 {
    force_n * diameter / 2_000.0
}

/// Material removal rate `ap·ae·vf/1000` (cm³/min).
pub fn material_removal_rate(ap: f64, ae: f64, feed_rate: f64) -> f64 {
    (ap * ae * feed_rate / 1_000.0).max(0.0)
}

/// Lateral force a cantilevered carbide tool tolerates at its tip (N).
///
/// Bending stress limit of 1000 N/mm² on a solid round shank,
/// `F = σ·π·d³ / (32·L)`.
pub fn allowable_tool_force_n(diameter: f64, stickout: f64) -> f64 {
    const ALLOWABLE_STRESS_N_MM2: f64 = 1_000.0;
    if diameter <= 0.0 {
        return 0.0;
    }
    let lever = stickout.max(diameter);
    ALLOWABLE_STRESS_N_MM2 * PI * diameter.powi(3) / (32.0 * lever)
}

// ============================================================================
// Surface Finish
// ============================================================================

/// Speed-regime multiplier on theoretical roughness.
///
/// 1.0 between 0.5× and 1.5× the nominal speed, rising linearly outside.
pub fn speed_regime_factor(vc: f64, vc_nominal: f64) -> f64 {
    if vc_nominal <= 0.0 {
        return 1.0;
    }
    let ratio = vc / vc_nominal;
    if ratio < 0.5 {
        1.0 + (0.5 - ratio) * 1.6
    } else if ratio > 1.5 {
        1.0 + (ratio - 1.5) * 0.5
    } else {
        1.0
    }
}

/// True when the edge is expected to carry built-up material.
pub fn built_up_edge_expected(family: MaterialFamily, vc: f64, vc_nominal: f64) -> bool {
    family.is_bue_prone() && vc_nominal > 0.0 && vc / vc_nominal < BUE_SPEED_RATIO
}

/// Arithmetic mean roughness `Ra = f²/(32·r)` with regime and BUE corrections (µm).
pub fn surface_roughness_um(
    fz: f64,
    corner_radius: f64,
    vc: f64,
    vc_nominal: f64,
    family: MaterialFamily,
) -> f64 {
    if corner_radius <= 0.0 {
        return f64::INFINITY;
    }
    let theoretical_um = fz * fz / (32.0 * corner_radius) * 1_000.0;
    let mut ra = theoretical_um * speed_regime_factor(vc, vc_nominal);
    if built_up_edge_expected(family, vc, vc_nominal) {
        ra *= BUE_ROUGHNESS_FACTOR;
    }
    ra
}
