//! Chatter stability: SDOF stability lobes and a fallback heuristic
//!
//! ## Lobes
//!
//! For a single mode `(fn, ζ, k)` the real and imaginary parts of the
//! frequency response at `r = f/fn` are
//!
//! ```text
//! Re[G] = (1 − r²) / (k·((1 − r²)² + (2ζr)²))
//! Im[G] = −2ζr      / (k·((1 − r²)² + (2ζr)²))
//! ```
//!
//! Chatter only builds where `Re[G] < 0`, so the sweep runs above `fn`. The
//! limiting depth is `b = −1 / (2·Ks·Re[G]·N*)` with `N*` the average teeth in
//! cut, and the spindle speed of lobe `j` is `n = 60·f / (N·(j + ε/2π))` with
//! phase `ε = 3π − 2·atan(Im/Re)`.

use crate::types::{DynamicsProfile, LobePoint};
use std::f64::consts::PI;

/// Upper end of the frequency-ratio sweep.
const SWEEP_MAX_RATIO: f64 = 1.6;

/// Build stability lobes.
///
/// `kc_n_mm2` is the specific cutting force, `teeth_in_cut` the average
/// engaged teeth. Returns one curve per lobe, each sorted by spindle speed.
/// Degenerate dynamics (non-positive stiffness, frequency or damping) return
/// no lobes.
pub fn stability_lobes(
    dynamics: &DynamicsProfile,
    kc_n_mm2: f64,
    flute_count: u32,
    teeth_in_cut: f64,
    lobe_count: usize,
    sweep_points: usize,
) -> Vec<Vec<LobePoint>> {
    let DynamicsProfile {
        natural_frequency_hz: fn_hz,
        damping_ratio: zeta,
        stiffness_n_per_m: k,
    } = *dynamics;
    if fn_hz <= 0.0 || zeta <= 0.0 || k <= 0.0 || kc_n_mm2 <= 0.0 || flute_count == 0 {
        return Vec::new();
    }
    let ks = kc_n_mm2 * 1e6; // N/m²
    let n_star = teeth_in_cut.max(1e-3);
    let teeth = f64::from(flute_count);
    let points = sweep_points.max(2);

    let mut lobes: Vec<Vec<LobePoint>> = vec![Vec::with_capacity(points); lobe_count];
    for i in 0..points {
        let r = 1.0 + (SWEEP_MAX_RATIO - 1.0) * (i as f64 + 1.0) / points as f64;
        let denom = k * ((1.0 - r * r).powi(2) + (2.0 * zeta * r).powi(2));
        let re = (1.0 - r * r) / denom;
        let im = -2.0 * zeta * r / denom;
        if re >= 0.0 {
            continue;
        }
        let b_lim_mm = -1.0 / (2.0 * ks * re * n_star) * 1_000.0;
        let epsilon = 3.0 * PI - 2.0 * (im / re).atan();
        let fc = r * fn_hz;
        for (j, lobe) in lobes.iter_mut().enumerate() {
            let rpm = 60.0 * fc / (teeth * (j as f64 + epsilon / (2.0 * PI)));
            if rpm.is_finite() && b_lim_mm.is_finite() {
                lobe.push(LobePoint {
                    spindle_speed_rpm: rpm,
                    limiting_doc_mm: b_lim_mm,
                });
            }
        }
    }

    for lobe in &mut lobes {
        lobe.sort_by(|a, b| a.spindle_speed_rpm.total_cmp(&b.spindle_speed_rpm));
    }
    lobes
}

/// Smallest depth on any lobe: chatter-free at every speed below this.
pub fn absolute_stability_limit(lobes: &[Vec<LobePoint>]) -> Option<f64> {
    lobes
        .iter()
        .flatten()
        .map(|p| p.limiting_doc_mm)
        .min_by(f64::total_cmp)
}

/// Limiting depth at a given spindle speed.
///
/// Takes the lowest boundary among lobes whose speed range covers `rpm`,
/// interpolating linearly inside each lobe. Speeds no lobe covers get the
/// absolute limit, which is conservative.
pub fn limiting_doc_at(lobes: &[Vec<LobePoint>], rpm: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for lobe in lobes {
        for pair in lobe.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if rpm >= a.spindle_speed_rpm && rpm <= b.spindle_speed_rpm {
                let span = b.spindle_speed_rpm - a.spindle_speed_rpm;
                let t = if span > 0.0 { (rpm - a.spindle_speed_rpm) / span } else { 0.0 };
                let depth = a.limiting_doc_mm + t * (b.limiting_doc_mm - a.limiting_doc_mm);
                best = Some(best.map_or(depth, |d: f64| d.min(depth)));
            }
        }
    }
    best.or_else(|| absolute_stability_limit(lobes))
}

/// Inputs to the heuristic chatter score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicInputs {
    pub diameter_mm: f64,
    pub stickout_mm: f64,
    pub doc_mm: f64,
    pub hardness_hb: Option<f64>,
    pub rpm: f64,
}

/// 0-100 chatter risk when no dynamic data is available.
pub fn heuristic_chatter_risk(inputs: &HeuristicInputs) -> f64 {
    if inputs.diameter_mm <= 0.0 {
        return 100.0;
    }
    let mut score: f64 = 0.0;

    let overhang = inputs.stickout_mm / inputs.diameter_mm;
    score += if overhang > 5.0 {
        35.0
    } else if overhang > 4.0 {
        25.0
    } else if overhang > 3.0 {
        15.0
    } else if overhang > 2.0 {
        5.0
    } else {
        0.0
    };

    let depth_ratio = inputs.doc_mm / inputs.diameter_mm;
    score += if depth_ratio > 2.0 {
        30.0
    } else if depth_ratio > 1.0 {
        20.0
    } else if depth_ratio > 0.5 {
        10.0
    } else {
        0.0
    };

    if let Some(hb) = inputs.hardness_hb {
        score += if hb > 350.0 {
            20.0
        } else if hb > 250.0 {
            10.0
        } else if hb > 180.0 {
            5.0
        } else {
            0.0
        };
    }

    // Very high speeds excite spindle modes; very low speeds lose process damping margin
    if inputs.rpm > 20_000.0 || (inputs.rpm > 0.0 && inputs.rpm < 500.0) {
        score += 10.0;
    }

    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamics() -> DynamicsProfile {
        DynamicsProfile {
            natural_frequency_hz: 800.0,
            damping_ratio: 0.03,
            stiffness_n_per_m: 1.0e7,
        }
    }

    #[test]
    fn lobes_are_positive_and_ordered() {
        let lobes = stability_lobes(&dynamics(), 2000.0, 4, 1.0, 4, 200);
        assert_eq!(lobes.len(), 4);
        for lobe in &lobes {
            assert!(!lobe.is_empty());
            assert!(lobe.iter().all(|p| p.limiting_doc_mm > 0.0 && p.spindle_speed_rpm > 0.0));
            assert!(lobe.windows(2).all(|w| w[0].spindle_speed_rpm <= w[1].spindle_speed_rpm));
        }
        // Lobe j+1 sits at lower speeds than lobe j
        let top_0 = lobes[0].last().unwrap().spindle_speed_rpm;
        let top_1 = lobes[1].last().unwrap().spindle_speed_rpm;
        assert!(top_1 < top_0);
    }

    #[test]
    fn absolute_limit_matches_closed_form() {
        // b_min = 2kζ(1+ζ) / (Ks·N*)
        let d = dynamics();
        let lobes = stability_lobes(&d, 2000.0, 4, 1.0, 3, 2000);
        let expected_mm = 2.0 * d.stiffness_n_per_m * d.damping_ratio * (1.0 + d.damping_ratio)
            / (2000.0e6 * 1.0)
            * 1_000.0;
        let got = absolute_stability_limit(&lobes).unwrap();
        assert!((got - expected_mm).abs() / expected_mm < 0.02, "got {got}, expected {expected_mm}");
    }

    #[test]
    fn limiting_doc_never_below_absolute_limit() {
        let lobes = stability_lobes(&dynamics(), 2000.0, 4, 1.0, 5, 300);
        let floor = absolute_stability_limit(&lobes).unwrap();
        for rpm in [500.0, 3_000.0, 8_000.0, 11_000.0, 30_000.0] {
            let b = limiting_doc_at(&lobes, rpm).unwrap();
            assert!(b >= floor - 1e-9);
        }
    }

    #[test]
    fn missing_dynamics_yield_no_lobes() {
        let mut d = dynamics();
        d.stiffness_n_per_m = 0.0;
        assert!(stability_lobes(&d, 2000.0, 4, 1.0, 3, 100).is_empty());
    }

    #[test]
    fn heuristic_scales_with_overhang_and_depth() {
        let stubby = heuristic_chatter_risk(&HeuristicInputs {
            diameter_mm: 12.0,
            stickout_mm: 24.0,
            doc_mm: 3.0,
            hardness_hb: Some(150.0),
            rpm: 8_000.0,
        });
        let long = heuristic_chatter_risk(&HeuristicInputs {
            diameter_mm: 12.0,
            stickout_mm: 72.0,
            doc_mm: 30.0,
            hardness_hb: Some(400.0),
            rpm: 25_000.0,
        });
        assert_eq!(stubby, 0.0);
        assert!(long > 80.0 && long <= 100.0);
    }
}
