//! Extended Taylor tool life and the family-keyed material fallback table
//!
//! `V·T^n·f^a·d^b = C`, solved for `T`. When a material profile omits its own
//! coefficients the family default is used instead; that changes numeric
//! output, so the resolution always reports a `ProfileWarning`.

use crate::types::{MaterialFamily, MaterialProfile, ProfileWarning, TaylorCoefficients, ValueRange};

/// Fallback cutting data for one material family (carbide tooling).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FamilyDefaults {
    pub taylor: TaylorCoefficients,
    pub kc1_1: f64,
    pub mc: f64,
    pub vc_nominal: f64,
    pub vc_range: ValueRange,
}

const fn taylor(n: f64, c: f64, a: f64, b: f64) -> TaylorCoefficients {
    TaylorCoefficients { n, c, a, b }
}

const fn range(min: f64, max: f64) -> ValueRange {
    ValueRange { min, max }
}

/// Family default table.
pub fn family_defaults(family: MaterialFamily) -> FamilyDefaults {
    match family {
        MaterialFamily::Aluminum => FamilyDefaults {
            taylor: taylor(0.35, 1400.0, 0.30, 0.10),
            kc1_1: 700.0,
            mc: 0.25,
            vc_nominal: 500.0,
            vc_range: range(200.0, 1000.0),
        },
        MaterialFamily::Steel => FamilyDefaults {
            taylor: taylor(0.25, 210.0, 0.40, 0.15),
            kc1_1: 1800.0,
            mc: 0.26,
            vc_nominal: 180.0,
            vc_range: range(100.0, 280.0),
        },
        MaterialFamily::Stainless => FamilyDefaults {
            taylor: taylor(0.22, 80.0, 0.45, 0.15),
            kc1_1: 2200.0,
            mc: 0.21,
            vc_nominal: 120.0,
            vc_range: range(70.0, 180.0),
        },
        MaterialFamily::Titanium => FamilyDefaults {
            taylor: taylor(0.20, 35.0, 0.45, 0.15),
            kc1_1: 1400.0,
            mc: 0.23,
            vc_nominal: 60.0,
            vc_range: range(30.0, 90.0),
        },
        MaterialFamily::Nickel => FamilyDefaults {
            taylor: taylor(0.18, 16.0, 0.50, 0.15),
            kc1_1: 2700.0,
            mc: 0.25,
            vc_nominal: 35.0,
            vc_range: range(20.0, 60.0),
        },
        MaterialFamily::CastIron => FamilyDefaults {
            taylor: taylor(0.25, 195.0, 0.35, 0.12),
            kc1_1: 1100.0,
            mc: 0.27,
            vc_nominal: 150.0,
            vc_range: range(90.0, 250.0),
        },
        MaterialFamily::Copper => FamilyDefaults {
            taylor: taylor(0.30, 500.0, 0.30, 0.10),
            kc1_1: 1000.0,
            mc: 0.25,
            vc_nominal: 280.0,
            vc_range: range(150.0, 500.0),
        },
    }
}

/// Coefficients from the profile, or the family default with a warning.
pub fn resolve_taylor(material: &MaterialProfile) -> (TaylorCoefficients, Option<ProfileWarning>) {
    match material.taylor {
        Some(t) if t.n > 0.0 && t.c > 0.0 => (t, None),
        _ => {
            let fallback = family_defaults(material.family).taylor;
            (
                fallback,
                Some(ProfileWarning::new(
                    "material",
                    format!(
                        "{}: no Taylor coefficients, using {} defaults (n={}, C={})",
                        material.id, material.family, fallback.n, fallback.c
                    ),
                )),
            )
        }
    }
}

/// Solve the extended Taylor equation for tool life in minutes.
///
/// Non-positive speed means the edge never engages: infinite life. Zero feed
/// or depth terms are skipped when their exponent is zero.
pub fn taylor_tool_life(coeffs: &TaylorCoefficients, vc: f64, fz: f64, ap: f64) -> f64 {
    if coeffs.n <= 0.0 || coeffs.c <= 0.0 {
        return 0.0;
    }
    if vc <= 0.0 {
        return f64::INFINITY;
    }
    let feed_term = if coeffs.a == 0.0 { 1.0 } else { fz.max(1e-6).powf(coeffs.a) };
    let depth_term = if coeffs.b == 0.0 { 1.0 } else { ap.max(1e-6).powf(coeffs.b) };
    (coeffs.c / (vc * feed_term * depth_term)).powf(1.0 / coeffs.n)
}

/// Cutting speed that yields the requested tool life (inverse of the above).
pub fn taylor_speed_for_life(coeffs: &TaylorCoefficients, life_min: f64, fz: f64, ap: f64) -> f64 {
    if life_min <= 0.0 || coeffs.n <= 0.0 {
        return 0.0;
    }
    let feed_term = if coeffs.a == 0.0 { 1.0 } else { fz.max(1e-6).powf(coeffs.a) };
    let depth_term = if coeffs.b == 0.0 { 1.0 } else { ap.max(1e-6).powf(coeffs.b) };
    coeffs.c / (life_min.powf(coeffs.n) * feed_term * depth_term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_taylor_exact_unit_life() {
        // (200/200)^(1/0.25) = 1
        let coeffs = TaylorCoefficients { n: 0.25, c: 200.0, a: 0.0, b: 0.0 };
        let life = taylor_tool_life(&coeffs, 200.0, 0.1, 2.0);
        assert!((life - 1.0).abs() < 1e-12);
    }

    #[test]
    fn halving_speed_extends_life_by_power_law() {
        let coeffs = TaylorCoefficients { n: 0.25, c: 200.0, a: 0.0, b: 0.0 };
        let fast = taylor_tool_life(&coeffs, 200.0, 0.1, 2.0);
        let slow = taylor_tool_life(&coeffs, 100.0, 0.1, 2.0);
        assert!((slow / fast - 16.0).abs() < 1e-9);
    }

    #[test]
    fn heavier_feed_shortens_life() {
        let coeffs = family_defaults(MaterialFamily::Steel).taylor;
        let light = taylor_tool_life(&coeffs, 180.0, 0.05, 5.0);
        let heavy = taylor_tool_life(&coeffs, 180.0, 0.15, 5.0);
        assert!(heavy < light);
    }

    #[test]
    fn inverse_matches_forward() {
        let coeffs = family_defaults(MaterialFamily::Aluminum).taylor;
        let v = taylor_speed_for_life(&coeffs, 45.0, 0.1, 4.0);
        let t = taylor_tool_life(&coeffs, v, 0.1, 4.0);
        assert!((t - 45.0).abs() < 1e-6);
    }

    #[test]
    fn missing_coefficients_fall_back_with_warning() {
        let material = MaterialProfile {
            id: "ti64".into(),
            name: "Ti-6Al-4V".into(),
            family: MaterialFamily::Titanium,
            hardness_hb: Some(334.0),
            kc1_1: None,
            mc: None,
            vc_range: None,
            vc_nominal: None,
            fz_range: None,
            max_doc_ratio: None,
            taylor: None,
        };
        let (coeffs, warning) = resolve_taylor(&material);
        assert_eq!(coeffs, family_defaults(MaterialFamily::Titanium).taylor);
        assert!(warning.unwrap().message.contains("titanium"));
    }

    #[test]
    fn defaults_give_plausible_lives() {
        for family in [
            MaterialFamily::Aluminum,
            MaterialFamily::Steel,
            MaterialFamily::Stainless,
            MaterialFamily::Titanium,
            MaterialFamily::Nickel,
            MaterialFamily::CastIron,
            MaterialFamily::Copper,
        ] {
            let d = family_defaults(family);
            let life = taylor_tool_life(&d.taylor, d.vc_nominal, 0.08, 2.0);
            assert!(
                (1.0..1_000.0).contains(&life),
                "{family}: nominal life {life:.1} min out of range"
            );
        }
    }
}
