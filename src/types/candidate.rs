//! Candidate parameter sets and optimization objectives

use super::envelope::{clamp_between, ConstraintEnvelope};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Geometry needed to convert between surface speed and spindle speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolGeometry {
    pub diameter_mm: f64,
    pub flute_count: u32,
}

impl ToolGeometry {
    pub fn rpm_for_vc(&self, vc: f64) -> f64 {
        if self.diameter_mm <= 0.0 {
            return 0.0;
        }
        1000.0 * vc / (PI * self.diameter_mm)
    }

    pub fn vc_for_rpm(&self, rpm: f64) -> f64 {
        PI * self.diameter_mm * rpm / 1000.0
    }

    pub fn teeth(&self) -> f64 {
        f64::from(self.flute_count.max(1))
    }
}

/// A point `[Vc, fz, ap, ae]` with derived spindle speed and table feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Cutting speed (m/min)
    pub vc: f64,
    /// Feed per tooth (mm/tooth)
    pub fz: f64,
    /// Axial depth of cut (mm)
    pub ap: f64,
    /// Radial width of cut (mm)
    pub ae: f64,
    /// Spindle speed (1/min)
    pub rpm: f64,
    /// Table feed (mm/min)
    pub feed_rate: f64,
}

impl Candidate {
    /// Build from a raw search position, deriving rpm and feed rate.
    pub fn from_position(position: [f64; 4], geometry: &ToolGeometry) -> Self {
        let [vc, fz, ap, ae] = position;
        let rpm = geometry.rpm_for_vc(vc);
        Self {
            vc,
            fz,
            ap,
            ae,
            rpm,
            feed_rate: fz * geometry.teeth() * rpm,
        }
    }

    pub fn position(&self) -> [f64; 4] {
        [self.vc, self.fz, self.ap, self.ae]
    }

    /// Project a raw position into the envelope.
    ///
    /// Speed is clamped against both the `vc` axis and the `rpm` axis; feed per
    /// tooth is then capped so the table feed stays under the feed-rate limit
    /// at the resulting spindle speed.
    pub fn clamped(
        position: [f64; 4],
        envelope: &ConstraintEnvelope,
        geometry: &ToolGeometry,
    ) -> Self {
        let [vc, fz, ap, ae] = position;

        let vc_lo = envelope.vc.min.max(geometry.vc_for_rpm(envelope.rpm.min));
        let vc_hi = envelope.vc.max.min(geometry.vc_for_rpm(envelope.rpm.max));
        let vc = clamp_between(vc, vc_lo, vc_hi);
        let rpm = geometry.rpm_for_vc(vc);

        let mut fz_hi = envelope.feed.max;
        if envelope.feed_rate_limit_mm_min.is_finite() && rpm > 0.0 {
            fz_hi = fz_hi.min(envelope.feed_rate_limit_mm_min / (rpm * geometry.teeth()));
        }
        let fz = clamp_between(fz, envelope.feed.min, fz_hi.max(envelope.feed.min));

        let ap = envelope.doc.clamp(ap);
        let ae = envelope.woc.clamp(ae);

        Self {
            vc,
            fz,
            ap,
            ae,
            rpm,
            feed_rate: fz * geometry.teeth() * rpm,
        }
    }

    /// Re-project this candidate (e.g. after a Bayesian rescale).
    pub fn clamp_to(&self, envelope: &ConstraintEnvelope, geometry: &ToolGeometry) -> Self {
        Self::clamped(self.position(), envelope, geometry)
    }

    /// True when every axis and the feed-rate coupling are satisfied.
    pub fn is_within(&self, envelope: &ConstraintEnvelope, geometry: &ToolGeometry) -> bool {
        let feed_rate_ok = !envelope.feed_rate_limit_mm_min.is_finite()
            || self.fz * geometry.teeth() * self.rpm
                <= envelope.feed_rate_limit_mm_min * (1.0 + 1e-9);
        envelope.vc.contains(self.vc)
            && envelope.rpm.contains(self.rpm)
            && envelope.feed.contains(self.fz)
            && envelope.doc.contains(self.ap)
            && envelope.woc.contains(self.ae)
            && feed_rate_ok
    }
}

/// Named objective weight sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectivePreset {
    Productivity,
    ToolLife,
    SurfaceFinish,
    #[default]
    Balanced,
}

impl ObjectivePreset {
    pub fn weights(self) -> ObjectiveWeights {
        match self {
            ObjectivePreset::Productivity => ObjectiveWeights::new(0.7, 0.15, 0.15),
            ObjectivePreset::ToolLife => ObjectiveWeights::new(0.2, 0.6, 0.2),
            ObjectivePreset::SurfaceFinish => ObjectiveWeights::new(0.15, 0.15, 0.7),
            ObjectivePreset::Balanced => ObjectiveWeights::new(0.4, 0.3, 0.3),
        }
    }
}

impl std::fmt::Display for ObjectivePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectivePreset::Productivity => "productivity",
            ObjectivePreset::ToolLife => "tool_life",
            ObjectivePreset::SurfaceFinish => "surface_finish",
            ObjectivePreset::Balanced => "balanced",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for ObjectivePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "productivity" => Ok(ObjectivePreset::Productivity),
            "tool_life" => Ok(ObjectivePreset::ToolLife),
            "surface_finish" => Ok(ObjectivePreset::SurfaceFinish),
            "balanced" => Ok(ObjectivePreset::Balanced),
            other => Err(format!("unknown objective: {other}")),
        }
    }
}

/// Fitness weights for MRR, tool life and surface finish.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub mrr: f64,
    pub tool_life: f64,
    pub surface_finish: f64,
}

impl ObjectiveWeights {
    pub fn new(mrr: f64, tool_life: f64, surface_finish: f64) -> Self {
        Self {
            mrr,
            tool_life,
            surface_finish,
        }
    }
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        ObjectivePreset::Balanced.weights()
    }
}
