//! Constraint envelope: the feasible box every candidate must live in

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bounded process axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Spindle speed (1/min)
    Rpm,
    /// Feed per tooth (mm/tooth)
    Feed,
    /// Axial depth of cut (mm)
    Doc,
    /// Radial width of cut (mm)
    Woc,
    /// Cutting speed (m/min)
    Vc,
}

impl Axis {
    pub const ALL: [Axis; 5] = [Axis::Rpm, Axis::Feed, Axis::Doc, Axis::Woc, Axis::Vc];
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Axis::Rpm => "rpm",
            Axis::Feed => "feed",
            Axis::Doc => "doc",
            Axis::Woc => "woc",
            Axis::Vc => "vc",
        };
        write!(f, "{name}")
    }
}

/// Clamp without panicking when `lo > hi` or the value is NaN.
///
/// `f64::clamp` asserts `lo <= hi`; envelope code must never panic on a
/// degenerate axis, so the upper bound wins.
pub fn clamp_between(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        return lo.min(hi);
    }
    value.max(lo).min(hi)
}

/// `{min, max}` for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub min: f64,
    #[serde(with = "super::unbounded")]
    pub max: f64,
}

impl AxisBounds {
    /// The starting point of aggregation: `(0, +inf)`.
    pub fn unbounded() -> Self {
        Self {
            min: 0.0,
            max: f64::INFINITY,
        }
    }

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_feasible(&self) -> bool {
        self.min <= self.max
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn width(&self) -> f64 {
        (self.max - self.min).max(0.0)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        clamp_between(value, self.min, self.max)
    }

    /// Containment with a small relative tolerance for round-off.
    pub fn contains(&self, value: f64) -> bool {
        let tol = 1e-9 * self.max.abs().max(1.0);
        value >= self.min - tol && value <= self.max + tol
    }
}

/// Aggregated feasible region for one tool/machine/material combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintEnvelope {
    pub rpm: AxisBounds,
    pub feed: AxisBounds,
    pub doc: AxisBounds,
    pub woc: AxisBounds,
    pub vc: AxisBounds,
    /// Product of machine, holder and workholding rigidity factors
    pub composite_rigidity: f64,
    #[serde(with = "super::unbounded")]
    pub power_limit_kw: f64,
    #[serde(with = "super::unbounded")]
    pub torque_limit_nm: f64,
    /// Table feed ceiling; couples rpm and feed per tooth
    #[serde(with = "super::unbounded")]
    pub feed_rate_limit_mm_min: f64,
    /// Ordered source tags per axis, appended only when a bound changed
    pub provenance: BTreeMap<Axis, Vec<String>>,
}

impl Default for ConstraintEnvelope {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ConstraintEnvelope {
    pub fn unbounded() -> Self {
        Self {
            rpm: AxisBounds::unbounded(),
            feed: AxisBounds::unbounded(),
            doc: AxisBounds::unbounded(),
            woc: AxisBounds::unbounded(),
            vc: AxisBounds::unbounded(),
            composite_rigidity: 1.0,
            power_limit_kw: f64::INFINITY,
            torque_limit_nm: f64::INFINITY,
            feed_rate_limit_mm_min: f64::INFINITY,
            provenance: Axis::ALL.iter().map(|a| (*a, Vec::new())).collect(),
        }
    }

    pub fn axis(&self, axis: Axis) -> &AxisBounds {
        match axis {
            Axis::Rpm => &self.rpm,
            Axis::Feed => &self.feed,
            Axis::Doc => &self.doc,
            Axis::Woc => &self.woc,
            Axis::Vc => &self.vc,
        }
    }

    fn axis_mut(&mut self, axis: Axis) -> &mut AxisBounds {
        match axis {
            Axis::Rpm => &mut self.rpm,
            Axis::Feed => &mut self.feed,
            Axis::Doc => &mut self.doc,
            Axis::Woc => &mut self.woc,
            Axis::Vc => &mut self.vc,
        }
    }

    /// Sources that shaped an axis, in application order.
    pub fn sources(&self, axis: Axis) -> &[String] {
        self.provenance.get(&axis).map(Vec::as_slice).unwrap_or(&[])
    }

    fn record(&mut self, axis: Axis, tag: &str) {
        let tags = self.provenance.entry(axis).or_default();
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    /// Raise the minimum of an axis. Never loosens. Returns true if changed.
    pub fn tighten_min(&mut self, axis: Axis, value: f64, tag: &str) -> bool {
        if !value.is_finite() {
            return false;
        }
        let bounds = self.axis_mut(axis);
        if value > bounds.min {
            bounds.min = value;
            self.record(axis, tag);
            true
        } else {
            false
        }
    }

    /// Lower the maximum of an axis. Never loosens. Returns true if changed.
    pub fn tighten_max(&mut self, axis: Axis, value: f64, tag: &str) -> bool {
        if value.is_nan() {
            return false;
        }
        let bounds = self.axis_mut(axis);
        if value < bounds.max {
            bounds.max = value;
            self.record(axis, tag);
            true
        } else {
            false
        }
    }

    /// Intersect an axis with `[min, max]`.
    pub fn intersect(&mut self, axis: Axis, min: f64, max: f64, tag: &str) -> bool {
        let lo = self.tighten_min(axis, min, tag);
        let hi = self.tighten_max(axis, max, tag);
        lo || hi
    }

    /// Scale an axis maximum by a factor in (0, 1].
    pub fn scale_max(&mut self, axis: Axis, factor: f64, tag: &str) -> bool {
        let current = self.axis(axis).max;
        if current.is_finite() && factor < 1.0 {
            self.tighten_max(axis, current * factor, tag)
        } else {
            false
        }
    }

    /// Axes whose bounds crossed, with their sources.
    pub fn violations(&self) -> Vec<AxisViolation> {
        Axis::ALL
            .iter()
            .filter(|axis| !self.axis(**axis).is_feasible())
            .map(|axis| {
                let bounds = self.axis(*axis);
                AxisViolation {
                    axis: *axis,
                    min: bounds.min,
                    max: bounds.max,
                    sources: self.sources(*axis).to_vec(),
                }
            })
            .collect()
    }

    pub fn is_feasible(&self) -> bool {
        Axis::ALL.iter().all(|a| self.axis(*a).is_feasible())
    }
}

/// One axis that ended aggregation with `min > max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisViolation {
    pub axis: Axis,
    pub min: f64,
    pub max: f64,
    pub sources: Vec<String>,
}

impl std::fmt::Display for AxisViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{:.4} > {:.4}] from {}",
            self.axis,
            self.min,
            self.max,
            if self.sources.is_empty() {
                "(no sources)".to_string()
            } else {
                self.sources.join(", ")
            }
        )
    }
}

/// Hard failure: the collaborators admit no feasible parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("infeasible constraint envelope: {}", format_violations(.violations))]
pub struct InfeasibleEnvelope {
    pub violations: Vec<AxisViolation>,
}

fn format_violations(violations: &[AxisViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tighten_never_loosens() {
        let mut env = ConstraintEnvelope::unbounded();
        assert!(env.tighten_max(Axis::Rpm, 10_000.0, "a"));
        assert!(!env.tighten_max(Axis::Rpm, 12_000.0, "b"));
        assert_eq!(env.rpm.max, 10_000.0);
        assert_eq!(env.sources(Axis::Rpm), &["a".to_string()]);
    }

    #[test]
    fn violations_name_axis_and_sources() {
        let mut env = ConstraintEnvelope::unbounded();
        env.tighten_min(Axis::Woc, 12.0, "strategy_woc");
        env.tighten_max(Axis::Woc, 6.0, "thin_wall");
        let v = env.violations();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].axis, Axis::Woc);
        let err = InfeasibleEnvelope { violations: v };
        let msg = err.to_string();
        assert!(msg.contains("woc"));
        assert!(msg.contains("strategy_woc, thin_wall"));
    }

    #[test]
    fn clamp_between_tolerates_crossed_bounds() {
        assert_eq!(clamp_between(5.0, 10.0, 2.0), 2.0);
        assert_eq!(clamp_between(f64::NAN, 1.0, 3.0), 1.0);
        assert_eq!(clamp_between(2.0, 1.0, 3.0), 2.0);
    }

    #[test]
    fn unbounded_envelope_reads_back_from_json() {
        let mut env = ConstraintEnvelope::unbounded();
        env.tighten_max(Axis::Doc, 24.0, "flute_length");
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains(r#""power_limit_kw":null"#));

        let back: ConstraintEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rpm.max, f64::INFINITY);
        assert_eq!(back.doc.max, 24.0);
        assert_eq!(back.power_limit_kw, f64::INFINITY);
        assert_eq!(back.feed_rate_limit_mm_min, f64::INFINITY);
        assert_eq!(back.sources(Axis::Doc), &["flute_length".to_string()]);
    }
}
