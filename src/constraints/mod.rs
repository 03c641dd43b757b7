//! Constraint Aggregation Engine
//!
//! Folds every collaborator's limits into one `ConstraintEnvelope`.
//!
//! ## Order
//!
//! machine → controller → tool → holder → workholding → material → strategy,
//! then the coupling pass (feed-rate limit, rpm ↔ Vc), fallback caps for
//! axes nobody bounded, and the thin-wall halving. Each step can only
//! tighten, and only a step that changes a bound leaves its tag behind.
//!
//! Missing data never fails the aggregation: it is skipped and reported as a
//! `ProfileWarning`. Crossed bounds at the end fail with `InfeasibleEnvelope`.

mod strategy;

pub use strategy::{strategy_limits, StrategyLimits};

use crate::config::FallbackLimits;
use crate::types::{
    Axis, ConstraintEnvelope, InfeasibleEnvelope, ProfileSet, ProfileWarning, ToolGeometry,
};
use tracing::{debug, warn};

/// Aggregation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstraintError {
    #[error(transparent)]
    Infeasible(#[from] InfeasibleEnvelope),
    #[error("invalid tool geometry for '{tool_id}': {reason}")]
    InvalidGeometry { tool_id: String, reason: String },
}

/// A feasible envelope plus the fallbacks taken while building it.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub envelope: ConstraintEnvelope,
    pub warnings: Vec<ProfileWarning>,
}

/// Seam for the orchestrator; a pure function of its inputs.
pub trait ConstraintAggregator: Send + Sync {
    fn aggregate(&self, profiles: &ProfileSet<'_>) -> Result<Aggregation, ConstraintError>;
}

/// Default aggregator.
#[derive(Debug, Clone, Default)]
pub struct ConstraintEngine {
    fallback: FallbackLimits,
}

impl ConstraintEngine {
    pub fn new(fallback: FallbackLimits) -> Self {
        Self { fallback }
    }
}

impl ConstraintAggregator for ConstraintEngine {
    fn aggregate(&self, profiles: &ProfileSet<'_>) -> Result<Aggregation, ConstraintError> {
        let mut env = ConstraintEnvelope::unbounded();
        let mut warnings = Vec::new();

        let geometry = validate_tool(profiles)?;

        apply_machine(&mut env, profiles, &mut warnings);
        apply_tool(&mut env, profiles, &mut warnings);
        apply_holder(&mut env, profiles);
        apply_workholding(&mut env, profiles);
        apply_material(&mut env, profiles, geometry.as_ref(), &mut warnings);
        apply_strategy(&mut env, profiles, geometry.as_ref(), &mut warnings);

        if let Some(g) = geometry.as_ref() {
            couple_axes(&mut env, g);
        }
        self.apply_fallbacks(&mut env);

        if profiles.thin_wall {
            env.scale_max(Axis::Doc, 0.5, "thin_wall");
            env.scale_max(Axis::Woc, 0.5, "thin_wall");
        }

        for w in &warnings {
            warn!(source = %w.source, "{}", w.message);
        }

        let violations = env.violations();
        if !violations.is_empty() {
            warn!(axes = violations.len(), "Constraint envelope is infeasible");
            return Err(InfeasibleEnvelope { violations }.into());
        }

        debug!(
            rpm_min = env.rpm.min,
            rpm_max = env.rpm.max,
            vc_max = env.vc.max,
            feed_max = env.feed.max,
            doc_max = env.doc.max,
            woc_max = env.woc.max,
            rigidity = env.composite_rigidity,
            "Constraint envelope aggregated"
        );

        Ok(Aggregation {
            envelope: env,
            warnings,
        })
    }
}

impl ConstraintEngine {
    fn apply_fallbacks(&self, env: &mut ConstraintEnvelope) {
        let caps = [
            (Axis::Rpm, self.fallback.max_rpm),
            (Axis::Vc, self.fallback.max_vc),
            (Axis::Feed, self.fallback.max_fz),
            (Axis::Doc, self.fallback.max_doc),
            (Axis::Woc, self.fallback.max_woc),
        ];
        for (axis, cap) in caps {
            if !env.axis(axis).max.is_finite() {
                env.tighten_max(axis, cap, "engine_default");
            }
        }
    }
}

// ============================================================================
// Collaborator Passes
// ============================================================================

fn validate_tool(profiles: &ProfileSet<'_>) -> Result<Option<ToolGeometry>, ConstraintError> {
    let Some(tool) = profiles.tool else {
        return Ok(None);
    };
    if !tool.diameter_mm.is_finite() || tool.diameter_mm <= 0.0 {
        return Err(ConstraintError::InvalidGeometry {
            tool_id: tool.id.clone(),
            reason: format!("diameter must be > 0 (got {})", tool.diameter_mm),
        });
    }
    if tool.flute_count == 0 {
        return Err(ConstraintError::InvalidGeometry {
            tool_id: tool.id.clone(),
            reason: "flute count must be > 0".to_string(),
        });
    }
    Ok(Some(ToolGeometry {
        diameter_mm: tool.diameter_mm,
        flute_count: tool.flute_count,
    }))
}

fn apply_machine(env: &mut ConstraintEnvelope, p: &ProfileSet<'_>, warnings: &mut Vec<ProfileWarning>) {
    let Some(machine) = p.machine else {
        warnings.push(ProfileWarning::new(
            "machine",
            "no machine profile: spindle, power and torque limits unknown",
        ));
        return;
    };

    if let Some(min) = machine.min_rpm {
        env.tighten_min(Axis::Rpm, min, "spindle_min_rpm");
    }
    match machine.max_rpm {
        Some(max) => {
            env.tighten_max(Axis::Rpm, max, "spindle_max_rpm");
        }
        None => warnings.push(ProfileWarning::new(
            "machine",
            format!("{}: no spindle speed limit", machine.id),
        )),
    }
    if let Some(limit) = machine.max_feed_rate_mm_min {
        env.feed_rate_limit_mm_min = env.feed_rate_limit_mm_min.min(limit);
    }
    match machine.max_power_kw {
        Some(kw) => env.power_limit_kw = kw,
        None => warnings.push(ProfileWarning::new(
            "machine",
            format!("{}: no spindle power rating, power is unchecked", machine.id),
        )),
    }
    if let Some(nm) = machine.max_torque_nm {
        env.torque_limit_nm = nm;
    }
    env.composite_rigidity *= machine.rigidity.unwrap_or(1.0);

    if let Some(controller) = machine.controller {
        if let Some(rpm) = controller.max_programmable_rpm {
            env.tighten_max(Axis::Rpm, rpm, "controller_max_rpm");
        }
        if let Some(limit) = controller.max_feed_rate_mm_min {
            env.feed_rate_limit_mm_min = env.feed_rate_limit_mm_min.min(limit);
        }
    }
}

fn apply_tool(env: &mut ConstraintEnvelope, p: &ProfileSet<'_>, warnings: &mut Vec<ProfileWarning>) {
    let Some(tool) = p.tool else {
        warnings.push(ProfileWarning::new(
            "tool",
            "no tool profile: geometry limits and speed coupling skipped",
        ));
        return;
    };

    match tool.flute_length_mm {
        Some(len) => {
            env.tighten_max(Axis::Doc, len, "flute_length");
        }
        None => warnings.push(ProfileWarning::new(
            "tool",
            format!("{}: no flute length, axial depth unbounded by tool", tool.id),
        )),
    }
    env.tighten_max(Axis::Woc, tool.diameter_mm, "tool_diameter");
    if let Some(rpm) = tool.max_rpm {
        env.tighten_max(Axis::Rpm, rpm, "tool_max_rpm");
    }
    if let Some(range) = tool.fz_range {
        env.intersect(Axis::Feed, range.min, range.max, "tool_chip_load");
    }
}

fn apply_holder(env: &mut ConstraintEnvelope, p: &ProfileSet<'_>) {
    let Some(holder) = p.holder else {
        return;
    };
    if let Some(rpm) = holder.max_rpm {
        env.tighten_max(Axis::Rpm, rpm, "holder_max_rpm");
    }
    env.composite_rigidity *= holder.rigidity.unwrap_or(1.0);
}

fn apply_workholding(env: &mut ConstraintEnvelope, p: &ProfileSet<'_>) {
    let Some(fixture) = p.workholding else {
        return;
    };
    if let Some(doc) = fixture.max_doc_mm {
        env.tighten_max(Axis::Doc, doc, "workholding_doc_limit");
    }
    env.composite_rigidity *= fixture.rigidity.unwrap_or(1.0);
}

fn apply_material(
    env: &mut ConstraintEnvelope,
    p: &ProfileSet<'_>,
    geometry: Option<&ToolGeometry>,
    warnings: &mut Vec<ProfileWarning>,
) {
    let Some(material) = p.material else {
        warnings.push(ProfileWarning::new(
            "material",
            "no material profile: cutting speed and chip load unbounded by material",
        ));
        return;
    };

    let speed_factor = p.tool.map_or(1.0, |t| t.tool_material.speed_factor());
    match material.vc_range {
        Some(range) => {
            env.intersect(
                Axis::Vc,
                range.min * speed_factor,
                range.max * speed_factor,
                "material_vc_range",
            );
        }
        None => warnings.push(ProfileWarning::new(
            "material",
            format!("{}: no cutting speed window", material.id),
        )),
    }
    if let Some(range) = material.fz_range {
        env.intersect(Axis::Feed, range.min, range.max, "material_chip_load");
    }
    if let (Some(ratio), Some(g)) = (material.max_doc_ratio, geometry) {
        env.tighten_max(Axis::Doc, ratio * g.diameter_mm, "material_doc_ratio");
    }
}

fn apply_strategy(
    env: &mut ConstraintEnvelope,
    p: &ProfileSet<'_>,
    geometry: Option<&ToolGeometry>,
    warnings: &mut Vec<ProfileWarning>,
) {
    let Some(mode) = p.mode else {
        return;
    };
    let Some(g) = geometry else {
        warnings.push(ProfileWarning::new(
            "strategy",
            format!("{mode}: strategy limits need a tool diameter, skipped"),
        ));
        return;
    };
    let d = g.diameter_mm;
    let limits = strategy_limits(mode);

    env.tighten_max(Axis::Doc, limits.doc_max_ratio * d, "strategy_doc");
    env.intersect(
        Axis::Woc,
        limits.woc_min_ratio * d,
        limits.woc_max_ratio * d,
        "strategy_woc",
    );
    env.scale_max(Axis::Feed, limits.feed_factor, "strategy_feed");
}

/// Make rpm and Vc mutually consistent and pull rpm under the feed-rate limit.
fn couple_axes(env: &mut ConstraintEnvelope, g: &ToolGeometry) {
    if env.feed_rate_limit_mm_min.is_finite() && env.feed.min > 0.0 {
        let rpm_cap = env.feed_rate_limit_mm_min / (env.feed.min * g.teeth());
        env.tighten_max(Axis::Rpm, rpm_cap, "feed_rate_limit");
    }

    let (vc_min, vc_max) = (env.vc.min, env.vc.max);
    env.tighten_min(Axis::Rpm, g.rpm_for_vc(vc_min), "vc_to_rpm");
    if vc_max.is_finite() {
        env.tighten_max(Axis::Rpm, g.rpm_for_vc(vc_max), "vc_to_rpm");
    }

    let (rpm_min, rpm_max) = (env.rpm.min, env.rpm.max);
    env.tighten_min(Axis::Vc, g.vc_for_rpm(rpm_min), "rpm_to_vc");
    if rpm_max.is_finite() {
        env.tighten_max(Axis::Vc, g.vc_for_rpm(rpm_max), "rpm_to_vc");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        HolderProfile, MachineProfile, MachiningMode, MaterialFamily, MaterialProfile,
        ToolMaterial, ToolProfile, ValueRange, WorkholdingProfile,
    };

    fn machine() -> MachineProfile {
        MachineProfile {
            id: "vmc".into(),
            min_rpm: Some(100.0),
            max_rpm: Some(12_000.0),
            max_power_kw: Some(15.0),
            max_torque_nm: Some(80.0),
            max_feed_rate_mm_min: Some(10_000.0),
            rigidity: Some(0.9),
            controller: None,
        }
    }

    fn tool() -> ToolProfile {
        ToolProfile {
            id: "em12".into(),
            diameter_mm: 12.0,
            flute_count: 4,
            flute_length_mm: Some(30.0),
            stickout_mm: Some(40.0),
            corner_radius_mm: None,
            tool_material: ToolMaterial::Carbide,
            max_rpm: None,
            fz_range: None,
            max_cutting_force_n: None,
            dynamics: None,
        }
    }

    fn aluminum() -> MaterialProfile {
        MaterialProfile {
            id: "6061".into(),
            name: "6061-T6".into(),
            family: MaterialFamily::Aluminum,
            hardness_hb: Some(95.0),
            kc1_1: Some(700.0),
            mc: Some(0.25),
            vc_range: Some(ValueRange::new(200.0, 600.0)),
            vc_nominal: Some(400.0),
            fz_range: Some(ValueRange::new(0.03, 0.15)),
            max_doc_ratio: Some(1.5),
            taylor: None,
        }
    }

    fn set<'a>(
        machine: Option<&'a MachineProfile>,
        tool: Option<&'a ToolProfile>,
        material: Option<&'a MaterialProfile>,
    ) -> ProfileSet<'a> {
        ProfileSet {
            machine,
            tool,
            holder: None,
            workholding: None,
            material,
            mode: None,
            thin_wall: false,
        }
    }

    #[test]
    fn machine_and_tool_scenario() {
        let m = machine();
        let t = tool();
        let agg = ConstraintEngine::default()
            .aggregate(&set(Some(&m), Some(&t), None))
            .unwrap();
        let env = agg.envelope;
        assert_eq!(env.rpm.min, 100.0);
        assert_eq!(env.rpm.max, 12_000.0);
        assert!(env.doc.max <= 30.0);
        assert!(env.sources(Axis::Rpm).contains(&"spindle_max_rpm".to_string()));
        assert!(env.sources(Axis::Doc).contains(&"flute_length".to_string()));
    }

    #[test]
    fn every_axis_ends_finite_and_ordered() {
        let m = machine();
        let t = tool();
        let mat = aluminum();
        let mut p = set(Some(&m), Some(&t), Some(&mat));
        for mode in [
            MachiningMode::Roughing,
            MachiningMode::Finishing,
            MachiningMode::Slotting,
            MachiningMode::Adaptive,
            MachiningMode::Profiling,
        ] {
            p.mode = Some(mode);
            let env = ConstraintEngine::default().aggregate(&p).unwrap().envelope;
            for axis in Axis::ALL {
                let b = env.axis(axis);
                assert!(b.min <= b.max, "{mode}/{axis}");
                assert!(b.max.is_finite(), "{mode}/{axis}");
            }
        }
    }

    #[test]
    fn collaborators_only_tighten() {
        let m = machine();
        let t = tool();
        let mat = aluminum();
        let engine = ConstraintEngine::default();
        let loose = engine.aggregate(&set(Some(&m), Some(&t), None)).unwrap().envelope;
        let tight = engine.aggregate(&set(Some(&m), Some(&t), Some(&mat))).unwrap().envelope;
        for axis in Axis::ALL {
            assert!(tight.axis(axis).min >= loose.axis(axis).min, "{axis}");
            assert!(tight.axis(axis).max <= loose.axis(axis).max, "{axis}");
        }
    }

    #[test]
    fn tags_only_when_bound_changes() {
        let mut m = machine();
        m.controller = Some(crate::types::ControllerProfile {
            max_feed_rate_mm_min: None,
            max_programmable_rpm: Some(15_000.0),
        });
        let t = tool();
        let env = ConstraintEngine::default()
            .aggregate(&set(Some(&m), Some(&t), None))
            .unwrap()
            .envelope;
        assert!(!env.sources(Axis::Rpm).contains(&"controller_max_rpm".to_string()));
    }

    #[test]
    fn composite_rigidity_multiplies() {
        let m = machine();
        let t = tool();
        let holder = HolderProfile {
            id: "hsk".into(),
            max_rpm: Some(20_000.0),
            rigidity: Some(0.8),
            runout_um: Some(3.0),
        };
        let vise = WorkholdingProfile {
            id: "vise".into(),
            rigidity: Some(0.5),
            max_doc_mm: Some(20.0),
        };
        let mut p = set(Some(&m), Some(&t), None);
        p.holder = Some(&holder);
        p.workholding = Some(&vise);
        let env = ConstraintEngine::default().aggregate(&p).unwrap().envelope;
        assert!((env.composite_rigidity - 0.9 * 0.8 * 0.5).abs() < 1e-12);
        assert_eq!(env.doc.max, 20.0);
        assert_eq!(env.sources(Axis::Doc), &["flute_length", "workholding_doc_limit"]);
    }

    #[test]
    fn slotting_pins_width_and_thin_wall_breaks_it() {
        let m = machine();
        let t = tool();
        let mut p = set(Some(&m), Some(&t), None);
        p.mode = Some(MachiningMode::Slotting);
        let env = ConstraintEngine::default().aggregate(&p).unwrap().envelope;
        assert_eq!(env.woc.min, 12.0);
        assert_eq!(env.woc.max, 12.0);

        p.thin_wall = true;
        match ConstraintEngine::default().aggregate(&p) {
            Err(ConstraintError::Infeasible(e)) => {
                assert_eq!(e.violations.len(), 1);
                assert_eq!(e.violations[0].axis, Axis::Woc);
                assert!(e.violations[0].sources.contains(&"thin_wall".to_string()));
            }
            other => panic!("expected infeasible, got {other:?}"),
        }
    }

    #[test]
    fn speed_window_outside_spindle_range_is_infeasible() {
        let mut m = machine();
        m.max_rpm = Some(1_000.0);
        let t = tool();
        let mat = aluminum();
        let err = ConstraintEngine::default()
            .aggregate(&set(Some(&m), Some(&t), Some(&mat)))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("rpm"));
        assert!(msg.contains("spindle_max_rpm"));
    }

    #[test]
    fn hss_scales_speed_window() {
        let m = machine();
        let mut t = tool();
        t.tool_material = ToolMaterial::Hss;
        let mat = aluminum();
        let env = ConstraintEngine::default()
            .aggregate(&set(Some(&m), Some(&t), Some(&mat)))
            .unwrap()
            .envelope;
        assert!((env.vc.max - 600.0 * 0.35).abs() < 1e-9);
    }

    #[test]
    fn feed_rate_limit_caps_spindle_speed() {
        let mut m = machine();
        m.max_feed_rate_mm_min = Some(1_000.0);
        let t = tool();
        let mat = aluminum();
        let env = ConstraintEngine::default()
            .aggregate(&set(Some(&m), Some(&t), Some(&mat)))
            .unwrap()
            .envelope;
        // 1000 / (0.03 × 4)
        assert!(env.rpm.max <= 1_000.0 / 0.12 + 1e-6);
        assert!(env.sources(Axis::Rpm).contains(&"feed_rate_limit".to_string()));
    }

    #[test]
    fn missing_everything_falls_back_with_warnings() {
        let agg = ConstraintEngine::default()
            .aggregate(&set(None, None, None))
            .unwrap();
        assert!(agg.warnings.len() >= 3);
        assert_eq!(agg.envelope.sources(Axis::Rpm), &["engine_default"]);
        assert!(agg.envelope.power_limit_kw.is_infinite());
    }

    #[test]
    fn zero_diameter_is_rejected() {
        let mut t = tool();
        t.diameter_mm = 0.0;
        let err = ConstraintEngine::default()
            .aggregate(&set(None, Some(&t), None))
            .unwrap_err();
        assert!(matches!(err, ConstraintError::InvalidGeometry { .. }));
    }
}
