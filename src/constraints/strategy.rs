//! Per-mode toolpath strategy envelopes, as fractions of tool diameter

use crate::types::MachiningMode;

/// Engagement limits one machining mode imposes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyLimits {
    /// Axial depth ceiling, multiple of D
    pub doc_max_ratio: f64,
    /// Radial width ceiling, multiple of D
    pub woc_max_ratio: f64,
    /// Radial width floor, multiple of D (slotting pins the width)
    pub woc_min_ratio: f64,
    /// Multiplier on the feed-per-tooth ceiling
    pub feed_factor: f64,
    /// Default radial engagement used to seed the search, multiple of D
    pub seed_woc_ratio: f64,
    /// Default axial engagement used to seed the search, multiple of D
    pub seed_doc_ratio: f64,
}

pub fn strategy_limits(mode: MachiningMode) -> StrategyLimits {
    match mode {
        MachiningMode::Roughing => StrategyLimits {
            doc_max_ratio: 1.0,
            woc_max_ratio: 0.5,
            woc_min_ratio: 0.0,
            feed_factor: 1.0,
            seed_woc_ratio: 0.4,
            seed_doc_ratio: 0.75,
        },
        MachiningMode::Finishing => StrategyLimits {
            doc_max_ratio: 1.5,
            woc_max_ratio: 0.1,
            woc_min_ratio: 0.0,
            feed_factor: 0.6,
            seed_woc_ratio: 0.05,
            seed_doc_ratio: 1.0,
        },
        MachiningMode::Slotting => StrategyLimits {
            doc_max_ratio: 0.5,
            woc_max_ratio: 1.0,
            woc_min_ratio: 1.0,
            feed_factor: 1.0,
            seed_woc_ratio: 1.0,
            seed_doc_ratio: 0.3,
        },
        MachiningMode::Adaptive => StrategyLimits {
            doc_max_ratio: 2.0,
            woc_max_ratio: 0.15,
            woc_min_ratio: 0.0,
            feed_factor: 1.0,
            seed_woc_ratio: 0.1,
            seed_doc_ratio: 1.5,
        },
        MachiningMode::Profiling => StrategyLimits {
            doc_max_ratio: 1.5,
            woc_max_ratio: 0.3,
            woc_min_ratio: 0.0,
            feed_factor: 1.0,
            seed_woc_ratio: 0.2,
            seed_doc_ratio: 1.0,
        },
    }
}
