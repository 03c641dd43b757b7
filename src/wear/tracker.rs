//! Wear filters keyed by tool instance
//!
//! One `RwLock` over the map: measurements are rare compared with reads, and
//! each write is a single predict/update pair.

use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};

use super::kalman::ToolWearFilter;
use super::{WearError, WearEstimator};
use crate::config::KalmanConfig;
use crate::types::WearEstimate;

/// All live tool instances.
#[derive(Debug, Default)]
pub struct WearTracker {
    config: KalmanConfig,
    filters: RwLock<HashMap<String, ToolWearFilter>>,
}

impl WearTracker {
    pub fn new(config: KalmanConfig) -> Self {
        Self {
            config,
            filters: RwLock::new(HashMap::new()),
        }
    }

    pub fn tracked(&self) -> Result<Vec<String>, WearError> {
        let filters = self.filters.read().map_err(|_| WearError::LockPoisoned)?;
        let mut ids: Vec<String> = filters.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

impl WearEstimator for WearTracker {
    fn record_measurement(&self, tool_instance_id: &str, measured_wear: f64) -> Result<WearEstimate, WearError> {
        if !measured_wear.is_finite() || measured_wear < 0.0 {
            return Err(WearError::InvalidMeasurement(measured_wear));
        }
        let mut filters = self.filters.write().map_err(|_| WearError::LockPoisoned)?;
        let mut filter = match filters.get(tool_instance_id) {
            Some(existing) => existing.clone(),
            None => {
                info!(tool = tool_instance_id, "Tracking new tool instance");
                ToolWearFilter::new(self.config.clone())
            }
        };
        filter.predict();
        filter.update(measured_wear)?;
        let estimate = filter.estimate(tool_instance_id);
        filters.insert(tool_instance_id.to_string(), filter);
        debug!(
            tool = tool_instance_id,
            measured = measured_wear,
            wear = estimate.wear_amount,
            rate = estimate.wear_rate,
            remaining = estimate.remaining_life,
            "Wear measurement applied"
        );
        Ok(estimate)
    }

    fn estimate(&self, tool_instance_id: &str) -> Option<WearEstimate> {
        let filters = self.filters.read().ok()?;
        filters.get(tool_instance_id).map(|f| f.estimate(tool_instance_id))
    }

    fn reset(&self, tool_instance_id: &str) -> Result<bool, WearError> {
        let mut filters = self.filters.write().map_err(|_| WearError::LockPoisoned)?;
        match filters.get_mut(tool_instance_id) {
            Some(filter) => {
                filter.reset();
                info!(tool = tool_instance_id, "Tool instance reset");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn snapshot(&self, tool_instance_id: &str) -> Result<Option<ToolWearFilter>, WearError> {
        let filters = self.filters.read().map_err(|_| WearError::LockPoisoned)?;
        Ok(filters.get(tool_instance_id).cloned())
    }

    fn restore(&self, tool_instance_id: &str, filter: ToolWearFilter) -> Result<(), WearError> {
        let mut filters = self.filters.write().map_err(|_| WearError::LockPoisoned)?;
        filters.insert(tool_instance_id.to_string(), filter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn first_measurement_creates_filter() {
        let tracker = WearTracker::new(KalmanConfig::default());
        assert!(tracker.estimate("T1").is_none());
        let est = tracker.record_measurement("T1", 0.02).unwrap();
        assert_eq!(est.measurements, 1);
        assert_eq!(tracker.tracked().unwrap(), vec!["T1".to_string()]);
    }

    #[test]
    fn instances_are_independent() {
        let tracker = WearTracker::new(KalmanConfig::default());
        tracker.record_measurement("T1", 0.10).unwrap();
        tracker.record_measurement("T2", 0.01).unwrap();
        let t1 = tracker.estimate("T1").unwrap();
        let t2 = tracker.estimate("T2").unwrap();
        assert!(t1.wear_amount > t2.wear_amount);
    }

    #[test]
    fn reset_unknown_tool_is_a_no_op() {
        let tracker = WearTracker::new(KalmanConfig::default());
        assert!(!tracker.reset("ghost").unwrap());
        tracker.record_measurement("T1", 0.1).unwrap();
        assert!(tracker.reset("T1").unwrap());
        assert_eq!(tracker.estimate("T1").unwrap().measurements, 0);
    }

    #[test]
    fn snapshot_restores_into_fresh_tracker() {
        let tracker = WearTracker::new(KalmanConfig::default());
        tracker.record_measurement("T1", 0.04).unwrap();
        let saved = tracker.snapshot("T1").unwrap().unwrap();

        let other = WearTracker::new(KalmanConfig::default());
        assert!(other.snapshot("T1").unwrap().is_none());
        other.restore("T1", saved).unwrap();
        assert_eq!(other.estimate("T1"), tracker.estimate("T1"));
    }

    #[test]
    fn negative_measurement_is_rejected() {
        let tracker = WearTracker::new(KalmanConfig::default());
        assert!(matches!(
            tracker.record_measurement("T1", -0.1),
            Err(WearError::InvalidMeasurement(_))
        ));
    }

    #[test]
    fn failed_update_keeps_previous_filter() {
        let broken = KalmanConfig {
            measurement_noise: f64::INFINITY,
            ..KalmanConfig::default()
        };
        let tracker = WearTracker::new(broken.clone());
        assert!(tracker.record_measurement("T1", 0.02).is_err());
        assert!(tracker.snapshot("T1").unwrap().is_none());

        tracker.restore("T2", ToolWearFilter::new(broken)).unwrap();
        let before = tracker.snapshot("T2").unwrap();
        assert!(tracker.record_measurement("T2", 0.02).is_err());
        assert_eq!(tracker.snapshot("T2").unwrap(), before);
    }

    #[test]
    fn concurrent_writers_serialize() {
        let tracker = Arc::new(WearTracker::new(KalmanConfig::default()));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let t = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        t.record_measurement("shared", 0.01 * f64::from(i)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(tracker.estimate("shared").unwrap().measurements, 100);
    }
}
