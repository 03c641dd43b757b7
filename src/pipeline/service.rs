//! CuttingService - the external surface
//!
//! Owns the long-lived learned state:
//! - one `BeliefState` and one `GaussianProcess` per session
//! - one wear filter per physical tool instance (inside the `WearEstimator`)
//!
//! Recommendations work on cloned snapshots, so a slow recommendation never
//! blocks feedback. With a `StateStore` attached, every mutation is written
//! through and state is read back the first time an id is seen.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use super::catalog::ProfileCatalog;
use super::orchestrator::{PipelineInput, RecommendationPipeline};
use super::PipelineError;
use crate::config::EngineConfig;
use crate::ml_engine::{BeliefState, FeedbackRecord, GaussianProcess};
use crate::storage::{
    belief_key, feedback_key, feedback_prefix, gp_key, load_json, save_json, wear_key, StateStore,
};
use crate::types::{
    AdaptedParameter, FeedbackOutcome, Gaussian, MachiningMode, ObjectivePreset, ProfileSet,
    ProfileWarning, RecommendationDocument, WearEstimate,
};
use crate::wear::ToolWearFilter;

/// One `recommend` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub session_id: String,
    pub material_id: String,
    pub tool_id: String,
    pub machine_id: String,
    #[serde(default)]
    pub holder_id: Option<String>,
    #[serde(default)]
    pub workholding_id: Option<String>,
    #[serde(default)]
    pub mode: MachiningMode,
    #[serde(default)]
    pub objective: ObjectivePreset,
    #[serde(default)]
    pub thin_wall: bool,
    #[serde(default)]
    pub tool_instance_id: Option<String>,
    #[serde(default)]
    pub cut_length_mm: Option<f64>,
    /// Sample the session's beliefs with this seed instead of using their means
    #[serde(default)]
    pub explore_seed: Option<u64>,
}

pub struct CuttingService {
    catalog: Arc<dyn ProfileCatalog>,
    pipeline: RecommendationPipeline,
    store: Option<Arc<dyn StateStore>>,
    beliefs: RwLock<HashMap<String, BeliefState>>,
    histories: RwLock<HashMap<String, GaussianProcess>>,
}

impl std::fmt::Debug for CuttingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CuttingService")
            .field("pipeline", &self.pipeline)
            .field("store", &self.store.as_ref().map(|s| s.backend_name()))
            .finish_non_exhaustive()
    }
}

impl CuttingService {
    pub fn new(catalog: Arc<dyn ProfileCatalog>, pipeline: RecommendationPipeline) -> Self {
        Self {
            catalog,
            pipeline,
            store: None,
            beliefs: RwLock::new(HashMap::new()),
            histories: RwLock::new(HashMap::new()),
        }
    }

    /// Default pipeline from configuration.
    pub fn from_config(config: &EngineConfig, catalog: Arc<dyn ProfileCatalog>) -> Self {
        Self::new(catalog, RecommendationPipeline::from_config(config))
    }

    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        info!(backend = store.backend_name(), "State store attached");
        self.store = Some(store);
        self
    }

    // ========================================================================
    // Recommendation
    // ========================================================================

    pub fn recommend(&self, request: &RecommendRequest) -> Result<RecommendationDocument, PipelineError> {
        let material = self
            .catalog
            .get_material(&request.material_id)
            .ok_or_else(|| not_found("material", &request.material_id))?;
        let tool = self
            .catalog
            .get_tool(&request.tool_id)
            .ok_or_else(|| not_found("tool", &request.tool_id))?;
        let machine = self
            .catalog
            .get_machine(&request.machine_id)
            .ok_or_else(|| not_found("machine", &request.machine_id))?;

        let mut lookup_warnings = Vec::new();
        let holder = request.holder_id.as_deref().and_then(|id| {
            let found = self.catalog.get_holder(id);
            if found.is_none() {
                warn!(holder = id, "Unknown holder, ignoring");
                lookup_warnings.push(ProfileWarning::new("holder", format!("{id}: not in catalog, ignored")));
            }
            found
        });
        let workholding = request.workholding_id.as_deref().and_then(|id| {
            let found = self.catalog.get_workholding(id);
            if found.is_none() {
                warn!(workholding = id, "Unknown workholding, ignoring");
                lookup_warnings.push(ProfileWarning::new(
                    "workholding",
                    format!("{id}: not in catalog, ignored"),
                ));
            }
            found
        });

        let beliefs = self.beliefs_snapshot(&request.session_id)?;
        let history = self.history_snapshot(&request.session_id)?;
        if let Some(id) = request.tool_instance_id.as_deref() {
            self.ensure_wear_loaded(id)?;
        }

        let input = PipelineInput {
            profiles: ProfileSet {
                machine: Some(machine),
                tool: Some(tool),
                holder,
                workholding,
                material: Some(material),
                mode: Some(request.mode),
                thin_wall: request.thin_wall,
            },
            material,
            tool,
            machine_id: &machine.id,
            objective: request.objective,
            beliefs: &beliefs,
            history: Some(&history),
            tool_instance_id: request.tool_instance_id.as_deref(),
            cut_length_mm: request.cut_length_mm,
            exploration_seed: request.explore_seed,
        };

        let mut document = self.pipeline.recommend(&input)?;
        document.warnings.extend(lookup_warnings);
        Ok(document)
    }

    // ========================================================================
    // Feedback and history
    // ========================================================================

    /// Fold one operator report into the session's beliefs.
    pub fn submit_feedback(
        &self,
        session_id: &str,
        parameter: AdaptedParameter,
        recommended: f64,
        actual_used: f64,
        outcome: FeedbackOutcome,
    ) -> Result<Gaussian, PipelineError> {
        let record = FeedbackRecord::new(parameter, recommended, actual_used, outcome);

        let mut sessions = self.beliefs.write().map_err(|_| PipelineError::LockPoisoned)?;
        let mut beliefs = match sessions.get(session_id) {
            Some(current) => current.clone(),
            None => self.load_beliefs(session_id)?,
        };

        // Memory only changes once the store has accepted the update.
        let posterior = self.pipeline.adaptation().record(&mut beliefs, &record)?;
        if let Some(store) = &self.store {
            let nanos = record.recorded_at.timestamp_nanos_opt().unwrap_or_default();
            let record_key = feedback_key(session_id, nanos, beliefs.observations());
            save_json(store.as_ref(), &record_key, &record)?;
            if let Err(e) = save_json(store.as_ref(), &belief_key(session_id), &beliefs) {
                if let Err(cleanup) = store.remove(&record_key) {
                    warn!(key = %record_key, error = %cleanup, "Orphaned feedback record left in store");
                }
                return Err(e.into());
            }
        }
        sessions.insert(session_id.to_string(), beliefs);

        info!(
            session = session_id,
            %parameter,
            %outcome,
            mean = posterior.mean,
            variance = posterior.variance,
            "Feedback applied"
        );
        Ok(posterior)
    }

    /// Operator reports for a session, oldest first. Empty without a store.
    pub fn feedback_history(&self, session_id: &str) -> Result<Vec<FeedbackRecord>, PipelineError> {
        let Some(store) = &self.store else {
            return Ok(Vec::new());
        };
        let mut records = Vec::new();
        for key in store.keys_with_prefix(&feedback_prefix(session_id))? {
            if let Some(record) = load_json::<FeedbackRecord>(store.as_ref(), &key)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Add one (cutting speed, observed tool life) pair to the session's GP.
    /// Returns the history length after the add.
    pub fn record_tool_life(
        &self,
        session_id: &str,
        cutting_speed: f64,
        tool_life_minutes: f64,
    ) -> Result<usize, PipelineError> {
        let mut sessions = self.histories.write().map_err(|_| PipelineError::LockPoisoned)?;
        let mut history = match sessions.get(session_id) {
            Some(current) => current.clone(),
            None => self.load_history(session_id)?,
        };

        history.add_observation(cutting_speed, tool_life_minutes)?;
        if let Some(store) = &self.store {
            save_json(store.as_ref(), &gp_key(session_id), &history)?;
        }
        let points = history.len();
        sessions.insert(session_id.to_string(), history);

        debug!(
            session = session_id,
            speed = cutting_speed,
            life = tool_life_minutes,
            points,
            "Tool-life observation recorded"
        );
        Ok(points)
    }

    // ========================================================================
    // Wear
    // ========================================================================

    pub fn report_wear_measurement(
        &self,
        tool_instance_id: &str,
        measured_wear: f64,
    ) -> Result<WearEstimate, PipelineError> {
        self.ensure_wear_loaded(tool_instance_id)?;
        let wear = self.pipeline.wear();
        let previous = wear.snapshot(tool_instance_id)?;
        let estimate = wear.record_measurement(tool_instance_id, measured_wear)?;
        if let Err(e) = self.persist_wear(tool_instance_id) {
            match previous {
                Some(filter) => wear.restore(tool_instance_id, filter)?,
                None => {
                    wear.reset(tool_instance_id)?;
                }
            }
            return Err(e);
        }
        Ok(estimate)
    }

    /// Fresh edge on a tracked instance. Returns false for an unknown id.
    pub fn reset_tool(&self, tool_instance_id: &str) -> Result<bool, PipelineError> {
        self.ensure_wear_loaded(tool_instance_id)?;
        let was_tracked = self.pipeline.wear().reset(tool_instance_id)?;
        if was_tracked {
            self.persist_wear(tool_instance_id)?;
        }
        Ok(was_tracked)
    }

    pub fn wear_estimate(&self, tool_instance_id: &str) -> Result<Option<WearEstimate>, PipelineError> {
        self.ensure_wear_loaded(tool_instance_id)?;
        Ok(self.pipeline.wear().estimate(tool_instance_id))
    }

    // ========================================================================
    // State loading
    // ========================================================================

    fn beliefs_snapshot(&self, session_id: &str) -> Result<BeliefState, PipelineError> {
        {
            let sessions = self.beliefs.read().map_err(|_| PipelineError::LockPoisoned)?;
            if let Some(b) = sessions.get(session_id) {
                return Ok(b.clone());
            }
        }
        let loaded = self.load_beliefs(session_id)?;
        let mut sessions = self.beliefs.write().map_err(|_| PipelineError::LockPoisoned)?;
        Ok(sessions.entry(session_id.to_string()).or_insert(loaded).clone())
    }

    fn history_snapshot(&self, session_id: &str) -> Result<GaussianProcess, PipelineError> {
        {
            let sessions = self.histories.read().map_err(|_| PipelineError::LockPoisoned)?;
            if let Some(h) = sessions.get(session_id) {
                return Ok(h.clone());
            }
        }
        let loaded = self.load_history(session_id)?;
        let mut sessions = self.histories.write().map_err(|_| PipelineError::LockPoisoned)?;
        Ok(sessions.entry(session_id.to_string()).or_insert(loaded).clone())
    }

    fn load_beliefs(&self, session_id: &str) -> Result<BeliefState, PipelineError> {
        if let Some(store) = &self.store {
            if let Some(saved) = load_json(store.as_ref(), &belief_key(session_id))? {
                debug!(session = session_id, "Beliefs restored");
                return Ok(saved);
            }
        }
        Ok(self.pipeline.adaptation().new_beliefs())
    }

    fn load_history(&self, session_id: &str) -> Result<GaussianProcess, PipelineError> {
        if let Some(store) = &self.store {
            if let Some(saved) = load_json(store.as_ref(), &gp_key(session_id))? {
                debug!(session = session_id, "Tool-life history restored");
                return Ok(saved);
            }
        }
        Ok(self.pipeline.adaptation().new_history())
    }

    fn ensure_wear_loaded(&self, tool_instance_id: &str) -> Result<(), PipelineError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let wear = self.pipeline.wear();
        if wear.snapshot(tool_instance_id)?.is_some() {
            return Ok(());
        }
        if let Some(filter) = load_json::<ToolWearFilter>(store.as_ref(), &wear_key(tool_instance_id))? {
            debug!(tool = tool_instance_id, "Wear filter restored");
            wear.restore(tool_instance_id, filter)?;
        }
        Ok(())
    }

    fn persist_wear(&self, tool_instance_id: &str) -> Result<(), PipelineError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if let Some(filter) = self.pipeline.wear().snapshot(tool_instance_id)? {
            save_json(store.as_ref(), &wear_key(tool_instance_id), &filter)?;
        }
        Ok(())
    }
}

fn not_found(kind: &'static str, id: &str) -> PipelineError {
    PipelineError::ProfileNotFound {
        kind,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MonteCarloConfig, PsoConfig};
    use crate::optimization::test_support;
    use crate::pipeline::InMemoryCatalog;
    use crate::storage::{InMemoryStore, StorageError};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn config() -> EngineConfig {
        EngineConfig {
            pso: PsoConfig {
                particles: 10,
                iterations: 15,
                ..PsoConfig::default()
            },
            monte_carlo: MonteCarloConfig {
                trials: 300,
                ..MonteCarloConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    fn catalog() -> Arc<dyn ProfileCatalog> {
        Arc::new(
            InMemoryCatalog::new()
                .with_material(test_support::material())
                .with_tool(test_support::tool())
                .with_machine(test_support::machine()),
        )
    }

    fn request() -> RecommendRequest {
        let tool = test_support::tool();
        let material = test_support::material();
        let machine = test_support::machine();
        RecommendRequest {
            session_id: "cell-1".into(),
            material_id: material.id,
            tool_id: tool.id,
            machine_id: machine.id,
            ..RecommendRequest::default()
        }
    }

    #[test]
    fn unknown_required_profile_is_an_error() {
        let service = CuttingService::from_config(&config(), catalog());
        let mut req = request();
        req.tool_id = "ghost".into();
        let err = service.recommend(&req).unwrap_err();
        assert!(matches!(err, PipelineError::ProfileNotFound { kind: "tool", .. }));
    }

    #[test]
    fn unknown_optional_profile_becomes_a_warning() {
        let service = CuttingService::from_config(&config(), catalog());
        let mut req = request();
        req.holder_id = Some("no-such-holder".into());
        let doc = service.recommend(&req).unwrap();
        assert!(doc.warnings.iter().any(|w| w.source == "holder"));
    }

    #[test]
    fn feedback_reaches_the_next_recommendation() {
        let service = CuttingService::from_config(&config(), catalog());
        let before = service.recommend(&request()).unwrap();
        for _ in 0..5 {
            service
                .submit_feedback("cell-1", AdaptedParameter::Feed, 0.10, 0.08, FeedbackOutcome::Success)
                .unwrap();
        }
        let after = service.recommend(&request()).unwrap();
        let conf = |d: &RecommendationDocument| {
            d.confidence
                .iter()
                .find(|c| c.parameter == AdaptedParameter::Feed)
                .map(|c| c.multiplier)
                .unwrap()
        };
        assert!(conf(&after) < conf(&before));

        // Other sessions are untouched.
        let mut other = request();
        other.session_id = "cell-2".into();
        let fresh = service.recommend(&other).unwrap();
        assert_eq!(conf(&fresh), conf(&before));
    }

    #[test]
    fn invalid_feedback_is_rejected() {
        let service = CuttingService::from_config(&config(), catalog());
        let err = service
            .submit_feedback("s", AdaptedParameter::Speed, 0.0, 100.0, FeedbackOutcome::Success)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Feedback(_)));
    }

    #[test]
    fn state_survives_a_service_restart() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        {
            let service = CuttingService::from_config(&config(), catalog()).with_store(Arc::clone(&store));
            service
                .submit_feedback("cell-1", AdaptedParameter::Speed, 300.0, 250.0, FeedbackOutcome::Acceptable)
                .unwrap();
            service.record_tool_life("cell-1", 300.0, 45.0).unwrap();
            service.report_wear_measurement("T-1", 0.03).unwrap();
        }

        let service = CuttingService::from_config(&config(), catalog()).with_store(store);
        assert_eq!(service.record_tool_life("cell-1", 350.0, 35.0).unwrap(), 2);
        let wear = service.wear_estimate("T-1").unwrap().unwrap();
        assert_eq!(wear.measurements, 1);
        let history = service.feedback_history("cell-1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].actual_used, 250.0);
    }

    #[test]
    fn reset_tool_reports_whether_it_was_tracked() {
        let service = CuttingService::from_config(&config(), catalog());
        assert!(!service.reset_tool("T-9").unwrap());
        service.report_wear_measurement("T-9", 0.1).unwrap();
        assert!(service.reset_tool("T-9").unwrap());
        assert_eq!(service.wear_estimate("T-9").unwrap().unwrap().measurements, 0);
    }

    /// Reads always work; writes fail while `down` is set.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryStore,
        down: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), StorageError> {
            if self.down.load(Ordering::SeqCst) {
                Err(StorageError::Database("disk full".into()))
            } else {
                Ok(())
            }
        }
    }

    impl StateStore for FlakyStore {
        fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
            self.check()?;
            self.inner.put(key, value)
        }

        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            self.inner.get(key)
        }

        fn remove(&self, key: &str) -> Result<bool, StorageError> {
            self.check()?;
            self.inner.remove(key)
        }

        fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            self.inner.keys_with_prefix(prefix)
        }

        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    #[test]
    fn failed_writes_leave_learned_state_untouched() {
        let store = Arc::new(FlakyStore::default());
        let service = CuttingService::from_config(&config(), catalog())
            .with_store(Arc::clone(&store) as Arc<dyn StateStore>);
        service
            .submit_feedback("cell-1", AdaptedParameter::Feed, 0.10, 0.09, FeedbackOutcome::Success)
            .unwrap();
        service.record_tool_life("cell-1", 300.0, 45.0).unwrap();
        service.report_wear_measurement("T-3", 0.02).unwrap();
        let before = service.beliefs_snapshot("cell-1").unwrap();

        store.down.store(true, Ordering::SeqCst);
        let err = service
            .submit_feedback("cell-1", AdaptedParameter::Feed, 0.10, 0.05, FeedbackOutcome::Success)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
        assert!(service.record_tool_life("cell-1", 350.0, 30.0).is_err());
        assert!(service.report_wear_measurement("T-3", 0.05).is_err());

        assert_eq!(service.beliefs_snapshot("cell-1").unwrap(), before);
        assert_eq!(service.history_snapshot("cell-1").unwrap().len(), 1);
        assert_eq!(service.wear_estimate("T-3").unwrap().unwrap().measurements, 1);

        store.down.store(false, Ordering::SeqCst);
        assert_eq!(service.record_tool_life("cell-1", 350.0, 30.0).unwrap(), 2);
        assert_eq!(service.feedback_history("cell-1").unwrap().len(), 1);
    }
}
