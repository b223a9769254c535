//! Modeling session
//!
//! One [`ModelingSession`] backs one modeling workbench: it owns the
//! configuration, the held result, the comparison baseline and the background
//! collinearity guard, and turns every backend outcome into notices.
//!
//! The state lock is never held across an `.await`. Every async operation
//! snapshots what it needs, awaits the backend, then re-checks that its
//! answer is still relevant (epoch / feature-set identity) before applying it.

use crate::assistant::{AssistOutcome, AssistantBridge};
use crate::backend::{
    EntityId, HealthRequest, ModelingBackend, RunRequest, SelectVariablesRequest,
    SelectionOutcome, SelectionParams,
};
use crate::busy::BusyFlag;
use crate::catalog::{
    self, DatasetMetadata, HealthReport, VariableMeta, VariableOption,
};
use crate::collinearity::{CollinearityGuard, CollinearityReport, GuardPhase};
use crate::comparison::{ComparisonEngine, ComparisonReport};
use crate::configuration::{ConfigurationState, ModelConfig, ModelParams, ModelType};
use crate::methodology;
use crate::projector::charts::ChartSet;
use crate::projector::ResultProjector;
use crate::result::{self, Horizon, Interpretation, ModelResult, TopResult};
use crate::runner::{ModelRunner, RunOutcome};
use insight_common::config::EngineConfig;
use insight_common::{Notice, NoticeBus};
use serde_json::Value;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Display time of analytical-failure notices
    pub error_duration: Duration,
    /// Display time of informational notices
    pub info_duration: Duration,
    pub vif_threshold: f64,
    pub debounce: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl SessionSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            error_duration: Duration::from_millis(config.notices.error_duration_ms),
            info_duration: Duration::from_millis(config.notices.info_duration_ms),
            vif_threshold: config.collinearity.vif_threshold,
            debounce: config.collinearity.debounce(),
        }
    }
}

/// What a run request ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDisposition {
    /// Preconditions unmet (no dataset, outcome not set); nothing sent
    Skipped,
    /// A run was already in progress; nothing sent
    Busy,
    /// New result stored
    Applied,
    /// Response arrived after a dataset or model-family change and was dropped
    Superseded,
    /// Fit failed on the service; result cleared
    AnalyticalFailure,
    /// Request failed; previous result kept
    TransportFailure,
}

/// Staleness stamps captured before a backend call and compared after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Epochs {
    dataset: u64,
    config: u64,
}

#[derive(Default)]
struct SessionState {
    dataset_id: Option<EntityId>,
    /// Bumped on every dataset switch
    dataset_epoch: u64,
    metadata: Option<DatasetMetadata>,
    health: HealthReport,
    configuration: ConfigurationState,
    /// Bumped on every model-family change; run responses carry the value they started with
    config_epoch: u64,
    result: Option<ModelResult>,
    /// Bumped whenever the held result is replaced or cleared
    result_epoch: u64,
    horizon: Option<Horizon>,
    comparison: ComparisonEngine,
    selection: Option<SelectionOutcome>,
    suggested_features: Vec<String>,
}

impl SessionState {
    fn epochs(&self) -> Epochs {
        Epochs {
            dataset: self.dataset_epoch,
            config: self.config_epoch,
        }
    }

    fn replace_result(&mut self, result: Option<ModelResult>) {
        self.result = result;
        self.result_epoch += 1;
    }
}

pub struct ModelingSession {
    backend: Arc<dyn ModelingBackend>,
    notices: NoticeBus,
    settings: SessionSettings,
    project_id: EntityId,
    state: RwLock<SessionState>,
    guard: CollinearityGuard,
    runner: ModelRunner,
    assistant: AssistantBridge,
    projector: ResultProjector,
    selecting: BusyFlag,
}

impl ModelingSession {
    pub fn new(
        backend: Arc<dyn ModelingBackend>,
        notices: NoticeBus,
        project_id: impl Into<EntityId>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            guard: CollinearityGuard::new(Arc::clone(&backend), settings.debounce),
            runner: ModelRunner::new(Arc::clone(&backend)),
            assistant: AssistantBridge::new(Arc::clone(&backend)),
            projector: ResultProjector::new(settings.vif_threshold),
            backend,
            notices,
            settings,
            project_id: project_id.into(),
            state: RwLock::new(SessionState::default()),
            selecting: BusyFlag::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn notices(&self) -> &NoticeBus {
        &self.notices
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn project_id(&self) -> &EntityId {
        &self.project_id
    }

    // ---------------------------------------------------------------------
    // Dataset and catalog
    // ---------------------------------------------------------------------

    /// Switch dataset. Result, selection outcome, metadata and health are dropped.
    pub fn set_dataset(&self, dataset_id: Option<EntityId>) {
        let features = {
            let mut state = self.write();
            state.dataset_id = dataset_id.clone();
            state.dataset_epoch += 1;
            state.metadata = None;
            state.health = HealthReport::new();
            state.selection = None;
            state.replace_result(None);
            state.configuration.features().to_vec()
        };
        self.guard.set_dataset(dataset_id);
        self.guard.on_features_changed(&features);
    }

    pub fn dataset_id(&self) -> Option<EntityId> {
        self.read().dataset_id.clone()
    }

    /// Store metadata and fetch the health map once.
    ///
    /// Health failures are logged only; options keep `unknown` status.
    pub async fn set_metadata(&self, metadata: Option<DatasetMetadata>) {
        let request = {
            let mut state = self.write();
            state.metadata = metadata;
            state.health = HealthReport::new();
            match (&state.dataset_id, &state.metadata) {
                (Some(dataset_id), Some(metadata)) => Some(HealthRequest {
                    dataset_id: dataset_id.clone(),
                    variables: metadata.names(),
                }),
                _ => None,
            }
        };

        let Some(request) = request else {
            return;
        };
        let dataset_id = request.dataset_id.clone();
        let variables = request.variables.clone();

        match self.backend.check_health(request).await {
            Ok(response) => {
                let mut state = self.write();
                let still_current = state.dataset_id.as_ref() == Some(&dataset_id)
                    && state.metadata.as_ref().map(|m| m.names()) == Some(variables);
                if still_current {
                    debug!(entries = response.report.len(), "Health report stored");
                    state.health = HealthReport::from_items(response.report);
                } else {
                    debug!("Discarding health report for superseded metadata");
                }
            }
            Err(e) => warn!(error = %e, "Health fetch failed"),
        }
    }

    pub fn metadata(&self) -> Option<DatasetMetadata> {
        self.read().metadata.clone()
    }

    pub fn health(&self) -> HealthReport {
        self.read().health.clone()
    }

    /// All variables as options, in metadata order
    pub fn variable_options(&self) -> Vec<VariableOption> {
        let state = self.read();
        catalog::project(state.metadata.as_ref(), Some(&state.health))
    }

    pub fn numeric_options(&self) -> Vec<VariableOption> {
        catalog::numeric_options(&self.variable_options())
    }

    pub fn categorical_options(&self) -> Vec<VariableOption> {
        catalog::categorical_options(&self.variable_options())
    }

    pub fn target_options(&self) -> Vec<VariableOption> {
        let options = self.variable_options();
        self.read().configuration.target_options(&options)
    }

    pub fn feature_options(&self) -> Vec<VariableOption> {
        let options = self.variable_options();
        self.read().configuration.feature_options(&options)
    }

    pub fn time_options(&self) -> Vec<VariableOption> {
        let options = self.variable_options();
        self.read().configuration.time_options(&options)
    }

    pub fn event_options(&self) -> Vec<VariableOption> {
        let options = self.variable_options();
        self.read().configuration.event_options(&options)
    }

    /// Categorical features with categories to choose a reference level from
    pub fn selected_categorical_vars(&self) -> Vec<VariableMeta> {
        let state = self.read();
        match &state.metadata {
            Some(metadata) => state
                .configuration
                .selected_categorical_vars(metadata)
                .into_iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    pub fn config(&self) -> ModelConfig {
        self.read().configuration.config().clone()
    }

    pub fn model_type(&self) -> ModelType {
        self.read().configuration.model_type()
    }

    pub fn is_target_set(&self) -> bool {
        self.read().configuration.is_target_set()
    }

    /// Adopt a whole configuration (saved or imported), repairing invariants.
    ///
    /// Counts as a family change: the held result is dropped.
    pub fn load_config(&self, config: ModelConfig) {
        let features = {
            let mut state = self.write();
            state.configuration = ConfigurationState::from_config(config);
            state.config_epoch += 1;
            state.replace_result(None);
            state.horizon = None;
            state.configuration.features().to_vec()
        };
        self.guard.on_features_changed(&features);
    }

    /// Change family. The held result no longer applies and is dropped.
    pub fn set_model_type(&self, model_type: ModelType) -> bool {
        let mut state = self.write();
        if !state.configuration.set_model_type(model_type) {
            return false;
        }
        state.config_epoch += 1;
        state.replace_result(None);
        state.horizon = None;
        true
    }

    pub fn set_target(&self, target: Option<String>) -> bool {
        self.write().configuration.set_target(target)
    }

    pub fn set_time_variable(&self, time: Option<String>) -> bool {
        self.write().configuration.set_time_variable(time)
    }

    pub fn set_event_variable(&self, event: Option<String>) -> bool {
        self.write().configuration.set_event_variable(event)
    }

    /// Replace the feature set; a change reschedules the collinearity check.
    ///
    /// Must be called from within a tokio runtime.
    pub fn set_features(&self, features: Vec<String>) -> bool {
        self.update_features(|c| c.set_features(features))
    }

    pub fn add_feature(&self, name: impl Into<String>) -> bool {
        let name = name.into();
        self.update_features(|c| c.add_feature(name))
    }

    pub fn remove_feature(&self, name: &str) -> bool {
        self.update_features(|c| c.remove_feature(name))
    }

    fn update_features(&self, edit: impl FnOnce(&mut ConfigurationState) -> bool) -> bool {
        let changed = {
            let mut state = self.write();
            edit(&mut state.configuration).then(|| state.configuration.features().to_vec())
        };
        match changed {
            Some(features) => {
                self.guard.on_features_changed(&features);
                true
            }
            None => false,
        }
    }

    pub fn set_ref_level(&self, variable: impl Into<String>, level: impl Into<String>) -> bool {
        self.write().configuration.set_ref_level(variable, level)
    }

    pub fn clear_ref_level(&self, variable: &str) -> bool {
        self.write().configuration.clear_ref_level(variable)
    }

    pub fn set_model_params(&self, params: ModelParams) {
        self.write().configuration.set_model_params(params);
    }

    // ---------------------------------------------------------------------
    // Collinearity
    // ---------------------------------------------------------------------

    pub fn collinearity_report(&self) -> Option<CollinearityReport> {
        self.guard.report()
    }

    pub fn collinearity_warning(&self) -> Option<String> {
        self.guard.warning_message()
    }

    pub fn collinearity_phase(&self) -> GuardPhase {
        self.guard.phase()
    }

    pub fn is_checking_collinearity(&self) -> bool {
        self.guard.is_checking()
    }

    // ---------------------------------------------------------------------
    // Running
    // ---------------------------------------------------------------------

    pub fn is_running(&self) -> bool {
        self.runner.is_busy()
    }

    /// Fit the current configuration.
    ///
    /// Success replaces the held result and keeps any comparison baseline.
    /// An analytical failure clears the result and raises a long-lived notice;
    /// a transport failure leaves the result untouched.
    pub async fn run(&self) -> RunDisposition {
        let (config, dataset_id, epoch) = {
            let state = self.read();
            let Some(dataset_id) = state.dataset_id.clone() else {
                debug!("Model run skipped: no dataset");
                return RunDisposition::Skipped;
            };
            if !state.configuration.is_target_set() {
                drop(state);
                self.notices
                    .emit_lossy(Notice::warning("Select the outcome variable(s) before running the model"));
                return RunDisposition::Skipped;
            }
            (state.configuration.config().clone(), dataset_id, state.epochs())
        };

        let outcome = self.runner.run(&config, &self.project_id, &dataset_id).await;

        match outcome {
            RunOutcome::Busy => RunDisposition::Busy,
            RunOutcome::Completed(fitted) => {
                {
                    let mut state = self.write();
                    if state.epochs() != epoch {
                        warn!("Discarding run result: dataset or model type changed while running");
                        return RunDisposition::Superseded;
                    }
                    let horizons = result::available_horizons(&fitted);
                    let keep = state
                        .horizon
                        .as_ref()
                        .is_some_and(|h| horizons.iter().any(|k| h.matches(k.as_str())));
                    if !keep {
                        if let Some(first) = horizons.first() {
                            state.horizon = Some(first.clone());
                        }
                    }
                    state.replace_result(Some(*fitted));
                }
                self.notices.emit_lossy(Notice::success("Model run succeeded"));
                RunDisposition::Applied
            }
            RunOutcome::AnalyticalFailure(message) => {
                {
                    let mut state = self.write();
                    if state.epochs() != epoch {
                        warn!("Discarding run failure: dataset or model type changed while running");
                        return RunDisposition::Superseded;
                    }
                    state.replace_result(None);
                }
                self.notices
                    .emit_lossy(Notice::persistent_error(message, self.settings.error_duration));
                RunDisposition::AnalyticalFailure
            }
            RunOutcome::TransportFailure(e) => {
                self.notices
                    .emit_lossy(Notice::error(e.user_message("Model run failed")));
                RunDisposition::TransportFailure
            }
        }
    }

    pub fn result(&self) -> Option<ModelResult> {
        self.read().result.clone()
    }

    pub fn has_result(&self) -> bool {
        self.read().result.is_some()
    }

    // ---------------------------------------------------------------------
    // Result views
    // ---------------------------------------------------------------------

    pub fn selected_horizon(&self) -> Option<Horizon> {
        self.read().horizon.clone()
    }

    /// Explicit horizon choice; kept across runs while the new result has it
    pub fn set_horizon(&self, horizon: Option<Horizon>) {
        self.write().horizon = horizon;
    }

    pub fn available_horizons(&self) -> Vec<Horizon> {
        self.read()
            .result
            .as_ref()
            .map(result::available_horizons)
            .unwrap_or_default()
    }

    pub fn current_extended_metrics(&self) -> Option<Value> {
        let state = self.read();
        let held = state.result.as_ref()?;
        result::current_extended_metrics(held, state.horizon.as_ref()).cloned()
    }

    pub fn nomogram(&self) -> Option<Value> {
        let state = self.read();
        let held = state.result.as_ref()?;
        result::nomogram(held, state.configuration.model_type()).cloned()
    }

    pub fn top_result(&self) -> Option<TopResult> {
        let state = self.read();
        result::top_result(state.result.as_ref()?, state.configuration.model_type())
    }

    pub fn max_importance(&self) -> f64 {
        self.read()
            .result
            .as_ref()
            .map(result::max_importance)
            .unwrap_or(1.0)
    }

    /// Chart series for the held result (all empty without one)
    pub fn charts(&self) -> ChartSet {
        let state = self.read();
        match &state.result {
            Some(held) => self.projector.project(
                held,
                state.configuration.config(),
                state.horizon.as_ref(),
            ),
            None => ChartSet::default(),
        }
    }

    /// Methods paragraph: the service's text when it sent one, generated otherwise
    pub fn methodology_text(&self) -> String {
        let state = self.read();
        state
            .result
            .as_ref()
            .and_then(|r| r.methodology.clone())
            .unwrap_or_else(|| methodology::generate(state.configuration.config()))
    }

    // ---------------------------------------------------------------------
    // Comparison
    // ---------------------------------------------------------------------

    /// Snapshot the held result as the comparison baseline
    pub fn set_baseline(&self) -> bool {
        {
            let mut state = self.write();
            let SessionState {
                result: held,
                comparison,
                ..
            } = &mut *state;
            let Some(held) = held.as_ref() else {
                return false;
            };
            comparison.set_baseline(held);
        }
        self.notices
            .emit_lossy(Notice::success("Current model set as baseline (Model 1)"));
        true
    }

    pub fn clear_baseline(&self) {
        self.write().comparison.clear_baseline();
    }

    pub fn has_baseline(&self) -> bool {
        self.read().comparison.has_baseline()
    }

    /// Baseline vs held result at the selected horizon
    pub fn compare_with_baseline(&self) -> Option<ComparisonReport> {
        let state = self.read();
        state
            .comparison
            .compare(state.result.as_ref()?, state.horizon.as_ref())
    }

    // ---------------------------------------------------------------------
    // Variable selection
    // ---------------------------------------------------------------------

    pub fn is_selecting(&self) -> bool {
        self.selecting.is_busy()
    }

    pub async fn run_variable_selection(&self, params: SelectionParams) -> Option<SelectionOutcome> {
        let _busy = self.selecting.try_acquire()?;
        let (request, epoch) = {
            let mut state = self.write();
            state.selection = None;
            let dataset_id = state.dataset_id.clone()?;
            (
                SelectVariablesRequest::new(dataset_id, state.configuration.config(), &params),
                state.epochs(),
            )
        };

        match self.backend.select_variables(request).await {
            Ok(outcome) => {
                {
                    let mut state = self.write();
                    if state.epochs() != epoch {
                        warn!("Discarding variable selection: dataset or model type changed");
                        return None;
                    }
                    state.selection = Some(outcome.clone());
                }
                info!(
                    method = %params.method,
                    selected = outcome.selected_features.len(),
                    "Variable selection completed"
                );
                self.notices.emit_lossy(Notice::success("Variable selection completed"));
                Some(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Variable selection failed");
                self.notices
                    .emit_lossy(Notice::error(e.user_message("Variable selection failed")));
                None
            }
        }
    }

    pub fn selection(&self) -> Option<SelectionOutcome> {
        self.read().selection.clone()
    }

    /// Adopt the selected features, optionally running the model right away.
    ///
    /// Returns `false` when no selection outcome is held.
    pub async fn apply_selection(&self, run_immediately: bool) -> bool {
        let Some(selected) = self
            .read()
            .selection
            .as_ref()
            .map(|s| s.selected_features.clone())
        else {
            return false;
        };

        self.set_features(selected);
        let applied = self.read().configuration.features().len();
        self.notices
            .emit_lossy(Notice::success(format!("Applied {} selected features.", applied)));

        if run_immediately {
            self.run().await;
        }
        true
    }

    // ---------------------------------------------------------------------
    // Export
    // ---------------------------------------------------------------------

    /// Returns the report download URL
    pub async fn export_results(&self) -> Option<String> {
        let request = {
            let state = self.read();
            RunRequest {
                project_id: self.project_id.clone(),
                dataset_id: state.dataset_id.clone()?,
                config: state.configuration.config().clone(),
            }
        };

        match self.backend.export(request).await {
            Ok(url) => {
                info!(url = %url, "Export ready");
                self.notices.emit_lossy(Notice::success("Export succeeded"));
                Some(url)
            }
            Err(e) => {
                warn!(error = %e, "Export failed");
                self.notices.emit_lossy(Notice::error(e.user_message("Export failed")));
                None
            }
        }
    }

    // ---------------------------------------------------------------------
    // Assistant
    // ---------------------------------------------------------------------

    pub fn is_suggesting(&self) -> bool {
        self.assistant.is_suggesting()
    }

    pub fn is_interpreting(&self) -> bool {
        self.assistant.is_interpreting()
    }

    pub fn suggested_features(&self) -> Vec<String> {
        self.read().suggested_features.clone()
    }

    /// Ask the assistant for roles and apply them to the configuration
    pub async fn auto_suggest_roles(&self) -> bool {
        let (model_type, variables, epoch) = {
            let mut state = self.write();
            if state.dataset_id.is_none() {
                return false;
            }
            state.suggested_features.clear();
            let variables = state
                .metadata
                .as_ref()
                .map(|m| m.variables.clone())
                .unwrap_or_default();
            (state.configuration.model_type(), variables, state.epochs())
        };

        let rec = match self.assistant.suggest_roles(model_type, variables).await {
            AssistOutcome::Busy => return false,
            AssistOutcome::Done(rec) => rec,
            AssistOutcome::Failed(e) => {
                self.notices
                    .emit_lossy(Notice::error(e.user_message("AI suggestion failed")));
                return false;
            }
        };

        let features = {
            let mut state = self.write();
            if state.epochs() != epoch {
                warn!("Discarding role suggestion: dataset or model type changed");
                return false;
            }
            state.suggested_features = rec.features.clone();
            state.configuration.apply_suggestion(&rec)
        };
        self.guard.on_features_changed(&features);

        self.notices.emit_lossy(Notice::success("AI suggestion applied"));
        if let Some(reason) = rec.reason.filter(|r| !r.trim().is_empty()) {
            self.notices.emit_lossy(
                Notice::info(reason)
                    .with_duration(self.settings.info_duration)
                    .dismissible(),
            );
        }
        true
    }

    /// Attach an AI interpretation to the held result
    pub async fn run_ai_interpretation(&self) -> bool {
        let snapshot = {
            let state = self.read();
            state.result.clone().map(|held| {
                (state.configuration.model_type(), held, state.result_epoch)
            })
        };
        let Some((model_type, held, epoch)) = snapshot else {
            self.notices
                .emit_lossy(Notice::warning("Run the model first to generate results"));
            return false;
        };

        let text = match self.assistant.interpret(model_type, &held).await {
            AssistOutcome::Busy => return false,
            AssistOutcome::Done(text) => text,
            AssistOutcome::Failed(e) => {
                self.notices
                    .emit_lossy(Notice::error(e.user_message("AI interpretation failed")));
                return false;
            }
        };

        {
            let mut state = self.write();
            if state.result_epoch != epoch {
                debug!("Discarding interpretation for a replaced result");
                return false;
            }
            if let Some(held) = state.result.as_mut() {
                held.interpretation = Some(Interpretation {
                    text,
                    is_ai: true,
                    level: "info".to_string(),
                });
            }
        }
        self.notices.emit_lossy(Notice::success("AI interpretation completed"));
        true
    }
}

impl Drop for ModelingSession {
    fn drop(&mut self) {
        self.guard.cancel_pending();
    }
}
