//! Model configuration state
//!
//! Holds the mutable model configuration and derives, on demand, which
//! variables are legal in each role. Two cross-field invariants hold after
//! every mutation:
//!
//! - `target` is [`Target::TimeEvent`] iff the family is [`ModelType::Cox`]
//! - no variable appears both in `features` and in any part of `target`
//!
//! Nothing here fails: an invalid request is corrected or ignored and logged.

use crate::catalog::{DatasetMetadata, VariableMeta, VariableOption, VariableType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Model family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Linear,
    #[default]
    Logistic,
    Cox,
    RandomForest,
    Xgboost,
}

impl ModelType {
    pub const ALL: [ModelType; 5] = [
        ModelType::Linear,
        ModelType::Logistic,
        ModelType::Cox,
        ModelType::RandomForest,
        ModelType::Xgboost,
    ];

    /// Time-to-event family (paired target, per-horizon evaluation)
    pub fn is_survival(self) -> bool {
        self == ModelType::Cox
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::Linear => "linear",
            ModelType::Logistic => "logistic",
            ModelType::Cox => "cox",
            ModelType::RandomForest => "random_forest",
            ModelType::Xgboost => "xgboost",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown model type '{}'", s))
    }
}

/// Outcome roles
///
/// Serializes to `null`, `"name"` or `{"time": .., "event": ..}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    #[default]
    Unset,
    Scalar(String),
    TimeEvent {
        time: Option<String>,
        event: Option<String>,
    },
}

impl Target {
    /// Every variable name the target consumes
    pub fn names(&self) -> Vec<&str> {
        match self {
            Target::Unset => Vec::new(),
            Target::Scalar(name) => vec![name.as_str()],
            Target::TimeEvent { time, event } => {
                time.iter().chain(event.iter()).map(String::as_str).collect()
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().contains(&name)
    }

    pub fn is_time_event(&self) -> bool {
        matches!(self, Target::TimeEvent { .. })
    }
}

/// Tree-ensemble hyperparameters (ignored by regression families)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub n_estimators: u32,
    pub max_depth: Option<u32>,
    pub learning_rate: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            learning_rate: 0.1,
        }
    }
}

/// The model configuration sent to the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_type: ModelType,
    #[serde(default)]
    pub target: Target,
    #[serde(default)]
    pub features: Vec<String>,
    /// Categorical feature → baseline category label
    #[serde(default)]
    pub ref_levels: BTreeMap<String, String>,
    #[serde(default)]
    pub model_params: ModelParams,
}

/// External role suggestion (AI assistant or heuristics)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Last cox-specific selection, kept while another family is active
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CoxSelection {
    time: Option<String>,
    event: Option<String>,
}

/// Mutable model configuration plus derived option lists
#[derive(Debug, Clone, Default)]
pub struct ConfigurationState {
    config: ModelConfig,
    cox: CoxSelection,
}

impl ConfigurationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt an existing configuration, repairing invariants if needed
    pub fn from_config(config: ModelConfig) -> Self {
        let mut state = Self::default();
        let features = config.features.clone();
        state.config.model_type = config.model_type;
        state.config.ref_levels = config.ref_levels;
        state.config.model_params = config.model_params;
        match (config.model_type.is_survival(), config.target) {
            (true, Target::TimeEvent { time, event }) => {
                state.cox = CoxSelection { time, event };
                state.sync_cox_target();
            }
            (true, _) => state.sync_cox_target(),
            (false, Target::Scalar(name)) => state.config.target = Target::Scalar(name),
            (false, _) => {}
        }
        state.set_features(features);
        state
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn model_type(&self) -> ModelType {
        self.config.model_type
    }

    pub fn target(&self) -> &Target {
        &self.config.target
    }

    pub fn features(&self) -> &[String] {
        &self.config.features
    }

    /// Switch family, converting the target shape.
    ///
    /// Returns `false` (and changes nothing) if `model_type` is already active.
    /// Callers must drop any held result when this returns `true`.
    pub fn set_model_type(&mut self, model_type: ModelType) -> bool {
        let previous = self.config.model_type;
        if previous == model_type {
            return false;
        }
        self.config.model_type = model_type;

        if model_type.is_survival() {
            // Cached names may have become features while another family was active
            let features = &self.config.features;
            if self.cox.time.as_ref().is_some_and(|t| features.contains(t)) {
                self.cox.time = None;
            }
            if self.cox.event.as_ref().is_some_and(|e| features.contains(e)) {
                self.cox.event = None;
            }
            self.sync_cox_target();
        } else if self.config.target.is_time_event() {
            self.config.target = Target::Unset;
        }

        debug!(from = %previous, to = %model_type, "Model type changed");
        true
    }

    /// Set the scalar outcome (non-survival families).
    ///
    /// Rejected when the family is cox or the variable is already a feature.
    pub fn set_target(&mut self, target: Option<String>) -> bool {
        if self.config.model_type.is_survival() {
            warn!("Scalar target ignored for survival model; set time/event instead");
            return false;
        }
        match target {
            None => self.config.target = Target::Unset,
            Some(name) => {
                if self.config.features.contains(&name) {
                    warn!(variable = %name, "Target rejected: variable is already a feature");
                    return false;
                }
                self.config.target = Target::Scalar(name);
            }
        }
        true
    }

    /// Set the survival time variable (cox only)
    pub fn set_time_variable(&mut self, time: Option<String>) -> bool {
        if !self.config.model_type.is_survival() {
            warn!("Time variable ignored for non-survival model");
            return false;
        }
        if let Some(name) = &time {
            if self.config.features.contains(name) || self.cox.event.as_ref() == Some(name) {
                warn!(variable = %name, "Time variable rejected: already in use");
                return false;
            }
        }
        self.cox.time = time;
        self.sync_cox_target();
        true
    }

    /// Set the survival event indicator (cox only)
    pub fn set_event_variable(&mut self, event: Option<String>) -> bool {
        if !self.config.model_type.is_survival() {
            warn!("Event variable ignored for non-survival model");
            return false;
        }
        if let Some(name) = &event {
            if self.config.features.contains(name) || self.cox.time.as_ref() == Some(name) {
                warn!(variable = %name, "Event variable rejected: already in use");
                return false;
            }
        }
        self.cox.event = event;
        self.sync_cox_target();
        true
    }

    /// Replace the feature set.
    ///
    /// Duplicates are collapsed (first occurrence wins) and names consumed by
    /// the target are dropped. Reference levels of removed features are pruned.
    /// Returns `true` if the stored feature list changed.
    pub fn set_features(&mut self, features: Vec<String>) -> bool {
        let mut cleaned: Vec<String> = Vec::with_capacity(features.len());
        for name in features {
            if cleaned.contains(&name) {
                continue;
            }
            if self.config.target.contains(&name) {
                warn!(variable = %name, "Feature dropped: variable is the target");
                continue;
            }
            cleaned.push(name);
        }

        self.config
            .ref_levels
            .retain(|variable, _| cleaned.contains(variable));

        if cleaned == self.config.features {
            return false;
        }
        self.config.features = cleaned;
        true
    }

    pub fn add_feature(&mut self, name: impl Into<String>) -> bool {
        let mut features = self.config.features.clone();
        features.push(name.into());
        self.set_features(features)
    }

    pub fn remove_feature(&mut self, name: &str) -> bool {
        let features = self
            .config
            .features
            .iter()
            .filter(|f| f.as_str() != name)
            .cloned()
            .collect();
        self.set_features(features)
    }

    /// Set the baseline category of a selected feature
    pub fn set_ref_level(&mut self, variable: impl Into<String>, level: impl Into<String>) -> bool {
        let variable = variable.into();
        if !self.config.features.contains(&variable) {
            warn!(variable = %variable, "Reference level ignored: variable is not a feature");
            return false;
        }
        self.config.ref_levels.insert(variable, level.into());
        true
    }

    pub fn clear_ref_level(&mut self, variable: &str) -> bool {
        self.config.ref_levels.remove(variable).is_some()
    }

    pub fn set_model_params(&mut self, params: ModelParams) {
        self.config.model_params = params;
    }

    /// Bulk-assign roles from a suggestion.
    ///
    /// Feature membership wins: a suggested target part that also appears in
    /// the suggested features is dropped from the target.
    /// Returns the features actually applied.
    pub fn apply_suggestion(&mut self, rec: &Recommendation) -> Vec<String> {
        let mut features: Vec<String> = Vec::with_capacity(rec.features.len());
        for name in &rec.features {
            if !features.contains(name) {
                features.push(name.clone());
            }
        }

        let keep = |role: &str, name: &Option<String>| -> Option<String> {
            match name {
                Some(n) if features.contains(n) => {
                    warn!(
                        role,
                        variable = %n,
                        "Correctable suggestion: target variable also suggested as feature, dropping it from the target"
                    );
                    None
                }
                other => other.clone(),
            }
        };

        if self.config.model_type.is_survival() {
            let time = keep("time", &rec.time);
            let mut event = keep("event", &rec.event);
            if event.is_some() && event == time {
                warn!("Correctable suggestion: time and event name the same variable");
                event = None;
            }
            self.cox = CoxSelection { time, event };
            self.sync_cox_target();
        } else {
            self.config.target = match keep("target", &rec.target) {
                Some(name) => Target::Scalar(name),
                None => Target::Unset,
            };
        }

        self.config.features.clear();
        self.set_features(features);
        self.config.features.clone()
    }

    /// Outcome fully specified (cox needs both time and event)
    pub fn is_target_set(&self) -> bool {
        match &self.config.target {
            Target::Unset => false,
            Target::Scalar(name) => !name.is_empty(),
            Target::TimeEvent { time, event } => time.is_some() && event.is_some(),
        }
    }

    pub fn target_options(&self, catalog: &[VariableOption]) -> Vec<VariableOption> {
        derive_target_options(&self.config, catalog)
    }

    pub fn feature_options(&self, catalog: &[VariableOption]) -> Vec<VariableOption> {
        derive_feature_options(&self.config, catalog)
    }

    pub fn time_options(&self, catalog: &[VariableOption]) -> Vec<VariableOption> {
        derive_time_options(&self.config, catalog)
    }

    pub fn event_options(&self, catalog: &[VariableOption]) -> Vec<VariableOption> {
        derive_event_options(&self.config, catalog)
    }

    /// Selected categorical features that have categories to pick a reference from
    pub fn selected_categorical_vars<'a>(
        &self,
        metadata: &'a DatasetMetadata,
    ) -> Vec<&'a VariableMeta> {
        metadata
            .variables
            .iter()
            .filter(|v| {
                self.config.features.contains(&v.name)
                    && v.var_type == VariableType::Categorical
                    && v.categories.as_ref().is_some_and(|c| !c.is_empty())
            })
            .collect()
    }

    fn sync_cox_target(&mut self) {
        self.config.target = Target::TimeEvent {
            time: self.cox.time.clone(),
            event: self.cox.event.clone(),
        };
    }
}

/// Target picker: features are disabled; linear also disables non-numeric variables.
pub fn derive_target_options(config: &ModelConfig, catalog: &[VariableOption]) -> Vec<VariableOption> {
    catalog
        .iter()
        .map(|o| {
            let taken = config.features.contains(&o.value);
            let wrong_type = config.model_type == ModelType::Linear && !o.var_type.is_numeric();
            o.disabled_if(taken || wrong_type)
        })
        .collect()
}

/// Feature picker: whatever the target consumes is disabled.
pub fn derive_feature_options(config: &ModelConfig, catalog: &[VariableOption]) -> Vec<VariableOption> {
    catalog
        .iter()
        .map(|o| o.disabled_if(config.target.contains(&o.value)))
        .collect()
}

/// Time picker: features and the event variable are disabled.
pub fn derive_time_options(config: &ModelConfig, catalog: &[VariableOption]) -> Vec<VariableOption> {
    let event = match &config.target {
        Target::TimeEvent { event, .. } => event.as_deref(),
        _ => None,
    };
    catalog
        .iter()
        .map(|o| o.disabled_if(config.features.contains(&o.value) || event == Some(o.value.as_str())))
        .collect()
}

/// Event picker: features and the time variable are disabled.
pub fn derive_event_options(config: &ModelConfig, catalog: &[VariableOption]) -> Vec<VariableOption> {
    let time = match &config.target {
        Target::TimeEvent { time, .. } => time.as_deref(),
        _ => None,
    };
    catalog
        .iter()
        .map(|o| o.disabled_if(config.features.contains(&o.value) || time == Some(o.value.as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{project, DatasetMetadata, VariableMeta};

    fn catalog() -> Vec<VariableOption> {
        project(
            Some(&DatasetMetadata::new(vec![
                VariableMeta::new("Y", VariableType::Binary),
                VariableMeta::new("Age", VariableType::Continuous),
                VariableMeta::new("Sex", VariableType::Categorical).with_categories(["M", "F"]),
                VariableMeta::new("Time", VariableType::Int),
                VariableMeta::new("Status", VariableType::Binary),
            ])),
            None,
        )
    }

    fn disabled(options: &[VariableOption]) -> Vec<&str> {
        options
            .iter()
            .filter(|o| o.disabled)
            .map(|o| o.value.as_str())
            .collect()
    }

    fn assert_disjoint(state: &ConfigurationState) {
        for f in state.features() {
            assert!(!state.target().contains(f), "{} is both feature and target", f);
        }
    }

    #[test]
    fn test_switch_into_cox_yields_paired_target() {
        let mut state = ConfigurationState::new();
        state.set_target(Some("Y".into()));
        assert!(state.set_model_type(ModelType::Cox));
        assert_eq!(
            state.target(),
            &Target::TimeEvent {
                time: None,
                event: None
            }
        );
    }

    #[test]
    fn test_switch_out_of_cox_collapses_target_and_cache_returns() {
        let mut state = ConfigurationState::new();
        state.set_model_type(ModelType::Cox);
        state.set_time_variable(Some("Time".into()));
        state.set_event_variable(Some("Status".into()));

        state.set_model_type(ModelType::Logistic);
        assert_eq!(state.target(), &Target::Unset);

        state.set_model_type(ModelType::Cox);
        assert_eq!(
            state.target(),
            &Target::TimeEvent {
                time: Some("Time".into()),
                event: Some("Status".into())
            }
        );
        assert!(state.is_target_set());
    }

    #[test]
    fn test_every_family_switch_respects_target_shape() {
        let mut state = ConfigurationState::new();
        for from in ModelType::ALL {
            for to in ModelType::ALL {
                state.set_model_type(from);
                if !from.is_survival() {
                    state.set_target(Some("Y".into()));
                }
                state.set_model_type(to);
                assert_eq!(state.target().is_time_event(), to.is_survival(), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_scalar_target_survives_non_survival_switch() {
        let mut state = ConfigurationState::new();
        state.set_target(Some("Age".into()));
        state.set_model_type(ModelType::Linear);
        assert_eq!(state.target(), &Target::Scalar("Age".into()));
    }

    #[test]
    fn test_same_type_is_noop() {
        let mut state = ConfigurationState::new();
        assert!(!state.set_model_type(ModelType::Logistic));
    }

    #[test]
    fn test_cached_cox_names_that_became_features_are_dropped() {
        let mut state = ConfigurationState::new();
        state.set_model_type(ModelType::Cox);
        state.set_time_variable(Some("Time".into()));
        state.set_model_type(ModelType::Logistic);
        state.set_features(vec!["Time".into(), "Age".into()]);

        state.set_model_type(ModelType::Cox);
        assert_eq!(
            state.target(),
            &Target::TimeEvent {
                time: None,
                event: None
            }
        );
        assert_disjoint(&state);
    }

    #[test]
    fn test_set_features_drops_target_and_duplicates() {
        let mut state = ConfigurationState::new();
        state.set_target(Some("Y".into()));
        state.set_features(vec!["Age".into(), "Y".into(), "Age".into(), "Sex".into()]);
        assert_eq!(state.features(), &["Age".to_string(), "Sex".to_string()]);
        assert_disjoint(&state);
    }

    #[test]
    fn test_target_that_is_feature_is_rejected() {
        let mut state = ConfigurationState::new();
        state.set_features(vec!["Age".into()]);
        assert!(!state.set_target(Some("Age".into())));
        assert_eq!(state.target(), &Target::Unset);
    }

    #[test]
    fn test_time_and_event_must_differ() {
        let mut state = ConfigurationState::new();
        state.set_model_type(ModelType::Cox);
        assert!(state.set_time_variable(Some("Time".into())));
        assert!(!state.set_event_variable(Some("Time".into())));
    }

    #[test]
    fn test_ref_levels_pruned_with_features() {
        let mut state = ConfigurationState::new();
        state.set_features(vec!["Sex".into(), "Age".into()]);
        assert!(state.set_ref_level("Sex", "F"));
        assert!(!state.set_ref_level("Race", "White"));

        state.remove_feature("Sex");
        assert!(state.config().ref_levels.is_empty());
    }

    #[test]
    fn test_target_options_for_linear_require_numeric() {
        let mut state = ConfigurationState::new();
        state.set_model_type(ModelType::Linear);
        state.set_features(vec!["Age".into()]);
        let options = state.target_options(&catalog());
        assert_eq!(disabled(&options), vec!["Y", "Age", "Sex", "Status"]);
    }

    #[test]
    fn test_target_options_for_logistic_only_disable_features() {
        let mut state = ConfigurationState::new();
        state.set_features(vec!["Sex".into()]);
        assert_eq!(disabled(&state.target_options(&catalog())), vec!["Sex"]);
    }

    #[test]
    fn test_feature_options_disable_target_parts() {
        let mut state = ConfigurationState::new();
        state.set_target(Some("Y".into()));
        assert_eq!(disabled(&state.feature_options(&catalog())), vec!["Y"]);

        state.set_model_type(ModelType::Cox);
        state.set_time_variable(Some("Time".into()));
        state.set_event_variable(Some("Status".into()));
        assert_eq!(
            disabled(&state.feature_options(&catalog())),
            vec!["Time", "Status"]
        );
    }

    #[test]
    fn test_time_and_event_options() {
        let mut state = ConfigurationState::new();
        state.set_model_type(ModelType::Cox);
        state.set_features(vec!["Age".into()]);
        state.set_time_variable(Some("Time".into()));
        state.set_event_variable(Some("Status".into()));

        assert_eq!(disabled(&state.time_options(&catalog())), vec!["Age", "Status"]);
        assert_eq!(disabled(&state.event_options(&catalog())), vec!["Age", "Time"]);
    }

    #[test]
    fn test_suggestion_conflict_drops_target() {
        let mut state = ConfigurationState::new();
        let applied = state.apply_suggestion(&Recommendation {
            target: Some("Age".into()),
            features: vec!["Age".into(), "Sex".into()],
            ..Default::default()
        });
        assert_eq!(applied, vec!["Age".to_string(), "Sex".to_string()]);
        assert_eq!(state.target(), &Target::Unset);
        assert_disjoint(&state);
    }

    #[test]
    fn test_cox_suggestion_assigns_time_and_event() {
        let mut state = ConfigurationState::new();
        state.set_model_type(ModelType::Cox);
        state.apply_suggestion(&Recommendation {
            time: Some("Time".into()),
            event: Some("Status".into()),
            features: vec!["Age".into(), "Status".into()],
            ..Default::default()
        });
        assert_eq!(
            state.target(),
            &Target::TimeEvent {
                time: Some("Time".into()),
                event: None
            }
        );
        assert_disjoint(&state);
    }

    #[test]
    fn test_selected_categorical_vars() {
        let metadata = DatasetMetadata::new(vec![
            VariableMeta::new("Sex", VariableType::Categorical).with_categories(["M", "F"]),
            VariableMeta::new("Site", VariableType::Categorical),
            VariableMeta::new("Age", VariableType::Continuous),
        ]);
        let mut state = ConfigurationState::new();
        state.set_features(vec!["Sex".into(), "Site".into(), "Age".into()]);
        let names: Vec<_> = state
            .selected_categorical_vars(&metadata)
            .into_iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, vec!["Sex"]);
    }

    #[test]
    fn test_target_wire_shapes() {
        assert_eq!(serde_json::to_string(&Target::Unset).unwrap(), "null");
        assert_eq!(
            serde_json::to_string(&Target::Scalar("Y".into())).unwrap(),
            "\"Y\""
        );
        let parsed: Target = serde_json::from_str(r#"{"time":"T","event":null}"#).unwrap();
        assert_eq!(
            parsed,
            Target::TimeEvent {
                time: Some("T".into()),
                event: None
            }
        );
    }

    #[test]
    fn test_from_config_repairs_invariants() {
        let state = ConfigurationState::from_config(ModelConfig {
            model_type: ModelType::Cox,
            target: Target::Scalar("Y".into()),
            features: vec!["Age".into()],
            ..Default::default()
        });
        assert!(state.target().is_time_event());

        let state = ConfigurationState::from_config(ModelConfig {
            model_type: ModelType::Logistic,
            target: Target::Scalar("Y".into()),
            features: vec!["Y".into(), "Age".into()],
            ..Default::default()
        });
        assert_eq!(state.features(), &["Age".to_string()]);
    }
}
