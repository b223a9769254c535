//! Wire types of the modeling service operations

use crate::catalog::{HealthItem, VariableMeta};
use crate::configuration::{ModelConfig, ModelType, Recommendation, Target};
use crate::result::{lenient, ModelResult, SummaryRow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Project or dataset identifier (numeric or string, as the backend issued it)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{}", id),
            EntityId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Int(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        // Numeric strings are sent as numbers, matching what the service issued
        id.parse::<i64>()
            .map(EntityId::Int)
            .unwrap_or_else(|_| EntityId::Text(id.to_string()))
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId::from(id.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestRolesRequest {
    pub model_type: ModelType,
    pub variables: Vec<VariableMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestRolesResponse {
    pub recommendation: Recommendation,
}

/// Stepwise selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionParams {
    pub method: String,
    pub direction: String,
    pub criterion: String,
}

impl Default for SelectionParams {
    fn default() -> Self {
        Self {
            method: "stepwise".to_string(),
            direction: "both".to_string(),
            criterion: "aic".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionOptions {
    pub direction: String,
    pub criterion: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectVariablesRequest {
    pub dataset_id: EntityId,
    pub model_type: ModelType,
    pub target: Target,
    pub features: Vec<String>,
    pub method: String,
    pub params: SelectionOptions,
}

impl SelectVariablesRequest {
    pub fn new(dataset_id: EntityId, config: &ModelConfig, params: &SelectionParams) -> Self {
        Self {
            dataset_id,
            model_type: config.model_type,
            target: config.target.clone(),
            features: config.features.clone(),
            method: params.method.clone(),
            params: SelectionOptions {
                direction: params.direction.clone(),
                criterion: params.criterion.clone(),
            },
        }
    }
}

/// Selected features plus whatever diagnostics the method reports (step log, criteria, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionOutcome {
    #[serde(default)]
    pub selected_features: Vec<String>,
    #[serde(flatten)]
    pub diagnostics: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollinearityRequest {
    pub dataset_id: EntityId,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollinearityFinding {
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub vif: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollinearityResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub report: Vec<CollinearityFinding>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthRequest {
    pub dataset_id: EntityId,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub report: Vec<HealthItem>,
}

/// Body of both the run and export operations
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest {
    pub project_id: EntityId,
    pub dataset_id: EntityId,
    #[serde(flatten)]
    pub config: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunResponse {
    pub results: ModelResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportResponse {
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterpretRequest {
    pub model_type: ModelType,
    pub summary: Vec<SummaryRow>,
    pub metrics: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterpretResponse {
    pub interpretation: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_request_flattens_config() {
        let request = RunRequest {
            project_id: EntityId::from("7"),
            dataset_id: EntityId::from("ds-a"),
            config: ModelConfig {
                target: Target::Scalar("Y".into()),
                features: vec!["Age".into()],
                ..Default::default()
            },
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["project_id"], json!(7));
        assert_eq!(body["dataset_id"], json!("ds-a"));
        assert_eq!(body["model_type"], json!("logistic"));
        assert_eq!(body["target"], json!("Y"));
        assert_eq!(body["model_params"]["n_estimators"], json!(100));
        assert_eq!(body["model_params"]["max_depth"], Value::Null);
    }

    #[test]
    fn test_select_request_shape() {
        let config = ModelConfig {
            model_type: ModelType::Cox,
            target: Target::TimeEvent {
                time: Some("T".into()),
                event: Some("E".into()),
            },
            ..Default::default()
        };
        let body = serde_json::to_value(SelectVariablesRequest::new(
            EntityId::Int(3),
            &config,
            &SelectionParams::default(),
        ))
        .unwrap();
        assert_eq!(body["method"], json!("stepwise"));
        assert_eq!(body["params"], json!({"direction": "both", "criterion": "aic"}));
        assert_eq!(body["target"], json!({"time": "T", "event": "E"}));
    }

    #[test]
    fn test_selection_outcome_keeps_diagnostics() {
        let outcome: SelectionOutcome =
            serde_json::from_value(json!({"selected_features": ["A"], "steps": [1, 2]})).unwrap();
        assert_eq!(outcome.selected_features, vec!["A"]);
        assert_eq!(outcome.diagnostics["steps"], json!([1, 2]));
    }
}
