//! Fit result model
//!
//! The backend result is treated as mostly opaque: the recognized parts are
//! typed, everything else is kept in flattened `extra` maps so nothing is
//! lost when a result is saved, snapshotted or re-serialized.
//!
//! Numeric fields are coerced leniently. The statistical service emits
//! numbers, numeric strings, `"Inf"` and error markers such as `"Error"`
//! interchangeably; anything that does not read as a number becomes absent.

use crate::configuration::ModelType;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Read a JSON value as a finite-or-infinite number. NaN and non-numeric → `None`.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| !v.is_nan())
}

/// Serde helpers for leniently typed numeric fields
pub(crate) mod lenient {
    use super::coerce_f64;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(coerce_f64))
    }

    /// Non-numeric entries become NaN so series keep their length
    pub fn vec_f64<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
        Ok(raw
            .unwrap_or_default()
            .iter()
            .map(|v| coerce_f64(v).unwrap_or(f64::NAN))
            .collect())
    }

    /// Outcome labels: anything numerically equal to 1 (or `true`) is an event
    pub fn labels<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
        Ok(raw
            .unwrap_or_default()
            .iter()
            .map(|v| match v {
                Value::Bool(b) => u8::from(*b),
                other => u8::from(coerce_f64(other) == Some(1.0)),
            })
            .collect())
    }
}

/// Embedded status of a structurally successful response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[serde(alias = "error")]
    Failed,
    /// Anything other than an explicit failure counts as success
    #[default]
    #[serde(other)]
    Success,
}

/// One row of the coefficient table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub variable: String,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub p_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub coef: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub or: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub hr: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub vif: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    #[serde(default, deserialize_with = "lenient::vec_f64")]
    pub fpr: Vec<f64>,
    #[serde(default, deserialize_with = "lenient::vec_f64")]
    pub tpr: Vec<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub auc: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DcaCurve {
    #[serde(default, deserialize_with = "lenient::vec_f64")]
    pub thresholds: Vec<f64>,
    #[serde(default, alias = "net_benefit", deserialize_with = "lenient::vec_f64")]
    pub net_benefit_model: Vec<f64>,
    #[serde(default, deserialize_with = "lenient::vec_f64")]
    pub net_benefit_all: Vec<f64>,
    #[serde(default, deserialize_with = "lenient::vec_f64")]
    pub net_benefit_none: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    #[serde(default, deserialize_with = "lenient::vec_f64")]
    pub prob_pred: Vec<f64>,
    #[serde(default, deserialize_with = "lenient::vec_f64")]
    pub prob_true: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VifPlot {
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default, deserialize_with = "lenient::vec_f64")]
    pub vif_values: Vec<f64>,
}

/// Evaluation plots of non-survival families
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roc: Option<RocCurve>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dca: Option<DcaCurve>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationCurve>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vif: Option<VifPlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nomogram: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Observed outcomes and predicted risks at one horizon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    #[serde(default, deserialize_with = "lenient::labels")]
    pub y_true: Vec<u8>,
    #[serde(default, deserialize_with = "lenient::vec_f64")]
    pub y_pred: Vec<f64>,
}

/// Per-horizon evaluation bundle of survival families
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalEval {
    #[serde(default)]
    pub roc: BTreeMap<String, RocCurve>,
    #[serde(default)]
    pub dca: BTreeMap<String, DcaCurve>,
    #[serde(default)]
    pub calibration: BTreeMap<String, CalibrationCurve>,
    #[serde(default)]
    pub extended_metrics: BTreeMap<String, Value>,
    #[serde(default)]
    pub predictions: BTreeMap<String, Predictions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nomogram: Option<Value>,
}

/// Plain-language reading of a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub text: String,
    #[serde(default)]
    pub is_ai: bool,
    #[serde(default = "default_interpretation_level")]
    pub level: String,
}

fn default_interpretation_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    #[serde(alias = "variable")]
    pub feature: String,
    #[serde(default, deserialize_with = "lenient_importance")]
    pub importance: f64,
}

fn lenient_importance<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::opt_f64(deserializer)?.unwrap_or(0.0))
}

/// A model fit as returned by the run operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub summary: Vec<SummaryRow>,
    #[serde(default)]
    pub metrics: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plots: Option<Plots>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_eval: Option<ClinicalEval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<Interpretation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<Vec<FeatureImportance>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methodology: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelResult {
    pub fn is_failed(&self) -> bool {
        self.status == RunStatus::Failed
    }

    /// Numeric metric value, `None` if missing or non-numeric
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(coerce_f64)
    }
}

/// A follow-up time point key of `clinical_eval`
///
/// Keys are kept verbatim (`"12"`, `"36.0"`); ordering and matching use the
/// numeric value where the key parses as a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Horizon(String);

impl Horizon {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn value(&self) -> Option<f64> {
        self.0.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Same key, or numerically equal keys (`"12"` matches `"12.0"`)
    pub fn matches(&self, key: &str) -> bool {
        if self.0 == key {
            return true;
        }
        match (self.value(), Horizon::new(key).value()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Look this horizon up in a horizon-keyed map
    pub fn lookup<'a, T>(&self, map: &'a BTreeMap<String, T>) -> Option<&'a T> {
        map.get(&self.0)
            .or_else(|| map.iter().find(|(k, _)| self.matches(k)).map(|(_, v)| v))
    }

    fn numeric_cmp(&self, other: &Horizon) -> Ordering {
        match (self.value(), other.value()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Horizon {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<u32> for Horizon {
    fn from(t: u32) -> Self {
        Self::new(t.to_string())
    }
}

/// Sort horizon keys by numeric value (non-numeric keys last)
pub fn sort_horizons<'a>(keys: impl IntoIterator<Item = &'a String>) -> Vec<Horizon> {
    let mut horizons: Vec<Horizon> = keys.into_iter().map(|k| Horizon::new(k.as_str())).collect();
    horizons.sort_by(Horizon::numeric_cmp);
    horizons
}

/// Horizons present in the survival evaluation bundle, smallest first
pub fn available_horizons(result: &ModelResult) -> Vec<Horizon> {
    result
        .clinical_eval
        .as_ref()
        .map(|ce| sort_horizons(ce.dca.keys()))
        .unwrap_or_default()
}

/// Extended metrics (sensitivity, specificity, ...) at the selected horizon
pub fn current_extended_metrics<'a>(
    result: &'a ModelResult,
    horizon: Option<&Horizon>,
) -> Option<&'a Value> {
    let horizon = horizon?;
    horizon.lookup(&result.clinical_eval.as_ref()?.extended_metrics)
}

/// Nomogram payload for families that produce one
pub fn nomogram(result: &ModelResult, model_type: ModelType) -> Option<&Value> {
    match model_type {
        ModelType::Logistic => result.plots.as_ref()?.nomogram.as_ref(),
        ModelType::Cox => result.clinical_eval.as_ref()?.nomogram.as_ref(),
        _ => None,
    }
}

/// Headline finding: the strongest significant predictor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopResult {
    pub variable: String,
    pub p_value: f64,
    pub effect_size: Option<f64>,
    pub description: String,
}

pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Among rows with p < 0.05: max OR (logistic), max HR (cox), max |coef| otherwise.
///
/// Ties keep the earliest row.
pub fn top_result(result: &ModelResult, model_type: ModelType) -> Option<TopResult> {
    let effect = |row: &SummaryRow| -> Option<f64> {
        match model_type {
            ModelType::Logistic => row.or,
            ModelType::Cox => row.hr,
            _ => row.coef,
        }
    };
    let rank = |row: &SummaryRow| -> f64 {
        let value = match model_type {
            ModelType::Logistic | ModelType::Cox => effect(row),
            _ => effect(row).map(f64::abs),
        };
        value.unwrap_or(f64::NEG_INFINITY)
    };

    let mut best: Option<(&SummaryRow, f64)> = None;
    for row in &result.summary {
        let Some(p) = row.p_value else { continue };
        if p >= SIGNIFICANCE_LEVEL {
            continue;
        }
        match best {
            Some((_, score)) if rank(row) <= score => {}
            _ => best = Some((row, rank(row))),
        }
    }

    best.and_then(|(row, _)| {
        Some(TopResult {
            variable: row.variable.clone(),
            p_value: row.p_value?,
            effect_size: effect(row),
            description: format!(
                "Variable **{}** has the most significant influence on the outcome.",
                row.variable
            ),
        })
    })
}

/// Largest feature importance, used to scale importance bars. 1.0 when absent.
pub fn max_importance(result: &ModelResult) -> f64 {
    result
        .importance
        .as_ref()
        .filter(|items| !items.is_empty())
        .map(|items| {
            items
                .iter()
                .map(|i| i.importance)
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .unwrap_or(1.0)
}
