//! Variable catalog
//!
//! Normalizes dataset variable metadata plus optional per-variable health
//! annotations into the uniform option list every picker is built from.
//! Projection is pure: same metadata + health map, same options, same order.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Storage/statistical type of a dataset variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Continuous,
    Float,
    Int,
    Categorical,
    Category,
    String,
    Boolean,
    Binary,
}

impl VariableType {
    /// Usable as a continuous outcome (linear regression target)
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            VariableType::Continuous | VariableType::Float | VariableType::Int
        )
    }

    pub fn is_categorical(self) -> bool {
        matches!(
            self,
            VariableType::Categorical
                | VariableType::Category
                | VariableType::String
                | VariableType::Boolean
        )
    }
}

/// One variable as described by dataset metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    /// Category labels (categorical variables only)
    #[serde(
        default,
        deserialize_with = "deserialize_labels",
        skip_serializing_if = "Option::is_none"
    )]
    pub categories: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl VariableMeta {
    pub fn new(name: impl Into<String>, var_type: VariableType) -> Self {
        Self {
            name: name.into(),
            var_type,
            categories: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }
}

/// Category lists arrive as strings, numbers or booleans depending on the column
fn deserialize_labels<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(raw.map(|values| {
        values
            .into_iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect()
    }))
}

/// Dataset metadata as delivered by the data service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    #[serde(default)]
    pub variables: Vec<VariableMeta>,
}

impl DatasetMetadata {
    pub fn new(variables: Vec<VariableMeta>) -> Self {
        Self { variables }
    }

    pub fn variable(&self, name: &str) -> Option<&VariableMeta> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }
}

/// Data-quality verdict for a variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[serde(alias = "ok", alias = "good")]
    Healthy,
    Warning,
    #[serde(alias = "danger", alias = "bad")]
    Error,
    /// Not reported, or a status this client does not know
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthEntry {
    #[serde(default)]
    pub status: HealthStatus,
    #[serde(default)]
    pub message: String,
}

/// Row of the check-health response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthItem {
    pub variable: String,
    #[serde(default)]
    pub status: HealthStatus,
    #[serde(default)]
    pub message: String,
}

/// Variable name → health annotation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthReport(HashMap<String, HealthEntry>);

impl HealthReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = HealthItem>) -> Self {
        Self(
            items
                .into_iter()
                .map(|item| {
                    (
                        item.variable,
                        HealthEntry {
                            status: item.status,
                            message: item.message,
                        },
                    )
                })
                .collect(),
        )
    }

    pub fn insert(&mut self, variable: impl Into<String>, entry: HealthEntry) {
        self.0.insert(variable.into(), entry);
    }

    pub fn get(&self, variable: &str) -> Option<&HealthEntry> {
        self.0.get(variable)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A pickable variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableOption {
    pub label: String,
    pub value: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    pub status: HealthStatus,
    pub message: String,
    /// Set by role-specific derivations; always false in the raw catalog
    #[serde(default)]
    pub disabled: bool,
}

impl VariableOption {
    pub(crate) fn disabled_if(&self, disabled: bool) -> Self {
        Self {
            disabled,
            ..self.clone()
        }
    }
}

/// Project metadata (and optional health map) into options, preserving metadata order.
pub fn project(
    metadata: Option<&DatasetMetadata>,
    health: Option<&HealthReport>,
) -> Vec<VariableOption> {
    let Some(metadata) = metadata else {
        return Vec::new();
    };

    metadata
        .variables
        .iter()
        .map(|v| {
            let entry = health.and_then(|h| h.get(&v.name));
            VariableOption {
                label: v.name.clone(),
                value: v.name.clone(),
                var_type: v.var_type,
                status: entry.map(|e| e.status).unwrap_or_default(),
                message: entry.map(|e| e.message.clone()).unwrap_or_default(),
                disabled: false,
            }
        })
        .collect()
}

/// Continuous/float/int options
pub fn numeric_options(options: &[VariableOption]) -> Vec<VariableOption> {
    options
        .iter()
        .filter(|o| o.var_type.is_numeric())
        .cloned()
        .collect()
}

/// Categorical/category/string/boolean options
pub fn categorical_options(options: &[VariableOption]) -> Vec<VariableOption> {
    options
        .iter()
        .filter(|o| o.var_type.is_categorical())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> DatasetMetadata {
        DatasetMetadata::new(vec![
            VariableMeta::new("Y", VariableType::Binary),
            VariableMeta::new("Age", VariableType::Continuous),
            VariableMeta::new("Sex", VariableType::Categorical).with_categories(["M", "F"]),
        ])
    }

    #[test]
    fn test_absent_metadata_projects_to_empty() {
        assert!(project(None, None).is_empty());
    }

    #[test]
    fn test_projection_preserves_order_and_defaults_health() {
        let options = project(Some(&metadata()), None);
        let names: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(names, vec!["Y", "Age", "Sex"]);
        assert!(options
            .iter()
            .all(|o| o.status == HealthStatus::Unknown && o.message.is_empty() && !o.disabled));
    }

    #[test]
    fn test_health_entries_are_attached() {
        let health = HealthReport::from_items(vec![HealthItem {
            variable: "Age".into(),
            status: HealthStatus::Warning,
            message: "12% missing".into(),
        }]);
        let options = project(Some(&metadata()), Some(&health));
        assert_eq!(options[1].status, HealthStatus::Warning);
        assert_eq!(options[1].message, "12% missing");
        assert_eq!(options[0].status, HealthStatus::Unknown);
    }

    #[test]
    fn test_type_filters() {
        let options = project(Some(&metadata()), None);
        let numeric: Vec<_> = numeric_options(&options).into_iter().map(|o| o.value).collect();
        let categorical: Vec<_> = categorical_options(&options)
            .into_iter()
            .map(|o| o.value)
            .collect();
        assert_eq!(numeric, vec!["Age"]);
        assert_eq!(categorical, vec!["Sex"]);
    }

    #[test]
    fn test_metadata_deserializes_mixed_categories() {
        let meta: DatasetMetadata = serde_json::from_str(
            r#"{"variables":[{"name":"Stage","type":"category","categories":[1,2,"3a"]},
                             {"name":"BMI","type":"float","missing":3}]}"#,
        )
        .unwrap();
        assert_eq!(
            meta.variables[0].categories.as_deref(),
            Some(&["1".to_string(), "2".to_string(), "3a".to_string()][..])
        );
        assert_eq!(meta.variables[1].extra.get("missing"), Some(&Value::from(3)));
    }

    #[test]
    fn test_unknown_health_status_is_tolerated() {
        let item: HealthItem =
            serde_json::from_str(r#"{"variable":"X","status":"mystery"}"#).unwrap();
        assert_eq!(item.status, HealthStatus::Unknown);

        let statuses: Vec<HealthStatus> =
            serde_json::from_str(r#"["ok","danger","warning","unknown"]"#).unwrap();
        assert_eq!(
            statuses,
            vec![
                HealthStatus::Healthy,
                HealthStatus::Error,
                HealthStatus::Warning,
                HealthStatus::Unknown
            ]
        );
    }
}
