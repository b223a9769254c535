//! "Methods" paragraph for publications, generated from the configuration

use crate::configuration::{ModelConfig, ModelType};

pub const SOFTWARE_LINE: &str =
    "All analyses were performed using the Insight Statistical Platform (v1.0).";

fn family_text(model_type: ModelType) -> &'static str {
    match model_type {
        ModelType::Logistic => "Multivariate logistic regression analysis",
        ModelType::Linear => "Multivariate linear regression analysis",
        ModelType::Cox => "Multivariate Cox proportional hazards regression analysis",
        ModelType::RandomForest => "Random Forest machine learning model",
        ModelType::Xgboost => "XGBoost (Extreme Gradient Boosting) model",
    }
}

fn effect_text(model_type: ModelType) -> Option<&'static str> {
    match model_type {
        ModelType::Logistic => Some(
            "Results were expressed as Odds Ratios (OR) with 95% confidence intervals (95% CI).",
        ),
        ModelType::Cox => Some(
            "Results were expressed as Hazard Ratios (HR) with 95% confidence intervals (95% CI).",
        ),
        ModelType::Linear => {
            Some("Coefficients (Coef) with 95% confidence intervals were calculated.")
        }
        ModelType::RandomForest | ModelType::Xgboost => None,
    }
}

pub fn generate(config: &ModelConfig) -> String {
    let mut sentences: Vec<String> = vec![format!(
        "{} was performed to identify factors associated with the outcome.",
        family_text(config.model_type)
    )];

    if let Some(text) = effect_text(config.model_type) {
        sentences.push(text.to_string());
    }

    sentences.push("A two-sided P-value < 0.05 was considered statistically significant.".to_string());
    sentences.push(SOFTWARE_LINE.to_string());

    if !config.ref_levels.is_empty() {
        let refs: Vec<String> = config
            .ref_levels
            .iter()
            .map(|(variable, level)| format!("{} for {}", level, variable))
            .collect();
        sentences.push(format!(
            "Reference groups for categorical variables were set as follows: {}.",
            refs.join(", ")
        ));
    }

    sentences.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logistic_with_reference_groups() {
        let mut config = ModelConfig::default();
        config.ref_levels.insert("Sex".into(), "Female".into());
        config.ref_levels.insert("Stage".into(), "I".into());

        let text = generate(&config);
        assert!(text.starts_with("Multivariate logistic regression analysis was performed"));
        assert!(text.contains("Odds Ratios (OR)"));
        assert!(text.ends_with(
            "Reference groups for categorical variables were set as follows: Female for Sex, I for Stage."
        ));
    }

    #[test]
    fn test_tree_model_has_no_effect_sentence() {
        let config = ModelConfig {
            model_type: ModelType::Xgboost,
            ..Default::default()
        };
        let text = generate(&config);
        assert!(!text.contains("95%"));
        assert!(text.ends_with(SOFTWARE_LINE));
    }
}
