//! Model-vs-model comparison
//!
//! A [`Baseline`] is an owned deep copy of a result. Every container in
//! [`ModelResult`] is owned (`Vec`, maps, `Value`), so `Clone` shares nothing
//! with the live result.

use crate::reclassification::{self, Reclassification};
use crate::result::{Horizon, ModelResult};
use serde::Serialize;
use tracing::debug;

/// Frozen copy of a prior result
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline(ModelResult);

impl Baseline {
    pub fn result(&self) -> &ModelResult {
        &self.0
    }
}

/// Take an independent snapshot of `result`
pub fn snapshot(result: &ModelResult) -> Baseline {
    Baseline(result.clone())
}

/// One metric on both sides
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricDelta {
    pub first: f64,
    pub second: f64,
    /// `second - first`
    pub diff: f64,
}

impl MetricDelta {
    fn between(first: &ModelResult, second: &ModelResult, key: &str) -> Self {
        let first = first.metric(key).unwrap_or(0.0);
        let second = second.metric(key).unwrap_or(0.0);
        Self {
            first,
            second,
            diff: second - first,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BasicMetrics {
    pub c_index: MetricDelta,
    pub aic: MetricDelta,
    pub bic: MetricDelta,
    pub log_likelihood: MetricDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReclassificationSummary {
    pub horizon: Horizon,
    pub nri: f64,
    pub idi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub first_name: String,
    pub second_name: String,
    pub basic: BasicMetrics,
    /// Present only when both sides carry same-length predictions at the horizon
    pub reclassification: Option<ReclassificationSummary>,
}

/// Compare the baseline (first) against `current` (second)
pub fn compare(
    baseline: &Baseline,
    current: &ModelResult,
    horizon: Option<&Horizon>,
) -> ComparisonReport {
    let first = baseline.result();
    let basic = BasicMetrics {
        c_index: MetricDelta::between(first, current, "c_index"),
        aic: MetricDelta::between(first, current, "aic"),
        bic: MetricDelta::between(first, current, "bic"),
        log_likelihood: MetricDelta::between(first, current, "log_likelihood"),
    };

    let reclassification = horizon.and_then(|h| {
        let old = h.lookup(&first.clinical_eval.as_ref()?.predictions)?;
        let new = h.lookup(&current.clinical_eval.as_ref()?.predictions)?;
        if old.y_true.len() != new.y_true.len() {
            debug!(
                horizon = %h,
                baseline = old.y_true.len(),
                current = new.y_true.len(),
                "Prediction lengths differ; skipping reclassification"
            );
            return None;
        }
        let Reclassification { nri, idi } =
            reclassification::calculate(&old.y_true, &old.y_pred, &new.y_pred);
        Some(ReclassificationSummary {
            horizon: h.clone(),
            nri,
            idi,
        })
    });

    ComparisonReport {
        first_name: "Model 1".to_string(),
        second_name: "Model 2".to_string(),
        basic,
        reclassification,
    }
}

/// Holds at most one baseline; never cleared implicitly
#[derive(Debug, Clone, Default)]
pub struct ComparisonEngine {
    baseline: Option<Baseline>,
}

impl ComparisonEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_baseline(&mut self, result: &ModelResult) {
        self.baseline = Some(snapshot(result));
    }

    pub fn clear_baseline(&mut self) {
        self.baseline = None;
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// `None` when no baseline is held
    pub fn compare(&self, current: &ModelResult, horizon: Option<&Horizon>) -> Option<ComparisonReport> {
        self.baseline.as_ref().map(|b| compare(b, current, horizon))
    }
}
