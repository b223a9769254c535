//! Result projection
//!
//! Turns a fit result into the four evaluation charts. Non-survival families
//! read `plots`; cox reads the horizon-keyed `clinical_eval` bundle. A chart
//! whose source is missing comes back empty.

pub mod charts;

use crate::configuration::{ModelConfig, ModelType};
use crate::result::{
    sort_horizons, CalibrationCurve, DcaCurve, Horizon, ModelResult, RocCurve, VifPlot,
};
use charts::*;
use std::collections::BTreeMap;

pub const DEFAULT_VIF_THRESHOLD: f64 = 5.0;
const DCA_MARGIN: f64 = 0.05;

#[derive(Debug, Clone, Copy)]
pub struct ResultProjector {
    vif_threshold: f64,
}

impl Default for ResultProjector {
    fn default() -> Self {
        Self::new(DEFAULT_VIF_THRESHOLD)
    }
}

impl ResultProjector {
    pub fn new(vif_threshold: f64) -> Self {
        Self { vif_threshold }
    }

    pub fn vif_threshold(&self) -> f64 {
        self.vif_threshold
    }

    pub fn project(
        &self,
        result: &ModelResult,
        config: &ModelConfig,
        horizon: Option<&Horizon>,
    ) -> ChartSet {
        let mut charts = ChartSet {
            vif: self.vif_chart(result),
            ..Default::default()
        };

        if config.model_type == ModelType::Cox {
            let (Some(eval), Some(horizon)) = (result.clinical_eval.as_ref(), horizon) else {
                return charts;
            };
            if let Some(roc) = horizon.lookup(&eval.roc) {
                charts.roc = roc_chart(roc);
            }
            if let Some(dca) = horizon.lookup(&eval.dca) {
                charts.dca = dca_chart(dca);
            }
            charts.calibration = horizon_calibration_chart(&eval.calibration, horizon);
        } else if let Some(plots) = result.plots.as_ref() {
            if let Some(roc) = &plots.roc {
                charts.roc = roc_chart(roc);
            }
            if let Some(dca) = &plots.dca {
                charts.dca = dca_chart(dca);
            }
            if let Some(calibration) = &plots.calibration {
                charts.calibration = model_calibration_chart(calibration);
            }
        }

        charts
    }

    /// One bar per feature, over-threshold bars flagged red, dashed line at the threshold.
    ///
    /// Uses `plots.vif`, falling back to the per-row VIF of the summary table.
    pub fn vif_chart(&self, result: &ModelResult) -> ChartSeries {
        let from_summary = || {
            let (variables, vif_values) = result
                .summary
                .iter()
                .filter_map(|row| row.vif.map(|v| (row.variable.clone(), v)))
                .unzip();
            VifPlot {
                variables,
                vif_values,
            }
        };
        let vif = result
            .plots
            .as_ref()
            .and_then(|p| p.vif.clone())
            .filter(|v| !v.variables.is_empty())
            .unwrap_or_else(from_summary);

        if vif.variables.is_empty() {
            return ChartSeries::default();
        }

        let colors = vif
            .vif_values
            .iter()
            .map(|&v| {
                if v > self.vif_threshold {
                    RED.to_string()
                } else {
                    BAR_BLUE.to_string()
                }
            })
            .collect();
        let n = vif.variables.len() as f64;

        ChartSeries {
            traces: vec![Trace {
                name: None,
                x: AxisValues::Labels(vif.variables),
                y: vif.vif_values,
                kind: TraceKind::Bar,
                line: None,
                marker: Some(MarkerStyle { size: None, colors }),
                opacity: None,
            }],
            layout: Layout {
                title: Some("VIF Values".to_string()),
                shapes: vec![ReferenceLine {
                    kind: ShapeKind::Line,
                    x0: -0.5,
                    x1: n - 0.5,
                    y0: self.vif_threshold,
                    y1: self.vif_threshold,
                    line: LineStyle::dashed(RED).width(2.0),
                }],
                ..Default::default()
            },
        }
    }
}

fn roc_chart(roc: &RocCurve) -> ChartSeries {
    let name = match roc.auc {
        Some(auc) => format!("AUC = {:.3}", auc),
        None => "Model".to_string(),
    };
    ChartSeries {
        traces: vec![
            Trace::line(name, roc.fpr.clone(), roc.tpr.clone(), LineStyle::solid(BLUE)),
            Trace::diagonal("Random"),
        ],
        layout: Layout {
            xaxis: Axis::titled("False positive rate (FPR)"),
            yaxis: Axis::titled("True positive rate (TPR)"),
            ..Default::default()
        },
    }
}

fn dca_chart(dca: &DcaCurve) -> ChartSeries {
    let max_y = dca
        .net_benefit_model
        .iter()
        .chain(&dca.net_benefit_all)
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let max_y = if max_y.is_finite() { max_y } else { 0.0 };

    ChartSeries {
        traces: vec![
            Trace::line(
                "Model",
                dca.thresholds.clone(),
                dca.net_benefit_model.clone(),
                LineStyle::solid(RED).width(2.0),
            ),
            Trace::line(
                "Treat All",
                dca.thresholds.clone(),
                dca.net_benefit_all.clone(),
                LineStyle::dashed(GRAY),
            ),
            Trace::line(
                "Treat None",
                dca.thresholds.clone(),
                dca.net_benefit_none.clone(),
                LineStyle::solid(BLACK),
            ),
        ],
        layout: Layout {
            xaxis: Axis::titled("Threshold probability").range(0.0, 1.0),
            yaxis: Axis::titled("Net benefit").range(-DCA_MARGIN, max_y + DCA_MARGIN),
            ..Default::default()
        },
    }
}

fn calibration_layout() -> Layout {
    Layout {
        xaxis: Axis::titled("Predicted probability").range(0.0, 1.0),
        yaxis: Axis::titled("Observed rate").range(0.0, 1.0),
        ..Default::default()
    }
}

fn model_calibration_chart(calibration: &CalibrationCurve) -> ChartSeries {
    let mut model = Trace::line(
        "Model",
        calibration.prob_pred.clone(),
        calibration.prob_true.clone(),
        LineStyle::solid(MODEL_RED),
    );
    model.kind = TraceKind::LinesMarkers;

    ChartSeries {
        traces: vec![model, Trace::diagonal("Ideal")],
        layout: calibration_layout(),
    }
}

/// All horizons at once; the selected one drawn heavier and opaque
fn horizon_calibration_chart(
    curves: &BTreeMap<String, CalibrationCurve>,
    selected: &Horizon,
) -> ChartSeries {
    let mut traces = Vec::with_capacity(curves.len() + 1);

    for (idx, horizon) in sort_horizons(curves.keys()).iter().enumerate() {
        let Some(curve) = curves.get(horizon.as_str()) else {
            continue;
        };
        if curve.prob_pred.is_empty() {
            continue;
        }
        let is_selected = selected.matches(horizon.as_str());
        let color = HORIZON_PALETTE[idx % HORIZON_PALETTE.len()];
        traces.push(Trace {
            name: Some(horizon.to_string()),
            x: AxisValues::Numbers(curve.prob_pred.clone()),
            y: curve.prob_true.clone(),
            kind: TraceKind::LinesMarkers,
            line: Some(LineStyle::solid(color).width(if is_selected { 3.0 } else { 2.0 })),
            marker: Some(MarkerStyle {
                size: Some(if is_selected { 8.0 } else { 6.0 }),
                colors: Vec::new(),
            }),
            opacity: Some(if is_selected { 1.0 } else { 0.6 }),
        });
    }

    traces.push(Trace::diagonal("Ideal"));
    ChartSeries {
        traces,
        layout: calibration_layout(),
    }
}
