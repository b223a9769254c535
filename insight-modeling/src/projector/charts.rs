//! Render-ready chart series
//!
//! Plain data in the trace/layout vocabulary most plotting front ends accept.
//! Serializes to JSON objects a plotting library can consume directly.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub const BLUE: &str = "blue";
pub const RED: &str = "red";
pub const GRAY: &str = "gray";
pub const BLACK: &str = "black";
pub const MODEL_RED: &str = "#D32F2F";
pub const BAR_BLUE: &str = "#409EFF";

/// Per-horizon calibration colors, cycled
pub const HORIZON_PALETTE: [&str; 5] = ["#3B71CA", "#D32F2F", "#2E7D32", "#E6A23C", "#9C27B0"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisValues {
    Numbers(Vec<f64>),
    Labels(Vec<String>),
}

impl AxisValues {
    pub fn len(&self) -> usize {
        match self {
            AxisValues::Numbers(v) => v.len(),
            AxisValues::Labels(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trace type; serializes to the `type` / `mode` pair plotting libraries expect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    Lines,
    LinesMarkers,
    Bar,
}

impl Serialize for TraceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            TraceKind::Lines => {
                map.serialize_entry("type", "scatter")?;
                map.serialize_entry("mode", "lines")?;
            }
            TraceKind::LinesMarkers => {
                map.serialize_entry("type", "scatter")?;
                map.serialize_entry("mode", "lines+markers")?;
            }
            TraceKind::Bar => map.serialize_entry("type", "bar")?,
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DashStyle {
    Solid,
    Dash,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<DashStyle>,
}

impl LineStyle {
    pub fn solid(color: &str) -> Self {
        Self {
            color: color.to_string(),
            width: None,
            dash: None,
        }
    }

    pub fn dashed(color: &str) -> Self {
        Self {
            dash: Some(DashStyle::Dash),
            ..Self::solid(color)
        }
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkerStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// One color per point (bar charts)
    #[serde(rename = "color", skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: AxisValues,
    pub y: Vec<f64>,
    #[serde(flatten)]
    pub kind: TraceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<MarkerStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl Trace {
    pub fn line(name: impl Into<String>, x: Vec<f64>, y: Vec<f64>, style: LineStyle) -> Self {
        Self {
            name: Some(name.into()),
            x: AxisValues::Numbers(x),
            y,
            kind: TraceKind::Lines,
            line: Some(style),
            marker: None,
            opacity: None,
        }
    }

    /// Unit diagonal from (0,0) to (1,1)
    pub fn diagonal(name: &str) -> Self {
        Self::line(name, vec![0.0, 1.0], vec![0.0, 1.0], LineStyle::dashed(GRAY))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
}

impl Axis {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            range: None,
        }
    }

    pub fn range(mut self, lo: f64, hi: f64) -> Self {
        self.range = Some([lo, hi]);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Line,
}

/// Straight reference segment drawn over the plot area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub line: LineStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub xaxis: Axis,
    pub yaxis: Axis,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shapes: Vec<ReferenceLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    #[serde(rename = "data")]
    pub traces: Vec<Trace>,
    pub layout: Layout,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.name.as_deref() == Some(name))
    }
}

/// Every evaluation chart of one result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSet {
    pub roc: ChartSeries,
    pub calibration: ChartSeries,
    pub dca: ChartSeries,
    pub vif: ChartSeries,
}
