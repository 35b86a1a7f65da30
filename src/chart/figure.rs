//! Serializable chart description.
//!
//! The document follows the Plotly figure layout (`data` traces plus a
//! `layout`), so a browser front end can hand it straight to `Plotly.newPlot`.

use serde::{Deserialize, Serialize};

use crate::data::model::CellValue;
use crate::error::ChartError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn to_json(&self) -> Result<String, ChartError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(document: &str) -> Result<Self, ChartError> {
        Ok(serde_json::from_str(document)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceType {
    Scatter,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceMode {
    #[serde(rename = "lines+markers")]
    LinesMarkers,
    #[serde(rename = "lines")]
    Lines,
    #[serde(rename = "markers")]
    Markers,
}

impl TraceMode {
    pub fn has_lines(self) -> bool {
        matches!(self, TraceMode::LinesMarkers | TraceMode::Lines)
    }

    pub fn has_markers(self) -> bool {
        matches!(self, TraceMode::LinesMarkers | TraceMode::Markers)
    }
}

/// One plotted series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: TraceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TraceMode>,
    pub name: String,
    pub x: Vec<CellValue>,
    pub y: Vec<CellValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<MarkerStyle>,
}

impl Trace {
    /// Series colour from the line style, falling back to the marker.
    pub fn color(&self) -> Option<&str> {
        self.line
            .as_ref()
            .map(|l| l.color.as_str())
            .or_else(|| self.marker.as_ref().and_then(|m| m.color.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Text { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub title: Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub family: String,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub title: Text,
    pub xaxis: Axis,
    pub yaxis: Axis,
    /// `"x unified"`: hovering an x position shows every series at that x.
    pub hovermode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barmode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_bgcolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_bgcolor: Option<String>,
}
