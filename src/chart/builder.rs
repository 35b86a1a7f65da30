use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use super::figure::{
    Axis, Figure, Font, Layout, LineStyle, MarkerStyle, Text, Trace, TraceMode, TraceType,
};
use crate::color::series_color;
use crate::data::model::{CellValue, Row};
use crate::error::ChartError;

// ---------------------------------------------------------------------------
// Chart kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Scatter,
}

impl FromStr for ChartKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            "scatter" => Ok(ChartKind::Scatter),
            _ => Err(ChartError::UnsupportedChartKind(s.to_string())),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Scatter => "scatter",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Style configuration
// ---------------------------------------------------------------------------

/// Presentation defaults applied to every chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    pub template: String,
    pub font_family: String,
    pub font_size: u32,
    pub background: String,
    pub line_width: f64,
    pub line_marker_size: f64,
    pub scatter_marker_size: f64,
    pub y_axis_title: String,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            template: "plotly_white".to_string(),
            font_family: "Arial, sans-serif".to_string(),
            font_size: 12,
            background: "rgba(0,0,0,0)".to_string(),
            line_width: 2.0,
            line_marker_size: 6.0,
            scatter_marker_size: 10.0,
            y_axis_title: "Values".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chart request
// ---------------------------------------------------------------------------

/// Everything needed to build one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub rows: Vec<Row>,
    pub x_column: String,
    pub y_columns: Vec<String>,
    pub kind: ChartKind,
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_title() -> String {
    "Data Visualization".to_string()
}

impl ChartSpec {
    pub fn build(&self) -> Result<Figure, ChartError> {
        build_chart(&self.rows, &self.x_column, &self.y_columns, self.kind, &self.title)
    }
}

/// Build a chart with the default [`ChartStyle`].
pub fn build_chart(
    rows: &[Row],
    x_column: &str,
    y_columns: &[String],
    kind: ChartKind,
    title: &str,
) -> Result<Figure, ChartError> {
    ChartBuilder::default().build(rows, x_column, y_columns, kind, title)
}

#[derive(Debug, Clone, Default)]
pub struct ChartBuilder {
    pub style: ChartStyle,
}

impl ChartBuilder {
    pub fn new(style: ChartStyle) -> Self {
        Self { style }
    }

    /// One trace per y-column, coloured by its index in `y_columns`.
    pub fn build(
        &self,
        rows: &[Row],
        x_column: &str,
        y_columns: &[String],
        kind: ChartKind,
        title: &str,
    ) -> Result<Figure, ChartError> {
        validate_columns(rows, x_column, y_columns)?;

        let x = column_values(rows, x_column);
        let data = y_columns
            .iter()
            .enumerate()
            .map(|(i, y_col)| self.trace(kind, y_col, x.clone(), column_values(rows, y_col), i))
            .collect::<Vec<_>>();
        debug!("built {kind} chart with {} series over {} rows", data.len(), rows.len());

        Ok(Figure {
            data,
            layout: self.layout(kind, x_column, title),
        })
    }

    fn trace(
        &self,
        kind: ChartKind,
        name: &str,
        x: Vec<CellValue>,
        y: Vec<CellValue>,
        index: usize,
    ) -> Trace {
        let color = series_color(index).to_string();
        let (trace_kind, mode, line, marker) = match kind {
            ChartKind::Line => (
                TraceType::Scatter,
                Some(TraceMode::LinesMarkers),
                Some(LineStyle {
                    color,
                    width: self.style.line_width,
                }),
                MarkerStyle {
                    color: None,
                    size: Some(self.style.line_marker_size),
                },
            ),
            ChartKind::Bar => (
                TraceType::Bar,
                None,
                None,
                MarkerStyle {
                    color: Some(color),
                    size: None,
                },
            ),
            ChartKind::Scatter => (
                TraceType::Scatter,
                Some(TraceMode::Markers),
                None,
                MarkerStyle {
                    color: Some(color),
                    size: Some(self.style.scatter_marker_size),
                },
            ),
        };

        Trace {
            kind: trace_kind,
            mode,
            name: name.to_string(),
            x,
            y,
            line,
            marker: Some(marker),
        }
    }

    fn layout(&self, kind: ChartKind, x_column: &str, title: &str) -> Layout {
        let style = &self.style;
        Layout {
            title: Text::new(title),
            xaxis: Axis {
                title: Text::new(x_column),
            },
            yaxis: Axis {
                title: Text::new(style.y_axis_title.as_str()),
            },
            hovermode: "x unified".to_string(),
            barmode: (kind == ChartKind::Bar).then(|| "group".to_string()),
            template: Some(style.template.clone()),
            font: Some(Font {
                family: style.font_family.clone(),
                size: style.font_size,
            }),
            plot_bgcolor: Some(style.background.clone()),
            paper_bgcolor: Some(style.background.clone()),
        }
    }
}

/// Column references must name row keys; with no rows there is nothing to
/// check against.
fn validate_columns(rows: &[Row], x_column: &str, y_columns: &[String]) -> Result<(), ChartError> {
    let invalid = |column: &str, reason: &str| ChartError::InvalidColumnReference {
        column: column.to_string(),
        reason: reason.to_string(),
    };

    let mut seen: HashSet<&str> = HashSet::with_capacity(y_columns.len());
    for y in y_columns {
        if y == x_column {
            return Err(invalid(y, "y-column is also the x-column"));
        }
        if !seen.insert(y.as_str()) {
            return Err(invalid(y, "y-column listed more than once"));
        }
    }

    if let Some(first) = rows.first() {
        for column in std::iter::once(x_column).chain(y_columns.iter().map(String::as_str)) {
            if !first.contains(column) {
                return Err(invalid(column, "no such column in the rows"));
            }
        }
    }
    Ok(())
}

/// Values of one column, null where a row lacks it.
fn column_values(rows: &[Row], column: &str) -> Vec<CellValue> {
    rows.iter()
        .map(|row| row.get(column).cloned().unwrap_or(CellValue::Null))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales_rows() -> Vec<Row> {
        vec![
            [
                ("Date", CellValue::String("2024-01".into())),
                ("Sales", CellValue::Integer(100)),
            ]
            .into_iter()
            .collect(),
            [
                ("Date", CellValue::String("2024-02".into())),
                ("Sales", CellValue::Integer(150)),
            ]
            .into_iter()
            .collect(),
        ]
    }

    fn cols(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn line_chart_has_one_series_per_y_column() {
        let fig = build_chart(&sales_rows(), "Date", &cols(&["Sales"]), ChartKind::Line, "Q1").unwrap();
        assert_eq!(fig.data.len(), 1);
        let trace = &fig.data[0];
        assert_eq!(trace.kind, TraceType::Scatter);
        assert_eq!(trace.mode, Some(TraceMode::LinesMarkers));
        assert_eq!(trace.y, [CellValue::Integer(100), CellValue::Integer(150)]);
        assert_eq!(trace.color(), Some("#FF6B35"));
        assert_eq!(fig.layout.title.text, "Q1");
        assert_eq!(fig.layout.xaxis.title.text, "Date");
        assert_eq!(fig.layout.yaxis.title.text, "Values");
        assert_eq!(fig.layout.hovermode, "x unified");
    }

    #[test]
    fn colours_cycle_after_five_series() {
        let names = ["A", "B", "C", "D", "E", "F"];
        let row: Row = std::iter::once(("X", CellValue::Integer(0)))
            .chain(names.iter().map(|n| (*n, CellValue::Integer(1))))
            .collect();
        let fig = build_chart(&[row], "X", &cols(&names), ChartKind::Bar, "t").unwrap();
        assert_eq!(fig.data.len(), 6);
        assert_eq!(fig.data[0].color(), fig.data[5].color());
        assert_ne!(fig.data[0].color(), fig.data[1].color());
        assert_eq!(fig.layout.barmode.as_deref(), Some("group"));
    }

    #[test]
    fn scatter_uses_markers_only() {
        let fig = build_chart(&sales_rows(), "Date", &cols(&["Sales"]), ChartKind::Scatter, "t").unwrap();
        assert_eq!(fig.data[0].mode, Some(TraceMode::Markers));
        assert!(fig.data[0].line.is_none());
    }

    #[test]
    fn unknown_columns_and_kinds_are_rejected() {
        let rows = sales_rows();
        let err = build_chart(&rows, "Date", &cols(&["Profit"]), ChartKind::Line, "t").unwrap_err();
        assert!(matches!(err, ChartError::InvalidColumnReference { ref column, .. } if column == "Profit"));

        let err = build_chart(&rows, "Date", &cols(&["Date"]), ChartKind::Line, "t").unwrap_err();
        assert!(matches!(err, ChartError::InvalidColumnReference { .. }));

        let err = build_chart(&rows, "Date", &cols(&["Sales", "Sales"]), ChartKind::Line, "t").unwrap_err();
        assert!(matches!(err, ChartError::InvalidColumnReference { .. }));

        assert!(matches!(
            "pie".parse::<ChartKind>(),
            Err(ChartError::UnsupportedChartKind(_))
        ));
        assert_eq!(" Bar ".parse::<ChartKind>().unwrap(), ChartKind::Bar);
    }

    #[test]
    fn building_leaves_rows_untouched_and_serializes() {
        let rows = sales_rows();
        let before = rows.clone();
        let fig = build_chart(&rows, "Date", &cols(&["Sales"]), ChartKind::Line, "Q1").unwrap();
        assert_eq!(rows, before);

        let json = fig.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["data"][0]["type"], "scatter");
        assert_eq!(value["data"][0]["mode"], "lines+markers");
        assert_eq!(value["data"][0]["x"], serde_json::json!(["2024-01", "2024-02"]));
        assert_eq!(Figure::from_json(&json).unwrap(), fig);
    }

    #[test]
    fn chart_spec_deserializes_from_json() {
        let spec: ChartSpec = serde_json::from_str(
            r#"{"rows":[{"Date":"2024-01","Sales":100}],"x_column":"Date","y_columns":["Sales"],"kind":"bar"}"#,
        )
        .unwrap();
        assert_eq!(spec.title, "Data Visualization");
        let fig = spec.build().unwrap();
        assert_eq!(fig.data[0].kind, TraceType::Bar);
    }
}
