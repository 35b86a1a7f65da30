use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// CellValue – a single scalar read from a sheet
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring what a spreadsheet reader yields.
///
/// Serialized untagged so rows look like plain JSON records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// ISO-8601 date/datetime kept as text.
    Date(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) | CellValue::Date(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Numbers without a fractional part are stored as integers, the way
    /// spreadsheet readers hand back whole-number cells.
    pub fn from_float(v: f64) -> Self {
        const EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
        if v.is_finite() && v.fract() == 0.0 && v.abs() < EXACT {
            CellValue::Integer(v as i64)
        } else {
            CellValue::Float(v)
        }
    }

    /// Try to interpret the value as an `f64` for plotting.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Null, NaN and whitespace-only text all count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(v) => v.is_nan(),
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, CellValue::String(_)) && !self.is_blank()
    }
}

// ---------------------------------------------------------------------------
// HeaderCell – one level of a column header
// ---------------------------------------------------------------------------

/// Sentinel a spreadsheet reader emits for a blank header cell.
pub const UNNAMED: &str = "Unnamed";

/// A header label that is either present or absent (blank, NaN, "Unnamed…").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderCell {
    Absent,
    Text(String),
}

impl HeaderCell {
    pub fn text(label: impl Into<String>) -> Self {
        HeaderCell::Text(label.into())
    }

    /// Stringify a raw cell into a header label.
    pub fn from_value(value: &CellValue) -> Self {
        if value.is_blank() {
            return HeaderCell::Absent;
        }
        let label = value.to_string();
        if label.contains(UNNAMED) {
            HeaderCell::Absent
        } else {
            HeaderCell::Text(label)
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            HeaderCell::Absent => None,
            HeaderCell::Text(s) => Some(s),
        }
    }
}

impl Serialize for HeaderCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HeaderCell::Absent => serializer.serialize_none(),
            HeaderCell::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// A raw (group, sub) header pair for one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeaderCell {
    pub group: HeaderCell,
    pub sub: HeaderCell,
}

impl RawHeaderCell {
    pub fn new(group: HeaderCell, sub: HeaderCell) -> Self {
        Self { group, sub }
    }
}

// ---------------------------------------------------------------------------
// Grid – a sheet as read from disk, before any header interpretation
// ---------------------------------------------------------------------------

/// Rectangular cell grid; every row has exactly `width` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
    width: usize,
    /// The workbook records a merged cell anchored in the first row.
    merged_header: bool,
}

impl Grid {
    /// Build a grid over the used area: trailing blank rows and columns are
    /// dropped, short rows are padded with nulls.
    pub fn from_rows(mut rows: Vec<Vec<CellValue>>) -> Self {
        while rows
            .last()
            .is_some_and(|row| row.iter().all(CellValue::is_blank))
        {
            rows.pop();
        }
        let width = rows
            .iter()
            .filter_map(|row| row.iter().rposition(|c| !c.is_blank()))
            .max()
            .map_or(0, |last| last + 1);
        for row in &mut rows {
            row.resize(width, CellValue::Null);
        }
        Grid {
            rows,
            width,
            merged_header: false,
        }
    }

    pub fn with_merged_header(mut self, merged: bool) -> Self {
        self.merged_header = merged;
        self
    }

    pub fn has_merged_header(&self) -> bool {
        self.merged_header
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, idx: usize) -> Option<&[CellValue]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// Rows from `start` onwards, skipping rows where every cell is blank.
    pub fn data_rows(&self, start: usize) -> impl Iterator<Item = &[CellValue]> {
        self.rows
            .iter()
            .skip(start)
            .filter(|row| !row.iter().all(CellValue::is_blank))
            .map(Vec::as_slice)
    }
}

// ---------------------------------------------------------------------------
// Row / NormalizedResult – the engine's output
// ---------------------------------------------------------------------------

/// One data row keyed by flat column name, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(pub IndexMap<String, CellValue>);

impl Row {
    /// Zip column names with cell values.
    pub fn from_cells(columns: &[String], cells: &[CellValue]) -> Self {
        Row(columns
            .iter()
            .cloned()
            .zip(cells.iter().cloned())
            .collect())
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.0.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, CellValue)>>(iter: T) -> Self {
        Row(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Header groups: group label → sub-labels in left-to-right column order.
pub type HeaderGroups = IndexMap<String, Vec<HeaderCell>>;

/// Flat schema plus rows for one sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedResult {
    pub header_groups: HeaderGroups,
    pub rows: Vec<Row>,
    /// Flat column names; every row has exactly these keys in this order.
    pub columns: Vec<String>,
    pub x_columns: Vec<String>,
    pub y_columns: Vec<String>,
    pub primary_group: Option<String>,
}

impl NormalizedResult {
    /// The successful result for a sheet without any columns.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The schema part of the result, without rows.
    pub fn schema(&self) -> ColumnSchema<'_> {
        ColumnSchema {
            header_groups: &self.header_groups,
            columns: &self.columns,
            x_columns: &self.x_columns,
            y_columns: &self.y_columns,
            primary_group: self.primary_group.as_deref(),
        }
    }
}

/// Borrowed view returned by the get-columns operation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnSchema<'a> {
    pub header_groups: &'a HeaderGroups,
    pub columns: &'a [String],
    pub x_columns: &'a [String],
    pub y_columns: &'a [String],
    pub primary_group: Option<&'a str>,
}
