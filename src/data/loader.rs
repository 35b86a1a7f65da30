use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use calamine::{
    open_workbook_auto, open_workbook_auto_from_rs, Data, Dimensions, Reader, Sheets,
};
use chrono::{NaiveDateTime, Timelike};
use log::debug;

use super::model::{CellValue, Grid};
use crate::error::SheetError;

// ---------------------------------------------------------------------------
// Resource – where the workbook bytes come from
// ---------------------------------------------------------------------------

/// A spreadsheet resource: a file on disk or a byte buffer handed over by a
/// blob store.
#[derive(Debug, Clone)]
pub enum Resource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

impl Resource {
    fn describe(&self) -> String {
        match self {
            Resource::Path(p) => p.display().to_string(),
            Resource::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }
}

impl From<&Path> for Resource {
    fn from(p: &Path) -> Self {
        Resource::Path(p.to_path_buf())
    }
}

impl From<PathBuf> for Resource {
    fn from(p: PathBuf) -> Self {
        Resource::Path(p)
    }
}

impl From<&str> for Resource {
    fn from(p: &str) -> Self {
        Resource::Path(PathBuf::from(p))
    }
}

impl From<Vec<u8>> for Resource {
    fn from(bytes: Vec<u8>) -> Self {
        Resource::Bytes(Arc::from(bytes))
    }
}

// ---------------------------------------------------------------------------
// Workbook – an opened resource
// ---------------------------------------------------------------------------

enum Inner {
    File(Sheets<BufReader<File>>),
    Memory(Sheets<Cursor<Arc<[u8]>>>),
    /// A CSV file behaves as a workbook with one sheet.
    Csv { name: String, grid: Grid },
}

/// An opened workbook. Each call opens its own handle; nothing is shared.
pub struct Workbook {
    source: String,
    inner: Inner,
}

impl Workbook {
    /// Open a resource.  Dispatch by extension, sniff content otherwise.
    ///
    /// Supported formats:
    /// * `.xlsx` `.xlsm` `.xlam` `.xlsb` `.xls` `.xla` `.ods` – via calamine
    /// * `.csv` – a single sheet named after the file stem
    pub fn open(resource: &Resource) -> Result<Self, SheetError> {
        let source = resource.describe();
        let inner = match resource {
            Resource::Path(path) => open_path(path, &source)?,
            Resource::Bytes(bytes) => open_bytes(Arc::clone(bytes), &source)?,
        };
        Ok(Workbook { source, inner })
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        match &self.inner {
            Inner::File(sheets) => sheets.sheet_names(),
            Inner::Memory(sheets) => sheets.sheet_names(),
            Inner::Csv { name, .. } => vec![name.clone()],
        }
    }

    /// Read one sheet (the first one when `sheet` is `None`) into a grid.
    pub fn read_sheet(&mut self, sheet: Option<&str>) -> Result<Grid, SheetError> {
        let names = self.sheet_names();
        let name = match sheet {
            Some(requested) if names.iter().any(|n| n == requested) => requested.to_string(),
            Some(requested) => {
                return Err(SheetError::SheetNotFound {
                    name: requested.to_string(),
                })
            }
            None => names.into_iter().next().ok_or_else(|| SheetError::SheetNotFound {
                name: "<first sheet>".to_string(),
            })?,
        };
        debug!("reading sheet '{name}' from {}", self.source);

        match &mut self.inner {
            Inner::File(sheets) => read_range(sheets, &name, &self.source),
            Inner::Memory(sheets) => read_range(sheets, &name, &self.source),
            Inner::Csv { grid, .. } => Ok(grid.clone()),
        }
    }
}

fn open_path(path: &Path, source: &str) -> Result<Inner, SheetError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xlam" | "xlsb" | "xls" | "xla" | "ods" => open_workbook_auto(path)
            .map(Inner::File)
            .map_err(|e| SheetError::unreadable(source, e)),
        "csv" => {
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Sheet1")
                .to_string();
            let grid = load_csv(path).map_err(|e| SheetError::unreadable(source, e))?;
            Ok(Inner::Csv { name, grid })
        }
        _ => {
            let bytes = std::fs::read(path).map_err(|e| SheetError::unreadable(source, e))?;
            open_bytes(Arc::from(bytes), source)
        }
    }
}

fn open_bytes(bytes: Arc<[u8]>, source: &str) -> Result<Inner, SheetError> {
    open_workbook_auto_from_rs(Cursor::new(bytes))
        .map(Inner::Memory)
        .map_err(|e| SheetError::unreadable(source, e))
}

// ---------------------------------------------------------------------------
// calamine ranges
// ---------------------------------------------------------------------------

fn read_range<RS>(sheets: &mut Sheets<RS>, name: &str, source: &str) -> Result<Grid, SheetError>
where
    RS: std::io::Read + std::io::Seek,
{
    let range = sheets
        .worksheet_range(name)
        .map_err(|e| SheetError::unreadable(source, e))?;
    let rows = range
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    let merged = match range.start() {
        Some((first_row, _)) => merged_regions(sheets, name, source)
            .iter()
            .any(|region| starts_header_span(region, first_row)),
        None => false,
    };
    let grid = Grid::from_rows(rows).with_merged_header(merged);
    debug!(
        "sheet '{name}': {}x{} cells, merged header: {merged}",
        grid.height(),
        grid.width()
    );
    Ok(grid)
}

/// Merged cells of one sheet. Only xlsx and xls record them; other formats
/// report none.
fn merged_regions<RS>(sheets: &mut Sheets<RS>, name: &str, source: &str) -> Vec<Dimensions>
where
    RS: std::io::Read + std::io::Seek,
{
    match sheets {
        Sheets::Xlsx(xlsx) => match xlsx.worksheet_merge_cells(name) {
            Some(Ok(regions)) => regions,
            Some(Err(e)) => {
                debug!("no merged regions for '{name}' in {source}: {e}");
                Vec::new()
            }
            None => Vec::new(),
        },
        Sheets::Xls(xls) => xls.worksheet_merge_cells(name).unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// A merged cell anchored in the header row that spans columns or reaches
/// into the row below.
fn starts_header_span(region: &Dimensions, header_row: u32) -> bool {
    region.start.0 == header_row && (region.end.1 > region.start.1 || region.end.0 > header_row)
}

/// Map a calamine cell to a [`CellValue`].
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::from_float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::String(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => CellValue::Date(format_datetime(&ndt)),
            None => CellValue::from_float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::Date(s.clone()),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(e.to_string()),
    }
}

fn format_datetime(ndt: &NaiveDateTime) -> String {
    if ndt.num_seconds_from_midnight() == 0 && ndt.nanosecond() == 0 {
        ndt.format("%Y-%m-%d").to_string()
    } else {
        ndt.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Every record becomes a grid row. Header fields stay text so column names
/// keep their spelling (`007` is not `7`); data fields are type-guessed.
fn load_csv(path: &Path) -> Result<Grid, csv::Error> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Grid, csv::Error> {
    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let row = if idx == 0 {
            record.iter().map(header_cell).collect()
        } else {
            record.iter().map(guess_cell_type).collect()
        };
        rows.push(row);
    }
    Ok(Grid::from_rows(rows))
}

fn header_cell(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        CellValue::Null
    } else {
        CellValue::String(s.to_string())
    }
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    match s {
        "true" | "TRUE" | "True" => CellValue::Bool(true),
        "false" | "FALSE" | "False" => CellValue::Bool(false),
        _ => CellValue::String(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_fields_are_type_guessed() {
        assert_eq!(guess_cell_type(""), CellValue::Null);
        assert_eq!(guess_cell_type("42"), CellValue::Integer(42));
        assert_eq!(guess_cell_type("4.5"), CellValue::Float(4.5));
        assert_eq!(guess_cell_type("TRUE"), CellValue::Bool(true));
        assert_eq!(guess_cell_type("North"), CellValue::String("North".into()));
    }

    #[test]
    fn csv_header_fields_keep_their_spelling() {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader("007,1e3,1.0,\n1,2,3,4\n".as_bytes());
        let grid = read_csv(reader).unwrap();
        assert_eq!(
            grid.row(0).unwrap(),
            &[
                CellValue::String("007".into()),
                CellValue::String("1e3".into()),
                CellValue::String("1.0".into()),
                CellValue::Null,
            ]
        );
        assert_eq!(grid.row(1).unwrap()[0], CellValue::Integer(1));
    }

    #[test]
    fn header_spans_need_an_anchor_in_the_header_row() {
        let across = Dimensions::new((0, 1), (0, 2));
        let down = Dimensions::new((0, 0), (1, 0));
        let single = Dimensions::new((0, 3), (0, 3));
        let lower = Dimensions::new((4, 0), (4, 2));
        assert!(starts_header_span(&across, 0));
        assert!(starts_header_span(&down, 0));
        assert!(!starts_header_span(&single, 0));
        assert!(!starts_header_span(&lower, 0));
    }

    #[test]
    fn datetimes_at_midnight_render_as_dates() {
        let ndt = chrono::NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format_datetime(&ndt), "2024-01-31");
        let ndt = ndt.with_hour(13).unwrap();
        assert_eq!(format_datetime(&ndt), "2024-01-31T13:00:00");
    }

    #[test]
    fn garbage_bytes_are_unreadable() {
        let resource = Resource::from(b"definitely not a workbook".to_vec());
        let err = Workbook::open(&resource).err().unwrap();
        assert!(matches!(err, SheetError::ResourceUnreadable { .. }));
    }
}
