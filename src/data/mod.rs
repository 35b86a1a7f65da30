/// Data layer: reading sheets and normalizing their headers.
///
/// Architecture:
/// ```text
///  .xlsx / .xls / .ods / .csv / bytes
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  open resource → Grid
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐   two-level?   ┌────────┐
///   │  header  │ ─────────────▶ │ roles  │  primary group → X, rest → Y
///   └──────────┘                └────────┘
///        │ no / malformed
///        ▼
///   ┌──────────┐
///   │   flat   │  first column → X, rest → Y
///   └──────────┘
///        │
///        ▼
///   NormalizedResult
/// ```
pub mod flat;
pub mod header;
pub mod loader;
pub mod model;
pub mod roles;

use log::{debug, info, warn};

use crate::error::SheetError;
use header::{HeaderProbe, SingleLevelReason};
use loader::{Resource, Workbook};
use model::NormalizedResult;

/// List the sheet names of a workbook.
///
/// Never fails: an unreadable resource looks like a workbook without sheets.
pub fn list_sheets(resource: &Resource) -> Vec<String> {
    match Workbook::open(resource) {
        Ok(workbook) => workbook.sheet_names(),
        Err(e) => {
            warn!("listing sheets failed: {e}");
            Vec::new()
        }
    }
}

/// Normalize a sheet, trying a two-row header first and falling back to a
/// single header row.
pub fn normalize(resource: &Resource, sheet: Option<&str>) -> Result<NormalizedResult, SheetError> {
    let grid = Workbook::open(resource)?.read_sheet(sheet)?;

    match header::probe(&grid) {
        HeaderProbe::MultiLevel(result) => {
            info!(
                "two-level header: {} columns, {} rows, primary group {:?}",
                result.columns.len(),
                result.rows.len(),
                result.primary_group
            );
            Ok(result)
        }
        HeaderProbe::SingleLevel(reason) => {
            match &reason {
                SingleLevelReason::Malformed(e) => warn!("two-level header rejected: {e}"),
                other => debug!("single-level header: {other:?}"),
            }
            Ok(flat::normalize_flat_grid(&grid))
        }
    }
}

/// Normalize a sheet with a single header row, without probing.
pub fn normalize_flat(
    resource: &Resource,
    sheet: Option<&str>,
) -> Result<NormalizedResult, SheetError> {
    let grid = Workbook::open(resource)?.read_sheet(sheet)?;
    Ok(flat::normalize_flat_grid(&grid))
}
