use std::collections::HashSet;

use super::model::{CellValue, Grid, HeaderCell, HeaderGroups, NormalizedResult, Row};
use super::roles::ColumnRoles;

/// Sub-label recorded for the X column of a single-level sheet.
pub const SINGLE_LEVEL_SUB: &str = "value";

// ---------------------------------------------------------------------------
// Single-level reading: first row is the header, first column is X
// ---------------------------------------------------------------------------

/// Interpret `grid` with a single header row.
///
/// A sheet without columns yields [`NormalizedResult::empty`].
pub fn normalize_flat_grid(grid: &Grid) -> NormalizedResult {
    let Some(header) = grid.row(0).filter(|_| grid.width() > 0) else {
        return NormalizedResult::empty();
    };

    let columns = column_names(header);
    let roles = ColumnRoles::first_column(&columns);
    let primary = columns[0].clone();

    let mut header_groups = HeaderGroups::new();
    header_groups.insert(primary.clone(), vec![HeaderCell::text(SINGLE_LEVEL_SUB)]);

    let rows = grid
        .data_rows(1)
        .map(|cells| Row::from_cells(&columns, cells))
        .collect();

    NormalizedResult {
        header_groups,
        rows,
        columns,
        x_columns: roles.x,
        y_columns: roles.y,
        primary_group: Some(primary),
    }
}

/// Stringified header names. Blank cells become `Unnamed: <i>`; repeats get
/// `.1`, `.2`, … so every name is a usable row key.
pub fn column_names(header: &[CellValue]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(header.len());
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = if cell.is_blank() {
                format!("Unnamed: {idx}")
            } else {
                cell.to_string()
            };
            let mut name = base.clone();
            let mut n = 1;
            while taken.contains(&name) {
                name = format!("{base}.{n}");
                n += 1;
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}
