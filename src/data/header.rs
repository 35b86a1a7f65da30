//! Two-level header detection and flattening.
//!
//! A two-level header is a group row stacked over a sub-label row:
//!
//! ```text
//!   | Period  |     | Region |       |
//!   | Month   | Qtr | North  | South |
//!   | 2024-01 | Q1  | 100    | 80    |
//! ```
//!
//! flattens to `Period_Month, Period_Qtr, Region_North, Region_South`.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use super::model::{
    CellValue, Grid, HeaderCell, HeaderGroups, NormalizedResult, RawHeaderCell, Row, UNNAMED,
};
use super::roles::ColumnRoles;

/// The header state is inconsistent; the sheet is re-read as single-level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedHeader {
    #[error("columns {first} and {second} both flatten to '{name}'")]
    DuplicateColumn {
        name: String,
        first: usize,
        second: usize,
    },
}

/// Why the two-level reading was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleLevelReason {
    /// Fewer than two rows, or an empty second row.
    TooFewHeaderRows,
    /// The second row reads as data, not as sub-labels.
    SecondRowIsData,
    Malformed(MalformedHeader),
}

/// Outcome of probing a grid for a two-level header.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderProbe {
    MultiLevel(NormalizedResult),
    SingleLevel(SingleLevelReason),
}

/// Flat schema derived from the raw header pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderSchema {
    pub groups: HeaderGroups,
    pub columns: Vec<String>,
}

/// `group` alone when the sub-label is absent, `group_sub` otherwise.
pub fn flat_name(group: &str, sub: &HeaderCell) -> String {
    match sub.label() {
        Some(sub) if sub != UNNAMED => format!("{group}_{sub}"),
        _ => group.to_string(),
    }
}

/// Flatten (group, sub) pairs into header groups and flat column names.
///
/// Absent groups get `Column_<position>`. Sub-labels are appended to their
/// group in column order, repeats included.
pub fn flatten_headers(cells: &[RawHeaderCell]) -> Result<HeaderSchema, MalformedHeader> {
    let mut groups = HeaderGroups::new();
    let mut columns = Vec::with_capacity(cells.len());
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(cells.len());

    for (idx, cell) in cells.iter().enumerate() {
        let group = match cell.group.label() {
            Some(label) => label.to_string(),
            None => format!("Column_{idx}"),
        };
        let name = flat_name(&group, &cell.sub);
        if let Some(&first) = seen.get(&name) {
            return Err(MalformedHeader::DuplicateColumn {
                name,
                first,
                second: idx,
            });
        }
        seen.insert(name.clone(), idx);

        groups.entry(group).or_default().push(cell.sub.clone());
        columns.push(name);
    }

    Ok(HeaderSchema { groups, columns })
}

/// Pair the first two grid rows into raw header cells.
///
/// A blank group cell continues the nearest label to its left (the shape a
/// merged cell leaves behind); leading blanks stay absent.
pub fn raw_header_cells(group_row: &[CellValue], sub_row: &[CellValue]) -> Vec<RawHeaderCell> {
    let mut last: Option<&CellValue> = None;
    group_row
        .iter()
        .zip(sub_row)
        .map(|(group, sub)| {
            let group = if group.is_blank() {
                last.map_or(HeaderCell::Absent, HeaderCell::from_value)
            } else {
                last = Some(group);
                HeaderCell::from_value(group)
            };
            RawHeaderCell::new(group, HeaderCell::from_value(sub))
        })
        .collect()
}

/// A label spans several columns: a blank follows a label, or a label repeats
/// in the next column.
fn has_spans(group_row: &[CellValue]) -> bool {
    group_row.windows(2).any(|pair| {
        let (left, right) = (&pair[0], &pair[1]);
        !left.is_blank() && (right.is_blank() || left == right)
    })
}

/// Some column has a text sub-label over data that is never text.
fn has_type_break<'a>(
    sub_row: &[CellValue],
    data_rows: impl Iterator<Item = &'a [CellValue]>,
) -> bool {
    let data: Vec<&[CellValue]> = data_rows.collect();
    sub_row
        .iter()
        .enumerate()
        .filter(|(_, sub)| sub.is_text())
        .any(|(col, _)| {
            let mut values = data
                .iter()
                .filter_map(|row| row.get(col))
                .filter(|v| !v.is_blank())
                .peekable();
            values.peek().is_some() && values.all(|v| !v.is_text())
        })
}

/// Text that parses as a number or a date.
fn looks_like_value(text: &str) -> bool {
    const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d.%m.%Y"];
    let text = text.trim();
    text.parse::<f64>().is_ok()
        || DATE_FORMATS
            .iter()
            .any(|fmt| NaiveDate::parse_from_str(text, fmt).is_ok())
        || NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").is_ok()
}

/// Blank, or text that cannot be mistaken for a data value.
fn is_label(cell: &CellValue) -> bool {
    match cell {
        CellValue::String(s) => s.trim().is_empty() || !looks_like_value(s),
        other => other.is_blank(),
    }
}

fn reads_as_two_level(grid: &Grid) -> Result<(), SingleLevelReason> {
    let (Some(group_row), Some(sub_row)) = (grid.row(0), grid.row(1)) else {
        return Err(SingleLevelReason::TooFewHeaderRows);
    };
    if sub_row.iter().all(CellValue::is_blank) {
        return Err(SingleLevelReason::TooFewHeaderRows);
    }

    // A merged group cell is recorded evidence; sub-labels under it may be
    // whole numbers (years, codes) but never flags, fractions or dates.
    if grid.has_merged_header()
        && sub_row
            .iter()
            .all(|c| c.is_blank() || matches!(c, CellValue::String(_) | CellValue::Integer(_)))
    {
        return Ok(());
    }

    // Otherwise the layout is inferred, and only label text qualifies.
    if !sub_row.iter().all(is_label) {
        return Err(SingleLevelReason::SecondRowIsData);
    }
    if has_spans(group_row) || has_type_break(sub_row, grid.data_rows(2)) {
        Ok(())
    } else {
        Err(SingleLevelReason::SecondRowIsData)
    }
}

/// Try to read `grid` as a two-level header sheet.
pub fn probe(grid: &Grid) -> HeaderProbe {
    if grid.width() == 0 {
        return HeaderProbe::SingleLevel(SingleLevelReason::TooFewHeaderRows);
    }
    if let Err(reason) = reads_as_two_level(grid) {
        return HeaderProbe::SingleLevel(reason);
    }
    let (Some(group_row), Some(sub_row)) = (grid.row(0), grid.row(1)) else {
        return HeaderProbe::SingleLevel(SingleLevelReason::TooFewHeaderRows);
    };

    let cells = raw_header_cells(group_row, sub_row);
    let schema = match flatten_headers(&cells) {
        Ok(schema) => schema,
        Err(e) => return HeaderProbe::SingleLevel(SingleLevelReason::Malformed(e)),
    };

    let roles = ColumnRoles::from_primary_group(&schema.groups, &schema.columns);
    let rows = grid
        .data_rows(2)
        .map(|cells| Row::from_cells(&schema.columns, cells))
        .collect();

    HeaderProbe::MultiLevel(NormalizedResult {
        primary_group: schema.groups.keys().next().cloned(),
        header_groups: schema.groups,
        rows,
        columns: schema.columns,
        x_columns: roles.x,
        y_columns: roles.y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::String(s.to_string())
    }

    fn pair(group: Option<&str>, sub: Option<&str>) -> RawHeaderCell {
        let cell = |v: Option<&str>| v.map_or(HeaderCell::Absent, HeaderCell::text);
        RawHeaderCell::new(cell(group), cell(sub))
    }

    #[test]
    fn group_and_sub_join_with_underscore() {
        let schema = flatten_headers(&[
            pair(Some("Region"), Some("North")),
            pair(Some("Region"), Some("South")),
        ])
        .unwrap();
        assert_eq!(schema.columns, ["Region_North", "Region_South"]);
        assert_eq!(
            schema.groups["Region"],
            [HeaderCell::text("North"), HeaderCell::text("South")]
        );
    }

    #[test]
    fn blank_group_is_named_after_its_position() {
        let schema = flatten_headers(&[
            pair(Some("Date"), None),
            pair(Some("Region"), Some("North")),
            pair(Some("Region"), Some("South")),
            pair(None, Some("Total")),
        ])
        .unwrap();
        assert_eq!(schema.columns[3], "Column_3_Total");
        assert!(schema.groups.contains_key("Column_3"));
    }

    #[test]
    fn absent_sub_leaves_group_alone() {
        let schema = flatten_headers(&[pair(Some("Date"), None), pair(None, None)]).unwrap();
        assert_eq!(schema.columns, ["Date", "Column_1"]);
        assert_eq!(schema.groups["Date"], [HeaderCell::Absent]);
    }

    #[test]
    fn repeated_group_keeps_every_sub_label() {
        let schema = flatten_headers(&[
            pair(Some("A"), Some("x")),
            pair(Some("B"), Some("x")),
            pair(Some("A"), Some("y")),
        ])
        .unwrap();
        assert_eq!(schema.groups.keys().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(schema.groups["A"], [HeaderCell::text("x"), HeaderCell::text("y")]);
    }

    #[test]
    fn colliding_flat_names_are_malformed() {
        let err = flatten_headers(&[pair(Some("A"), Some("x")), pair(Some("A"), Some("x"))])
            .unwrap_err();
        assert_eq!(
            err,
            MalformedHeader::DuplicateColumn {
                name: "A_x".into(),
                first: 0,
                second: 1
            }
        );
    }

    #[test]
    fn merged_group_cells_extend_to_the_right() {
        let cells = raw_header_cells(
            &[CellValue::Null, text("Region"), CellValue::Null],
            &[text("Month"), text("North"), text("South")],
        );
        assert_eq!(cells[0].group, HeaderCell::Absent);
        assert_eq!(cells[1].group, HeaderCell::text("Region"));
        assert_eq!(cells[2].group, HeaderCell::text("Region"));
    }

    #[test]
    fn probe_flattens_grouped_sheet() {
        let grid = Grid::from_rows(vec![
            vec![text("Period"), CellValue::Null, text("Region"), CellValue::Null],
            vec![text("Month"), text("Qtr"), text("North"), text("South")],
            vec![text("2024-01"), text("Q1"), CellValue::Integer(100), CellValue::Integer(80)],
            vec![CellValue::Null; 4],
            vec![text("2024-02"), text("Q1"), CellValue::Integer(120), CellValue::Float(85.5)],
        ]);
        let HeaderProbe::MultiLevel(result) = probe(&grid) else {
            panic!("expected a two-level header");
        };
        assert_eq!(
            result.columns,
            ["Period_Month", "Period_Qtr", "Region_North", "Region_South"]
        );
        assert_eq!(result.x_columns, ["Period_Month", "Period_Qtr"]);
        assert_eq!(result.y_columns, ["Region_North", "Region_South"]);
        assert_eq!(result.primary_group.as_deref(), Some("Period"));
        assert_eq!(result.rows.len(), 2);
        assert_eq!(
            result.rows[1].get("Region_South"),
            Some(&CellValue::Float(85.5))
        );
    }

    #[test]
    fn probe_detects_unspanned_header_by_type_break() {
        let grid = Grid::from_rows(vec![
            vec![text("When"), text("Sales")],
            vec![text("Month"), text("EUR")],
            vec![text("2024-01"), CellValue::Integer(100)],
        ]);
        assert!(matches!(probe(&grid), HeaderProbe::MultiLevel(_)));
    }

    #[test]
    fn probe_rejects_single_header_row() {
        let grid = Grid::from_rows(vec![
            vec![text("Date"), text("Sales")],
            vec![text("2024-01"), CellValue::Integer(100)],
            vec![text("2024-02"), CellValue::Integer(150)],
        ]);
        assert_eq!(
            probe(&grid),
            HeaderProbe::SingleLevel(SingleLevelReason::SecondRowIsData)
        );

        let header_only = Grid::from_rows(vec![vec![text("Date"), text("Sales")]]);
        assert_eq!(
            probe(&header_only),
            HeaderProbe::SingleLevel(SingleLevelReason::TooFewHeaderRows)
        );
    }

    #[test]
    fn whole_number_data_under_a_blank_header_cell_is_data() {
        let grid = Grid::from_rows(vec![
            vec![text("Date"), text("Sales"), CellValue::Null],
            vec![CellValue::Integer(2023), CellValue::Integer(100), CellValue::Integer(5)],
            vec![CellValue::Integer(2024), CellValue::Integer(150), CellValue::Integer(7)],
        ]);
        assert_eq!(
            probe(&grid),
            HeaderProbe::SingleLevel(SingleLevelReason::SecondRowIsData)
        );

        let repeated = Grid::from_rows(vec![
            vec![text("Date"), text("Sales"), text("Sales")],
            vec![text("2024-01"), CellValue::Integer(100), CellValue::Integer(5)],
        ]);
        assert_eq!(
            probe(&repeated),
            HeaderProbe::SingleLevel(SingleLevelReason::SecondRowIsData)
        );
    }

    #[test]
    fn merged_header_accepts_year_sub_labels() {
        let grid = Grid::from_rows(vec![
            vec![text("Region"), text("Sales"), CellValue::Null],
            vec![CellValue::Null, CellValue::Integer(2023), CellValue::Integer(2024)],
            vec![text("North"), CellValue::Integer(100), CellValue::Integer(120)],
        ]);
        assert!(matches!(probe(&grid), HeaderProbe::SingleLevel(_)));

        let HeaderProbe::MultiLevel(result) = probe(&grid.with_merged_header(true)) else {
            panic!("expected a two-level header");
        };
        assert_eq!(result.columns, ["Region", "Sales_2023", "Sales_2024"]);
        assert_eq!(result.rows.len(), 1);
    }

    #[test]
    fn a_single_mixed_column_is_not_a_type_break() {
        let grid = Grid::from_rows(vec![
            vec![text("Date"), text("Status")],
            vec![text("2024-01"), text("pending")],
            vec![text("2024-02"), CellValue::Integer(150)],
        ]);
        assert!(matches!(probe(&grid), HeaderProbe::SingleLevel(_)));

        let mixed = Grid::from_rows(vec![
            vec![text("Name"), text("Status")],
            vec![text("alice"), text("pending")],
            vec![text("bob"), CellValue::Integer(150)],
            vec![text("carol"), text("done")],
        ]);
        assert!(matches!(probe(&mixed), HeaderProbe::SingleLevel(_)));
    }

    #[test]
    fn dates_and_numbers_in_text_are_not_labels() {
        for value in ["2024-01", "2024-01-31", "31/01/2024", "12.5", "007"] {
            assert!(!is_label(&text(value)), "{value}");
        }
        for label in ["Month", "Q1", "EUR", "North"] {
            assert!(is_label(&text(label)), "{label}");
        }
        assert!(is_label(&CellValue::Null));
        assert!(!is_label(&CellValue::Integer(2024)));
    }

    #[test]
    fn probe_reports_collisions_as_malformed() {
        let grid = Grid::from_rows(vec![
            vec![text("A"), CellValue::Null],
            vec![text("x"), text("x")],
            vec![CellValue::Integer(1), CellValue::Integer(2)],
        ]);
        assert!(matches!(
            probe(&grid),
            HeaderProbe::SingleLevel(SingleLevelReason::Malformed(_))
        ));
    }
}
