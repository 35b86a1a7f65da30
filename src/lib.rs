//! Spreadsheet header normalization and chart descriptions.
//!
//! A sheet whose header is one row (`Date | Sales`) or two rows (a group row
//! over sub-labels) is turned into flat columns, each assigned the X
//! (category) or Y (measurement) role, and then into a chart description.
//!
//! ```no_run
//! use rusty_chart::{build_chart, normalize, ChartKind, Resource};
//!
//! let resource = Resource::from("sales.xlsx");
//! let result = normalize(&resource, Some("2024"))?;
//! let figure = build_chart(
//!     &result.rows,
//!     &result.x_columns[0],
//!     &result.y_columns,
//!     ChartKind::Line,
//!     "Sales 2024",
//! )?;
//! println!("{}", figure.to_json()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod chart;
pub mod color;
pub mod data;
pub mod error;

pub use chart::builder::{build_chart, ChartBuilder, ChartKind, ChartSpec, ChartStyle};
pub use chart::export::{export_chart, ChartExporter, ExportFormat, RasterConfig, RasterExporter};
pub use chart::figure::Figure;
pub use data::loader::{Resource, Workbook};
pub use data::model::{CellValue, ColumnSchema, HeaderCell, NormalizedResult, Row};
pub use data::{list_sheets, normalize, normalize_flat};
pub use error::{ChartError, SheetError};
