use thiserror::Error;

use crate::chart::export::ExportFormat;

// ---------------------------------------------------------------------------
// Sheet errors – surfaced by the reader and the normalizer
// ---------------------------------------------------------------------------

/// Errors that reach the caller when reading a workbook.
///
/// Header problems never show up here: they are recovered by the
/// single-level fallback.
#[derive(Error, Debug)]
pub enum SheetError {
    /// The resource cannot be opened or is not a recognised spreadsheet.
    #[error("cannot read spreadsheet '{resource}': {reason}")]
    ResourceUnreadable { resource: String, reason: String },

    /// The requested sheet does not exist (or the workbook has no sheets).
    #[error("sheet '{name}' not found")]
    SheetNotFound { name: String },
}

impl SheetError {
    pub(crate) fn unreadable(resource: impl Into<String>, reason: impl ToString) -> Self {
        SheetError::ResourceUnreadable {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chart errors – bad chart requests and export failures
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("unsupported chart kind '{0}' (expected line, bar or scatter)")]
    UnsupportedChartKind(String),

    #[error("invalid column reference '{column}': {reason}")]
    InvalidColumnReference { column: String, reason: String },

    #[error("invalid chart document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("export format '{0}' is not supported by this exporter")]
    UnsupportedExportFormat(ExportFormat),

    #[error("unknown export format '{0}' (expected pdf, jpg or png)")]
    UnknownExportFormat(String),

    #[error("failed to encode chart image: {0}")]
    Encode(#[from] image::ImageError),
}
