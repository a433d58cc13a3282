use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("invalid tables JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("no pages available after applying selection")]
    NoPagesSelected,

    #[error("table {table_number} on page {page} is too ambiguous (confidence={confidence:.2})")]
    AmbiguousTable {
        table_number: usize,
        page: u32,
        confidence: f32,
    },

    #[error("table {table_number} on page {page} has no data rows")]
    EmptyTable { table_number: usize, page: u32 },
}
