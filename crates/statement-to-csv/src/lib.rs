//! Bank statement PDFs to normalized transaction records.
//!
//! The pipeline has two halves. A [`TableExtractor`] turns a PDF into
//! [`ExtractedTable`]s; [`normalize`] then scans the text of every table row
//! for statement lines and produces [`TransactionRecord`]s ready for CSV or
//! spreadsheet export.

mod error;
mod export;
mod extract;
mod header;
mod model;
mod normalize;
mod options;
mod pdf_reader;
mod summary;
mod table_detect;
mod table_parse;
mod tables_json;
mod warning;

use std::io::Read;
use std::path::Path;

use serde::Serialize;

pub use error::ExtractError;
pub use export::{write_csv, write_csv_to_string, write_xlsx, write_xlsx_to_buffer};
pub use extract::{Extraction, TableExtractor, TableFailure, TextLayerExtractor, stage_and_extract};
pub use model::{
    CellValue, ExtractedTable, Row, TRANSACTION_COLUMNS, TableLocation, TransactionRecord,
};
pub use normalize::{flatten_row, normalize, parse_transactions};
pub use options::{ExtractOptions, HeaderMode, PageSelection, QualityMode};
pub use summary::{ColumnSummary, numerical_summary};
pub use tables_json::{TablesDocument, tables_from_json, tables_to_json};
pub use warning::{ExtractWarning, WarningCode as ExtractWarningCode};

use crate::warning::WarningCode;

pub const NO_TABLES_MESSAGE: &str = "No tables found in the PDF or error occurred during processing";

/// Outcome of running one statement through extraction and normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementReport {
    pub number_of_tables: usize,
    pub records: Vec<TransactionRecord>,
    pub failures: Vec<TableFailure>,
    pub warnings: Vec<ExtractWarning>,
    /// User-facing message when no tables could be produced.
    pub error: Option<String>,
}

impl StatementReport {
    #[must_use]
    pub fn from_extraction(extraction: Extraction) -> Self {
        let Extraction {
            number_of_tables,
            tables,
            failures,
            mut warnings,
            error,
        } = extraction;

        if number_of_tables == 0 {
            let message = match error {
                Some(detail) => format!("{NO_TABLES_MESSAGE}: {detail}"),
                None => NO_TABLES_MESSAGE.to_string(),
            };
            return Self {
                number_of_tables,
                records: Vec::new(),
                failures,
                warnings,
                error: Some(message),
            };
        }

        let records = normalize(&tables);
        if records.is_empty() {
            warnings.push(ExtractWarning::new(
                WarningCode::NoTransactionsFound,
                "no transaction lines were found in the extracted tables",
            ));
        }

        Self {
            number_of_tables,
            records,
            failures,
            warnings,
            error,
        }
    }

    /// True when the document yielded at least one table.
    #[must_use]
    pub fn found_tables(&self) -> bool {
        self.number_of_tables > 0
    }
}

fn extractor_for(options: &ExtractOptions) -> Result<TextLayerExtractor, StatementReport> {
    TextLayerExtractor::new(options.clone()).map_err(|error| {
        StatementReport::from_extraction(Extraction::failed(format!(
            "Error processing PDF: {error}"
        )))
    })
}

pub fn process_statement_bytes(input_pdf: &[u8], options: &ExtractOptions) -> StatementReport {
    match extractor_for(options) {
        Ok(extractor) => StatementReport::from_extraction(extractor.extract(input_pdf)),
        Err(report) => report,
    }
}

pub fn process_statement_file(input_pdf: &Path, options: &ExtractOptions) -> StatementReport {
    match extractor_for(options) {
        Ok(extractor) => StatementReport::from_extraction(extractor.extract_path(input_pdf)),
        Err(report) => report,
    }
}

/// Like [`process_statement_file`] for streamed uploads; the stream is
/// staged in `options.work_dir` for the duration of the extraction.
pub fn process_statement_reader<R: Read + ?Sized>(
    input: &mut R,
    options: &ExtractOptions,
) -> StatementReport {
    match extractor_for(options) {
        Ok(extractor) => StatementReport::from_extraction(stage_and_extract(
            input,
            options.work_dir.as_deref(),
            &extractor,
        )),
        Err(report) => report,
    }
}

pub fn extract_pdf_to_csv(
    input_pdf: &Path,
    output_csv: &Path,
    options: &ExtractOptions,
) -> Result<StatementReport, ExtractError> {
    let report = process_statement_file(input_pdf, options);
    write_csv(output_csv, &report.records, options.delimiter)?;
    Ok(report)
}

pub fn extract_pdf_bytes_to_csv_string(
    input_pdf: &[u8],
    options: &ExtractOptions,
) -> Result<(String, StatementReport), ExtractError> {
    let report = process_statement_bytes(input_pdf, options);
    let csv = write_csv_to_string(&report.records, options.delimiter)?;
    Ok((csv, report))
}
