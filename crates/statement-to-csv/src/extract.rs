use std::collections::{HashMap, HashSet};
use std::io::{self, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::header::resolve_columns;
use crate::model::{CellValue, DetectedTable, ExtractedTable, Row};
use crate::options::{ExtractOptions, QualityMode};
use crate::pdf_reader::read_pdf_pages;
use crate::table_detect::{LOW_CONFIDENCE_THRESHOLD, detect_tables};
use crate::table_parse::pad_rows;
use crate::warning::{ExtractWarning, WarningCode};

/// A table that was detected but could not be turned into an
/// [`ExtractedTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFailure {
    pub table_number: usize,
    pub page: Option<u32>,
    pub message: String,
}

/// Everything an extraction adapter hands over for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Tables detected in the document, including ones that failed later.
    pub number_of_tables: usize,
    pub tables: Vec<ExtractedTable>,
    pub failures: Vec<TableFailure>,
    pub warnings: Vec<ExtractWarning>,
    /// Set when the document as a whole could not be processed.
    pub error: Option<String>,
}

impl Extraction {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Turns a PDF document into tables.
///
/// Implementations never fail outright: a document that cannot be read comes
/// back as an [`Extraction`] with no tables and an error message.
pub trait TableExtractor {
    fn extract(&self, pdf: &[u8]) -> Extraction;

    fn extract_path(&self, path: &Path) -> Extraction {
        match std::fs::read(path) {
            Ok(bytes) => self.extract(&bytes),
            Err(error) => Extraction::failed(format!(
                "Error processing PDF: cannot read '{}': {error}",
                path.display()
            )),
        }
    }
}

/// Table extraction over the PDF text layer.
#[derive(Debug, Clone)]
pub struct TextLayerExtractor {
    options: ExtractOptions,
}

impl TextLayerExtractor {
    pub fn new(options: ExtractOptions) -> Result<Self, ExtractError> {
        if options.do_ocr {
            return Err(ExtractError::InvalidOption(
                "OCR is not available; only the PDF text layer can be read".to_string(),
            ));
        }
        if options.min_cols < 2 {
            return Err(ExtractError::InvalidOption(
                "min_cols must be at least 2".to_string(),
            ));
        }
        Ok(Self { options })
    }

    #[must_use]
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    fn try_extract(&self, pdf: &[u8]) -> Result<Extraction, ExtractError> {
        let pages = read_pdf_pages(pdf, self.options.pages.as_ref())?;
        let detected = detect_tables(&pages, &self.options);

        let mut extraction = Extraction {
            number_of_tables: detected.len(),
            ..Extraction::default()
        };

        for (index, table) in detected.iter().enumerate() {
            let table_number = index + 1;
            match self.shape_table(table, table_number, &mut extraction.warnings) {
                Ok(Some(shaped)) => {
                    tracing::debug!(
                        table = table_number,
                        page = table.page,
                        rows = shaped.row_count,
                        "extracted table"
                    );
                    extraction.tables.push(shaped);
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(table = table_number, "skipping table: {error}");
                    extraction.failures.push(TableFailure {
                        table_number,
                        page: Some(table.page),
                        message: format!("Error processing table {table_number}: {error}"),
                    });
                }
            }
        }

        if detected.is_empty() {
            extraction.warnings.push(ExtractWarning::new(
                WarningCode::NoTablesDetected,
                "no table rows were detected in the selected pages",
            ));
        }

        Ok(extraction)
    }

    /// `Ok(None)` means the table was dropped on purpose.
    fn shape_table(
        &self,
        table: &DetectedTable,
        table_number: usize,
        warnings: &mut Vec<ExtractWarning>,
    ) -> Result<Option<ExtractedTable>, ExtractError> {
        if table.confidence < LOW_CONFIDENCE_THRESHOLD {
            let warning = |message: &str| {
                ExtractWarning::new(WarningCode::LowConfidence, message)
                    .with_page(table.page)
                    .with_table_number(table_number)
                    .with_confidence(table.confidence)
            };
            match self.options.quality_mode {
                QualityMode::BestEffort => warnings.push(warning(
                    "table confidence is low; exported in best-effort mode",
                )),
                QualityMode::SkipAmbiguous => {
                    warnings.push(warning("skipping low-confidence table"));
                    return Ok(None);
                }
                QualityMode::Strict => {
                    return Err(ExtractError::AmbiguousTable {
                        table_number,
                        page: table.page,
                        confidence: table.confidence,
                    });
                }
            }
        }

        let (columns, data) =
            resolve_columns(table, self.options.header_mode, table_number, warnings);
        let columns = unique_columns(columns);

        if data.iter().flatten().all(|cell| cell.trim().is_empty()) {
            return Err(ExtractError::EmptyTable {
                table_number,
                page: table.page,
            });
        }

        let rows = pad_rows(&data, columns.len())
            .into_iter()
            .map(|cells| {
                columns
                    .iter()
                    .zip(cells)
                    .map(|(column, cell)| {
                        let value = if cell.is_empty() {
                            CellValue::Null
                        } else {
                            CellValue::Text(cell)
                        };
                        (column.clone(), value)
                    })
                    .collect::<Row>()
            })
            .collect();

        Ok(Some(
            ExtractedTable::new(table_number, columns, rows).on_page(table.page),
        ))
    }
}

impl TableExtractor for TextLayerExtractor {
    fn extract(&self, pdf: &[u8]) -> Extraction {
        self.try_extract(pdf)
            .unwrap_or_else(|error| Extraction::failed(format!("Error processing PDF: {error}")))
    }
}

/// Suffixes repeated titles (`Amount`, `Amount.1`) so no cell is shadowed.
/// A generated name never reuses a title that is already taken or that
/// appears elsewhere in the header.
fn unique_columns(columns: Vec<String>) -> Vec<String> {
    let titles: HashSet<String> = columns.iter().cloned().collect();
    let mut taken: HashSet<String> = HashSet::with_capacity(columns.len());
    let mut next_suffix: HashMap<String, usize> = HashMap::new();

    columns
        .into_iter()
        .map(|column| {
            if taken.insert(column.clone()) {
                return column;
            }
            let suffix = next_suffix.entry(column.clone()).or_insert(1);
            loop {
                let candidate = format!("{column}.{suffix}");
                *suffix += 1;
                if !titles.contains(&candidate) && taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// Spools `input` into a temporary file under `work_dir`, runs the extractor
/// on it and removes the file again, whatever the outcome.
pub fn stage_and_extract<R, E>(input: &mut R, work_dir: Option<&Path>, extractor: &E) -> Extraction
where
    R: Read + ?Sized,
    E: TableExtractor + ?Sized,
{
    let staged = match work_dir {
        Some(dir) => tempfile::Builder::new()
            .prefix("statement-")
            .suffix(".pdf")
            .tempfile_in(dir),
        None => tempfile::Builder::new()
            .prefix("statement-")
            .suffix(".pdf")
            .tempfile(),
    };
    let mut staged = match staged {
        Ok(file) => file,
        Err(error) => {
            return Extraction::failed(format!(
                "Error processing PDF: cannot stage input: {error}"
            ));
        }
    };

    let copied = io::copy(input, &mut staged).and_then(|_| staged.flush());
    let extraction = match copied {
        Ok(()) => extractor.extract_path(staged.path()),
        Err(error) => Extraction::failed(format!(
            "Error processing PDF: cannot stage input: {error}"
        )),
    };

    let staged_path = staged.path().to_path_buf();
    if let Err(error) = staged.close() {
        tracing::warn!(
            path = %staged_path.display(),
            "failed to remove staged input: {error}"
        );
    }

    extraction
}
