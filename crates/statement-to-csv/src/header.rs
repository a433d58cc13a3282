use crate::model::DetectedTable;
use crate::options::HeaderMode;
use crate::warning::{ExtractWarning, WarningCode};

const HEADER_CONFIDENCE_THRESHOLD: f32 = 0.55;

fn is_numeric(value: &str) -> bool {
    value.trim().replace(',', "").parse::<f64>().is_ok()
}

fn text_ratio(cells: &[String]) -> f32 {
    if cells.is_empty() {
        return 0.0;
    }

    let text_cells = cells.iter().filter(|cell| !is_numeric(cell)).count();
    text_cells as f32 / cells.len() as f32
}

/// Guesses whether the first row holds column titles.
///
/// A header row is mostly non-numeric while the row under it carries numbers.
pub(crate) fn infer_has_header(rows: &[Vec<String>]) -> (bool, f32) {
    let Some(first) = rows.first() else {
        return (false, 0.0);
    };

    let first = text_ratio(first);
    let second = rows.get(1).map_or(0.0, |row| text_ratio(row));

    let confidence = (first * 0.6 + (1.0 - second) * 0.4).clamp(0.0, 1.0);
    (first >= 0.6 && second <= 0.7, confidence)
}

fn generated_columns(width: usize) -> Vec<String> {
    (1..=width).map(|index| format!("col_{index}")).collect()
}

fn header_columns(header: &[String], width: usize) -> Vec<String> {
    (0..width)
        .map(|index| match header.get(index).map(|name| name.trim()) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("col_{}", index + 1),
        })
        .collect()
}

/// Splits a detected table into column names and data rows.
pub(crate) fn resolve_columns(
    table: &DetectedTable,
    mode: HeaderMode,
    table_number: usize,
    warnings: &mut Vec<ExtractWarning>,
) -> (Vec<String>, Vec<Vec<String>>) {
    let width = table.rows.iter().map(Vec::len).max().unwrap_or(0);
    let use_header = match mode {
        HeaderMode::HasHeader => true,
        HeaderMode::NoHeader => false,
        HeaderMode::AutoDetect => {
            let (has_header, confidence) = infer_has_header(&table.rows);
            if confidence < HEADER_CONFIDENCE_THRESHOLD {
                warnings.push(
                    ExtractWarning::new(
                        WarningCode::HeaderInferenceLowConfidence,
                        "header inference confidence is low; keeping the first row as data",
                    )
                    .with_page(table.page)
                    .with_table_number(table_number)
                    .with_confidence(confidence),
                );
            }
            has_header && confidence >= HEADER_CONFIDENCE_THRESHOLD
        }
    };

    match table.rows.split_first() {
        Some((header, data)) if use_header => (header_columns(header, width), data.to_vec()),
        _ => (generated_columns(width), table.rows.clone()),
    }
}
