use std::collections::BTreeMap;

use encoding_rs::UTF_16BE;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use crate::error::ExtractError;
use crate::model::PageText;
use crate::options::PageSelection;
use crate::table_parse::{soft_split_line_into_cells, split_line_into_cells};

const WEAK_PAGE_SCORE: i64 = 80;

fn split_text_into_pages(raw_text: &str) -> Vec<String> {
    let mut pages = raw_text
        .split('\u{000C}')
        .map(str::to_string)
        .collect::<Vec<_>>();
    if pages.last().is_some_and(String::is_empty) {
        pages.pop();
    }
    pages
}

fn looks_decoding_broken(text: &str) -> bool {
    if text.contains("?Identity-H Unimplemented?") {
        return true;
    }

    let total = text.chars().count();
    if total == 0 {
        return false;
    }

    let replacement = text.matches('\u{FFFD}').count();
    let control = text
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();

    replacement * 8 > total || control * 5 > total
}

fn decode_pdf_bytes(encoding: Option<&str>, bytes: &[u8]) -> String {
    let decoded = Document::decode_text(encoding, bytes);
    if !looks_decoding_broken(&decoded) {
        return decoded;
    }

    let has_bom = bytes.starts_with(&[0xFE, 0xFF]);
    let wide_font = encoding.is_some_and(|name| {
        let lower = name.to_ascii_lowercase();
        ["utf16", "ucs2", "identity-h", "unicode"]
            .iter()
            .any(|hint| lower.contains(hint))
    });
    if has_bom || wide_font {
        let payload = if has_bom { &bytes[2..] } else { bytes };
        let (utf16, had_errors) = UTF_16BE.decode_without_bom_handling(payload);
        if !had_errors && !utf16.is_empty() {
            return utf16.into_owned();
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// Ranks candidate page texts; statement-like lines with dates and amounts
/// split into several cells score highest.
fn extraction_quality_score(text: &str) -> i64 {
    if text.trim().is_empty() {
        return i64::MIN / 4;
    }

    let mut score = 0_i64;
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        score += 1;
        if split_line_into_cells(line).len() >= 2 || soft_split_line_into_cells(line).len() >= 3 {
            score += 50;
        }
        if line.contains('/') && line.chars().any(|ch| ch.is_ascii_digit()) {
            score += 15;
        }
        if line.contains('.') && (line.contains("Dr") || line.contains("Cr")) {
            score += 10;
        }
    }

    if looks_decoding_broken(text) {
        score -= 800;
    }
    score
}

fn extract_text_from_page_content(document: &Document, page_id: ObjectId) -> Option<String> {
    fn collect_text(text: &mut String, encoding: Option<&str>, operands: &[Object]) {
        for operand in operands {
            match operand {
                Object::String(bytes, _) => text.push_str(&decode_pdf_bytes(encoding, bytes)),
                Object::Array(items) => {
                    collect_text(text, encoding, items);
                    text.push(' ');
                }
                // Large negative kerning in TJ arrays is a visual gap.
                Object::Integer(value) if *value < -100 => text.push(' '),
                _ => {}
            }
        }
    }

    let raw_content = document.get_page_content(page_id).ok()?;
    let content = Content::decode(&raw_content).ok()?;
    let encodings = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect::<BTreeMap<Vec<u8>, &str>>();

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_encoding = None;
    for operation in content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                current_encoding = operation
                    .operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                    .and_then(|font_name| encodings.get(font_name).copied());
            }
            "Tj" | "TJ" | "'" | "\"" => {
                collect_text(&mut current, current_encoding, &operation.operands);
            }
            "T*" | "Td" | "TD" | "ET" if !current.trim().is_empty() => {
                lines.push(std::mem::take(&mut current));
            }
            _ => {}
        }
    }

    if !current.trim().is_empty() {
        lines.push(current);
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Loads a PDF held in memory and returns the best text found for every
/// selected page.
pub(crate) fn read_pdf_pages(
    input_pdf: &[u8],
    page_selection: Option<&PageSelection>,
) -> Result<Vec<PageText>, ExtractError> {
    let document = Document::load_mem(input_pdf)?;
    let pages_map = document.get_pages();

    let (split_pages, whole_text) = match pdf_extract::extract_text_from_mem(input_pdf) {
        Ok(text) => {
            let pages = split_text_into_pages(&text);
            if pages.len() == pages_map.len() {
                (Some(pages), None)
            } else {
                (None, Some(text))
            }
        }
        Err(error) => {
            tracing::debug!("pdf-extract could not read the document: {error}");
            (None, None)
        }
    };

    let mut pages = Vec::new();
    for (index, (&page_no, &page_id)) in pages_map.iter().enumerate() {
        if page_selection.is_some_and(|selection| !selection.contains(page_no)) {
            continue;
        }

        let mut candidates = Vec::new();
        if let Some(text) = split_pages
            .as_ref()
            .and_then(|pages| pages.get(index))
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text.clone());
        }
        if let Some(text) = extract_text_from_page_content(&document, page_id) {
            candidates.push(text);
        }
        if let Some(text) = document
            .extract_text(&[page_no])
            .ok()
            .filter(|text| !text.trim().is_empty())
        {
            candidates.push(text);
        }

        let best_local = candidates
            .iter()
            .map(|text| extraction_quality_score(text))
            .max()
            .unwrap_or(i64::MIN / 4);
        if index == 0
            && best_local < WEAK_PAGE_SCORE
            && let Some(text) = whole_text.as_ref().filter(|text| !text.trim().is_empty())
        {
            candidates.push(text.clone());
        }

        let text = candidates
            .into_iter()
            .max_by_key(|text| extraction_quality_score(text))
            .unwrap_or_default();
        tracing::debug!(page = page_no, chars = text.len(), "selected page text");

        pages.push(PageText {
            page_number: page_no,
            text,
        });
    }

    if pages.is_empty() {
        return Err(ExtractError::NoPagesSelected);
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::{
        decode_pdf_bytes, extraction_quality_score, looks_decoding_broken, split_text_into_pages,
    };

    #[test]
    fn splits_form_feed_delimited_pages() {
        let pages = split_text_into_pages("p1\u{000C}p2\u{000C}");
        assert_eq!(pages, vec!["p1", "p2"]);
    }

    #[test]
    fn flags_replacement_heavy_text_as_broken() {
        assert!(looks_decoding_broken("\u{FFFD}\u{FFFD}ab"));
        assert!(looks_decoding_broken("?Identity-H Unimplemented?"));
        assert!(!looks_decoding_broken("15/03/24 CREDIT 2,500.00"));
    }

    #[test]
    fn falls_back_to_lossy_utf8_for_unknown_fonts() {
        assert_eq!(decode_pdf_bytes(None, b"DEBIT"), "DEBIT");
    }

    #[test]
    fn statement_text_outranks_prose() {
        let statement = "01/01/24  02/01/24  DEBIT  100.00  900.00Dr";
        let prose = "Thank you for banking with us";
        assert!(extraction_quality_score(statement) > extraction_quality_score(prose));
    }
}
