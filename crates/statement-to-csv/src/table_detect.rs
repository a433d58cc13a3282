use crate::model::{DetectedTable, PageText};
use crate::options::ExtractOptions;
use crate::table_parse::{modal_width, soft_split_line_into_cells, split_line_into_cells};

pub(crate) const LOW_CONFIDENCE_THRESHOLD: f32 = 0.60;

/// Layout consistency of a candidate table, from 0.0 to 1.0.
fn table_confidence(rows: &[Vec<String>]) -> f32 {
    if rows.len() < 2 {
        return 0.0;
    }

    let modal = modal_width(rows);
    if modal == 0 {
        return 0.0;
    }

    let consistent =
        rows.iter().filter(|row| row.len() == modal).count() as f32 / rows.len() as f32;
    let widest = rows.iter().map(Vec::len).max().unwrap_or(modal);
    let narrowest = rows.iter().map(Vec::len).min().unwrap_or(modal);
    let uniformity = 1.0 - (widest - narrowest) as f32 / widest as f32;

    (consistent * 0.75 + uniformity * 0.25).clamp(0.0, 1.0)
}

fn line_cells(line: &str, min_cols: usize) -> Vec<String> {
    let cells = split_line_into_cells(line);
    if cells.len() >= min_cols {
        return cells;
    }

    // Statement lines often come out of the text layer with single spaces.
    let soft_cells = soft_split_line_into_cells(line);
    let has_digit = soft_cells
        .iter()
        .any(|cell| cell.chars().any(|ch| ch.is_ascii_digit()));
    let looks_like_sentence = line
        .trim_end()
        .ends_with(|ch: char| matches!(ch, '.' | '!' | '?'));

    if soft_cells.len() >= min_cols && !looks_like_sentence && (has_digit || soft_cells.len() <= 6)
    {
        soft_cells
    } else {
        cells
    }
}

fn detect_tables_in_page(page: &PageText, min_cols: usize) -> Vec<DetectedTable> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    let flush = |current: &mut Vec<Vec<String>>, tables: &mut Vec<DetectedTable>| {
        if current.len() >= 2 {
            let confidence = table_confidence(current);
            tables.push(DetectedTable {
                page: page.page_number,
                rows: std::mem::take(current),
                confidence,
            });
        } else {
            current.clear();
        }
    };

    for line in page.text.lines() {
        let cells = line_cells(line, min_cols);
        if cells.len() >= min_cols {
            current.push(cells);
        } else {
            flush(&mut current, &mut tables);
        }
    }
    flush(&mut current, &mut tables);

    tables
}

/// One single-column table per page holding every non-empty line.
fn page_line_tables(pages: &[PageText]) -> Vec<DetectedTable> {
    pages
        .iter()
        .filter_map(|page| {
            let rows = page
                .text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| vec![line.to_string()])
                .collect::<Vec<_>>();
            (!rows.is_empty()).then(|| DetectedTable {
                page: page.page_number,
                rows,
                confidence: 1.0,
            })
        })
        .collect()
}

pub(crate) fn detect_tables(pages: &[PageText], options: &ExtractOptions) -> Vec<DetectedTable> {
    if !options.do_table_structure {
        return page_line_tables(pages);
    }

    let min_cols = options.min_cols.max(2);
    pages
        .iter()
        .flat_map(|page| detect_tables_in_page(page, min_cols))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{LOW_CONFIDENCE_THRESHOLD, detect_tables};
    use crate::model::PageText;
    use crate::options::ExtractOptions;

    fn page(page_number: u32, text: &str) -> PageText {
        PageText {
            page_number,
            text: text.to_string(),
        }
    }

    #[test]
    fn detects_statement_block_between_prose() {
        let pages = vec![page(
            1,
            "Account statement for March.\n\
             Post Date  Value Date  Details  Amount  Balance\n\
             15/03/24  15/03/24  CREDIT  2,500.00  10,000.00Cr\n\
             16/03/24  16/03/24  DEBIT  100.00  9,900.00Cr\n\
             Thank you for banking with us.",
        )];

        let tables = detect_tables(&pages, &ExtractOptions::default());

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
        assert!(tables[0].confidence >= LOW_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn single_space_statement_lines_fall_back_to_soft_split() {
        let pages = vec![page(
            3,
            "01/01/24 02/01/24 DEBIT 100.00 900.00Dr\n03/01/24 04/01/24 CREDIT 50.00 950.00Cr",
        )];

        let tables = detect_tables(&pages, &ExtractOptions::default());

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].page, 3);
        assert_eq!(tables[0].rows[0].len(), 5);
    }

    #[test]
    fn ragged_rows_lower_confidence() {
        let pages = vec![page(1, "A  B  C\n1  2\n3  4  5  6\n7  8")];

        let tables = detect_tables(&pages, &ExtractOptions::default());

        assert_eq!(tables.len(), 1);
        assert!(tables[0].confidence < LOW_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn without_table_structure_each_page_is_one_column() {
        let pages = vec![page(1, "first line\n\n second line "), page(2, "   ")];
        let options = ExtractOptions {
            do_table_structure: false,
            ..ExtractOptions::default()
        };

        let tables = detect_tables(&pages, &options);

        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].rows,
            vec![vec!["first line".to_string()], vec!["second line".to_string()]]
        );
    }
}
