//! Reparses extracted table text into transaction records.
//!
//! Each row is flattened into one line of text and scanned for statement
//! lines of the shape
//!
//! ```text
//! 15/03/24 15/03/24 CREDIT 2,500.00 10,000.00Cr
//! <post>   <value>  <type> <amount> <balance><Dr|Cr>
//! ```
//!
//! A row may hold several such lines; rows without one contribute nothing.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{ExtractedTable, Row, TransactionRecord};

fn transaction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?P<post>\d{2}/\d{2}/\d{2})\s+",
            r"(?P<value>\d{2}/\d{2}/\d{2})\s+",
            r"(?P<kind>\w+)\s+",
            r"(?P<amount>[\d,]+\.\d{2})\s+",
            r"(?P<balance>[\d,]+\.\d{2})(?:Dr|Cr)",
        ))
        .expect("hardcoded transaction regex is valid")
    })
}

fn strip_grouping(amount: &str) -> String {
    amount.replace(',', "")
}

/// Joins the non-blank text cells of a row with single spaces.
///
/// Numbers and nulls are not part of the statement text and are skipped.
#[must_use]
pub fn flatten_row(row: &Row) -> String {
    row.values()
        .filter_map(|value| value.as_text())
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every transaction line found in `text`, in order of appearance.
#[must_use]
pub fn parse_transactions(text: &str) -> Vec<TransactionRecord> {
    transaction_re()
        .captures_iter(text)
        .map(|caps| {
            let transaction_type = caps["kind"].to_uppercase();
            let amount = strip_grouping(&caps["amount"]);

            // Only these two literal spellings route the amount.
            let debit = (transaction_type == "DEBIT").then(|| amount.clone());
            let credit = (transaction_type == "CREDIT").then_some(amount);

            TransactionRecord {
                post_date: caps["post"].to_string(),
                value_date: caps["value"].to_string(),
                transaction_type,
                debit,
                credit,
                balance: strip_grouping(&caps["balance"]),
            }
        })
        .collect()
}

/// Scans every row of every table and returns the transactions in
/// table, row and match order.
#[must_use]
pub fn normalize(tables: &[ExtractedTable]) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    for table in tables {
        let before = records.len();
        for row in &table.rows {
            let text = flatten_row(row);
            if text.is_empty() {
                continue;
            }
            records.extend(parse_transactions(&text));
        }
        tracing::debug!(
            table = table.table_number,
            rows = table.rows.len(),
            transactions = records.len() - before,
            "normalized table"
        );
    }
    records
}

#[cfg(test)]
mod tests {
    use super::{flatten_row, normalize, parse_transactions};
    use crate::model::{CellValue, ExtractedTable, Row, TransactionRecord};

    fn text_table(table_number: usize, lines: &[&str]) -> ExtractedTable {
        let rows = lines
            .iter()
            .map(|line| Row::from_iter([("Col1", *line)]))
            .collect();
        ExtractedTable::new(table_number, vec!["Col1".to_string()], rows)
    }

    fn record(
        post_date: &str,
        value_date: &str,
        transaction_type: &str,
        debit: Option<&str>,
        credit: Option<&str>,
        balance: &str,
    ) -> TransactionRecord {
        TransactionRecord {
            post_date: post_date.to_string(),
            value_date: value_date.to_string(),
            transaction_type: transaction_type.to_string(),
            debit: debit.map(str::to_string),
            credit: credit.map(str::to_string),
            balance: balance.to_string(),
        }
    }

    #[test]
    fn single_credit_line_becomes_one_record() {
        let tables = vec![text_table(
            1,
            &["15/03/24 15/03/24 CREDIT 2,500.00 10,000.00Cr"],
        )];

        assert_eq!(
            normalize(&tables),
            vec![record(
                "15/03/24",
                "15/03/24",
                "CREDIT",
                None,
                Some("2500.00"),
                "10000.00"
            )]
        );
    }

    #[test]
    fn finds_every_transaction_in_one_row() {
        let records = parse_transactions(
            "01/01/24 02/01/24 DEBIT 100.00 900.00Dr 03/01/24 04/01/24 CREDIT 50.00 950.00Cr",
        );

        assert_eq!(
            records,
            vec![
                record("01/01/24", "02/01/24", "DEBIT", Some("100.00"), None, "900.00"),
                record("03/01/24", "04/01/24", "CREDIT", None, Some("50.00"), "950.00"),
            ]
        );
    }

    #[test]
    fn keeps_table_then_row_order() {
        let tables = vec![
            text_table(1, &["01/01/24 01/01/24 DEBIT 1.00 9.00Dr"]),
            text_table(
                2,
                &[
                    "02/01/24 02/01/24 CREDIT 2.00 11.00Cr",
                    "not a transaction",
                    "03/01/24 03/01/24 DEBIT 3.00 8.00Dr",
                ],
            ),
        ];

        let dates = normalize(&tables)
            .into_iter()
            .map(|record| record.post_date)
            .collect::<Vec<_>>();
        assert_eq!(dates, vec!["01/01/24", "02/01/24", "03/01/24"]);
    }

    #[test]
    fn normalizing_twice_gives_identical_output() {
        let tables = vec![text_table(
            1,
            &["01/01/24 02/01/24 debit 1,000,000.99 5.00Cr"],
        )];

        let first = normalize(&tables);
        assert_eq!(first, normalize(&tables));
        assert_eq!(first[0].transaction_type, "DEBIT");
        assert_eq!(first[0].debit.as_deref(), Some("1000000.99"));
    }

    #[test]
    fn other_type_tokens_fill_neither_amount_column() {
        let records = parse_transactions("05/05/24 05/05/24 WDL 40.00 60.00Dr");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].transaction_type, "WDL");
        assert_eq!(records[0].debit, None);
        assert_eq!(records[0].credit, None);
        assert_eq!(records[0].balance, "60.00");
    }

    #[test]
    fn incomplete_lines_do_not_match() {
        for text in [
            "Reference ABC 01/01/24",
            "01/01/2024 02/01/2024 DEBIT 100.00 900.00Dr",
            "01/01/24 02/01/24 DEBIT 100.00 900.00",
            "01/01/24 02/01/24 DEBIT 100.0 900.00Dr",
            "01/01/24 02/01/24 DEBIT 100.00 900.00 Dr",
        ] {
            assert!(parse_transactions(text).is_empty(), "matched: {text}");
        }
    }

    #[test]
    fn flatten_skips_blank_numeric_and_null_cells() {
        let row = Row::from_iter([
            ("a", CellValue::from("01/01/24")),
            ("b", CellValue::from("   ")),
            ("c", CellValue::Number(7.0)),
            ("d", CellValue::Null),
            ("e", CellValue::from("02/01/24")),
        ]);

        assert_eq!(flatten_row(&row), "01/01/24 02/01/24");
    }

    #[test]
    fn transactions_split_across_cells_are_joined() {
        let row = Row::from_iter([
            ("Post Date", "15/03/24"),
            ("Value Date", "15/03/24"),
            ("Details", "CREDIT"),
            ("Amount", "2,500.00"),
            ("Balance", "10,000.00Cr"),
        ]);
        let table = ExtractedTable::new(1, Vec::new(), vec![row]);

        assert_eq!(normalize(&[table]).len(), 1);
    }

    #[test]
    fn blank_and_numeric_rows_contribute_nothing() {
        let rows = vec![
            Row::from_iter([("Col1", CellValue::from("   "))]),
            Row::from_iter([("Col1", CellValue::Number(1.0)), ("Col2", CellValue::Null)]),
            Row::new(),
        ];
        let table = ExtractedTable::new(1, vec!["Col1".to_string()], rows);

        assert!(normalize(&[table]).is_empty());
    }

    #[test]
    fn at_most_one_amount_column_is_filled() {
        let records = parse_transactions(
            "01/01/24 01/01/24 DEBIT 1.00 2.00Dr 01/01/24 01/01/24 CREDIT 1.00 3.00Cr \
             01/01/24 01/01/24 POS 1.00 2.00Dr",
        );

        assert_eq!(records.len(), 3);
        for record in &records {
            assert!(record.debit.is_none() || record.credit.is_none());
            assert_eq!(record.debit.is_some(), record.transaction_type == "DEBIT");
            assert_eq!(record.credit.is_some(), record.transaction_type == "CREDIT");
        }
    }
}
