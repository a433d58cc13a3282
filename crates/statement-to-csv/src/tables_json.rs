use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::extract::{Extraction, TableFailure};
use crate::model::ExtractedTable;
use crate::summary::{ColumnSummary, numerical_summary};

/// Interchange form of an extraction, readable from any external adapter.
///
/// Tables that cannot be read are reported in `failures` instead of
/// rejecting the whole document.
#[derive(Debug, Clone, PartialEq)]
pub struct TablesDocument {
    pub number_of_tables: usize,
    pub tables: Vec<ExtractedTable>,
    pub failures: Vec<TableFailure>,
    pub error: Option<String>,
}

impl From<TablesDocument> for Extraction {
    fn from(document: TablesDocument) -> Self {
        Self {
            number_of_tables: document.number_of_tables,
            tables: document.tables,
            failures: document.failures,
            error: document.error,
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
struct RawDocument {
    number_of_tables: usize,
    tables: Vec<serde_json::Value>,
    #[serde(default)]
    failures: Vec<TableFailure>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct TableDump<'a> {
    #[serde(flatten)]
    table: &'a ExtractedTable,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    numerical_summary: BTreeMap<String, ColumnSummary>,
}

#[derive(Serialize)]
struct DocumentDump<'a> {
    number_of_tables: usize,
    tables: Vec<TableDump<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: &'a Vec<TableFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

pub fn tables_to_json(extraction: &Extraction) -> Result<String, ExtractError> {
    let dump = DocumentDump {
        number_of_tables: extraction.number_of_tables,
        tables: extraction
            .tables
            .iter()
            .map(|table| TableDump {
                table,
                numerical_summary: numerical_summary(table),
            })
            .collect(),
        failures: &extraction.failures,
        error: extraction.error.as_deref(),
    };
    Ok(serde_json::to_string_pretty(&dump)?)
}

/// Parses a tables document. Only a malformed envelope is an error; a table
/// that does not parse becomes a [`TableFailure`] and its siblings are kept.
pub fn tables_from_json(json: &str) -> Result<TablesDocument, ExtractError> {
    let raw: RawDocument = serde_json::from_str(json)?;

    let mut tables = Vec::with_capacity(raw.tables.len());
    let mut failures = raw.failures;
    for (index, value) in raw.tables.into_iter().enumerate() {
        let table_number = value
            .get("table_number")
            .and_then(serde_json::Value::as_u64)
            .and_then(|number| usize::try_from(number).ok())
            .unwrap_or(index + 1);
        let page = value
            .pointer("/location/page")
            .and_then(serde_json::Value::as_u64)
            .and_then(|page| u32::try_from(page).ok());

        match serde_json::from_value::<ExtractedTable>(value) {
            Ok(table) => tables.push(table),
            Err(error) => {
                tracing::warn!(table = table_number, "skipping unreadable table: {error}");
                failures.push(TableFailure {
                    table_number,
                    page,
                    message: format!("Error processing table {table_number}: {error}"),
                });
            }
        }
    }

    Ok(TablesDocument {
        number_of_tables: raw.number_of_tables,
        tables,
        failures,
        error: raw.error,
    })
}

#[cfg(test)]
mod tests {
    use super::{tables_from_json, tables_to_json};
    use crate::extract::{Extraction, TableFailure};
    use crate::normalize::normalize;
    use crate::model::{CellValue, ExtractedTable, Row};

    #[test]
    fn dump_adds_summary_only_for_numeric_tables() {
        let numeric = ExtractedTable::new(
            1,
            vec!["n".to_string()],
            vec![Row::from_iter([("n", CellValue::Number(2.0))])],
        )
        .on_page(1);
        let text = ExtractedTable::new(
            2,
            vec!["t".to_string()],
            vec![Row::from_iter([("t", "x")])],
        );
        let extraction = Extraction {
            number_of_tables: 2,
            tables: vec![numeric, text],
            ..Extraction::default()
        };

        let json = tables_to_json(&extraction).expect("dump should serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("dump is JSON");

        assert_eq!(value["number_of_tables"], 2);
        assert_eq!(value["tables"][0]["location"]["page"], 1);
        assert_eq!(value["tables"][0]["numerical_summary"]["n"]["count"], 1);
        assert!(value["tables"][1].get("numerical_summary").is_none());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn reads_documents_from_external_adapters() {
        let document = tables_from_json(
            r#"{
                "number_of_tables": 1,
                "tables": [{
                    "table_number": 1,
                    "columns": ["Col1", "Col2"],
                    "row_count": 1,
                    "data": [{"Col1": "15/03/24 15/03/24 CREDIT", "Col2": "2,500.00 10,000.00Cr"}],
                    "location": {"page": 1, "coordinates": {"l": 10.0, "t": 20.0}}
                }]
            }"#,
        )
        .expect("document should parse");

        assert_eq!(document.tables.len(), 1);
        assert!(document.tables[0].location.coordinates.is_some());
        assert_eq!(document.error, None);
    }

    #[test]
    fn unreadable_table_does_not_sink_its_siblings() {
        let document = tables_from_json(
            r#"{
                "number_of_tables": 3,
                "tables": [
                    {"table_number": 1, "columns": ["Col1"], "row_count": 1,
                     "data": [{"Col1": "15/03/24 15/03/24 CREDIT 2,500.00 10,000.00Cr"}],
                     "location": {"page": 1, "coordinates": null}},
                    {"table_number": 2, "columns": ["f"], "row_count": 1,
                     "data": [{"f": true}],
                     "location": {"page": 2, "coordinates": null}},
                    {"table_number": 3, "columns": "oops", "location": {"page": 2}}
                ]
            }"#,
        )
        .expect("envelope is valid");

        assert_eq!(document.tables.len(), 2);
        assert_eq!(document.failures.len(), 1);
        assert_eq!(document.failures[0].table_number, 3);
        assert_eq!(document.failures[0].page, Some(2));
        assert!(
            document.failures[0]
                .message
                .starts_with("Error processing table 3")
        );

        let records = normalize(&document.tables);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].credit.as_deref(), Some("2500.00"));
    }

    #[test]
    fn table_failures_survive_a_dump_and_reload() {
        let extraction = Extraction {
            number_of_tables: 2,
            tables: vec![ExtractedTable::new(
                1,
                vec!["t".to_string()],
                vec![Row::from_iter([("t", "x")])],
            )],
            failures: vec![TableFailure {
                table_number: 2,
                page: Some(1),
                message: "Error processing table 2: no data rows".to_string(),
            }],
            ..Extraction::default()
        };

        let json = tables_to_json(&extraction).expect("dump should serialize");
        let document = tables_from_json(&json).expect("dump should parse");

        assert_eq!(document.failures, extraction.failures);
        assert_eq!(document.tables.len(), 1);
    }
}
