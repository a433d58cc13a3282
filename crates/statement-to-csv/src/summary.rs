use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{CellValue, ExtractedTable};

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` for a single value.
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    let position = fraction * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

fn summarize(mut values: Vec<f64>) -> Option<ColumnSummary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let squares = values.iter().map(|value| (value - mean).powi(2)).sum::<f64>();
        (squares / (count - 1) as f64).sqrt()
    });

    Some(ColumnSummary {
        count,
        mean,
        std,
        min: values[0],
        p25: percentile(&values, 0.25),
        p50: percentile(&values, 0.50),
        p75: percentile(&values, 0.75),
        max: values[count - 1],
    })
}

/// Summaries for the columns whose non-null cells are all numbers.
#[must_use]
pub fn numerical_summary(table: &ExtractedTable) -> BTreeMap<String, ColumnSummary> {
    let mut summaries = BTreeMap::new();
    for column in &table.columns {
        let mut values = Vec::new();
        let mut numeric = true;
        for cell in table.rows.iter().filter_map(|row| row.get(column)) {
            match cell {
                CellValue::Number(value) => values.push(*value),
                CellValue::Null => {}
                CellValue::Text(_) | CellValue::Other(_) => {
                    numeric = false;
                    break;
                }
            }
        }

        if numeric && let Some(summary) = summarize(values) {
            summaries.insert(column.clone(), summary);
        }
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::numerical_summary;
    use crate::model::{CellValue, ExtractedTable, Row};

    #[test]
    fn summarizes_only_all_numeric_columns() {
        let rows = [1.0, 2.0, 3.0, 4.0]
            .into_iter()
            .map(|value| {
                Row::from_iter([
                    ("amount", CellValue::Number(value)),
                    ("details", CellValue::from("DEBIT")),
                    ("empty", CellValue::Null),
                ])
            })
            .collect();
        let table = ExtractedTable::new(
            1,
            vec![
                "amount".to_string(),
                "details".to_string(),
                "empty".to_string(),
            ],
            rows,
        );

        let summary = numerical_summary(&table);

        assert_eq!(summary.len(), 1);
        let amount = &summary["amount"];
        assert_eq!(amount.count, 4);
        assert!((amount.mean - 2.5).abs() < 1e-9);
        assert!((amount.p25 - 1.75).abs() < 1e-9);
        assert!((amount.p50 - 2.5).abs() < 1e-9);
        assert!((amount.std.unwrap_or_default() - 1.290_994_448_7).abs() < 1e-6);
        assert_eq!(amount.max, 4.0);
    }

    #[test]
    fn single_value_has_no_deviation() {
        let table = ExtractedTable::new(
            1,
            vec!["n".to_string()],
            vec![Row::from_iter([("n", CellValue::Number(5.0))])],
        );

        let summary = numerical_summary(&table);

        assert_eq!(summary["n"].std, None);
        assert_eq!(summary["n"].p75, 5.0);
    }
}
