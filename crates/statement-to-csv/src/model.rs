use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageText {
    pub page_number: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DetectedTable {
    pub page: u32,
    pub rows: Vec<Vec<String>>,
    pub confidence: f32,
}

/// A single table cell as handed over by an extraction adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Null,
    /// Any other JSON value (booleans, arrays, objects); never flattened.
    Other(serde_json::Value),
}

impl CellValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Number(_) | Self::Null | Self::Other(_) => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) | Self::Null | Self::Other(_) => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Column name to cell mapping. Keeps insertion order; re-inserting a column
/// overwrites the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, CellValue)>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((column, value)),
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.cells.iter().map(|(_, value)| value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<CellValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

struct RowVisitor;

impl<'de> Visitor<'de> for RowVisitor {
    type Value = Row;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an object mapping column names to string, number or null")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
        let mut row = Row::new();
        while let Some((column, value)) = access.next_entry::<String, CellValue>()? {
            row.insert(column, value);
        }
        Ok(row)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RowVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableLocation {
    pub page: Option<u32>,
    /// Adapter-specific geometry, passed through untouched.
    pub coordinates: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTable {
    pub table_number: usize,
    pub columns: Vec<String>,
    pub row_count: usize,
    #[serde(rename = "data")]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub location: TableLocation,
}

impl ExtractedTable {
    #[must_use]
    pub fn new(table_number: usize, columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            table_number,
            columns,
            row_count: rows.len(),
            rows,
            location: TableLocation::default(),
        }
    }

    #[must_use]
    pub fn on_page(mut self, page: u32) -> Self {
        self.location.page = Some(page);
        self
    }
}

/// Column headings of every transaction export, in output order.
pub const TRANSACTION_COLUMNS: [&str; 6] = [
    "Post Date",
    "Value Date",
    "Details",
    "Debit",
    "Credit",
    "Balance",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub post_date: String,
    pub value_date: String,
    pub transaction_type: String,
    pub debit: Option<String>,
    pub credit: Option<String>,
    pub balance: String,
}

impl TransactionRecord {
    /// Cells in [`TRANSACTION_COLUMNS`] order; absent amounts render empty.
    #[must_use]
    pub fn export_cells(&self) -> [&str; 6] {
        [
            self.post_date.as_str(),
            self.value_date.as_str(),
            self.transaction_type.as_str(),
            self.debit.as_deref().unwrap_or_default(),
            self.credit.as_deref().unwrap_or_default(),
            self.balance.as_str(),
        ]
    }
}
