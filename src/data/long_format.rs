//! Long-format records and the encoded frame the regression stage fits on.

use crate::data::{OrdinalEncoding, StratifiedTable, UNMAPPED};
use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};

/// Name of the response column in a [`RegressionFrame`].
pub const RESPONSE_COLUMN: &str = "rate";

/// One (year, category, stratum, rate) observation after un-pivoting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongRecord {
    /// Survey year.
    pub year: i32,
    /// Stratification category label the record came from.
    pub category: String,
    /// Stratum label.
    pub stratum: String,
    /// Measured rate.
    pub rate: f64,
}

/// Concatenate the melted tables in the given order.
///
/// Rows are pooled, not joined: records from different categories are never
/// aligned by year.
pub fn stack(tables: &[&StratifiedTable]) -> Vec<LongRecord> {
    tables.iter().flat_map(|t| t.melt()).collect()
}

/// Pooled long table with one rank column per ordinal encoding.
#[derive(Debug, Clone)]
pub struct RegressionFrame {
    records: Vec<LongRecord>,
    /// (column name, values) in insertion order; the response comes first.
    columns: Vec<(String, Vec<f64>)>,
}

impl RegressionFrame {
    /// Encode stacked records.
    ///
    /// Each `(column name, encoding)` pair adds a rank column. A record whose
    /// category differs from the encoding's name, or whose stratum is not in
    /// its list, gets [`UNMAPPED`] in that column.
    pub fn encode(
        records: Vec<LongRecord>,
        encodings: &[(&str, &OrdinalEncoding)],
    ) -> Result<Self> {
        if records.is_empty() {
            return Err(StrataError::EmptyData(
                "No long-format records to encode".to_string(),
            ));
        }

        let mut columns = Vec::with_capacity(encodings.len() + 1);
        columns.push((
            RESPONSE_COLUMN.to_string(),
            records.iter().map(|r| r.rate).collect(),
        ));

        for (name, encoding) in encodings {
            if columns.iter().any(|(c, _)| c == name) {
                return Err(StrataError::InvalidParameter(format!(
                    "Duplicate column name '{}'",
                    name
                )));
            }
            let ranks: Vec<f64> = records
                .iter()
                .map(|r| {
                    let rank = if r.category == encoding.name() {
                        encoding.encode(&r.stratum)
                    } else {
                        UNMAPPED
                    };
                    rank as f64
                })
                .collect();
            columns.push((name.to_string(), ranks));
        }

        Ok(Self { records, columns })
    }

    /// Underlying records.
    pub fn records(&self) -> &[LongRecord] {
        &self.records
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.records.len()
    }

    /// Column names, response first.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Check if a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Values of a column.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
            .ok_or_else(|| StrataError::MissingColumn(name.to_string()))
    }

    /// The response values.
    pub fn response(&self) -> &[f64] {
        &self.columns[0].1
    }

    /// Number of rows belonging to a category.
    pub fn count_category(&self, category: &str) -> usize {
        self.records.iter().filter(|r| r.category == category).count()
    }
}
