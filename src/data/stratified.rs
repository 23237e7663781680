//! Year-indexed tables with one column per stratum.

use crate::data::{LongRecord, Observation};
use crate::error::{Result, StrataError};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// Header written for the year index.
pub const YEAR_COLUMN: &str = "YearStart";

/// How several observations landing in the same (year, stratum) cell are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Arithmetic mean of the duplicates.
    #[default]
    Mean,
    /// Reject duplicates with [`StrataError::DuplicateCell`].
    Error,
}

/// A stratified table: years × strata, complete cases only.
#[derive(Debug, Clone, PartialEq)]
pub struct StratifiedTable {
    /// Stratification category label.
    category: String,
    /// Years in ascending order (rows).
    years: Vec<i32>,
    /// Stratum labels (columns).
    columns: Vec<String>,
    /// Rates, years × strata.
    data: DMatrix<f64>,
}

#[derive(Default)]
struct Cell {
    sum: f64,
    count: usize,
}

impl StratifiedTable {
    /// Create a table from its parts.
    pub fn new(
        category: &str,
        years: Vec<i32>,
        columns: Vec<String>,
        data: DMatrix<f64>,
    ) -> Result<Self> {
        if data.nrows() != years.len() {
            return Err(StrataError::DimensionMismatch {
                expected: data.nrows(),
                actual: years.len(),
            });
        }
        if data.ncols() != columns.len() {
            return Err(StrataError::DimensionMismatch {
                expected: data.ncols(),
                actual: columns.len(),
            });
        }
        if let Some(v) = data.iter().find(|v| !v.is_finite()) {
            return Err(StrataError::Numerical(format!(
                "Stratified table '{}' holds a non-finite rate ({})",
                category, v
            )));
        }
        Ok(Self {
            category: category.to_string(),
            years,
            columns,
            data,
        })
    }

    /// Pivot observations into a year × stratum table.
    ///
    /// With `columns` set, exactly those strata become columns in the given
    /// order and observations of any other stratum are ignored. Otherwise
    /// columns follow the order in which strata are first seen.
    ///
    /// Only years with a value in every column are kept. A configured stratum
    /// that never appears, or a pivot without any complete year, is reported
    /// as [`StrataError::NoData`].
    pub fn pivot(
        category: &str,
        observations: &[Observation],
        columns: Option<&[String]>,
        aggregation: Aggregation,
    ) -> Result<Self> {
        let mut discovered: Vec<String> = Vec::new();
        let mut cells: BTreeMap<i32, HashMap<String, Cell>> = BTreeMap::new();

        for obs in observations {
            let Some(rate) = obs.rate.filter(|r| r.is_finite()) else {
                continue;
            };
            if let Some(cols) = columns {
                if !cols.iter().any(|c| c == &obs.stratum) {
                    continue;
                }
            }
            if !discovered.iter().any(|d| d == &obs.stratum) {
                discovered.push(obs.stratum.clone());
            }
            let cell = cells
                .entry(obs.year)
                .or_default()
                .entry(obs.stratum.clone())
                .or_default();
            if cell.count > 0 && aggregation == Aggregation::Error {
                return Err(StrataError::DuplicateCell {
                    year: obs.year,
                    stratum: obs.stratum.clone(),
                });
            }
            cell.sum += rate;
            cell.count += 1;
        }

        let columns: Vec<String> = match columns {
            Some(cols) => cols.to_vec(),
            None => discovered.clone(),
        };
        if columns.is_empty() {
            return Err(StrataError::no_data(category));
        }

        let absent: Vec<&String> = columns
            .iter()
            .filter(|c| !discovered.contains(c))
            .collect();
        if !absent.is_empty() {
            warn!(category, ?absent, "configured strata never observed");
            return Err(StrataError::no_data(category));
        }

        let mut years = Vec::new();
        let mut values = Vec::new();
        for (year, row) in &cells {
            let complete: Option<Vec<f64>> = columns
                .iter()
                .map(|c| row.get(c).map(|cell| cell.sum / cell.count as f64))
                .collect();
            match complete {
                Some(mut rates) => {
                    years.push(*year);
                    values.append(&mut rates);
                }
                None => debug!(category, year, "dropping incomplete year"),
            }
        }

        if years.is_empty() {
            return Err(StrataError::no_data(category));
        }

        let data = DMatrix::from_row_slice(years.len(), columns.len(), &values);
        Self::new(category, years, columns, data)
    }

    /// Stratification category label.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Years (row index), ascending.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Stratum labels (columns).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Underlying years × strata matrix.
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Number of years (rows).
    pub fn n_years(&self) -> usize {
        self.years.len()
    }

    /// Number of strata (columns).
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Values of one column by position.
    pub fn column_at(&self, idx: usize) -> Vec<f64> {
        self.data.column(idx).iter().copied().collect()
    }

    /// Values of one column by stratum label.
    pub fn column(&self, stratum: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == stratum)?;
        Some(self.column_at(idx))
    }

    /// All columns as separate samples, in column order.
    pub fn groups(&self) -> Vec<Vec<f64>> {
        (0..self.n_columns()).map(|j| self.column_at(j)).collect()
    }

    /// Un-pivot into long-format records, column by column.
    pub fn melt(&self) -> Vec<LongRecord> {
        let mut records = Vec::with_capacity(self.years.len() * self.columns.len());
        for (j, stratum) in self.columns.iter().enumerate() {
            for (i, &year) in self.years.iter().enumerate() {
                records.push(LongRecord {
                    year,
                    category: self.category.clone(),
                    stratum: stratum.clone(),
                    rate: self.data[(i, j)],
                });
            }
        }
        records
    }

    /// Write the table as CSV with the year as first column.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(YEAR_COLUMN.to_string());
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;

        for (i, year) in self.years.iter().enumerate() {
            let mut row = Vec::with_capacity(header.len());
            row.push(year.to_string());
            row.extend(self.data.row(i).iter().map(|&v| format_rate(v)));
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a table written by [`StratifiedTable::to_csv`].
    pub fn from_csv<P: AsRef<Path>>(path: P, category: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let header = reader.headers()?.clone();
        if header.len() < 2 {
            return Err(StrataError::EmptyData(format!(
                "Stratified table for '{}' has no stratum columns",
                category
            )));
        }
        let columns: Vec<String> = header.iter().skip(1).map(String::from).collect();

        let mut years = Vec::new();
        let mut values = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let raw_year = record.get(0).unwrap_or("").trim();
            let year = raw_year.parse::<i32>().map_err(|_| StrataError::InvalidValue {
                value: raw_year.to_string(),
                column: header.get(0).unwrap_or(YEAR_COLUMN).to_string(),
                row: row_idx,
            })?;
            years.push(year);
            for (col_idx, column) in columns.iter().enumerate() {
                let raw = record.get(col_idx + 1).unwrap_or("").trim();
                let v = raw.parse::<f64>().map_err(|_| StrataError::InvalidValue {
                    value: raw.to_string(),
                    column: column.clone(),
                    row: row_idx,
                })?;
                values.push(v);
            }
        }

        if years.is_empty() {
            return Err(StrataError::no_data(category));
        }

        let data = DMatrix::from_row_slice(years.len(), columns.len(), &values);
        Self::new(category, years, columns, data)
    }
}

/// Format a rate the way the tables are written: integral values keep one decimal.
pub fn format_rate(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

impl std::fmt::Display for StratifiedTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let widths: Vec<usize> = self.columns.iter().map(|c| c.len().max(8)).collect();
        write!(f, "{:<10}", YEAR_COLUMN)?;
        for (c, w) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>w$}", c, w = w)?;
        }
        for (i, year) in self.years.iter().enumerate() {
            writeln!(f)?;
            write!(f, "{:<10}", year)?;
            for (j, w) in widths.iter().enumerate() {
                write!(f, "  {:>w$.1}", self.data[(i, j)], w = w)?;
            }
        }
        Ok(())
    }
}
