//! Design matrix construction from an encoded frame and a formula.

use crate::data::{Formula, RegressionFrame, Term};
use crate::error::{Result, StrataError};
use nalgebra::DMatrix;

/// Name given to the intercept column.
pub const INTERCEPT: &str = "(Intercept)";

/// A design matrix for linear modeling.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    /// The design matrix (rows × coefficients).
    matrix: DMatrix<f64>,
    /// Names of the coefficients (columns).
    coefficient_names: Vec<String>,
}

impl DesignMatrix {
    /// Build a design matrix from a regression frame and formula.
    pub fn from_formula(frame: &RegressionFrame, formula: &Formula) -> Result<Self> {
        let mut columns: Vec<(&str, &[f64])> = Vec::new();
        for var in formula.variables() {
            columns.push((var, frame.column(var)?));
        }
        Self::from_columns(&columns, frame.n_rows(), formula)
    }

    /// Build a design matrix from named numeric columns.
    ///
    /// Every variable the formula uses must be present, and every column must
    /// have `n_rows` values.
    pub fn from_columns(
        columns: &[(&str, &[f64])],
        n_rows: usize,
        formula: &Formula,
    ) -> Result<Self> {
        let mut coefficient_names = Vec::new();
        let mut built: Vec<Vec<f64>> = Vec::new();

        if formula.intercept {
            coefficient_names.push(INTERCEPT.to_string());
            built.push(vec![1.0; n_rows]);
        }

        for term in &formula.terms {
            match term {
                Term::Intercept => {}
                Term::Main(var) => {
                    coefficient_names.push(var.clone());
                    built.push(lookup(columns, var, n_rows)?.to_vec());
                }
                Term::Interaction(var1, var2) => {
                    let col1 = lookup(columns, var1, n_rows)?;
                    let col2 = lookup(columns, var2, n_rows)?;
                    coefficient_names.push(format!("{}:{}", var1, var2));
                    built.push(col1.iter().zip(col2).map(|(a, b)| a * b).collect());
                }
            }
        }

        let mut matrix = DMatrix::zeros(n_rows, built.len());
        for (col_idx, col) in built.iter().enumerate() {
            for (row_idx, &val) in col.iter().enumerate() {
                matrix[(row_idx, col_idx)] = val;
            }
        }

        Ok(Self {
            matrix,
            coefficient_names,
        })
    }

    /// Get the design matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Get coefficient names.
    pub fn coefficient_names(&self) -> &[String] {
        &self.coefficient_names
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of coefficients (columns).
    pub fn n_coefficients(&self) -> usize {
        self.matrix.ncols()
    }

    /// Check if the matrix has an intercept.
    pub fn has_intercept(&self) -> bool {
        self.coefficient_names.first().map(String::as_str) == Some(INTERCEPT)
    }
}

fn lookup<'a>(columns: &[(&str, &'a [f64])], name: &str, n_rows: usize) -> Result<&'a [f64]> {
    let values = columns
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
        .ok_or_else(|| StrataError::MissingColumn(name.to_string()))?;
    if values.len() != n_rows {
        return Err(StrataError::DimensionMismatch {
            expected: n_rows,
            actual: values.len(),
        });
    }
    Ok(values)
}
