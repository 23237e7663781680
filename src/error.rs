//! Error types for the brfss-strata library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum StrataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column '{0}' in input table")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("No data for requested stratification '{category}'")]
    NoData { category: String },

    #[error("Duplicate observations for year {year}, stratum '{stratum}'")]
    DuplicateCell { year: i32, stratum: String },

    #[error("{test} needs at least {needed} observations, got {actual}")]
    InsufficientData {
        test: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        value: String,
        column: String,
        row: usize,
    },

    #[error("Formula parse error: {0}")]
    FormulaParse(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Plotting error: {0}")]
    Plot(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StrataError {
    /// Shorthand for the empty-stratification condition.
    pub fn no_data(category: &str) -> Self {
        Self::NoData {
            category: category.to_string(),
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, StrataError>;
