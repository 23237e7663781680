//! Stage configuration, the comparison and regression stages, and the batch runner.

pub mod compare;
pub mod config;
pub mod regression;
pub mod runner;

pub use compare::{
    build_table, run_comparison, test_table, ColumnNormality, ComparisonReport, Omnibus,
    TableTests,
};
pub use config::{ColumnOrder, RegressionConfig, StrataConfig, CLEANED_DATA_FILE, RAW_DATA_FILE};
pub use regression::{
    analyze, build_frame, fit_formula, prediction_grid, run_regression, ModelSummary,
    PredictionGrid, RegressionReport, AGE_RANK, EDUCATION_RANK, INCOME_RANK,
};
pub use runner::{Batch, BatchConfig, Stage, StageReport};
