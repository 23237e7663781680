//! Stratified analysis of BRFSS adult obesity prevalence
//!
//! This library cleans a BRFSS nutrition and physical activity extract,
//! compares obesity rates across the strata of one demographic category at a
//! time, and fits a pooled ordinal regression of the rate on income and
//! education.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Observations, stratified year × stratum tables, ordinal
//!   encodings, long-format frames, formulas and design matrices
//! - **filter**: Topic and stratification filters
//! - **test**: Hypothesis tests (Shapiro-Wilk, Levene, t-test, one-way ANOVA)
//! - **model**: Ordinary least squares
//! - **plot**: Line charts, the prediction heatmap and residual diagnostics
//! - **pipeline**: Stage configuration and the batch runner
//!
//! # Example
//!
//! ```no_run
//! use brfss_strata::prelude::*;
//!
//! // Clean the raw extract, then run every comparison and the regression
//! let reports = Batch::standard("data").run().unwrap();
//! for report in &reports {
//!     println!("{}", report);
//! }
//! ```

pub mod data;
pub mod error;
pub mod filter;
pub mod model;
pub mod pipeline;
pub mod plot;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{
        clean_dataset, load_observations, Aggregation, CleanSummary, DesignMatrix, Formula,
        Observation, OrdinalEncoding, RegressionFrame, StratifiedTable, Term, EDUCATION_ORDER,
        INCOME_ORDER, UNMAPPED,
    };
    pub use crate::error::{Result, StrataError};
    pub use crate::filter::{filter_stratification, filter_topic};
    pub use crate::model::{fit_ols, Coefficient, OlsFit};
    pub use crate::pipeline::{
        analyze, build_table, run_comparison, run_regression, test_table, Batch, BatchConfig,
        ComparisonReport, Omnibus, RegressionConfig, RegressionReport, Stage, StageReport,
        StrataConfig,
    };
    pub use crate::test::{
        equal_var_from_levene, levene, one_way_anova, shapiro_wilk, two_sample_t_test,
        AnovaResult, LeveneResult, ShapiroResult, TTestResult,
    };
}
