//! Data structures for the stratified obesity analysis.

mod design_matrix;
mod formula;
mod long_format;
mod observation;
mod ordinal;
mod staged;
mod stratified;

pub use design_matrix::{DesignMatrix, INTERCEPT};
pub use formula::{Formula, Term};
pub use long_format::{stack, LongRecord, RegressionFrame, RESPONSE_COLUMN};
pub use observation::{
    clean_dataset, is_missing_value, load_observations, CleanSummary, Observation, RATE_COLUMN,
};
pub use ordinal::{
    OrdinalEncoding, AGE_ORDER, EDUCATION_ORDER, GENDER_VALUES, INCOME_ORDER, UNMAPPED,
};
pub use staged::StagedFiles;
pub use stratified::{format_rate, Aggregation, StratifiedTable, YEAR_COLUMN};
