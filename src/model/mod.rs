//! Linear models fitted by the regression stage.

pub mod lm;

pub use lm::{fit_ols, Coefficient, OlsFit, CONFIDENCE_LEVEL};
