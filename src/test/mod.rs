//! Hypothesis tests used by the stratified comparisons.

pub mod ttest;

pub use anova::{one_way_anova, AnovaResult};
pub use levene::{levene, LeveneResult};
pub use shapiro::{shapiro_wilk, ShapiroResult};
pub use ttest::{equal_var_from_levene, two_sample_t_test, TTestResult};

use crate::error::{Result, StrataError};

/// Arithmetic mean. NaN for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with `n - 1` in the denominator.
pub(crate) fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0)
}

pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// k >= 2 non-empty groups with more observations than groups.
pub(crate) fn check_groups(test: &'static str, groups: &[&[f64]]) -> Result<()> {
    if groups.len() < 2 {
        return Err(StrataError::InsufficientData {
            test,
            needed: 2,
            actual: groups.len(),
        });
    }
    if let Some(empty) = groups.iter().find(|g| g.is_empty()) {
        return Err(StrataError::InsufficientData {
            test,
            needed: 1,
            actual: empty.len(),
        });
    }
    let total: usize = groups.iter().map(|g| g.len()).sum();
    if total <= groups.len() {
        return Err(StrataError::InsufficientData {
            test,
            needed: groups.len() + 1,
            actual: total,
        });
    }
    if groups.iter().flat_map(|g| g.iter()).any(|v| !v.is_finite()) {
        return Err(StrataError::Numerical(format!(
            "{} input contains non-finite values",
            test
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_variance() {
        assert_eq!(variance(&[1.0, 2.0, 3.0]), 1.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0, 6.0]), 3.0);
    }
}
