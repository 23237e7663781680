//! Two-sample t-test, pooled or Welch.

use crate::error::{Result, StrataError};
use crate::test::{mean, variance};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Significance level Levene's test must reach before the pooled variant is dropped.
pub const EQUAL_VARIANCE_ALPHA: f64 = 0.05;

/// Result of a two-sample t-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    /// t statistic for `mean(a) - mean(b)`.
    pub statistic: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Degrees of freedom (Welch-Satterthwaite when unequal).
    pub df: f64,
    /// Whether the pooled-variance form was used.
    pub equal_var: bool,
}

/// Pick the variant from a Levene p-value: pooled when `p >= 0.05`.
pub fn equal_var_from_levene(levene_p: f64) -> bool {
    levene_p >= EQUAL_VARIANCE_ALPHA
}

/// Two-sided two-sample t-test.
///
/// With `equal_var` the pooled variance is used with `n1 + n2 - 2` degrees of
/// freedom; otherwise Welch's form with Welch-Satterthwaite degrees of freedom.
/// Each sample needs at least two values.
pub fn two_sample_t_test(a: &[f64], b: &[f64], equal_var: bool) -> Result<TTestResult> {
    for sample in [a, b] {
        if sample.len() < 2 {
            return Err(StrataError::InsufficientData {
                test: "t-test",
                needed: 2,
                actual: sample.len(),
            });
        }
    }

    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    let v1 = variance(a);
    let v2 = variance(b);
    let diff = mean(a) - mean(b);

    let (se, df) = if equal_var {
        let df = n1 + n2 - 2.0;
        let pooled = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / df;
        ((pooled * (1.0 / n1 + 1.0 / n2)).sqrt(), df)
    } else {
        let s1 = v1 / n1;
        let s2 = v2 / n2;
        let df = (s1 + s2).powi(2) / (s1 * s1 / (n1 - 1.0) + s2 * s2 / (n2 - 1.0));
        ((s1 + s2).sqrt(), df)
    };

    let statistic = diff / se;
    let p_value = if statistic.is_nan() || df.is_nan() {
        f64::NAN
    } else if statistic.is_infinite() {
        0.0
    } else {
        let t_dist = StudentsT::new(0.0, 1.0, df)
            .map_err(|e| StrataError::Numerical(e.to_string()))?;
        (2.0 * (1.0 - t_dist.cdf(statistic.abs()))).clamp(0.0, 1.0)
    };

    Ok(TTestResult {
        statistic,
        p_value,
        df,
        equal_var,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pooled_two_points_each() {
        let r = two_sample_t_test(&[25.0, 26.0], &[30.0, 31.0], true).unwrap();

        assert_relative_eq!(r.statistic, -50.0f64.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(r.df, 2.0);
        // t with 2 df: p = 1 - |t| / sqrt(2 + t^2)
        assert_relative_eq!(r.p_value, 1.0 - (50.0f64 / 52.0).sqrt(), epsilon = 1e-6);
        assert!(r.equal_var);
    }

    #[test]
    fn test_welch_matches_pooled_for_balanced_equal_variance() {
        let pooled = two_sample_t_test(&[25.0, 26.0], &[30.0, 31.0], true).unwrap();
        let welch = two_sample_t_test(&[25.0, 26.0], &[30.0, 31.0], false).unwrap();

        assert_relative_eq!(welch.statistic, pooled.statistic, epsilon = 1e-10);
        assert_relative_eq!(welch.df, 2.0, epsilon = 1e-10);
        assert!(!welch.equal_var);
    }

    #[test]
    fn test_welch_satterthwaite_df() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];

        let r = two_sample_t_test(&a, &b, false).unwrap();

        assert_relative_eq!(r.statistic, -4.0 / (7.0f64 / 3.0).sqrt(), epsilon = 1e-10);
        assert_relative_eq!(r.df, (49.0 / 9.0) / (1.0 / 18.0 + 1.0), epsilon = 1e-10);
        assert!(r.p_value > 0.0 && r.p_value < 0.1);
    }

    #[test]
    fn test_sign_follows_argument_order() {
        let a = [30.0, 31.0, 29.5];
        let b = [25.0, 26.0, 27.5];
        let ab = two_sample_t_test(&a, &b, true).unwrap();
        let ba = two_sample_t_test(&b, &a, true).unwrap();
        assert!(ab.statistic > 0.0);
        assert_relative_eq!(ab.statistic, -ba.statistic, epsilon = 1e-12);
        assert_relative_eq!(ab.p_value, ba.p_value, epsilon = 1e-12);
    }

    #[test]
    fn test_levene_gate() {
        assert!(equal_var_from_levene(0.05));
        assert!(equal_var_from_levene(0.6));
        assert!(!equal_var_from_levene(0.049));
        assert!(!equal_var_from_levene(f64::NAN));
    }

    #[test]
    fn test_single_value_rejected() {
        assert!(two_sample_t_test(&[1.0], &[2.0, 3.0], true).is_err());
    }
}
