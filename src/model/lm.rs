//! Ordinary least squares fitting and the summary table reported for it.

use crate::data::DesignMatrix;
use crate::error::{Result, StrataError};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use std::f64::consts::PI;
use std::fmt;
use tracing::warn;

/// Confidence level of the reported coefficient intervals.
pub const CONFIDENCE_LEVEL: f64 = 0.95;

/// One row of the coefficient table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// A fitted OLS model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsFit {
    /// Formula the design was built from, if known.
    pub formula: Option<String>,
    pub coefficients: Vec<Coefficient>,
    /// Residuals, `y - fitted`.
    #[serde(skip)]
    pub residuals: Vec<f64>,
    #[serde(skip)]
    pub fitted: Vec<f64>,
    /// Residual standard error.
    pub sigma: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    /// P-value of the overall F test.
    pub f_p_value: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub n_obs: usize,
    /// Number of regressors excluding the intercept.
    pub df_model: usize,
    pub df_residual: usize,
    /// Numerical rank of the design matrix.
    pub rank: usize,
}

impl OlsFit {
    /// Coefficient names in design order.
    pub fn coefficient_names(&self) -> Vec<&str> {
        self.coefficients.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a coefficient by name.
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    /// Estimated coefficient vector.
    pub fn estimates(&self) -> Vec<f64> {
        self.coefficients.iter().map(|c| c.estimate).collect()
    }

    /// Predict the response for the rows of `design`.
    ///
    /// The design must have the same coefficients, in the same order, as the
    /// one the model was fitted on.
    pub fn predict(&self, design: &DesignMatrix) -> Result<Vec<f64>> {
        if design.coefficient_names().len() != self.coefficients.len()
            || design
                .coefficient_names()
                .iter()
                .zip(&self.coefficients)
                .any(|(n, c)| *n != c.name)
        {
            return Err(StrataError::InvalidParameter(format!(
                "Prediction design has coefficients {:?}, model has {:?}",
                design.coefficient_names(),
                self.coefficient_names()
            )));
        }
        let beta = DVector::from_vec(self.estimates());
        Ok((design.matrix() * beta).iter().copied().collect())
    }
}

/// Fit `y ~ X` by least squares.
///
/// The solution is `pinv(X) y`, so a rank-deficient design still fits and
/// yields the minimum-norm coefficients. Degrees of freedom follow the rank
/// of `X`. Fails if the sizes disagree or if the model is saturated.
pub fn fit_ols(y: &[f64], design: &DesignMatrix) -> Result<OlsFit> {
    let n = design.n_rows();
    let k = design.n_coefficients();

    if y.len() != n {
        return Err(StrataError::DimensionMismatch {
            expected: n,
            actual: y.len(),
        });
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(StrataError::Numerical(
            "Response contains non-finite values".to_string(),
        ));
    }
    if n == 0 || k == 0 {
        return Err(StrataError::EmptyData("Empty design matrix".to_string()));
    }

    let x = design.matrix();
    let svd = x.clone().svd(true, true);
    let tol = svd.singular_values.max() * n.max(k) as f64 * f64::EPSILON;
    let rank = svd.rank(tol);
    if rank < k {
        warn!(rank, n_coefficients = k, "design matrix is rank deficient");
    }

    let df_residual = n.saturating_sub(rank);
    if df_residual == 0 {
        return Err(StrataError::Numerical(
            "Model is saturated (n_obs <= rank of design)".to_string(),
        ));
    }

    let pinv = svd
        .pseudo_inverse(tol)
        .map_err(|e| StrataError::Numerical(e.to_string()))?;
    // pinv(X'X) = pinv(X) pinv(X)'
    let cov_unscaled = &pinv * pinv.transpose();

    let y_vec = DVector::from_column_slice(y);
    let beta = &pinv * &y_vec;
    let y_hat = x * &beta;
    let residuals_vec = &y_vec - &y_hat;

    let rss: f64 = residuals_vec.iter().map(|e| e * e).sum();
    let sigma2 = rss / df_residual as f64;
    let sigma = sigma2.sqrt();

    let has_intercept = design.has_intercept();
    let df_model = if has_intercept { rank - 1 } else { rank };

    // centred total sum of squares only when an intercept is fitted
    let tss: f64 = if has_intercept {
        let y_mean = y.iter().sum::<f64>() / n as f64;
        y.iter().map(|v| (v - y_mean).powi(2)).sum()
    } else {
        y.iter().map(|v| v * v).sum()
    };
    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { 0.0 };
    let adj_r_squared = 1.0
        - (1.0 - r_squared) * (n as f64 - if has_intercept { 1.0 } else { 0.0 })
            / df_residual as f64;

    let (f_statistic, f_p_value) = if df_model == 0 {
        (f64::NAN, f64::NAN)
    } else {
        let f = ((tss - rss) / df_model as f64) / sigma2;
        let p = if f.is_infinite() {
            0.0
        } else if f.is_nan() {
            f64::NAN
        } else {
            let dist = FisherSnedecor::new(df_model as f64, df_residual as f64)
                .map_err(|e| StrataError::Numerical(e.to_string()))?;
            (1.0 - dist.cdf(f)).clamp(0.0, 1.0)
        };
        (f, p)
    };

    let nf = n as f64;
    let log_likelihood = -nf / 2.0 * ((2.0 * PI).ln() + (rss / nf).ln() + 1.0);
    let aic = -2.0 * log_likelihood + 2.0 * rank as f64;
    let bic = -2.0 * log_likelihood + rank as f64 * nf.ln();

    let t_dist = StudentsT::new(0.0, 1.0, df_residual as f64)
        .map_err(|e| StrataError::Numerical(e.to_string()))?;
    let t_crit = t_dist.inverse_cdf(1.0 - (1.0 - CONFIDENCE_LEVEL) / 2.0);

    let coefficients = design
        .coefficient_names()
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let estimate = beta[j];
            let std_error = sigma * cov_unscaled[(j, j)].max(0.0).sqrt();
            let t_value = estimate / std_error;
            let p_value = if t_value.is_finite() {
                2.0 * (1.0 - t_dist.cdf(t_value.abs()))
            } else if t_value.is_infinite() {
                0.0
            } else {
                f64::NAN
            };
            Coefficient {
                name: name.clone(),
                estimate,
                std_error,
                t_value,
                p_value,
                ci_lower: estimate - t_crit * std_error,
                ci_upper: estimate + t_crit * std_error,
            }
        })
        .collect();

    Ok(OlsFit {
        formula: None,
        coefficients,
        residuals: residuals_vec.iter().copied().collect(),
        fitted: y_hat.iter().copied().collect(),
        sigma,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
        log_likelihood,
        aic,
        bic,
        n_obs: n,
        df_model,
        df_residual,
        rank,
    })
}

impl fmt::Display for OlsFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OLS Regression Results")?;
        if let Some(formula) = &self.formula {
            writeln!(f, "Formula:        {}", formula)?;
        }
        writeln!(
            f,
            "No. Observations: {:>8}    R-squared:      {:>10.4}",
            self.n_obs, self.r_squared
        )?;
        writeln!(
            f,
            "Df Model:         {:>8}    Adj. R-squared: {:>10.4}",
            self.df_model, self.adj_r_squared
        )?;
        writeln!(
            f,
            "Df Residuals:     {:>8}    F-statistic:    {:>10.4}",
            self.df_residual, self.f_statistic
        )?;
        writeln!(
            f,
            "Log-Likelihood: {:>10.3}    Prob (F):       {:>10.4e}",
            self.log_likelihood, self.f_p_value
        )?;
        writeln!(
            f,
            "AIC:            {:>10.3}    BIC:            {:>10.3}",
            self.aic, self.bic
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<28} {:>10} {:>10} {:>8} {:>8} {:>10} {:>10}",
            "", "coef", "std err", "t", "P>|t|", "[0.025", "0.975]"
        )?;
        for c in &self.coefficients {
            writeln!(
                f,
                "{:<28} {:>10.4} {:>10.4} {:>8.3} {:>8.3} {:>10.4} {:>10.4}",
                c.name, c.estimate, c.std_error, c.t_value, c.p_value, c.ci_lower, c.ci_upper
            )?;
        }
        Ok(())
    }
}
