//! Pooled ordinal regression over the income, education and age tables.

use crate::data::{
    stack, DesignMatrix, Formula, OrdinalEncoding, RegressionFrame, StagedFiles, StratifiedTable,
    RESPONSE_COLUMN, UNMAPPED,
};
use crate::error::{Result, StrataError};
use crate::model::{fit_ols, OlsFit};
use crate::pipeline::{RegressionConfig, StrataConfig};
use crate::plot::{plot_heatmap, plot_residual_distribution, plot_residuals_vs_fitted};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

pub const INCOME_RANK: &str = "income_rank";
pub const EDUCATION_RANK: &str = "education_rank";
pub const AGE_RANK: &str = "age_rank";

/// Predicted rate for every (income, education) level pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionGrid {
    /// Row labels, lowest income first.
    pub income_levels: Vec<String>,
    /// Column labels, lowest education first.
    pub education_levels: Vec<String>,
    /// Row-major predictions, `income_levels.len()` × `education_levels.len()`.
    pub values: Vec<Vec<f64>>,
}

impl PredictionGrid {
    pub fn to_matrix(&self) -> DMatrix<f64> {
        let rows = self.values.len();
        let cols = self.education_levels.len();
        DMatrix::from_fn(rows, cols, |i, j| self.values[i][j])
    }
}

/// R² of one of the compact comparison models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub label: String,
    pub formula: String,
    pub r_squared: f64,
}

/// Output of the regression stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionReport {
    pub n_obs: usize,
    /// Rows contributed by each category, in stack order.
    pub rows_per_category: Vec<(String, usize)>,
    pub interaction: OlsFit,
    pub grid: PredictionGrid,
    pub summaries: Vec<ModelSummary>,
}

/// The three encodings, named after the tables they apply to.
fn encodings() -> [(&'static str, OrdinalEncoding); 3] {
    [
        (INCOME_RANK, OrdinalEncoding::income()),
        (EDUCATION_RANK, OrdinalEncoding::education()),
        (AGE_RANK, OrdinalEncoding::age()),
    ]
}

/// Melt and stack the tables (income, education, then age) and encode ranks.
pub fn build_frame(
    income: &StratifiedTable,
    education: &StratifiedTable,
    age: &StratifiedTable,
) -> Result<RegressionFrame> {
    let records = stack(&[income, education, age]);
    let encodings = encodings();
    let named: Vec<(&str, &OrdinalEncoding)> = encodings.iter().map(|(n, e)| (*n, e)).collect();
    RegressionFrame::encode(records, &named)
}

/// Fit `formula` on the frame's response and rank columns.
pub fn fit_formula(frame: &RegressionFrame, formula: &str) -> Result<OlsFit> {
    let parsed = Formula::parse(formula)?;
    let response = parsed.response.as_deref().unwrap_or(RESPONSE_COLUMN);
    let design = DesignMatrix::from_formula(frame, &parsed)?;
    let mut fit = fit_ols(frame.column(response)?, &design)?;
    fit.formula = Some(parsed.to_string());
    Ok(fit)
}

/// Labels of the ranks used on one grid axis.
fn rank_labels(encoding: &OrdinalEncoding) -> Vec<String> {
    encoding
        .ranks()
        .filter_map(|r| encoding.decode(r))
        .map(String::from)
        .collect()
}

/// Predict every (income, education) pair with the other ranks unmapped.
pub fn prediction_grid(fit: &OlsFit, formula: &str) -> Result<PredictionGrid> {
    let parsed = Formula::parse(formula)?;
    let income = OrdinalEncoding::income();
    let education = OrdinalEncoding::education();

    let mut income_col = Vec::new();
    let mut education_col = Vec::new();
    for i in income.ranks() {
        for e in education.ranks() {
            income_col.push(i as f64);
            education_col.push(e as f64);
        }
    }
    let n = income_col.len();
    let age_col = vec![UNMAPPED as f64; n];

    let design = DesignMatrix::from_columns(
        &[
            (INCOME_RANK, income_col.as_slice()),
            (EDUCATION_RANK, education_col.as_slice()),
            (AGE_RANK, age_col.as_slice()),
        ],
        n,
        &parsed,
    )?;
    let predicted = fit.predict(&design)?;

    Ok(PredictionGrid {
        income_levels: rank_labels(&income),
        education_levels: rank_labels(&education),
        values: predicted
            .chunks(education.len())
            .map(<[f64]>::to_vec)
            .collect(),
    })
}

/// Fit the interaction model and the compact single-predictor models.
pub fn analyze(
    income: &StratifiedTable,
    education: &StratifiedTable,
    age: &StratifiedTable,
    formula: &str,
) -> Result<RegressionReport> {
    let frame = build_frame(income, education, age)?;
    info!(rows = frame.n_rows(), "stacked long-format records");

    let interaction = fit_formula(&frame, formula)?;
    let grid = prediction_grid(&interaction, formula)?;

    let compact = [
        ("Age Model", format!("{} ~ {}", RESPONSE_COLUMN, AGE_RANK)),
        ("Income Model", format!("{} ~ {}", RESPONSE_COLUMN, INCOME_RANK)),
        ("Education Model", format!("{} ~ {}", RESPONSE_COLUMN, EDUCATION_RANK)),
    ];
    let mut summaries = compact
        .par_iter()
        .map(|(label, f)| {
            fit_formula(&frame, f).map(|fit| ModelSummary {
                label: label.to_string(),
                formula: f.clone(),
                r_squared: fit.r_squared,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    summaries.push(ModelSummary {
        label: "Full Model with Interactions".to_string(),
        formula: formula.to_string(),
        r_squared: interaction.r_squared,
    });

    let rows_per_category = [income, education, age]
        .iter()
        .map(|t| (t.category().to_string(), frame.count_category(t.category())))
        .collect();

    Ok(RegressionReport {
        n_obs: frame.n_rows(),
        rows_per_category,
        interaction,
        grid,
        summaries,
    })
}

/// Load the three stratified tables, fit, and write the diagnostic charts.
///
/// The three charts are committed together once all of them have rendered.
pub fn run_regression(config: &RegressionConfig) -> Result<RegressionReport> {
    info!("running regression stage");
    let load = |path: &std::path::Path, preset: StrataConfig| {
        StratifiedTable::from_csv(path, &preset.category).map_err(|e| {
            StrataError::Pipeline(format!(
                "Cannot load {} table {}: {}",
                preset.name,
                path.display(),
                e
            ))
        })
    };
    let income = load(&config.income_csv, StrataConfig::income())?;
    let education = load(&config.education_csv, StrataConfig::education())?;
    let age = load(&config.age_csv, StrataConfig::age())?;

    let report = analyze(&income, &education, &age, &config.formula)?;

    let mut staged = StagedFiles::new();
    plot_heatmap(
        &report.grid.to_matrix(),
        &report.grid.income_levels,
        &report.grid.education_levels,
        "Interaction Effect of Income and Education on Obesity Rate",
        &staged.stage(&config.heatmap_png)?,
    )?;
    plot_residuals_vs_fitted(
        &report.interaction.fitted,
        &report.interaction.residuals,
        &format!("Residuals vs Fitted Values ({})", config.model_name),
        &staged.stage(&config.residuals_png)?,
    )?;
    plot_residual_distribution(
        &report.interaction.residuals,
        config.bins,
        &format!("Residuals Distribution ({})", config.model_name),
        &staged.stage(&config.residual_hist_png)?,
    )?;
    staged.commit()?;
    for path in [&config.heatmap_png, &config.residuals_png, &config.residual_hist_png] {
        info!(path = %path.display(), "saved chart");
    }

    Ok(report)
}

impl fmt::Display for RegressionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Interaction Model Summary:")?;
        writeln!(f, "{}", self.interaction)?;
        writeln!(f, "Predicted obesity rate (rows: income, columns: education)")?;
        for (label, row) in self.grid.income_levels.iter().zip(&self.grid.values) {
            let cells: Vec<String> = row.iter().map(|v| format!("{:>6.1}", v)).collect();
            writeln!(f, "{:<22}{}", label, cells.join(" "))?;
        }
        writeln!(f)?;
        writeln!(f, "Model Summary Table:")?;
        for s in &self.summaries {
            writeln!(f, "{}: R² = {:.3}", s.label, s.r_squared)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AGE_ORDER, EDUCATION_ORDER, INCOME_ORDER};
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn table(
        category: &str,
        strata: &[&str],
        rate: impl Fn(usize, usize) -> f64,
    ) -> StratifiedTable {
        let years: Vec<i32> = (2011..2016).collect();
        let data = DMatrix::from_fn(years.len(), strata.len(), |i, j| rate(i, j));
        StratifiedTable::new(
            category,
            years,
            strata.iter().map(|s| s.to_string()).collect(),
            data,
        )
        .unwrap()
    }

    fn tables() -> (StratifiedTable, StratifiedTable, StratifiedTable) {
        let wobble = |i: usize, j: usize| ((i * 7 + j * 3) % 5) as f64 * 0.1;
        (
            table("Income", &INCOME_ORDER, |i, j| 35.0 - 1.0 * j as f64 + wobble(i, j)),
            table("Education", &EDUCATION_ORDER, |i, j| 36.0 - 3.0 * j as f64 + wobble(i, j)),
            table("Age (years)", &AGE_ORDER, |i, j| 18.0 + 3.5 * j as f64 + wobble(i, j)),
        )
    }

    #[test]
    fn test_frame_is_pooled_with_sentinels() {
        let (income, education, age) = tables();
        let frame = build_frame(&income, &education, &age).unwrap();

        assert_eq!(frame.n_rows(), 5 * (6 + 4 + 6));
        let inc = frame.column(INCOME_RANK).unwrap();
        let edu = frame.column(EDUCATION_RANK).unwrap();
        let age_rank = frame.column(AGE_RANK).unwrap();
        // income block first, then education, then age
        assert_eq!((inc[0], edu[0], age_rank[0]), (0.0, -1.0, -1.0));
        assert_eq!((inc[30], edu[30], age_rank[30]), (-1.0, 0.0, -1.0));
        assert_eq!((inc[50], edu[50], age_rank[50]), (-1.0, -1.0, 0.0));
        assert_eq!(age_rank[79], 5.0);
    }

    #[test]
    fn test_analyze_reports_all_models() {
        let (income, education, age) = tables();
        let formula = "rate ~ income_rank * education_rank";
        let report = analyze(&income, &education, &age, formula).unwrap();

        assert_eq!(report.n_obs, 80);
        assert_eq!(
            report.rows_per_category,
            vec![
                ("Income".to_string(), 30),
                ("Education".to_string(), 20),
                ("Age (years)".to_string(), 30)
            ]
        );
        let labels: Vec<&str> = report.summaries.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Age Model", "Income Model", "Education Model", "Full Model with Interactions"]
        );
        assert_relative_eq!(report.summaries[3].r_squared, report.interaction.r_squared);
        assert!(report.summaries.iter().all(|s| (0.0..=1.0).contains(&s.r_squared)));
        assert_eq!(report.interaction.rank, 3);
        assert!(report.to_string().contains("Model Summary Table:"));
    }

    #[test]
    fn test_prediction_grid_shape() {
        let (income, education, age) = tables();
        let formula = "rate ~ income_rank * education_rank";
        let report = analyze(&income, &education, &age, formula).unwrap();
        let grid = &report.grid;

        assert_eq!(grid.values.len(), 6);
        assert!(grid.values.iter().all(|row| row.len() == 4));
        assert_eq!(grid.income_levels[0], "Less than $15,000");
        assert_eq!(grid.education_levels[3], "College graduate");

        // each cell matches the fitted surface
        let beta = report.interaction.estimates();
        let at = |i: f64, e: f64| beta[0] + beta[1] * i + beta[2] * e + beta[3] * i * e;
        assert_relative_eq!(grid.values[2][1], at(2.0, 1.0), epsilon = 1e-9);
        assert_relative_eq!(grid.to_matrix()[(5, 3)], at(5.0, 3.0), epsilon = 1e-9);
    }

    #[test]
    fn test_education_gradient_recovered_by_single_predictor() {
        let (income, education, age) = tables();
        let frame = build_frame(&income, &education, &age).unwrap();

        let fit = fit_formula(&frame, "rate ~ education_rank").unwrap();

        assert_eq!(fit.formula.as_deref(), Some("rate ~ education_rank"));
        assert_eq!(fit.coefficient_names(), vec!["(Intercept)", "education_rank"]);
    }

    #[test]
    fn test_grid_labels_follow_rank_order() {
        let (income, education, age) = tables();
        let report = analyze(&income, &education, &age, "rate ~ income_rank").unwrap();

        assert_eq!(report.grid.income_levels, INCOME_ORDER.to_vec());
        assert_eq!(report.grid.education_levels, EDUCATION_ORDER.to_vec());
    }

    #[test]
    fn test_unwritable_chart_writes_no_charts() {
        let (income, education, age) = tables();
        let dir = TempDir::new().unwrap();
        let mut config = RegressionConfig::default().in_dir(dir.path());
        income.to_csv(&config.income_csv).unwrap();
        education.to_csv(&config.education_csv).unwrap();
        age.to_csv(&config.age_csv).unwrap();
        config.residual_hist_png = dir.path().join("charts").join("hist.png");

        assert!(run_regression(&config).is_err());
        assert!(!config.heatmap_png.exists());
        assert!(!config.residuals_png.exists());
        let left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(left.len(), 3, "only the input tables remain: {:?}", left);
    }

    #[test]
    fn test_unknown_variable() {
        let (income, education, age) = tables();
        let frame = build_frame(&income, &education, &age).unwrap();
        assert!(matches!(
            fit_formula(&frame, "rate ~ region_rank"),
            Err(StrataError::MissingColumn(_))
        ));
    }
}
