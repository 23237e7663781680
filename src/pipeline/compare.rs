//! One stratified comparison: filter, pivot, test, persist and chart.

use crate::data::{Observation, StagedFiles, StratifiedTable};
use crate::error::{Result, StrataError};
use crate::filter::{filter_stratification, filter_topic};
use crate::pipeline::StrataConfig;
use crate::plot::plot_time_series;
use crate::test::{
    equal_var_from_levene, levene, one_way_anova, shapiro_wilk, two_sample_t_test, AnovaResult,
    LeveneResult, ShapiroResult, TTestResult,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Shapiro-Wilk result for one stratum column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnNormality {
    pub stratum: String,
    #[serde(flatten)]
    pub result: ShapiroResult,
}

/// Omnibus comparison of the stratum columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum Omnibus {
    /// More than two columns.
    Anova(AnovaResult),
    /// Exactly two columns, first against second.
    TTest {
        first: String,
        second: String,
        #[serde(flatten)]
        result: TTestResult,
    },
}

impl Omnibus {
    pub fn statistic(&self) -> f64 {
        match self {
            Omnibus::Anova(r) => r.statistic,
            Omnibus::TTest { result, .. } => result.statistic,
        }
    }

    pub fn p_value(&self) -> f64 {
        match self {
            Omnibus::Anova(r) => r.p_value,
            Omnibus::TTest { result, .. } => result.p_value,
        }
    }
}

/// Everything one comparison computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub name: String,
    pub category: String,
    /// The pivoted table, as written to `output_csv`.
    #[serde(skip)]
    pub table: Option<StratifiedTable>,
    pub years: Vec<i32>,
    pub columns: Vec<String>,
    pub normality: Vec<ColumnNormality>,
    pub levene: LeveneResult,
    pub omnibus: Omnibus,
    pub output_csv: PathBuf,
    pub output_chart: Option<PathBuf>,
}

/// Tests run on a complete stratified table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableTests {
    pub normality: Vec<ColumnNormality>,
    pub levene: LeveneResult,
    pub omnibus: Omnibus,
}

/// Run normality, variance and omnibus tests on the columns of `table`.
///
/// Normality is tested column by column in parallel and reported in column
/// order. Two columns get a t-test whose variance assumption follows
/// Levene's p-value; more get a one-way ANOVA.
pub fn test_table(table: &StratifiedTable) -> Result<TableTests> {
    let groups = table.groups();
    if groups.len() < 2 {
        return Err(StrataError::InsufficientData {
            test: "Omnibus comparison",
            needed: 2,
            actual: groups.len(),
        });
    }

    let normality = groups
        .par_iter()
        .zip(table.columns().par_iter())
        .map(|(values, stratum)| {
            shapiro_wilk(values).map(|result| ColumnNormality {
                stratum: stratum.clone(),
                result,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let slices: Vec<&[f64]> = groups.iter().map(Vec::as_slice).collect();
    let levene = levene(&slices)?;

    let omnibus = if slices.len() == 2 {
        let equal_var = equal_var_from_levene(levene.p_value);
        debug!(equal_var, levene_p = levene.p_value, "t-test variance assumption");
        Omnibus::TTest {
            first: table.columns()[0].clone(),
            second: table.columns()[1].clone(),
            result: two_sample_t_test(slices[0], slices[1], equal_var)?,
        }
    } else {
        Omnibus::Anova(one_way_anova(&slices)?)
    };

    Ok(TableTests {
        normality,
        levene,
        omnibus,
    })
}

/// Filter and pivot cleaned observations according to `config`.
pub fn build_table(
    observations: &[Observation],
    config: &StrataConfig,
) -> Result<StratifiedTable> {
    let topic = filter_topic(observations);
    let selected = filter_stratification(
        &topic,
        &config.category,
        config.include.as_deref(),
        &config.exclude,
    )?;
    let columns = config.columns();
    StratifiedTable::pivot(
        &config.category,
        &selected,
        columns.as_deref(),
        config.aggregation,
    )
}

/// Run a full comparison and write its CSV and chart.
///
/// Outputs are only written once every test has succeeded, and the CSV and
/// chart appear together or not at all.
pub fn run_comparison(
    observations: &[Observation],
    config: &StrataConfig,
) -> Result<ComparisonReport> {
    info!(name = %config.name, category = %config.category, "running comparison");

    let table = build_table(observations, config)?;
    info!(
        years = table.n_years(),
        columns = table.n_columns(),
        "pivoted complete years"
    );

    let tests = test_table(&table)?;

    let mut staged = StagedFiles::new();
    table.to_csv(staged.stage(&config.output_csv)?)?;
    if let Some(chart) = &config.output_chart {
        let path = staged.stage(chart)?;
        plot_time_series(&table, &config.title, &config.legend_title, &path)?;
    }
    staged.commit()?;
    info!(path = %config.output_csv.display(), "saved table");
    if let Some(chart) = &config.output_chart {
        info!(path = %chart.display(), "saved chart");
    }

    Ok(ComparisonReport {
        name: config.name.clone(),
        category: config.category.clone(),
        years: table.years().to_vec(),
        columns: table.columns().to_vec(),
        normality: tests.normality,
        levene: tests.levene,
        omnibus: tests.omnibus,
        output_csv: config.output_csv.clone(),
        output_chart: config.output_chart.clone(),
        table: Some(table),
    })
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ({}) ==", self.name, self.category)?;
        if let Some(table) = &self.table {
            writeln!(f, "{}", table)?;
        }
        for n in &self.normality {
            writeln!(
                f,
                "Normality test for {}: W={:.4}, p-value={:.4}",
                n.stratum, n.result.statistic, n.result.p_value
            )?;
        }
        writeln!(
            f,
            "Levene's test for equality of variances: statistic={:.4}, p-value={:.4}",
            self.levene.statistic, self.levene.p_value
        )?;
        match &self.omnibus {
            Omnibus::Anova(r) => writeln!(
                f,
                "ANOVA test result - F-statistic: {:.4}, P-value: {:.4e}",
                r.statistic, r.p_value
            )?,
            Omnibus::TTest {
                first,
                second,
                result,
            } => writeln!(
                f,
                "T-test result ({} vs {}, equal_var={}) - T-statistic: {:.4}, P-value: {:.4e}",
                first, second, result.equal_var, result.statistic, result.p_value
            )?,
        }
        write!(f, "Saved {}", self.output_csv.display())
    }
}
