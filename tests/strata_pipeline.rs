//! Integration tests for the cleaning, comparison and regression stages.

use approx::assert_relative_eq;
use brfss_strata::data::{CleanSummary, AGE_ORDER, GENDER_VALUES};
use brfss_strata::filter::{TOPIC_CLASS, TOPIC_QUESTION};
use brfss_strata::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const HEADER: [&str; 8] = [
    "YearStart",
    "YearEnd",
    "LocationAbbr",
    "Class",
    "Question",
    "Data_Value",
    "StratificationCategory1",
    "Stratification1",
];

const YEARS: [i32; 5] = [2011, 2012, 2013, 2014, 2015];
const WOBBLE: [f64; 5] = [0.3, -0.2, 0.5, 0.0, -0.4];

fn row(
    year: i32,
    class: &str,
    question: &str,
    rate: &str,
    category: &str,
    stratum: &str,
) -> Vec<String> {
    vec![
        year.to_string(),
        year.to_string(),
        "US".to_string(),
        class.to_string(),
        question.to_string(),
        rate.to_string(),
        category.to_string(),
        stratum.to_string(),
    ]
}

fn obesity(year_idx: usize, category: &str, stratum: &str, rate: f64) -> Vec<String> {
    row(
        YEARS[year_idx],
        TOPIC_CLASS,
        TOPIC_QUESTION,
        &format!("{:.1}", rate),
        category,
        stratum,
    )
}

/// A raw extract with every category, plus rows the analysis must ignore.
fn raw_rows() -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut category = |name: &str, strata: &[&str], base: f64, step: f64| {
        for (j, stratum) in strata.iter().enumerate() {
            for i in 0..YEARS.len() {
                let rate = base + step * j as f64 + WOBBLE[i] + 0.1 * (i * (j + 1)) as f64;
                rows.push(obesity(i, name, stratum, rate));
            }
        }
    };
    category("Age (years)", &AGE_ORDER, 18.0, 3.5);
    // reverse order so the explicit preset ordering is what ranks them
    let mut education = EDUCATION_ORDER.to_vec();
    education.reverse();
    category("Education", &education, 27.0, 3.0);
    let mut income = INCOME_ORDER.to_vec();
    income.reverse();
    category("Income", &income, 29.0, 1.0);
    category("Gender", &GENDER_VALUES, 28.0, -0.6);

    rows.push(obesity(0, "Education", "Data not reported", 40.0));
    rows.push(obesity(1, "Income", "Data not reported", 41.0));
    rows.push(row(2011, TOPIC_CLASS, TOPIC_QUESTION, "", "Gender", "Male"));
    rows.push(row(2012, TOPIC_CLASS, TOPIC_QUESTION, "NA", "Income", "Less than $15,000"));
    rows.push(row(
        2011,
        "Physical Activity",
        "Percent of adults who engage in no leisure-time physical activity",
        "25.0",
        "Gender",
        "Male",
    ));
    rows
}

fn write_raw(path: &Path, rows: &[Vec<String>]) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(HEADER).unwrap();
    for r in rows {
        writer.write_record(r).unwrap();
    }
    writer.flush().unwrap();
}

fn without_charts(config: StrataConfig, dir: &Path) -> StrataConfig {
    let mut config = config.in_dir(dir);
    config.output_chart = None;
    config
}

fn batch_without_charts(dir: &Path) -> Batch {
    let raw = dir.join(brfss_strata::pipeline::RAW_DATA_FILE);
    let cleaned = dir.join(brfss_strata::pipeline::CLEANED_DATA_FILE);
    let mut batch = Batch::new().name("test").data(&cleaned).clean(raw, &cleaned);
    for preset in StrataConfig::presets() {
        batch = batch.compare(without_charts(preset, dir));
    }
    batch
}

#[test]
fn test_clean_then_load() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw.csv");
    let cleaned = dir.path().join("cleaned.csv");
    let rows = raw_rows();
    write_raw(&raw, &rows);

    let summary: CleanSummary = clean_dataset(&raw, &cleaned).unwrap();

    assert_eq!(summary.dropped, 2);
    assert_eq!(summary.rows, rows.len() - 2);
    assert_eq!(summary.columns, HEADER.len());
    assert_eq!(summary.header, HEADER.to_vec());

    let observations = load_observations(&cleaned).unwrap();
    assert_eq!(observations.len(), summary.rows);
    // quoted brackets survive the round trip
    assert!(observations.iter().any(|o| o.stratum == "$15,000 - $24,999"));
    assert!(observations.iter().all(|o| o.rate.is_some()));
}

#[test]
fn test_gender_pivot_and_t_test() {
    let rates = [(2011, 25.0, 30.0), (2012, 26.0, 31.0), (2013, 28.0, 33.0)];
    let observations: Vec<Observation> = rates
        .iter()
        .flat_map(|&(year, male, female)| {
            vec![
                Observation::new(TOPIC_CLASS, TOPIC_QUESTION, "Gender", "Male", year, male),
                Observation::new(TOPIC_CLASS, TOPIC_QUESTION, "Gender", "Female", year, female),
            ]
        })
        .collect();
    let dir = TempDir::new().unwrap();
    let config = without_charts(StrataConfig::gender(), dir.path());

    let report = run_comparison(&observations, &config).unwrap();

    assert_eq!(report.years, vec![2011, 2012, 2013]);
    assert_eq!(report.columns, vec!["Male", "Female"]);
    // identical spread around each median
    assert!(report.levene.p_value > 0.99);
    match &report.omnibus {
        Omnibus::TTest { first, second, result } => {
            assert_eq!((first.as_str(), second.as_str()), ("Male", "Female"));
            assert!(result.equal_var);
            assert!(result.statistic < 0.0);
            assert!(result.p_value < 0.05);
        }
        other => panic!("expected t-test, got {:?}", other),
    }

    let written = std::fs::read_to_string(&config.output_csv).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("YearStart,Male,Female"));
    assert_eq!(lines.next(), Some("2011,25.0,30.0"));
}

#[test]
fn test_two_year_gender_table() {
    let observations = vec![
        Observation::new(TOPIC_CLASS, TOPIC_QUESTION, "Gender", "Male", 2011, 25.0),
        Observation::new(TOPIC_CLASS, TOPIC_QUESTION, "Gender", "Female", 2011, 30.0),
        Observation::new(TOPIC_CLASS, TOPIC_QUESTION, "Gender", "Male", 2012, 26.0),
        Observation::new(TOPIC_CLASS, TOPIC_QUESTION, "Gender", "Female", 2012, 31.0),
    ];
    let dir = TempDir::new().unwrap();
    let config = without_charts(StrataConfig::gender(), dir.path());

    let table = build_table(&observations, &config).unwrap();
    assert_eq!(table.years(), &[2011, 2012]);
    assert_eq!(table.column("Male"), Some(vec![25.0, 26.0]));
    assert_eq!(table.column("Female"), Some(vec![30.0, 31.0]));

    let t = two_sample_t_test(&[25.0, 26.0], &[30.0, 31.0], false).unwrap();
    assert_relative_eq!(t.statistic, -(50.0f64.sqrt()), epsilon = 1e-10);
    assert_relative_eq!(t.df, 2.0, epsilon = 1e-10);

    // two values per column is below the normality test minimum
    let result = run_comparison(&observations, &config);
    assert!(matches!(
        result,
        Err(StrataError::InsufficientData { needed: 3, actual: 2, .. })
    ));
    assert!(!config.output_csv.exists());
}

#[test]
fn test_missing_stratum_is_no_data() {
    let observations = vec![
        Observation::new(TOPIC_CLASS, TOPIC_QUESTION, "Gender", "Male", 2011, 27.0),
        Observation::new(TOPIC_CLASS, TOPIC_QUESTION, "Gender", "Male", 2012, 27.5),
        Observation::new(TOPIC_CLASS, TOPIC_QUESTION, "Gender", "Male", 2013, 28.4),
    ];
    let dir = TempDir::new().unwrap();
    let config = without_charts(StrataConfig::gender(), dir.path());

    let result = run_comparison(&observations, &config);

    assert!(matches!(result, Err(StrataError::NoData { .. })));
    assert!(!config.output_csv.exists());
}

#[test]
fn test_batch_orders_and_tests_every_category() {
    let dir = TempDir::new().unwrap();
    write_raw(&dir.path().join(brfss_strata::pipeline::RAW_DATA_FILE), &raw_rows());

    let reports = batch_without_charts(dir.path()).run().unwrap();
    assert_eq!(reports.len(), 5);

    let comparisons: Vec<&ComparisonReport> = reports
        .iter()
        .filter_map(|r| match r {
            StageReport::Compare(c) => Some(c),
            _ => None,
        })
        .collect();
    assert_eq!(comparisons.len(), 4);

    let by_name = |name: &str| comparisons.iter().find(|c| c.name == name).unwrap();
    assert_eq!(by_name("age").columns, AGE_ORDER.to_vec());
    assert_eq!(by_name("education").columns, EDUCATION_ORDER.to_vec());
    assert_eq!(by_name("income").columns, INCOME_ORDER.to_vec());
    assert_eq!(by_name("gender").columns, GENDER_VALUES.to_vec());

    for c in &comparisons {
        assert_eq!(c.years, YEARS.to_vec());
        assert_eq!(c.normality.len(), c.columns.len());
        assert!(c.output_csv.exists());
        let expects_t_test = c.columns.len() == 2;
        assert_eq!(matches!(c.omnibus, Omnibus::TTest { .. }), expects_t_test);
    }
    // strong gradients across age groups
    assert!(by_name("age").omnibus.p_value() < 1e-6);
}

#[test]
fn test_regression_over_written_tables() {
    let dir = TempDir::new().unwrap();
    write_raw(&dir.path().join(brfss_strata::pipeline::RAW_DATA_FILE), &raw_rows());
    batch_without_charts(dir.path()).run().unwrap();

    let config = RegressionConfig::default().in_dir(dir.path());
    let income = StratifiedTable::from_csv(&config.income_csv, "Income").unwrap();
    let education = StratifiedTable::from_csv(&config.education_csv, "Education").unwrap();
    let age = StratifiedTable::from_csv(&config.age_csv, "Age (years)").unwrap();

    let report = analyze(&income, &education, &age, &config.formula).unwrap();

    assert_eq!(report.n_obs, YEARS.len() * (6 + 4 + 6));
    // the intercept and the two main effects span the pooled sentinel design
    assert_eq!(report.interaction.rank, 3);
    assert_eq!(report.grid.values.len(), INCOME_ORDER.len());
    assert_eq!(report.grid.values[0].len(), EDUCATION_ORDER.len());
    assert_eq!(report.summaries.len(), 4);

    // education rises by 3 points per level in the data
    let education_fit = report
        .summaries
        .iter()
        .find(|s| s.label == "Education Model")
        .unwrap();
    assert!(education_fit.r_squared > 0.0);
    let text = report.to_string();
    assert!(text.contains("Interaction Model Summary:"));
    assert!(text.contains("Full Model with Interactions: R² ="));
}

#[test]
fn test_levene_gate_boundary() {
    assert!(equal_var_from_levene(0.05));
    assert!(equal_var_from_levene(0.8));
    assert!(!equal_var_from_levene(0.0499));
    assert!(!equal_var_from_levene(f64::NAN));
}

#[test]
fn test_batch_stops_at_missing_input() {
    let dir = TempDir::new().unwrap();
    let result = batch_without_charts(dir.path()).run();
    assert!(result.is_err());
    assert!(!dir.path().join(brfss_strata::pipeline::CLEANED_DATA_FILE).exists());
}
