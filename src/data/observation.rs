//! Survey observation records and the cleaning stage.

use crate::data::StagedFiles;
use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Header of the measured-rate column.
pub const RATE_COLUMN: &str = "Data_Value";

/// Spellings treated as a missing rate by the cleaning stage.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Number of cleaned rows echoed back in the summary preview.
const PREVIEW_ROWS: usize = 5;

/// One row of the source table.
///
/// Only the columns the analysis reads are mapped; any other columns in the
/// file are ignored on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Survey topic class (e.g. "Obesity / Weight Status").
    #[serde(rename = "Class")]
    pub class: String,
    /// Question text.
    #[serde(rename = "Question")]
    pub question: String,
    /// Stratification category name (e.g. "Income").
    #[serde(rename = "StratificationCategory1")]
    pub stratification_category: String,
    /// Stratum value within the category (e.g. "$75,000 or greater").
    #[serde(rename = "Stratification1")]
    pub stratum: String,
    /// Survey year.
    #[serde(rename = "YearStart")]
    pub year: i32,
    /// Measured rate, `None` when the source cell is missing or unparseable.
    #[serde(rename = "Data_Value", deserialize_with = "csv::invalid_option", default)]
    pub rate: Option<f64>,
}

impl Observation {
    /// Create an observation with a present rate.
    pub fn new(
        class: &str,
        question: &str,
        stratification_category: &str,
        stratum: &str,
        year: i32,
        rate: f64,
    ) -> Self {
        Self {
            class: class.to_string(),
            question: question.to_string(),
            stratification_category: stratification_category.to_string(),
            stratum: stratum.to_string(),
            year,
            rate: Some(rate),
        }
    }

    /// Whether the rate is present and finite.
    pub fn has_rate(&self) -> bool {
        self.rate.map_or(false, f64::is_finite)
    }
}

/// Load observations from a CSV file, discarding records without a rate.
pub fn load_observations<P: AsRef<Path>>(path: P) -> Result<Vec<Observation>> {
    let path = path.as_ref();
    let reader = csv::Reader::from_path(path)?;
    let observations = read_observations(reader)?;
    info!(
        path = %path.display(),
        rows = observations.len(),
        "loaded observations"
    );
    Ok(observations)
}

fn read_observations<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Observation>> {
    let mut observations = Vec::new();
    let mut dropped = 0usize;
    for record in reader.deserialize::<Observation>() {
        let obs = record?;
        if obs.has_rate() {
            observations.push(obs);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        debug!(dropped, "skipped observations without a rate");
    }
    Ok(observations)
}

/// Outcome of the cleaning stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanSummary {
    /// Rows written to the cleaned file.
    pub rows: usize,
    /// Columns in the cleaned file.
    pub columns: usize,
    /// Rows removed because the rate was missing.
    pub dropped: usize,
    /// Header of the cleaned file.
    pub header: Vec<String>,
    /// The first few cleaned rows.
    pub preview: Vec<Vec<String>>,
}

impl std::fmt::Display for CleanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.header.join(" | "))?;
        for row in &self.preview {
            writeln!(f, "{}", row.join(" | "))?;
        }
        write!(
            f,
            "Number of rows after cleaning: {}, Number of columns: {}",
            self.rows, self.columns
        )
    }
}

/// Check whether a raw rate cell counts as missing.
pub fn is_missing_value(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw.trim())
}

/// Drop every record whose rate is missing and write the rest unchanged.
///
/// The output is written to a temporary file beside it and renamed into
/// place, so a failure leaves no partial output behind.
pub fn clean_dataset<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
) -> Result<CleanSummary> {
    let input = input.as_ref();
    let output = output.as_ref();

    let mut reader = csv::Reader::from_path(input)?;
    let headers = reader.headers()?.clone();
    let rate_idx = headers
        .iter()
        .position(|h| h == RATE_COLUMN)
        .ok_or_else(|| StrataError::MissingColumn(RATE_COLUMN.to_string()))?;

    let mut kept = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;
        match record.get(rate_idx) {
            Some(raw) if !is_missing_value(raw) => kept.push(record),
            _ => dropped += 1,
        }
    }

    let mut staged = StagedFiles::new();
    let mut writer = csv::Writer::from_path(staged.stage(output)?)?;
    writer.write_record(&headers)?;
    for record in &kept {
        writer.write_record(record)?;
    }
    writer.flush()?;
    drop(writer);
    staged.commit()?;

    let summary = CleanSummary {
        rows: kept.len(),
        columns: headers.len(),
        dropped,
        header: headers.iter().map(String::from).collect(),
        preview: kept
            .iter()
            .take(PREVIEW_ROWS)
            .map(|r| r.iter().map(String::from).collect())
            .collect(),
    };
    info!(
        input = %input.display(),
        output = %output.display(),
        rows = summary.rows,
        columns = summary.columns,
        dropped,
        "cleaned dataset"
    );
    Ok(summary)
}
