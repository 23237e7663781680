//! Batch runner composing the cleaning, comparison and regression stages.

use crate::data::{clean_dataset, load_observations, CleanSummary, Observation};
use crate::error::{Result, StrataError};
use crate::pipeline::{
    run_comparison, run_regression, ComparisonReport, RegressionConfig, RegressionReport,
    StrataConfig, CLEANED_DATA_FILE, RAW_DATA_FILE,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// A stage of the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    /// Drop records without a rate.
    Clean { input: PathBuf, output: PathBuf },
    /// One stratified comparison over the cleaned data.
    Compare(StrataConfig),
    /// Pooled regression over previously written tables.
    Regress(RegressionConfig),
}

impl Stage {
    fn label(&self) -> String {
        match self {
            Stage::Clean { .. } => "clean".to_string(),
            Stage::Compare(c) => format!("compare:{}", c.name),
            Stage::Regress(_) => "regress".to_string(),
        }
    }
}

/// Batch configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub name: String,
    /// Cleaned data read by comparison stages.
    pub data: PathBuf,
    pub stages: Vec<Stage>,
}

impl BatchConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(StrataError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(StrataError::from)
    }
}

/// What a stage produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageReport {
    Clean(CleanSummary),
    Compare(ComparisonReport),
    Regress(RegressionReport),
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageReport::Clean(s) => write!(f, "{}", s),
            StageReport::Compare(r) => write!(f, "{}", r),
            StageReport::Regress(r) => write!(f, "{}", r),
        }
    }
}

/// Builder for a sequence of stages sharing one data file.
#[derive(Debug, Clone)]
pub struct Batch {
    name: String,
    data: PathBuf,
    stages: Vec<Stage>,
}

impl Default for Batch {
    fn default() -> Self {
        Self::new()
    }
}

impl Batch {
    /// Create an empty batch reading [`CLEANED_DATA_FILE`].
    pub fn new() -> Self {
        Self {
            name: "unnamed".to_string(),
            data: PathBuf::from(CLEANED_DATA_FILE),
            stages: Vec::new(),
        }
    }

    /// Every stage with default file names inside `dir`.
    pub fn standard<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        let mut batch = Self::new()
            .name("brfss-obesity")
            .data(dir.join(CLEANED_DATA_FILE))
            .clean(dir.join(RAW_DATA_FILE), dir.join(CLEANED_DATA_FILE));
        for preset in StrataConfig::presets() {
            batch = batch.compare(preset.in_dir(dir));
        }
        batch.regress(RegressionConfig::default().in_dir(dir))
    }

    /// Create from a config.
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            name: config.name.clone(),
            data: config.data.clone(),
            stages: config.stages.clone(),
        }
    }

    /// Set the batch name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the cleaned data file read by comparisons.
    pub fn data<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data = path.into();
        self
    }

    /// Add a cleaning stage.
    pub fn clean<P: Into<PathBuf>, Q: Into<PathBuf>>(mut self, input: P, output: Q) -> Self {
        self.stages.push(Stage::Clean {
            input: input.into(),
            output: output.into(),
        });
        self
    }

    /// Add a stratified comparison.
    pub fn compare(mut self, config: StrataConfig) -> Self {
        self.stages.push(Stage::Compare(config));
        self
    }

    /// Add the regression stage.
    pub fn regress(mut self, config: RegressionConfig) -> Self {
        self.stages.push(Stage::Regress(config));
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Convert to config for serialization.
    pub fn to_config(&self) -> BatchConfig {
        BatchConfig {
            name: self.name.clone(),
            data: self.data.clone(),
            stages: self.stages.clone(),
        }
    }

    /// Run the stages in order, stopping at the first failure.
    ///
    /// The cleaned data is loaded once, by the first comparison that needs it.
    pub fn run(&self) -> Result<Vec<StageReport>> {
        info!(name = %self.name, stages = self.stages.len(), "running batch");
        let mut observations: Option<Vec<Observation>> = None;
        let mut reports = Vec::with_capacity(self.stages.len());

        for (i, stage) in self.stages.iter().enumerate() {
            info!(step = i + 1, stage = %stage.label(), "starting stage");
            let report = match stage {
                Stage::Clean { input, output } => {
                    let summary = clean_dataset(input, output)?;
                    observations = None;
                    StageReport::Clean(summary)
                }
                Stage::Compare(config) => {
                    let rows = match observations.take() {
                        Some(rows) => rows,
                        None => load_observations(&self.data)?,
                    };
                    let report = run_comparison(&rows, config)?;
                    observations = Some(rows);
                    StageReport::Compare(report)
                }
                Stage::Regress(config) => StageReport::Regress(run_regression(config)?),
            };
            reports.push(report);
        }
        Ok(reports)
    }
}
