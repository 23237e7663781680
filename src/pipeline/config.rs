//! Serializable configuration for the comparison and regression stages.

use crate::data::{Aggregation, EDUCATION_ORDER, GENDER_VALUES, INCOME_ORDER};
use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw survey extract read by the cleaning stage.
pub const RAW_DATA_FILE: &str = "BRFSS_data.csv";
/// Output of the cleaning stage, input of every comparison.
pub const CLEANED_DATA_FILE: &str = "BRFSS_data_cleaned.csv";

/// How the columns of a stratified table are ordered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "columns", rename_all = "snake_case")]
pub enum ColumnOrder {
    /// Order of the `include` list when one is set, otherwise the order in
    /// which strata first appear in the data.
    #[default]
    Discovery,
    /// Exactly these strata, in this order.
    Explicit(Vec<String>),
}

/// Parameters of one stratified comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrataConfig {
    /// Short name, used for logging and preset lookup.
    pub name: String,
    /// `StratificationCategory1` value to select.
    pub category: String,
    /// When set, only these strata are kept.
    #[serde(default)]
    pub include: Option<Vec<String>>,
    /// Strata dropped before pivoting.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub ordering: ColumnOrder,
    #[serde(default)]
    pub aggregation: Aggregation,
    /// Pivoted table destination.
    pub output_csv: PathBuf,
    /// Line chart destination; no chart is drawn when absent.
    #[serde(default)]
    pub output_chart: Option<PathBuf>,
    pub title: String,
    pub legend_title: String,
}

impl StrataConfig {
    /// Names accepted by [`StrataConfig::preset`].
    pub const PRESETS: [&'static str; 4] = ["age", "education", "income", "gender"];

    /// Obesity by age group; columns in discovery order.
    pub fn age() -> Self {
        Self {
            name: "age".to_string(),
            category: "Age (years)".to_string(),
            include: None,
            exclude: Vec::new(),
            ordering: ColumnOrder::Discovery,
            aggregation: Aggregation::Mean,
            output_csv: PathBuf::from("Yearly_Obesity_Rates_by_Age_Group.csv"),
            output_chart: Some(PathBuf::from("Obesity_Rates_by_Age_Group_Over_Time.png")),
            title: "Obesity Rates Over Time by Age Group (2011-2023)".to_string(),
            legend_title: "Age Group".to_string(),
        }
    }

    /// Obesity by education, lowest level first.
    pub fn education() -> Self {
        Self {
            name: "education".to_string(),
            category: "Education".to_string(),
            include: None,
            exclude: vec!["Data not reported".to_string()],
            ordering: ColumnOrder::Explicit(to_strings(&EDUCATION_ORDER)),
            aggregation: Aggregation::Mean,
            output_csv: PathBuf::from(
                "Yearly_Obesity_Rates_by_Education_Level_Ordered_Low_to_High.csv",
            ),
            output_chart: Some(PathBuf::from("Obesity_Rates_by_Education_Level_Over_Time.png")),
            title: "Obesity Rates Over Time by Education Level (2011-2023)".to_string(),
            legend_title: "Education Level".to_string(),
        }
    }

    /// Obesity by household income, lowest bracket first.
    pub fn income() -> Self {
        Self {
            name: "income".to_string(),
            category: "Income".to_string(),
            include: None,
            exclude: vec!["Data not reported".to_string()],
            ordering: ColumnOrder::Explicit(to_strings(&INCOME_ORDER)),
            aggregation: Aggregation::Mean,
            output_csv: PathBuf::from("Yearly_Obesity_Rates_by_Income_Group_Ordered.csv"),
            output_chart: Some(PathBuf::from("Obesity_Rates_by_Income_Group_Over_Time.png")),
            title: "Obesity Rates Over Time by Income Group (2011-2023)".to_string(),
            legend_title: "Income Group".to_string(),
        }
    }

    /// Male versus female; the only two-group comparison.
    pub fn gender() -> Self {
        Self {
            name: "gender".to_string(),
            category: "Gender".to_string(),
            include: Some(to_strings(&GENDER_VALUES)),
            exclude: Vec::new(),
            ordering: ColumnOrder::Discovery,
            aggregation: Aggregation::Mean,
            output_csv: PathBuf::from("Yearly_Male_Female_Obesity_Rates.csv"),
            output_chart: Some(PathBuf::from("Obesity_Rates_by_Gender_Over_Time.png")),
            title: "Obesity Rates Over Time by Gender (2011-2023)".to_string(),
            legend_title: "Gender".to_string(),
        }
    }

    /// Look up a built-in preset by name.
    pub fn preset(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "age" => Ok(Self::age()),
            "education" | "edu" => Ok(Self::education()),
            "income" => Ok(Self::income()),
            "gender" | "sex" => Ok(Self::gender()),
            other => Err(StrataError::InvalidParameter(format!(
                "Unknown preset '{}'. Available: {}",
                other,
                Self::PRESETS.join(", ")
            ))),
        }
    }

    /// All four presets in the order the batch runs them.
    pub fn presets() -> Vec<Self> {
        vec![Self::age(), Self::education(), Self::income(), Self::gender()]
    }

    /// Strata that must all be present for a year to be kept.
    ///
    /// The explicit ordering wins over `include`; with neither, the strata
    /// discovered in the data are used.
    pub fn columns(&self) -> Option<Vec<String>> {
        let mut columns = match &self.ordering {
            ColumnOrder::Explicit(cols) => cols.clone(),
            ColumnOrder::Discovery => self.include.clone()?,
        };
        columns.retain(|c| !self.exclude.contains(c));
        Some(columns)
    }

    /// Copy with output paths resolved against `dir`.
    pub fn in_dir<P: AsRef<Path>>(&self, dir: P) -> Self {
        let dir = dir.as_ref();
        let mut resolved = self.clone();
        resolved.output_csv = dir.join(&self.output_csv);
        resolved.output_chart = self.output_chart.as_ref().map(|p| dir.join(p));
        resolved
    }

    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(StrataError::from)
    }

    /// Load from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(StrataError::from)
    }
}

/// Inputs and outputs of the regression stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionConfig {
    pub income_csv: PathBuf,
    pub education_csv: PathBuf,
    pub age_csv: PathBuf,
    /// Formula of the interaction model.
    pub formula: String,
    pub heatmap_png: PathBuf,
    pub residuals_png: PathBuf,
    pub residual_hist_png: PathBuf,
    /// Label used in diagnostic chart titles.
    pub model_name: String,
    /// Number of histogram bins for the residual distribution.
    pub bins: usize,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            income_csv: StrataConfig::income().output_csv,
            education_csv: StrataConfig::education().output_csv,
            age_csv: StrataConfig::age().output_csv,
            formula: "rate ~ income_rank * education_rank".to_string(),
            heatmap_png: PathBuf::from("Income_Education_Interaction_Heatmap.png"),
            residuals_png: PathBuf::from("Residuals_vs_Fitted.png"),
            residual_hist_png: PathBuf::from("Residuals_Distribution.png"),
            model_name: "Interaction Model (Income and Education)".to_string(),
            bins: 20,
        }
    }
}

impl RegressionConfig {
    /// Copy with every path resolved against `dir`.
    pub fn in_dir<P: AsRef<Path>>(&self, dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            income_csv: dir.join(&self.income_csv),
            education_csv: dir.join(&self.education_csv),
            age_csv: dir.join(&self.age_csv),
            heatmap_png: dir.join(&self.heatmap_png),
            residuals_png: dir.join(&self.residuals_png),
            residual_hist_png: dir.join(&self.residual_hist_png),
            ..self.clone()
        }
    }

    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(StrataError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(StrataError::from)
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
