//! Topic and stratification filters over survey observations.

use crate::data::Observation;
use crate::error::{Result, StrataError};
use tracing::debug;

/// `Class` value of the obesity topic.
pub const TOPIC_CLASS: &str = "Obesity / Weight Status";

/// `Question` value of the obesity prevalence question.
pub const TOPIC_QUESTION: &str = "Percent of adults aged 18 years and older who have obesity";

/// Keep observations of the obesity prevalence question.
pub fn filter_topic(observations: &[Observation]) -> Vec<Observation> {
    let kept: Vec<Observation> = observations
        .iter()
        .filter(|o| o.class == TOPIC_CLASS && o.question == TOPIC_QUESTION)
        .cloned()
        .collect();
    debug!(
        total = observations.len(),
        kept = kept.len(),
        "filtered to obesity topic"
    );
    kept
}

/// Keep observations of one stratification category.
///
/// # Arguments
/// * `observations` - Topic-filtered observations
/// * `category` - `StratificationCategory1` value to keep
/// * `include` - When set, only these strata are kept
/// * `exclude` - Strata dropped regardless of `include`
///
/// # Returns
/// The matching observations, or [`StrataError::NoData`] when none match.
pub fn filter_stratification(
    observations: &[Observation],
    category: &str,
    include: Option<&[String]>,
    exclude: &[String],
) -> Result<Vec<Observation>> {
    let kept: Vec<Observation> = observations
        .iter()
        .filter(|o| o.stratification_category == category)
        .filter(|o| include.map_or(true, |inc| inc.iter().any(|s| s == &o.stratum)))
        .filter(|o| !exclude.iter().any(|s| s == &o.stratum))
        .cloned()
        .collect();

    debug!(category, kept = kept.len(), "filtered by stratification");

    if kept.is_empty() {
        return Err(StrataError::no_data(category));
    }
    Ok(kept)
}
