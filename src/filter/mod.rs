//! Filtering primitives for survey observations.

pub mod topic;

pub use topic::{filter_stratification, filter_topic, TOPIC_CLASS, TOPIC_QUESTION};
