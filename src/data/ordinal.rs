//! Ordered category lists and their integer encodings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rank given to a value that is not in the category list.
pub const UNMAPPED: i64 = -1;

/// Education levels, low to high.
pub const EDUCATION_ORDER: [&str; 4] = [
    "Less than high school",
    "High school graduate",
    "Some college or technical school",
    "College graduate",
];

/// Income brackets, low to high.
pub const INCOME_ORDER: [&str; 6] = [
    "Less than $15,000",
    "$15,000 - $24,999",
    "$25,000 - $34,999",
    "$35,000 - $49,999",
    "$50,000 - $74,999",
    "$75,000 or greater",
];

/// Age bands, youngest first.
pub const AGE_ORDER: [&str; 6] = [
    "18 - 24",
    "25 - 34",
    "35 - 44",
    "45 - 54",
    "55 - 64",
    "65 or older",
];

/// Gender strata compared by the two-sample test.
pub const GENDER_VALUES: [&str; 2] = ["Male", "Female"];

/// Mapping from an ordered category list to ranks `0..k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EncodingSpec", into = "EncodingSpec")]
pub struct OrdinalEncoding {
    name: String,
    categories: Vec<String>,
    ranks: HashMap<String, i64>,
}

/// Serialized form: just the name and the ordered list.
#[derive(Serialize, Deserialize)]
struct EncodingSpec {
    name: String,
    categories: Vec<String>,
}

impl From<EncodingSpec> for OrdinalEncoding {
    fn from(spec: EncodingSpec) -> Self {
        Self::new(&spec.name, spec.categories.as_slice())
    }
}

impl From<OrdinalEncoding> for EncodingSpec {
    fn from(enc: OrdinalEncoding) -> Self {
        Self {
            name: enc.name,
            categories: enc.categories,
        }
    }
}

impl OrdinalEncoding {
    /// Build an encoding; the position in `categories` is the rank.
    ///
    /// A repeated category keeps its first position.
    pub fn new<S: AsRef<str>>(name: &str, categories: &[S]) -> Self {
        let mut ordered: Vec<String> = Vec::with_capacity(categories.len());
        for c in categories {
            let c = c.as_ref();
            if !ordered.iter().any(|o| o == c) {
                ordered.push(c.to_string());
            }
        }
        let ranks = Self::index(&ordered);
        Self {
            name: name.to_string(),
            categories: ordered,
            ranks,
        }
    }

    fn index(categories: &[String]) -> HashMap<String, i64> {
        categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i as i64))
            .collect()
    }

    /// Education levels, low to high.
    pub fn education() -> Self {
        Self::new("Education", &EDUCATION_ORDER)
    }

    /// Income brackets, low to high.
    pub fn income() -> Self {
        Self::new("Income", &INCOME_ORDER)
    }

    /// Age bands, youngest first.
    pub fn age() -> Self {
        Self::new("Age (years)", &AGE_ORDER)
    }

    /// Name of the encoded category.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered category labels.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Rank of a label, or [`UNMAPPED`].
    pub fn encode(&self, label: &str) -> i64 {
        self.ranks.get(label).copied().unwrap_or(UNMAPPED)
    }

    /// Label for a rank.
    pub fn decode(&self, rank: i64) -> Option<&str> {
        usize::try_from(rank)
            .ok()
            .and_then(|i| self.categories.get(i))
            .map(String::as_str)
    }

    /// All valid ranks in order.
    pub fn ranks(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.categories.len()).map(|i| i as i64)
    }
}
