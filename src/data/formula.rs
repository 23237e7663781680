//! Formula parsing for model specification.

use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};

/// A term in a formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Term {
    /// Intercept term (constant).
    Intercept,
    /// Main effect of a variable.
    Main(String),
    /// Interaction between two variables.
    Interaction(String, String),
}

impl Term {
    /// Get the variable names involved in this term.
    pub fn variables(&self) -> Vec<&str> {
        match self {
            Term::Intercept => vec![],
            Term::Main(v) => vec![v.as_str()],
            Term::Interaction(v1, v2) => vec![v1.as_str(), v2.as_str()],
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Intercept => write!(f, "1"),
            Term::Main(v) => write!(f, "{}", v),
            Term::Interaction(v1, v2) => write!(f, "{}:{}", v1, v2),
        }
    }
}

/// A parsed formula specifying a linear model.
///
/// Supports R-style formula syntax with an optional response:
/// - `rate ~ income_rank` - intercept + income_rank
/// - `~ income_rank + education_rank` - intercept + both ranks
/// - `~ income_rank * education_rank` - both ranks + their product
/// - `~ 0 + income_rank` - no intercept
/// - `~ income_rank:education_rank` - intercept + product only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    /// Response variable, when written on the left of `~`.
    pub response: Option<String>,
    /// Whether to include an intercept.
    pub intercept: bool,
    /// Terms in the formula (excluding intercept).
    pub terms: Vec<Term>,
    /// Original formula string.
    pub formula_str: String,
}

impl Formula {
    /// Parse a formula string.
    ///
    /// # Examples
    /// ```
    /// use brfss_strata::data::Formula;
    /// let f = Formula::parse("rate ~ income_rank * education_rank").unwrap();
    /// assert!(f.intercept);
    /// assert_eq!(f.response.as_deref(), Some("rate"));
    /// assert_eq!(f.terms.len(), 3);
    /// ```
    pub fn parse(formula: &str) -> Result<Self> {
        let (lhs, rhs) = formula.trim().split_once('~').ok_or_else(|| {
            StrataError::FormulaParse("Formula must contain '~'".to_string())
        })?;

        let lhs = lhs.trim();
        if lhs.contains(|c: char| c.is_whitespace() || "+*:".contains(c)) {
            return Err(StrataError::FormulaParse(format!(
                "Response must be a single variable, got '{}'",
                lhs
            )));
        }
        let response = (!lhs.is_empty()).then(|| lhs.to_string());

        let mut intercept = true;
        let mut terms: Vec<Term> = Vec::new();
        let pieces: Vec<&str> = rhs.split('+').map(str::trim).collect();
        if pieces.iter().all(|p| p.is_empty()) {
            return Err(StrataError::FormulaParse(
                "Formula right-hand side is empty".to_string(),
            ));
        }

        for piece in pieces {
            match piece {
                "" | "1" => {}
                "0" | "-1" => intercept = false,
                _ if piece.contains('*') => {
                    let (a, b) = split_pair(piece, '*')?;
                    push_unique(Term::Main(a.clone()), &mut terms);
                    push_unique(Term::Main(b.clone()), &mut terms);
                    push_unique(Term::Interaction(a, b), &mut terms);
                }
                _ if piece.contains(':') => {
                    let (a, b) = split_pair(piece, ':')?;
                    push_unique(Term::Interaction(a, b), &mut terms);
                }
                _ => push_unique(Term::Main(piece.to_string()), &mut terms),
            }
        }

        if terms.is_empty() && !intercept {
            return Err(StrataError::FormulaParse(
                "Formula must have at least one term".to_string(),
            ));
        }

        Ok(Self {
            response,
            intercept,
            terms,
            formula_str: formula.to_string(),
        })
    }

    /// Get all variable names used in the formula.
    pub fn variables(&self) -> Vec<&str> {
        let mut vars: Vec<&str> = self
            .terms
            .iter()
            .flat_map(|t| t.variables())
            .collect();
        vars.sort();
        vars.dedup();
        vars
    }
}

fn push_unique(term: Term, terms: &mut Vec<Term>) {
    if !terms.contains(&term) {
        terms.push(term);
    }
}

/// Split `a<sep>b` into exactly two non-empty variable names.
fn split_pair(piece: &str, sep: char) -> Result<(String, String)> {
    let parts: Vec<&str> = piece.split(sep).map(str::trim).collect();
    match parts.as_slice() {
        [a, b] if !a.is_empty() && !b.is_empty() => Ok((a.to_string(), b.to_string())),
        _ => Err(StrataError::FormulaParse(format!(
            "Invalid interaction term: {}",
            piece
        ))),
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(response) = &self.response {
            write!(f, "{} ", response)?;
        }
        write!(f, "~ ")?;
        if !self.intercept {
            write!(f, "0 + ")?;
        }
        let term_strs: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", term_strs.join(" + "))
    }
}
