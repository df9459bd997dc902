//! Bayesian scores over contingency tables.
//!
//! The conditional-independence test compares two Dirichlet-multinomial
//! models of the same table:
//!
//! - dependence: the whole table is one joint distribution
//! - independence: the child and every ancestor are independent binary
//!   variables (product of 2-cell marginals)
//!
//! `bayes_factor = log P(table | dependence) - log P(table | independence)`.
//! Positive values are evidence of dependence.

use crate::contingency::ContingencyTable;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error("invalid {field}: {message}")]
    InvalidParameter { field: &'static str, message: String },
}

// Six-term Lanczos series (g = 5).
const LANCZOS: [f64; 6] = [
    76.18009173,
    -86.50532033,
    24.01409822,
    -1.231739516,
    0.00120858003,
    -0.00000536382,
];

#[inline]
fn lanczos(x: f64) -> f64 {
    let tmp = (x - 0.5) * (x + 4.5).ln() - (x + 4.5);
    let mut ser = 1.0;
    for (i, c) in LANCZOS.iter().enumerate() {
        ser += c / (x + i as f64);
    }
    tmp + (ser * (2.0 * PI).sqrt()).ln()
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ScoreError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ScoreError::InvalidParameter {
            field,
            message: format!("expected a positive finite value, got {value}"),
        })
    }
}

/// `ln Γ(x)` for `x > 0`.
pub fn log_gamma(x: f64) -> Result<f64, ScoreError> {
    check_positive("x", x)?;
    Ok(lanczos(x))
}

/// Dirichlet-multinomial marginal log-likelihood with symmetric prior
/// `alpha` spread uniformly over the cells.
pub fn marginal_log_likelihood(counts: &[u64], alpha: f64) -> Result<f64, ScoreError> {
    check_positive("alpha", alpha)?;
    if counts.is_empty() {
        return Err(ScoreError::InvalidParameter {
            field: "counts",
            message: "at least one cell is required".to_string(),
        });
    }

    let alpha_k = alpha / counts.len() as f64;
    let lg_alpha_k = lanczos(alpha_k);
    let mut mll = 0.0;
    let mut total = 0.0;
    for &c in counts {
        let c = c as f64;
        mll += lanczos(alpha_k + c) - lg_alpha_k;
        total += c;
    }
    mll += lanczos(alpha) - lanczos(alpha + total);
    Ok(mll)
}

pub fn dependence_score(table: &ContingencyTable, alpha: f64) -> Result<f64, ScoreError> {
    marginal_log_likelihood(table.cells(), alpha)
}

pub fn independence_score(table: &ContingencyTable, alpha: f64) -> Result<f64, ScoreError> {
    let mut score = marginal_log_likelihood(&table.child_marginal(), alpha)?;
    for ancestor in 0..table.arity() {
        score += marginal_log_likelihood(&table.ancestor_marginal(ancestor), alpha)?;
    }
    Ok(score)
}

pub fn bayes_factor(table: &ContingencyTable, alpha: f64) -> Result<f64, ScoreError> {
    Ok(dependence_score(table, alpha)? - independence_score(table, alpha)?)
}

/// BDeu-style score over consecutive 2-cell blocks with equivalent sample
/// size `ess`.
pub fn bdeu_score(table: &ContingencyTable, ess: f64) -> Result<f64, ScoreError> {
    check_positive("ess", ess)?;
    let lg_ess = lanczos(ess);
    let mut score = 0.0;
    for block in table.cells().chunks_exact(2) {
        let (n0, n1) = (block[0] as f64, block[1] as f64);
        score += lg_ess - lanczos(n0 + n1 + ess);
        score += lanczos(n0 + ess) - lg_ess;
        score += lanczos(n1 + ess) - lg_ess;
    }
    Ok(score)
}

/// Which score drives the search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// Conditional-independence Bayes factor; the parameter is `alpha`.
    #[default]
    ConditionalIndependence,
    /// BDeu; the parameter is the equivalent sample size.
    Bdeu,
}

impl ScoreKind {
    pub fn score(self, table: &ContingencyTable, parameter: f64) -> Result<f64, ScoreError> {
        match self {
            ScoreKind::ConditionalIndependence => bayes_factor(table, parameter),
            ScoreKind::Bdeu => bdeu_score(table, parameter),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScoreKind::ConditionalIndependence => "ci",
            ScoreKind::Bdeu => "bdeu",
        }
    }
}
