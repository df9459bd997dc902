//! Search tunables.

use crate::error::MappingError;
use ctxmap_stats::ScoreKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for one mapping run.
///
/// Missing JSON fields fall back to the defaults, so a config file only
/// needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Dirichlet prior strength (or the equivalent sample size for BDeu).
    pub alpha: f64,
    /// `bf <= min_threshold` prunes the destination subtree.
    pub min_threshold: f64,
    /// `bf > accept_threshold` emits a mapping.
    pub accept_threshold: f64,
    pub score: ScoreKind,
    /// Reuse pruned sets recorded under ancestor contexts.
    pub memoize: bool,
    /// Use the smaller of the two mapped ontologies as the source graph.
    pub orient_by_size: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            alpha: 2.0,
            min_threshold: 0.0,
            accept_threshold: 5.0,
            score: ScoreKind::default(),
            memoize: true,
            orient_by_size: true,
        }
    }
}

impl SearchConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, MappingError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MappingError::invalid("config", format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            MappingError::invalid("config", format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_thresholds(mut self, min_threshold: f64, accept_threshold: f64) -> Self {
        self.min_threshold = min_threshold;
        self.accept_threshold = accept_threshold;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_score(mut self, score: ScoreKind) -> Self {
        self.score = score;
        self
    }

    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    pub fn with_orient_by_size(mut self, orient_by_size: bool) -> Self {
        self.orient_by_size = orient_by_size;
        self
    }

    pub fn validate(&self) -> Result<(), MappingError> {
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(MappingError::invalid(
                "alpha",
                format!("expected a positive finite value, got {}", self.alpha),
            ));
        }
        if self.min_threshold.is_nan() {
            return Err(MappingError::invalid("min_threshold", "must not be NaN"));
        }
        if self.accept_threshold.is_nan() {
            return Err(MappingError::invalid("accept_threshold", "must not be NaN"));
        }
        if self.min_threshold > self.accept_threshold {
            return Err(MappingError::invalid(
                "min_threshold",
                format!(
                    "min_threshold {} exceeds accept_threshold {}",
                    self.min_threshold, self.accept_threshold
                ),
            ));
        }
        Ok(())
    }
}
