//! The dependence test behind every search decision.

use crate::config::SearchConfig;
use crate::error::MappingError;
use ctxmap_graph::ConceptId;
use ctxmap_stats::{ContingencyOracle, CountBackend, ScoreKind};

/// Evidence that `destination` depends on `source` within `context`,
/// as a log Bayes factor.
pub trait DependenceTest: Send + Sync {
    fn bayes_factor(
        &self,
        source: ConceptId,
        destination: ConceptId,
        context: ConceptId,
    ) -> Result<f64, MappingError>;
}

impl<T: DependenceTest + ?Sized> DependenceTest for &T {
    fn bayes_factor(
        &self,
        source: ConceptId,
        destination: ConceptId,
        context: ConceptId,
    ) -> Result<f64, MappingError> {
        (**self).bayes_factor(source, destination, context)
    }
}

/// Builds a one-ancestor contingency table (`ancestors = [source]`,
/// `child = destination`) and scores it.
#[derive(Debug, Clone)]
pub struct ContingencyTest<B> {
    oracle: ContingencyOracle<B>,
    score: ScoreKind,
    parameter: f64,
}

impl<B: CountBackend> ContingencyTest<B> {
    pub fn new(backend: B, score: ScoreKind, parameter: f64) -> Self {
        Self {
            oracle: ContingencyOracle::new(backend),
            score,
            parameter,
        }
    }

    pub fn from_config(backend: B, config: &SearchConfig) -> Self {
        Self::new(backend, config.score, config.alpha)
    }

    pub fn oracle(&self) -> &ContingencyOracle<B> {
        &self.oracle
    }
}

impl<B: CountBackend> DependenceTest for ContingencyTest<B> {
    fn bayes_factor(
        &self,
        source: ConceptId,
        destination: ConceptId,
        context: ConceptId,
    ) -> Result<f64, MappingError> {
        let table = self.oracle.build_table(&[source], destination, context)?;
        Ok(self.score.score(&table, self.parameter)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxmap_stats::{bayes_factor, MemoryIndex};

    #[test]
    fn scores_the_one_ancestor_table() {
        let mut docs = Vec::new();
        for _ in 0..40 {
            docs.push(vec![10, 1, 100]);
            docs.push(vec![10]);
        }
        docs.push(vec![10, 1]);
        docs.push(vec![10, 100]);
        let index = MemoryIndex::from_documents(docs);
        let test = ContingencyTest::new(&index, ScoreKind::ConditionalIndependence, 2.0);

        let table = test.oracle().build_table(&[1], 100, 10).unwrap();
        let expected = bayes_factor(&table, 2.0).unwrap();
        assert_eq!(test.bayes_factor(1, 100, 10).unwrap(), expected);
        assert!(expected > 5.0);
    }
}
