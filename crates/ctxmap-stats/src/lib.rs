//! Statistics layer for context-sensitive ontology mapping.
//!
//! - `counts`: the count-backend contract (raw co-occurrence counts)
//! - `memory`: an in-memory, bitmap-backed reference backend
//! - `cache`: a memoizing decorator for any backend
//! - `contingency`: 2^k x 2 contingency tables built from count queries
//! - `score`: Dirichlet marginal likelihoods, CI Bayes factor and BDeu
//!
//! The production count index (disk-based, built from an external
//! annotation store) is not part of this crate; it plugs in through
//! [`CountBackend`].

pub mod cache;
pub mod contingency;
pub mod counts;
pub mod memory;
pub mod score;

pub use cache::{CacheStats, CachingBackend};
pub use contingency::{ContingencyOracle, ContingencyTable, TableError, MAX_ANCESTORS};
pub use counts::{CountBackend, CountError};
pub use ctxmap_graph::ConceptId;
pub use memory::{MemoryIndex, MemoryIndexSpec};
pub use score::{
    bayes_factor, bdeu_score, dependence_score, independence_score, log_gamma,
    marginal_log_likelihood, ScoreError, ScoreKind,
};
