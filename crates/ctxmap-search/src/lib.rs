//! Context-sensitive mapping search.
//!
//! Given a source, a destination and a context ontology plus a count
//! backend, find triples `(source concept, destination concept, context
//! concept)` where the destination concept depends on the source concept
//! within the context, measured by a Bayes factor over document
//! co-occurrence counts.
//!
//! - [`MappingSearch::run`]: branch-and-bound with subtree pruning and
//!   cross-context memoization
//! - [`MappingSearch::run_brute_force`]: exhaustive parallel reference
//! - [`filter_by_information_content`]: post-filter on accepted mappings

mod brute;
pub mod cancel;
pub mod config;
pub mod dependence;
pub mod error;
pub mod information;
pub mod mapping;
pub mod report;
pub mod search;
mod traversal;

pub use cancel::CancellationToken;
pub use config::SearchConfig;
pub use dependence::{ContingencyTest, DependenceTest};
pub use error::{MappingError, SearchFailure};
pub use information::{InformationContent, NegativeLogFrequency};
pub use mapping::{filter_by_information_content, Mapping, MappingSink};
pub use report::SearchReport;
pub use search::{MappingSearch, SearchOutcome};
