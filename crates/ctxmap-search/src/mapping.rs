//! Accepted mappings and their post-processing.

use ctxmap_graph::ConceptId;
use serde::{Deserialize, Serialize};

/// "`destination` depends on `source` in `context`", with the information
/// content of each concept in its own ontology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub source: ConceptId,
    pub source_information: f64,
    pub destination: ConceptId,
    pub destination_information: f64,
    pub context: ConceptId,
    pub context_information: f64,
    pub bayes_factor: f64,
}

impl Mapping {
    /// `(source, destination, context)`.
    pub fn key(&self) -> (ConceptId, ConceptId, ConceptId) {
        (self.source, self.destination, self.context)
    }
}

/// Destination for accepted mappings, in emission order.
pub trait MappingSink {
    fn push(&mut self, mapping: Mapping);
}

impl MappingSink for Vec<Mapping> {
    fn push(&mut self, mapping: Mapping) {
        Vec::push(self, mapping);
    }
}

/// Keep mappings whose three information-content values each exceed
/// `cutoff` times the maximum of that dimension over `mappings`.
pub fn filter_by_information_content(mappings: &[Mapping], cutoff: f64) -> Vec<Mapping> {
    let max_of = |f: fn(&Mapping) -> f64| mappings.iter().map(f).fold(0.0_f64, f64::max);
    let source_max = max_of(|m| m.source_information);
    let destination_max = max_of(|m| m.destination_information);
    let context_max = max_of(|m| m.context_information);

    mappings
        .iter()
        .filter(|m| {
            m.source_information > cutoff * source_max
                && m.destination_information > cutoff * destination_max
                && m.context_information > cutoff * context_max
        })
        .cloned()
        .collect()
}
