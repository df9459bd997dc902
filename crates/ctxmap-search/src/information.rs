//! Information content of a concept within its ontology.

/// Maps a concept's document count (relative to its ontology's total) to an
/// information value. Must be non-increasing in `concept_count / total_count`.
pub trait InformationContent: Send + Sync {
    fn information_content(&self, concept_count: u64, total_count: u64) -> f64;
}

/// `-ln(max(count, 1) / max(total, count, 1))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegativeLogFrequency;

impl InformationContent for NegativeLogFrequency {
    fn information_content(&self, concept_count: u64, total_count: u64) -> f64 {
        let count = concept_count.max(1) as f64;
        let total = total_count.max(concept_count).max(1) as f64;
        (total / count).ln()
    }
}
