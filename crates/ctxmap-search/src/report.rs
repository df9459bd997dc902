use serde::{Deserialize, Serialize};

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReport {
    /// Dependence tests issued.
    pub tests_run: u64,
    pub accepted: u64,
    /// Destination nodes pruned (`bf <= min_threshold`).
    pub pruned: u64,
    /// Destination nodes skipped because an ancestor was pruned.
    pub blocked: u64,
    /// Source branches skipped because every destination root was pruned.
    pub skipped_source_branches: u64,
    pub context_nodes: u64,
    pub source_nodes: u64,
    pub cancelled: bool,
    /// Source and destination were exchanged by `orient_by_size`.
    pub swapped: bool,
}
