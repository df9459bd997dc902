//! Contingency tables over co-occurrence counts.
//!
//! A table conditions a binary child concept on `k` ancestor concepts inside
//! one context concept. It has `2 * 2^k` cells; for every ancestor
//! configuration `instance` in `[0, 2^k)` (bit `i` set = ancestor `i`
//! present):
//!
//! - cell `2 * instance`     = context AND NOT child AND configuration
//! - cell `2 * instance + 1` = context AND child AND configuration
//!
//! Cell 0 is never queried. It is closed against the context total:
//! `cell[0] = count(context) - sum(cell[1..])`.

use crate::counts::{CountBackend, CountError};
use ctxmap_graph::ConceptId;

/// Upper bound on conditioning ancestors (`2^16` configurations).
pub const MAX_ANCESTORS: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error(transparent)]
    Count(#[from] CountError),
    #[error("too many ancestors: {count} (max {MAX_ANCESTORS})")]
    TooManyAncestors { count: usize },
    #[error("invalid table shape: {len} cells (expected 2 * 2^k)")]
    InvalidShape { len: usize },
    #[error("observed cells sum to {observed}, exceeding the context total {context_total}")]
    InconsistentCounts { context_total: u64, observed: u64 },
    #[error("table counts overflow u64 ({cells} cells)")]
    CountOverflow { cells: usize },
}

/// Cells always sum to a value that fits in `u64`, so every marginal does too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContingencyTable {
    cells: Vec<u64>,
    arity: usize,
}

impl ContingencyTable {
    /// Wrap raw cells; the length must be `2 * 2^k` with `k <= MAX_ANCESTORS`
    /// and the cells must sum to at most `u64::MAX`.
    pub fn from_cells(cells: Vec<u64>) -> Result<Self, TableError> {
        let len = cells.len();
        if len < 2 || !len.is_power_of_two() {
            return Err(TableError::InvalidShape { len });
        }
        let arity = (len / 2).trailing_zeros() as usize;
        if arity > MAX_ANCESTORS {
            return Err(TableError::TooManyAncestors { count: arity });
        }
        checked_sum(&cells).ok_or(TableError::CountOverflow { cells: len })?;
        Ok(Self { cells, arity })
    }

    pub fn cells(&self) -> &[u64] {
        &self.cells
    }

    /// Number of conditioning ancestors `k`.
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn cell(&self, instance: usize, child_present: bool) -> u64 {
        self.cells[2 * instance + usize::from(child_present)]
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().sum()
    }

    /// `[child absent, child present]`, summed over all configurations.
    pub fn child_marginal(&self) -> [u64; 2] {
        let mut out = [0u64; 2];
        for (i, &c) in self.cells.iter().enumerate() {
            out[i & 1] += c;
        }
        out
    }

    /// `[ancestor absent, ancestor present]` for ancestor `ancestor`.
    pub fn ancestor_marginal(&self, ancestor: usize) -> [u64; 2] {
        let mut out = [0u64; 2];
        for (i, &c) in self.cells.iter().enumerate() {
            let instance = i >> 1;
            out[(instance >> ancestor) & 1] += c;
        }
        out
    }
}

/// Builds contingency tables by issuing one count query per cell.
#[derive(Debug, Clone)]
pub struct ContingencyOracle<B> {
    backend: B,
}

impl<B: CountBackend> ContingencyOracle<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Build the full table for `child` conditioned on `ancestors` in
    /// `context`. Any failing query aborts the whole table.
    pub fn build_table(
        &self,
        ancestors: &[ConceptId],
        child: ConceptId,
        context: ConceptId,
    ) -> Result<ContingencyTable, TableError> {
        let k = ancestors.len();
        if k > MAX_ANCESTORS {
            return Err(TableError::TooManyAncestors { count: k });
        }

        let configurations = 1usize << k;
        let mut cells = vec![0u64; 2 * configurations];
        let mut required = Vec::with_capacity(k + 2);
        let mut excluded = Vec::with_capacity(k + 1);

        for instance in 0..configurations {
            required.clear();
            excluded.clear();
            required.push(context);
            for (bit, &ancestor) in ancestors.iter().enumerate() {
                if (instance >> bit) & 1 == 1 {
                    required.push(ancestor);
                } else {
                    excluded.push(ancestor);
                }
            }

            required.push(child);
            cells[2 * instance + 1] = self.backend.count_matching(&required, &excluded)?;
            required.pop();

            // The all-absent negative cell is derived below.
            if instance != 0 {
                excluded.push(child);
                cells[2 * instance] = self.backend.count_matching(&required, &excluded)?;
            }
        }

        let context_total = self.backend.count(context)?;
        let observed = checked_sum(&cells[1..]).ok_or(TableError::CountOverflow {
            cells: cells.len(),
        })?;
        cells[0] = context_total
            .checked_sub(observed)
            .ok_or(TableError::InconsistentCounts {
                context_total,
                observed,
            })?;

        Ok(ContingencyTable { cells, arity: k })
    }
}

fn checked_sum(cells: &[u64]) -> Option<u64> {
    cells.iter().try_fold(0u64, |acc, &c| acc.checked_add(c))
}
