//! Memoizing count backend.
//!
//! The search asks for the same single-concept and range counts over and
//! over (information content, context totals). `CachingBackend` keeps every
//! successful answer in concurrent maps so it can be shared across rayon
//! workers. Failed queries are not cached.

use crate::counts::{CountBackend, CountError};
use ctxmap_graph::ConceptId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

type MatchKey = (Vec<ConceptId>, Vec<ConceptId>);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

pub struct CachingBackend<B> {
    inner: B,
    concepts: DashMap<ConceptId, u64>,
    ranges: DashMap<(ConceptId, u64), u64>,
    matches: DashMap<MatchKey, u64>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<B: CountBackend> CachingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            concepts: DashMap::new(),
            ranges: DashMap::new(),
            matches: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn hit(&self, value: u64) -> Result<u64, CountError> {
        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

/// Order-insensitive key: predicate sets are sets.
fn normalize(concepts: &[ConceptId]) -> Vec<ConceptId> {
    let mut out = concepts.to_vec();
    out.sort_unstable();
    out.dedup();
    out
}

impl<B: CountBackend> CountBackend for CachingBackend<B> {
    fn count(&self, concept: ConceptId) -> Result<u64, CountError> {
        if let Some(v) = self.concepts.get(&concept) {
            return self.hit(*v);
        }
        self.miss();
        let v = self.inner.count(concept)?;
        self.concepts.insert(concept, v);
        Ok(v)
    }

    fn count_in_range(&self, start: ConceptId, length: u64) -> Result<u64, CountError> {
        if let Some(v) = self.ranges.get(&(start, length)) {
            return self.hit(*v);
        }
        self.miss();
        let v = self.inner.count_in_range(start, length)?;
        self.ranges.insert((start, length), v);
        Ok(v)
    }

    fn count_matching(
        &self,
        required: &[ConceptId],
        excluded: &[ConceptId],
    ) -> Result<u64, CountError> {
        let key = (normalize(required), normalize(excluded));
        if let Some(v) = self.matches.get(&key) {
            return self.hit(*v);
        }
        self.miss();
        let v = self.inner.count_matching(required, excluded)?;
        self.matches.insert(key, v);
        Ok(v)
    }
}
