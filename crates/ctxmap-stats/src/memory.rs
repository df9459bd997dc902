//! In-memory count index.
//!
//! Each annotated document gets a dense `u32` id; every concept keeps a
//! Roaring bitmap of the documents it annotates. Counting is then a matter of
//! bitmap joins:
//!
//! - `count(c)` = `|postings(c)|`
//! - `count_in_range` = `|union of postings over the range|`
//! - `count_matching` = `|intersection(required) - union(excluded)|`
//!
//! Postings are kept in a `BTreeMap` so range queries only touch concepts
//! that actually occur.

use crate::counts::{CountBackend, CountError};
use ctxmap_graph::ConceptId;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Serialized form: one concept list per document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryIndexSpec {
    pub documents: Vec<Vec<ConceptId>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    postings: BTreeMap<ConceptId, RoaringBitmap>,
    documents: u32,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents<I, D>(documents: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: IntoIterator<Item = ConceptId>,
    {
        let mut index = Self::new();
        for doc in documents {
            index.add_document(doc);
        }
        index
    }

    pub fn from_spec(spec: &MemoryIndexSpec) -> Self {
        Self::from_documents(spec.documents.iter().map(|d| d.iter().copied()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CountError> {
        let text = std::fs::read_to_string(path)?;
        let spec: MemoryIndexSpec = serde_json::from_str(&text)?;
        let index = Self::from_spec(&spec);
        tracing::debug!(
            path = %path.display(),
            documents = index.document_count(),
            concepts = index.concept_count(),
            "loaded count index"
        );
        Ok(index)
    }

    /// Add one document; returns its id.
    pub fn add_document<D: IntoIterator<Item = ConceptId>>(&mut self, concepts: D) -> u32 {
        let id = self.documents;
        self.documents += 1;
        for concept in concepts {
            self.postings
                .entry(concept)
                .or_insert_with(RoaringBitmap::new)
                .insert(id);
        }
        id
    }

    pub fn document_count(&self) -> u64 {
        u64::from(self.documents)
    }

    /// Number of distinct concepts with at least one document.
    pub fn concept_count(&self) -> usize {
        self.postings.len()
    }

    pub fn postings(&self, concept: ConceptId) -> Option<&RoaringBitmap> {
        self.postings.get(&concept)
    }

    /// Documents carrying every `required` concept and no `excluded` one.
    ///
    /// An empty `required` list matches every document.
    pub fn documents_matching(
        &self,
        required: &[ConceptId],
        excluded: &[ConceptId],
    ) -> RoaringBitmap {
        let mut acc = match required.split_first() {
            None => {
                let mut all = RoaringBitmap::new();
                all.insert_range(0..self.documents);
                all
            }
            Some((first, rest)) => {
                let Some(first) = self.postings.get(first) else {
                    return RoaringBitmap::new();
                };
                let mut acc = first.clone();
                for concept in rest {
                    match self.postings.get(concept) {
                        Some(bits) => acc &= bits,
                        None => return RoaringBitmap::new(),
                    }
                    if acc.is_empty() {
                        return acc;
                    }
                }
                acc
            }
        };

        for concept in excluded {
            if let Some(bits) = self.postings.get(concept) {
                acc -= bits;
            }
        }
        acc
    }
}

impl CountBackend for MemoryIndex {
    fn count(&self, concept: ConceptId) -> Result<u64, CountError> {
        Ok(self.postings.get(&concept).map(|b| b.len()).unwrap_or(0))
    }

    fn count_in_range(&self, start: ConceptId, length: u64) -> Result<u64, CountError> {
        if length == 0 {
            return Ok(0);
        }
        let end = start.saturating_add(length);
        let mut union = RoaringBitmap::new();
        for (_, bits) in self.postings.range(start..end) {
            union |= bits;
        }
        Ok(union.len())
    }

    fn count_matching(
        &self,
        required: &[ConceptId],
        excluded: &[ConceptId],
    ) -> Result<u64, CountError> {
        Ok(self.documents_matching(required, excluded).len())
    }
}
