//! Ontology graphs for context-sensitive mapping.
//!
//! An ontology is a DAG of concepts with designated roots. Concepts carry
//! globally unique `u64` ids and every ontology owns a contiguous id range
//! `[start, start + length)`.
//!
//! Graphs are stored as an arena:
//! - every concept gets a dense [`NodeIdx`]
//! - children and parents are index lists (insertion order is preserved)
//! - the graph is immutable once built and is validated on construction
//!   (range membership + acyclicity)
//!
//! Graphs come from a [`GraphSource`] as an [`OntologySpec`] record and are
//! turned into an [`OntologyGraph`] with [`OntologyGraph::from_spec`].

pub mod source;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

pub use source::{load_json_file, GraphSource, InMemoryGraphSource, JsonGraphSource};

/// Globally unique concept identifier.
pub type ConceptId = u64;

// ============================================================================
// Identifiers and ranges
// ============================================================================

/// Dense arena index of a concept inside one [`OntologyGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeIdx(u32);

impl NodeIdx {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Contiguous concept-id range owned by one ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRange {
    pub start: ConceptId,
    pub length: u64,
}

impl ConceptRange {
    pub const fn new(start: ConceptId, length: u64) -> Self {
        Self { start, length }
    }

    /// Exclusive upper bound (saturating).
    pub fn end(&self) -> ConceptId {
        self.start.saturating_add(self.length)
    }

    pub fn contains(&self, concept: ConceptId) -> bool {
        concept >= self.start && concept - self.start < self.length
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("malformed ontology `{ontology}`: {message}")]
    MalformedGraph { ontology: String, message: String },
    #[error("graph source failed for `{ontology}`: {message}")]
    Source { ontology: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraphError {
    pub fn malformed(ontology: &str, message: impl Into<String>) -> Self {
        GraphError::MalformedGraph {
            ontology: ontology.to_string(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Graph source record
// ============================================================================

/// Bulk-load record produced by a graph source.
///
/// `adjacency` maps a parent concept to its direct children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OntologySpec {
    pub name: String,
    pub start_index: ConceptId,
    pub length: u64,
    pub roots: Vec<ConceptId>,
    #[serde(default)]
    pub adjacency: BTreeMap<ConceptId, Vec<ConceptId>>,
}

impl OntologySpec {
    pub fn range(&self) -> ConceptRange {
        ConceptRange::new(self.start_index, self.length)
    }
}

// ============================================================================
// Ontology graph
// ============================================================================

/// Immutable, validated ontology DAG.
#[derive(Debug, Clone)]
pub struct OntologyGraph {
    name: String,
    range: ConceptRange,
    concepts: Vec<ConceptId>,
    index: HashMap<ConceptId, NodeIdx>,
    children: Vec<Vec<NodeIdx>>,
    parents: Vec<Vec<NodeIdx>>,
    roots: Vec<NodeIdx>,
    edge_count: usize,
}

impl OntologyGraph {
    pub fn builder(name: impl Into<String>, range: ConceptRange) -> OntologyGraphBuilder {
        OntologyGraphBuilder::new(name, range)
    }

    /// Build and validate a graph from a graph-source record.
    pub fn from_spec(spec: OntologySpec) -> Result<Self, GraphError> {
        let mut builder = OntologyGraphBuilder::new(spec.name.clone(), spec.range());
        for root in &spec.roots {
            builder.add_root(*root);
        }
        for (parent, children) in &spec.adjacency {
            for child in children {
                builder.add_edge(*parent, *child);
            }
        }
        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> ConceptRange {
        self.range
    }

    /// Declared number of concepts (the range length).
    pub fn len(&self) -> u64 {
        self.range.length
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Number of concepts that actually appear in roots or edges.
    pub fn node_count(&self) -> usize {
        self.concepts.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn roots(&self) -> &[NodeIdx] {
        &self.roots
    }

    pub fn root_concepts(&self) -> Vec<ConceptId> {
        self.roots.iter().map(|&r| self.concept(r)).collect()
    }

    pub fn children(&self, node: NodeIdx) -> &[NodeIdx] {
        self.children
            .get(node.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn parents(&self, node: NodeIdx) -> &[NodeIdx] {
        self.parents
            .get(node.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Concept id of an arena index.
    ///
    /// Panics if `node` does not belong to this graph.
    pub fn concept(&self, node: NodeIdx) -> ConceptId {
        self.concepts[node.index()]
    }

    pub fn index_of(&self, concept: ConceptId) -> Option<NodeIdx> {
        self.index.get(&concept).copied()
    }

    pub fn contains(&self, concept: ConceptId) -> bool {
        self.index.contains_key(&concept)
    }

    /// Child concept ids of `concept` (empty for leaves and unknown ids).
    pub fn children_of(&self, concept: ConceptId) -> Vec<ConceptId> {
        match self.index_of(concept) {
            Some(node) => self
                .children(node)
                .iter()
                .map(|&c| self.concept(c))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Breadth-first layering from the roots, as arena indices.
    ///
    /// Layer 0 holds the roots; layer `i + 1` holds the children of layer `i`
    /// that were not already placed in an earlier layer. A node reachable at
    /// several depths lands in the layer where it was first discovered, so
    /// this is not a true topological order for DAGs with cross-level edges.
    pub fn layer_indices(&self) -> Vec<Vec<NodeIdx>> {
        let mut layers = Vec::new();
        let mut visited = vec![false; self.concepts.len()];

        let mut current = Vec::with_capacity(self.roots.len());
        for &root in &self.roots {
            if !visited[root.index()] {
                visited[root.index()] = true;
                current.push(root);
            }
        }

        while !current.is_empty() {
            let mut next = Vec::new();
            for &node in &current {
                for &child in self.children(node) {
                    if !visited[child.index()] {
                        visited[child.index()] = true;
                        next.push(child);
                    }
                }
            }
            layers.push(current);
            current = next;
        }

        layers
    }

    /// Breadth-first layering from the roots, as concept ids.
    pub fn topological_layers(&self) -> Vec<Vec<ConceptId>> {
        self.layer_indices()
            .into_iter()
            .map(|layer| layer.into_iter().map(|n| self.concept(n)).collect())
            .collect()
    }

    /// Every concept reachable from the roots, in layer order.
    pub fn all_concepts(&self) -> Vec<ConceptId> {
        self.layer_indices()
            .into_iter()
            .flatten()
            .map(|n| self.concept(n))
            .collect()
    }

    /// Export back to a graph-source record.
    pub fn to_spec(&self) -> OntologySpec {
        let mut adjacency = BTreeMap::new();
        for (i, children) in self.children.iter().enumerate() {
            if children.is_empty() {
                continue;
            }
            adjacency.insert(
                self.concepts[i],
                children.iter().map(|&c| self.concept(c)).collect(),
            );
        }
        OntologySpec {
            name: self.name.clone(),
            start_index: self.range.start,
            length: self.range.length,
            roots: self.root_concepts(),
            adjacency,
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Incremental constructor for [`OntologyGraph`].
///
/// Edges and roots may be added in any order; validation happens in
/// [`OntologyGraphBuilder::build`].
#[derive(Debug)]
pub struct OntologyGraphBuilder {
    name: String,
    range: ConceptRange,
    concepts: Vec<ConceptId>,
    index: HashMap<ConceptId, NodeIdx>,
    children: Vec<Vec<NodeIdx>>,
    parents: Vec<Vec<NodeIdx>>,
    roots: Vec<NodeIdx>,
    root_set: HashSet<NodeIdx>,
    edges: HashSet<(NodeIdx, NodeIdx)>,
    node_limit: usize,
    /// First concept that did not fit in the node arena.
    overflow: Option<ConceptId>,
}

/// Largest node count a graph can hold (`NodeIdx` is a `u32`).
pub const MAX_NODES: usize = u32::MAX as usize;

impl OntologyGraphBuilder {
    pub fn new(name: impl Into<String>, range: ConceptRange) -> Self {
        Self {
            name: name.into(),
            range,
            concepts: Vec::new(),
            index: HashMap::new(),
            children: Vec::new(),
            parents: Vec::new(),
            roots: Vec::new(),
            root_set: HashSet::new(),
            edges: HashSet::new(),
            node_limit: MAX_NODES,
            overflow: None,
        }
    }

    #[cfg(test)]
    fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = limit;
        self
    }

    /// `None` once the arena is full; `build` then reports the overflow.
    fn intern(&mut self, concept: ConceptId) -> Option<NodeIdx> {
        if let Some(&idx) = self.index.get(&concept) {
            return Some(idx);
        }
        let len = self.concepts.len();
        let raw = match u32::try_from(len) {
            Ok(raw) if len < self.node_limit => raw,
            _ => {
                self.overflow.get_or_insert(concept);
                return None;
            }
        };
        let idx = NodeIdx(raw);
        self.concepts.push(concept);
        self.children.push(Vec::new());
        self.parents.push(Vec::new());
        self.index.insert(concept, idx);
        Some(idx)
    }

    pub fn add_root(&mut self, concept: ConceptId) {
        let Some(idx) = self.intern(concept) else {
            return;
        };
        if self.root_set.insert(idx) {
            self.roots.push(idx);
        }
    }

    /// Add a parent -> child edge. Duplicate edges are ignored.
    pub fn add_edge(&mut self, parent: ConceptId, child: ConceptId) {
        let (Some(p), Some(c)) = (self.intern(parent), self.intern(child)) else {
            return;
        };
        if self.edges.insert((p, c)) {
            self.children[p.index()].push(c);
            self.parents[c.index()].push(p);
        }
    }

    pub fn root(mut self, concept: ConceptId) -> Self {
        self.add_root(concept);
        self
    }

    pub fn edge(mut self, parent: ConceptId, child: ConceptId) -> Self {
        self.add_edge(parent, child);
        self
    }

    pub fn build(self) -> Result<OntologyGraph, GraphError> {
        if let Some(concept) = self.overflow {
            return Err(GraphError::malformed(
                &self.name,
                format!(
                    "concept {concept} exceeds the node limit of {}",
                    self.node_limit
                ),
            ));
        }
        if let Some(outside) = self
            .concepts
            .iter()
            .copied()
            .find(|c| !self.range.contains(*c))
        {
            return Err(GraphError::malformed(
                &self.name,
                format!(
                    "concept {outside} lies outside [{}, {})",
                    self.range.start,
                    self.range.end()
                ),
            ));
        }

        self.check_acyclic()?;

        let edge_count = self.edges.len();
        tracing::debug!(
            ontology = %self.name,
            nodes = self.concepts.len(),
            edges = edge_count,
            roots = self.roots.len(),
            "built ontology graph"
        );

        Ok(OntologyGraph {
            name: self.name,
            range: self.range,
            concepts: self.concepts,
            index: self.index,
            children: self.children,
            parents: self.parents,
            roots: self.roots,
            edge_count,
        })
    }

    /// Iterative three-colour DFS over every node.
    fn check_acyclic(&self) -> Result<(), GraphError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks = vec![Mark::New; self.concepts.len()];
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for start in 0..self.concepts.len() {
            if marks[start] != Mark::New {
                continue;
            }
            marks[start] = Mark::Active;
            stack.push((start, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = *frame;
                match self.children[node].get(cursor) {
                    Some(&child) => {
                        frame.1 += 1;
                        match marks[child.index()] {
                            Mark::New => {
                                marks[child.index()] = Mark::Active;
                                stack.push((child.index(), 0));
                            }
                            Mark::Active => {
                                return Err(GraphError::malformed(
                                    &self.name,
                                    format!(
                                        "cycle through edge {} -> {}",
                                        self.concepts[node],
                                        self.concepts[child.index()]
                                    ),
                                ));
                            }
                            Mark::Done => {}
                        }
                    }
                    None => {
                        marks[node] = Mark::Done;
                        stack.pop();
                    }
                }
            }
        }

        Ok(())
    }
}
