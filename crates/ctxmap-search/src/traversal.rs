//! Explicit-stack depth-first walk shared by the context and source loops.
//!
//! A node is entered once, when it first reaches the top of the stack, and
//! left once, when it reaches the top again after everything pushed above
//! it has been left. Expanded nodes still on the stack form the current
//! path, so per-path state can be kept in a parallel stack that grows on
//! [`Step::Enter`] and shrinks on [`Step::Leave`].
//!
//! [`ParentFirst`] orders a destination scan so that a node is released
//! only after every parent reachable from the roots.

use crate::error::MappingError;
use ctxmap_graph::{NodeIdx, OntologyGraph};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Enter(NodeIdx),
    Leave(NodeIdx),
}

pub(crate) struct DepthFirst<'g> {
    graph: &'g OntologyGraph,
    stack: Vec<NodeIdx>,
    on_stack: Vec<bool>,
    expanded: Vec<bool>,
}

impl<'g> DepthFirst<'g> {
    /// Start a walk with every root of `graph` pending.
    pub(crate) fn from_roots(graph: &'g OntologyGraph) -> Result<Self, MappingError> {
        let n = graph.node_count();
        let mut walk = Self {
            graph,
            stack: Vec::with_capacity(graph.roots().len()),
            on_stack: vec![false; n],
            expanded: vec![false; n],
        };
        for &root in graph.roots() {
            walk.push(root)?;
        }
        Ok(walk)
    }

    fn push(&mut self, node: NodeIdx) -> Result<(), MappingError> {
        let i = node.index();
        if self.expanded[i] {
            if self.on_stack[i] {
                return Err(MappingError::malformed(
                    self.graph.name(),
                    format!(
                        "concept {} is reachable from itself",
                        self.graph.concept(node)
                    ),
                ));
            }
            return Ok(());
        }
        if !self.on_stack[i] {
            self.on_stack[i] = true;
            self.stack.push(node);
        }
        Ok(())
    }

    /// Mark `node` expanded and push its children that are neither expanded
    /// nor already pending.
    pub(crate) fn expand(&mut self, node: NodeIdx, push_children: bool) -> Result<(), MappingError> {
        self.expanded[node.index()] = true;
        if push_children {
            for &child in self.graph.children(node) {
                self.push(child)?;
            }
        }
        Ok(())
    }

    /// Every [`Step::Enter`] must be followed by [`DepthFirst::expand`] on
    /// the same node before the next call.
    pub(crate) fn next_step(&mut self) -> Option<Step> {
        let top = *self.stack.last()?;
        if self.expanded[top.index()] {
            self.stack.pop();
            self.on_stack[top.index()] = false;
            Some(Step::Leave(top))
        } else {
            Some(Step::Enter(top))
        }
    }
}

/// Reachable-parent counts of a graph, computed once per run and reused by
/// every destination scan.
#[derive(Debug, Clone)]
pub(crate) struct ParentCounts {
    pending: Vec<usize>,
    roots: Vec<bool>,
    starts: Vec<NodeIdx>,
}

impl ParentCounts {
    pub(crate) fn new(graph: &OntologyGraph) -> Self {
        let n = graph.node_count();
        let reachable_nodes: Vec<NodeIdx> = graph.layer_indices().into_iter().flatten().collect();
        let mut reachable = vec![false; n];
        for &node in &reachable_nodes {
            reachable[node.index()] = true;
        }

        let mut pending = vec![0; n];
        for &node in &reachable_nodes {
            pending[node.index()] = graph
                .parents(node)
                .iter()
                .filter(|p| reachable[p.index()])
                .count();
        }

        let mut roots = vec![false; n];
        for &root in graph.roots() {
            roots[root.index()] = true;
        }
        let starts = graph
            .roots()
            .iter()
            .copied()
            .filter(|r| pending[r.index()] == 0)
            .collect();
        Self {
            pending,
            roots,
            starts,
        }
    }

    pub(crate) fn is_root(&self, node: NodeIdx) -> bool {
        self.roots[node.index()]
    }

    pub(crate) fn scan<'g>(&self, graph: &'g OntologyGraph) -> ParentFirst<'g> {
        ParentFirst {
            graph,
            pending: self.pending.clone(),
            ready: self.starts.iter().copied().collect(),
        }
    }
}

/// Kahn-style walk over the nodes reachable from the roots. A yielded node
/// counts as decided, so its children may be released right away.
pub(crate) struct ParentFirst<'g> {
    graph: &'g OntologyGraph,
    pending: Vec<usize>,
    ready: VecDeque<NodeIdx>,
}

impl Iterator for ParentFirst<'_> {
    type Item = NodeIdx;

    fn next(&mut self) -> Option<NodeIdx> {
        let node = self.ready.pop_front()?;
        for &child in self.graph.children(node) {
            let left = &mut self.pending[child.index()];
            *left = left.saturating_sub(1);
            if *left == 0 {
                self.ready.push_back(child);
            }
        }
        Some(node)
    }
}
