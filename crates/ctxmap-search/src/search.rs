//! Branch-and-bound search over (context, source, destination) triples.
//!
//! The outer loop walks the context graph depth-first. For every context
//! node the source graph is walked depth-first, and for every source node
//! the destination graph is scanned parent-first from its roots
//! (`compute_marked_nodes`): a node is only considered once every parent
//! reachable from the roots has been decided. A destination node whose
//! Bayes factor is at or below `min_threshold` is *pruned*: neither it nor
//! any of its descendants is tested in the same scan, nor again
//!
//! - further down the same source path (path marks), and
//! - for the same source node under descendant contexts (memo, when
//!   `memoize` is on).
//!
//! All search state lives on the stack of one `run` call.

use crate::cancel::CancellationToken;
use crate::config::SearchConfig;
use crate::dependence::{ContingencyTest, DependenceTest};
use crate::error::{MappingError, SearchFailure};
use crate::information::{InformationContent, NegativeLogFrequency};
use crate::mapping::{Mapping, MappingSink};
use crate::report::SearchReport;
use crate::traversal::{DepthFirst, ParentCounts, Step};
use ctxmap_graph::{ConceptId, NodeIdx, OntologyGraph};
use ctxmap_stats::CountBackend;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, info, warn};

pub(crate) type PrunedSet = HashSet<NodeIdx>;

/// Pruned sets recorded for each source node under one context: the
/// snapshot of the source path at the time the node was processed.
type MemoFrame = HashMap<NodeIdx, Vec<Rc<PrunedSet>>>;

/// Document totals of the three ontologies, computed once per run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Totals {
    source: u64,
    destination: u64,
    context: u64,
}

/// Per-run state shared by every destination scan.
struct RunPlan {
    totals: Totals,
    order: ParentCounts,
}

/// Mappings and counters of a completed (or cancelled) run.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub mappings: Vec<Mapping>,
    pub report: SearchReport,
}

/// Pruned sets visible while evaluating one (source, context) pair.
struct Inherited<'a> {
    path: &'a [Rc<PrunedSet>],
    memo: &'a [Rc<PrunedSet>],
}

impl Inherited<'_> {
    fn contains(&self, node: NodeIdx) -> bool {
        self.path.iter().any(|set| set.contains(&node))
            || self.memo.iter().any(|set| set.contains(&node))
    }

    fn covers(&self, roots: &[NodeIdx]) -> bool {
        roots.iter().all(|&root| self.contains(root))
    }
}

pub struct MappingSearch<'g, B, T = ContingencyTest<B>, I = NegativeLogFrequency> {
    source: &'g OntologyGraph,
    destination: &'g OntologyGraph,
    context: &'g OntologyGraph,
    backend: B,
    test: T,
    information: I,
    config: SearchConfig,
    cancel: CancellationToken,
    swapped: bool,
}

impl<'g, B: CountBackend + Clone> MappingSearch<'g, B> {
    /// Set up a search with the contingency-table dependence test.
    ///
    /// `backend` is shared between the test and the information-content
    /// lookups, so pass a reference or an `Arc`.
    pub fn new(
        source: &'g OntologyGraph,
        destination: &'g OntologyGraph,
        context: &'g OntologyGraph,
        backend: B,
        config: SearchConfig,
    ) -> Result<Self, MappingError> {
        config.validate()?;
        let swapped = config.orient_by_size && source.len() > destination.len();
        let (source, destination) = if swapped {
            (destination, source)
        } else {
            (source, destination)
        };
        let test = ContingencyTest::from_config(backend.clone(), &config);
        Ok(Self {
            source,
            destination,
            context,
            backend,
            test,
            information: NegativeLogFrequency,
            config,
            cancel: CancellationToken::new(),
            swapped,
        })
    }
}

impl<'g, B, T, I> MappingSearch<'g, B, T, I>
where
    B: CountBackend,
    T: DependenceTest,
    I: InformationContent,
{
    pub fn with_dependence_test<U: DependenceTest>(self, test: U) -> MappingSearch<'g, B, U, I> {
        MappingSearch {
            source: self.source,
            destination: self.destination,
            context: self.context,
            backend: self.backend,
            test,
            information: self.information,
            config: self.config,
            cancel: self.cancel,
            swapped: self.swapped,
        }
    }

    pub fn with_information_content<J: InformationContent>(
        self,
        information: J,
    ) -> MappingSearch<'g, B, T, J> {
        MappingSearch {
            source: self.source,
            destination: self.destination,
            context: self.context,
            backend: self.backend,
            test: self.test,
            information,
            config: self.config,
            cancel: self.cancel,
            swapped: self.swapped,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The source graph actually walked (after orientation).
    pub fn source(&self) -> &OntologyGraph {
        self.source
    }

    pub fn destination(&self) -> &OntologyGraph {
        self.destination
    }

    pub fn context(&self) -> &OntologyGraph {
        self.context
    }

    /// True when `orient_by_size` exchanged source and destination.
    pub fn is_swapped(&self) -> bool {
        self.swapped
    }

    pub(crate) fn test(&self) -> &T {
        &self.test
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn new_report(&self) -> SearchReport {
        SearchReport {
            swapped: self.swapped,
            ..SearchReport::default()
        }
    }

    /// Run the branch-and-bound search.
    pub fn run(&self) -> Result<SearchOutcome, SearchFailure> {
        let mut mappings = Vec::new();
        let mut report = self.new_report();
        match self.execute(&mut mappings, &mut report) {
            Ok(()) => Ok(SearchOutcome { mappings, report }),
            Err(error) => {
                warn!(
                    error = %error,
                    partial = mappings.len(),
                    tests = report.tests_run,
                    "mapping run failed"
                );
                Err(SearchFailure {
                    error,
                    partial: mappings,
                    report,
                })
            }
        }
    }

    /// Run the search, streaming mappings into `sink`. On error the sink
    /// keeps whatever was emitted before the failure.
    pub fn run_into(&self, sink: &mut dyn MappingSink) -> Result<SearchReport, MappingError> {
        let mut report = self.new_report();
        self.execute(sink, &mut report)?;
        Ok(report)
    }

    fn execute(
        &self,
        sink: &mut dyn MappingSink,
        report: &mut SearchReport,
    ) -> Result<(), MappingError> {
        info!(
            source = self.source.name(),
            destination = self.destination.name(),
            context = self.context.name(),
            score = self.config.score.name(),
            alpha = self.config.alpha,
            min_threshold = self.config.min_threshold,
            accept_threshold = self.config.accept_threshold,
            memoize = self.config.memoize,
            swapped = self.swapped,
            "starting mapping search"
        );
        let plan = RunPlan {
            totals: self.totals()?,
            order: ParentCounts::new(self.destination),
        };

        let mut contexts = DepthFirst::from_roots(self.context)?;
        let mut memo: Vec<MemoFrame> = Vec::new();

        while let Some(step) = contexts.next_step() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match step {
                Step::Leave(_) => {
                    memo.pop();
                }
                Step::Enter(ctx) => {
                    report.context_nodes += 1;
                    let frame = self.walk_sources(ctx, &memo, &plan, sink, report)?;
                    if report.cancelled {
                        break;
                    }
                    memo.push(frame);
                    contexts.expand(ctx, true)?;
                }
            }
        }

        if report.cancelled {
            warn!(
                accepted = report.accepted,
                tests = report.tests_run,
                "mapping search cancelled"
            );
        } else {
            info!(
                accepted = report.accepted,
                tests = report.tests_run,
                pruned = report.pruned,
                skipped_branches = report.skipped_source_branches,
                "mapping search finished"
            );
        }
        Ok(())
    }

    /// Walk the source graph under one context node and return the memo
    /// frame recorded for it.
    fn walk_sources(
        &self,
        ctx: NodeIdx,
        memo: &[MemoFrame],
        plan: &RunPlan,
        sink: &mut dyn MappingSink,
        report: &mut SearchReport,
    ) -> Result<MemoFrame, MappingError> {
        let roots = self.destination.roots();
        let mut frame = MemoFrame::new();
        let mut path: Vec<Rc<PrunedSet>> = Vec::new();
        let mut sources = DepthFirst::from_roots(self.source)?;

        while let Some(step) = sources.next_step() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let src = match step {
                Step::Leave(_) => {
                    path.pop();
                    continue;
                }
                Step::Enter(src) => src,
            };
            report.source_nodes += 1;

            let remembered: Vec<Rc<PrunedSet>> = if self.config.memoize {
                memo.iter()
                    .filter_map(|f| f.get(&src))
                    .flatten()
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };

            let inherited = Inherited {
                path: &path,
                memo: &remembered,
            };
            if inherited.covers(roots) {
                debug!(
                    source = self.source.concept(src),
                    context = self.context.concept(ctx),
                    "every destination root pruned, skipping source branch"
                );
                report.skipped_source_branches += 1;
                path.push(Rc::new(PrunedSet::new()));
                if self.config.memoize {
                    frame.insert(src, path.clone());
                }
                sources.expand(src, false)?;
                continue;
            }

            let pruned = self.compute_marked_nodes(src, ctx, &inherited, plan, sink, report)?;
            path.push(Rc::new(pruned));
            if self.config.memoize {
                frame.insert(src, path.clone());
            }

            let covered = Inherited {
                path: &path,
                memo: &remembered,
            }
            .covers(roots);
            sources.expand(src, !covered)?;
        }
        Ok(frame)
    }

    /// Parent-first scan of the destination graph for one (source,
    /// context) pair. Returns the destination nodes pruned here.
    ///
    /// A node is *dead* when it is pruned (here or inherited) or sits below
    /// a dead node, and *live* when it was tested without being pruned. A
    /// node with a dead parent is never tested; it counts as blocked when
    /// the scan reached it through a live parent.
    fn compute_marked_nodes(
        &self,
        src: NodeIdx,
        ctx: NodeIdx,
        inherited: &Inherited<'_>,
        plan: &RunPlan,
        sink: &mut dyn MappingSink,
        report: &mut SearchReport,
    ) -> Result<PrunedSet, MappingError> {
        let source = self.source.concept(src);
        let context = self.context.concept(ctx);
        let mut pruned = PrunedSet::new();
        let mut dead = vec![false; self.destination.node_count()];
        let mut live = vec![false; self.destination.node_count()];

        for node in plan.order.scan(self.destination) {
            let parents = self.destination.parents(node);
            if inherited.contains(node) {
                dead[node.index()] = true;
                continue;
            }
            if parents.iter().any(|p| dead[p.index()]) {
                dead[node.index()] = true;
                if plan.order.is_root(node) || parents.iter().any(|p| live[p.index()]) {
                    report.blocked += 1;
                }
                continue;
            }

            let destination = self.destination.concept(node);
            let bf = self.test.bayes_factor(source, destination, context)?;
            report.tests_run += 1;

            if bf <= self.config.min_threshold {
                debug!(
                    source,
                    destination,
                    context,
                    bayes_factor = bf,
                    "pruned destination subtree"
                );
                pruned.insert(node);
                dead[node.index()] = true;
                report.pruned += 1;
                continue;
            }
            if bf > self.config.accept_threshold {
                let mapping = self.make_mapping(&plan.totals, source, destination, context, bf)?;
                debug!(
                    source,
                    destination,
                    context,
                    bayes_factor = bf,
                    "accepted mapping"
                );
                sink.push(mapping);
                report.accepted += 1;
            }
            live[node.index()] = true;
        }
        Ok(pruned)
    }

    pub(crate) fn totals(&self) -> Result<Totals, MappingError> {
        let total = |graph: &OntologyGraph| {
            let range = graph.range();
            self.backend.count_in_range(range.start, range.length)
        };
        Ok(Totals {
            source: total(self.source)?,
            destination: total(self.destination)?,
            context: total(self.context)?,
        })
    }

    pub(crate) fn make_mapping(
        &self,
        totals: &Totals,
        source: ConceptId,
        destination: ConceptId,
        context: ConceptId,
        bayes_factor: f64,
    ) -> Result<Mapping, MappingError> {
        let ic = |concept: ConceptId, total: u64| -> Result<f64, MappingError> {
            let count = self.backend.count(concept)?;
            Ok(self.information.information_content(count, total))
        };
        Ok(Mapping {
            source,
            source_information: ic(source, totals.source)?,
            destination,
            destination_information: ic(destination, totals.destination)?,
            context,
            context_information: ic(context, totals.context)?,
            bayes_factor,
        })
    }
}
