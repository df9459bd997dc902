//! Exhaustive reference search.

use crate::dependence::DependenceTest;
use crate::error::{MappingError, SearchFailure};
use crate::information::InformationContent;
use crate::mapping::Mapping;
use crate::search::{MappingSearch, SearchOutcome, Totals};
use ctxmap_graph::ConceptId;
use ctxmap_stats::CountBackend;
use rayon::prelude::*;
use tracing::info;

/// What one worker produced for one context concept.
struct ContextRun {
    mappings: Vec<Mapping>,
    tests_run: u64,
    cancelled: bool,
    error: Option<MappingError>,
}

impl<B, T, I> MappingSearch<'_, B, T, I>
where
    B: CountBackend,
    T: DependenceTest,
    I: InformationContent,
{
    /// Test every (context, source, destination) triple and accept
    /// `bf > accept_threshold`. No pruning; contexts run in parallel.
    ///
    /// Mappings are grouped by context in `all_concepts()` order.
    pub fn run_brute_force(&self) -> Result<SearchOutcome, SearchFailure> {
        let mut report = self.new_report();
        let totals = match self.totals() {
            Ok(totals) => totals,
            Err(error) => {
                return Err(SearchFailure {
                    error,
                    partial: Vec::new(),
                    report,
                })
            }
        };

        let sources = self.source().all_concepts();
        let destinations = self.destination().all_concepts();
        let contexts = self.context().all_concepts();
        info!(
            contexts = contexts.len(),
            sources = sources.len(),
            destinations = destinations.len(),
            "starting brute-force mapping"
        );

        let runs: Vec<ContextRun> = contexts
            .par_iter()
            .map(|&context| {
                let mut run = ContextRun {
                    mappings: Vec::new(),
                    tests_run: 0,
                    cancelled: false,
                    error: None,
                };
                if let Err(error) =
                    self.scan_context(context, &sources, &destinations, &totals, &mut run)
                {
                    run.error = Some(error);
                }
                run
            })
            .collect();

        let mut mappings = Vec::new();
        let mut failure = None;
        for run in runs {
            report.tests_run += run.tests_run;
            report.cancelled |= run.cancelled;
            report.context_nodes += 1;
            mappings.extend(run.mappings);
            if failure.is_none() {
                failure = run.error;
            }
        }
        report.accepted = mappings.len() as u64;

        match failure {
            Some(error) => Err(SearchFailure {
                error,
                partial: mappings,
                report,
            }),
            None => {
                info!(
                    accepted = report.accepted,
                    tests = report.tests_run,
                    "brute-force mapping finished"
                );
                Ok(SearchOutcome { mappings, report })
            }
        }
    }

    fn scan_context(
        &self,
        context: ConceptId,
        sources: &[ConceptId],
        destinations: &[ConceptId],
        totals: &Totals,
        run: &mut ContextRun,
    ) -> Result<(), MappingError> {
        for &source in sources {
            if self.cancellation().is_cancelled() {
                run.cancelled = true;
                return Ok(());
            }
            for &destination in destinations {
                let bf = self.test().bayes_factor(source, destination, context)?;
                run.tests_run += 1;
                if bf > self.config().accept_threshold {
                    run.mappings
                        .push(self.make_mapping(totals, source, destination, context, bf)?);
                }
            }
        }
        Ok(())
    }
}
