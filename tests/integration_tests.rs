//! Integration tests for the complete ctxmap pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - JSON graph source → OntologyGraph
//! - JSON document index → MemoryIndex → CachingBackend
//! - ContingencyTest → MappingSearch → filter
//!
//! Run with: cargo test --test integration_tests

use approx::assert_abs_diff_eq;
use ctxmap_graph::{GraphSource, JsonGraphSource, OntologyGraph};
use ctxmap_search::{filter_by_information_content, Mapping, MappingSearch, SearchConfig};
use ctxmap_stats::{
    bayes_factor, CachingBackend, ContingencyOracle, MemoryIndex, MemoryIndexSpec, ScoreKind,
};
use std::collections::BTreeSet;
use std::fs;
use tempfile::tempdir;

// ============================================================================
// Fixtures
// ============================================================================

const SOURCE: &str = r#"{
    "name": "anatomy",
    "start_index": 1,
    "length": 2,
    "roots": [1],
    "adjacency": { "1": [2] }
}"#;

const DESTINATION: &str = r#"{
    "name": "disease",
    "start_index": 100,
    "length": 2,
    "roots": [100],
    "adjacency": { "100": [101] }
}"#;

const CONTEXT: &str = r#"{
    "name": "organism",
    "start_index": 10,
    "length": 2,
    "roots": [10],
    "adjacency": { "10": [11] }
}"#;

/// Inside context 10, concepts 1 and 100 almost always occur together.
fn documents() -> Vec<Vec<u64>> {
    let mut docs = Vec::new();
    for _ in 0..40 {
        docs.push(vec![10, 1, 100]);
        docs.push(vec![10]);
    }
    for _ in 0..2 {
        docs.push(vec![10, 1]);
        docs.push(vec![10, 100]);
    }
    for _ in 0..10 {
        docs.push(vec![2]);
        docs.push(vec![101]);
        docs.push(vec![11]);
    }
    docs
}

struct Fixture {
    source: OntologyGraph,
    destination: OntologyGraph,
    context: OntologyGraph,
    index: MemoryIndex,
}

fn load_fixture() -> Fixture {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("anatomy.json"), SOURCE).unwrap();
    fs::write(dir.path().join("disease.json"), DESTINATION).unwrap();
    fs::write(dir.path().join("organism.json"), CONTEXT).unwrap();
    let index_path = dir.path().join("index.json");
    let spec = MemoryIndexSpec {
        documents: documents(),
    };
    fs::write(&index_path, serde_json::to_string(&spec).unwrap()).unwrap();

    let graphs = JsonGraphSource::new(dir.path());
    Fixture {
        source: graphs.load_graph("anatomy").unwrap(),
        destination: graphs.load_graph("disease").unwrap(),
        context: graphs.load_graph("organism").unwrap(),
        index: MemoryIndex::from_json_file(&index_path).unwrap(),
    }
}

fn keys(mappings: &[Mapping]) -> BTreeSet<(u64, u64, u64)> {
    mappings.iter().map(Mapping::key).collect()
}

// ============================================================================
// Pipeline
// ============================================================================

#[test]
fn test_search_finds_the_planted_dependence() {
    let fx = load_fixture();
    let search = MappingSearch::new(
        &fx.source,
        &fx.destination,
        &fx.context,
        &fx.index,
        SearchConfig::default(),
    )
    .unwrap();
    let outcome = search.run().unwrap();

    let planted = outcome
        .mappings
        .iter()
        .find(|m| m.key() == (1, 100, 10))
        .expect("planted mapping should be accepted");

    let table = ContingencyOracle::new(&fx.index)
        .build_table(&[1], 100, 10)
        .unwrap();
    assert_eq!(table.cells(), &[40, 2, 2, 40]);
    assert_abs_diff_eq!(
        planted.bayes_factor,
        bayes_factor(&table, 2.0).unwrap(),
        epsilon = 1e-12
    );
    // count(1) = 42 of 52 anatomy documents
    assert_abs_diff_eq!(
        planted.source_information,
        (52.0f64 / 42.0).ln(),
        epsilon = 1e-12
    );
    assert!(!outcome.report.cancelled);
}

#[test]
fn test_branch_and_bound_is_a_subset_of_brute_force() {
    let fx = load_fixture();
    let search = MappingSearch::new(
        &fx.source,
        &fx.destination,
        &fx.context,
        &fx.index,
        SearchConfig::default(),
    )
    .unwrap();

    let pruned = search.run().unwrap();
    let brute = search.run_brute_force().unwrap();
    assert!(keys(&pruned.mappings).is_subset(&keys(&brute.mappings)));
    assert!(keys(&brute.mappings).contains(&(1, 100, 10)));
    assert!(pruned.report.tests_run <= brute.report.tests_run);
}

#[test]
fn test_caching_backend_gives_identical_results() {
    let fx = load_fixture();
    let cached = CachingBackend::new(fx.index.clone());

    let direct = MappingSearch::new(
        &fx.source,
        &fx.destination,
        &fx.context,
        &fx.index,
        SearchConfig::default(),
    )
    .unwrap()
    .run()
    .unwrap();
    let through_cache = MappingSearch::new(
        &fx.source,
        &fx.destination,
        &fx.context,
        &cached,
        SearchConfig::default(),
    )
    .unwrap()
    .run()
    .unwrap();

    assert_eq!(direct.mappings, through_cache.mappings);
    assert!(cached.stats().misses > 0);
}

#[test]
fn test_bdeu_scores_prune_everything_at_zero() {
    let fx = load_fixture();
    let config = SearchConfig::default().with_score(ScoreKind::Bdeu);
    let outcome = MappingSearch::new(&fx.source, &fx.destination, &fx.context, &fx.index, config)
        .unwrap()
        .run()
        .unwrap();

    // BDeu is a log-likelihood, so it never clears a threshold of zero.
    assert!(outcome.mappings.is_empty());
    assert!(outcome.report.pruned >= 1);
}

// ============================================================================
// Post-processing
// ============================================================================

#[test]
fn test_mappings_roundtrip_through_json_and_filter() {
    let fx = load_fixture();
    let outcome = MappingSearch::new(
        &fx.source,
        &fx.destination,
        &fx.context,
        &fx.index,
        SearchConfig::default(),
    )
    .unwrap()
    .run()
    .unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("mappings.json");
    fs::write(&path, serde_json::to_string_pretty(&outcome.mappings).unwrap()).unwrap();
    let loaded: Vec<Mapping> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(keys(&loaded), keys(&outcome.mappings));
    for (a, b) in loaded.iter().zip(&outcome.mappings) {
        assert_abs_diff_eq!(a.bayes_factor, b.bayes_factor, epsilon = 1e-9);
    }

    let kept = filter_by_information_content(&loaded, 0.5);
    assert!(kept.len() <= loaded.len());
    for m in &kept {
        assert!(m.source_information > 0.0);
        assert!(m.destination_information > 0.0);
        assert!(m.context_information > 0.0);
    }
}
