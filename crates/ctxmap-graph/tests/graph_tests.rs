use ctxmap_graph::{
    ConceptRange, GraphError, GraphSource, InMemoryGraphSource, JsonGraphSource, OntologyGraph,
    OntologySpec,
};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

fn spec(name: &str, start: u64, length: u64, roots: &[u64], edges: &[(u64, u64)]) -> OntologySpec {
    let mut adjacency: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    for &(p, c) in edges {
        adjacency.entry(p).or_default().push(c);
    }
    OntologySpec {
        name: name.to_string(),
        start_index: start,
        length,
        roots: roots.to_vec(),
        adjacency,
    }
}

#[test]
fn layering_places_nodes_at_first_discovery() {
    // 1 -> 2 -> 3 and 1 -> 3: node 3 is reachable at depth 1 and depth 2.
    let g = OntologyGraph::from_spec(spec("cross", 1, 3, &[1], &[(1, 2), (2, 3), (1, 3)])).unwrap();
    let layers = g.topological_layers();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0], vec![1]);
    let second: HashSet<u64> = layers[1].iter().copied().collect();
    assert_eq!(second, HashSet::from([2, 3]));
}

#[test]
fn layering_with_multiple_roots() {
    let g = OntologyGraph::from_spec(spec(
        "forest",
        10,
        6,
        &[10, 11],
        &[(10, 12), (11, 13), (12, 14), (13, 14)],
    ))
    .unwrap();
    let layers = g.topological_layers();
    assert_eq!(layers.len(), 3);
    assert_eq!(layers[2], vec![14]);
    assert_eq!(g.all_concepts().len(), 5);
}

#[test]
fn no_roots_means_no_layers() {
    let g = OntologyGraph::from_spec(spec("rootless", 1, 2, &[], &[(1, 2)])).unwrap();
    assert!(g.topological_layers().is_empty());
    assert_eq!(g.node_count(), 2);
}

#[test]
fn cycle_is_rejected() {
    let err = OntologyGraph::from_spec(spec("cyc", 1, 3, &[1], &[(1, 2), (2, 3), (3, 2)]))
        .unwrap_err();
    match err {
        GraphError::MalformedGraph { ontology, message } => {
            assert_eq!(ontology, "cyc");
            assert!(message.contains("cycle"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn out_of_range_concept_is_rejected() {
    let err = OntologyGraph::from_spec(spec("range", 1, 2, &[1], &[(1, 5)])).unwrap_err();
    assert!(matches!(err, GraphError::MalformedGraph { .. }));
}

#[test]
fn parents_mirror_children() {
    let g = OntologyGraph::from_spec(spec("dag", 1, 4, &[1], &[(1, 2), (1, 3), (2, 4), (3, 4)]))
        .unwrap();
    let four = g.index_of(4).unwrap();
    let parents: HashSet<u64> = g.parents(four).iter().map(|&p| g.concept(p)).collect();
    assert_eq!(parents, HashSet::from([2, 3]));
    assert_eq!(g.edge_count(), 4);
}

#[test]
fn spec_roundtrip_preserves_structure() {
    let original = spec("rt", 100, 5, &[100], &[(100, 101), (100, 102), (101, 103)]);
    let g = OntologyGraph::from_spec(original.clone()).unwrap();
    let exported = g.to_spec();
    assert_eq!(exported.roots, original.roots);
    assert_eq!(exported.adjacency, original.adjacency);
}

#[test]
fn json_source_loads_by_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let record = spec("GO", 1000, 3, &[1000], &[(1000, 1001), (1000, 1002)]);
    std::fs::write(
        dir.path().join("go.json"),
        serde_json::to_string_pretty(&record).unwrap(),
    )
    .unwrap();

    let source = JsonGraphSource::new(dir.path());
    let g = source.load_graph("go").unwrap();
    assert_eq!(g.name(), "GO");
    assert_eq!(g.children_of(1000).len(), 2);

    let missing = source.load("nope").unwrap_err();
    assert!(matches!(missing, GraphError::Source { .. }));
}

#[test]
fn in_memory_source_returns_records() {
    let source = InMemoryGraphSource::new().with("a", spec("A", 1, 1, &[1], &[]));
    assert_eq!(source.load_graph("a").unwrap().root_concepts(), vec![1]);
    assert!(source.load("b").is_err());
}

#[test]
fn range_membership() {
    let r = ConceptRange::new(10, 5);
    assert!(r.contains(10));
    assert!(r.contains(14));
    assert!(!r.contains(15));
    assert!(!r.contains(9));
}

fn forward_dag_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..40).prop_flat_map(|n| {
        let edge = (0..n, 0..n).prop_filter_map("forward edges only", |(a, b)| {
            if a < b {
                Some((a, b))
            } else {
                None
            }
        });
        (Just(n), prop::collection::vec(edge, 0..(n * 2)))
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn layers_partition_reachable_nodes((n, edges) in forward_dag_strategy()) {
        let mut b = OntologyGraph::builder("p", ConceptRange::new(0, n as u64)).root(0);
        for (p, c) in &edges {
            b.add_edge(*p as u64, *c as u64);
        }
        let g = b.build().unwrap();
        let layers = g.topological_layers();

        let mut seen = HashSet::new();
        for layer in &layers {
            prop_assert!(!layer.is_empty());
            for c in layer {
                prop_assert!(seen.insert(*c), "concept {} placed twice", c);
            }
        }

        // Every child of a placed node is placed too.
        for c in &seen {
            for child in g.children_of(*c) {
                prop_assert!(seen.contains(&child));
            }
        }
    }
}
