use approx::assert_abs_diff_eq;
use ctxmap_stats::{
    bayes_factor, bdeu_score, dependence_score, independence_score, log_gamma,
    marginal_log_likelihood, ContingencyTable, ScoreError, ScoreKind,
};
use proptest::prelude::*;

/// Independent `ln Γ`: shift the argument up with the recurrence, then use
/// the Stirling series.
fn reference_ln_gamma(x: f64) -> f64 {
    let mut z = x;
    let mut shift = 0.0;
    while z < 15.0 {
        shift += z.ln();
        z += 1.0;
    }
    let series = 1.0 / (12.0 * z) - 1.0 / (360.0 * z.powi(3)) + 1.0 / (1260.0 * z.powi(5));
    (z - 0.5) * z.ln() - z + 0.5 * (2.0 * std::f64::consts::PI).ln() + series - shift
}

fn reference_mll(counts: &[u64], alpha: f64) -> f64 {
    let ak = alpha / counts.len() as f64;
    let total: f64 = counts.iter().map(|&c| c as f64).sum();
    let cells: f64 = counts
        .iter()
        .map(|&c| reference_ln_gamma(ak + c as f64) - reference_ln_gamma(ak))
        .sum();
    cells + reference_ln_gamma(alpha) - reference_ln_gamma(alpha + total)
}

#[test]
fn log_gamma_reference_points() {
    assert_abs_diff_eq!(log_gamma(1.0).unwrap(), 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(log_gamma(5.0).unwrap(), 3.178_053_830_347_945_6, epsilon = 1e-6);
    for x in [0.25, 0.5, 1.5, 3.0, 7.5, 42.0, 1016.5] {
        assert_abs_diff_eq!(log_gamma(x).unwrap(), reference_ln_gamma(x), epsilon = 1e-6);
    }
}

#[test]
fn dependence_matches_direct_dirichlet_formula() {
    let table = ContingencyTable::from_cells(vec![1016, 28, 95, 6]).unwrap();
    let dep = dependence_score(&table, 2.0).unwrap();
    assert!(dep.is_finite());
    assert_abs_diff_eq!(dep, reference_mll(&[1016, 28, 95, 6], 2.0), epsilon = 1e-6);
}

#[test]
fn independence_is_product_of_marginals() {
    let table = ContingencyTable::from_cells(vec![1016, 28, 95, 6]).unwrap();
    let ind = independence_score(&table, 2.0).unwrap();
    assert!(ind.is_finite());
    // child marginal [1016+95, 28+6]; ancestor marginal [1016+28, 95+6]
    let expected = reference_mll(&[1111, 34], 2.0) + reference_mll(&[1044, 101], 2.0);
    assert_abs_diff_eq!(ind, expected, epsilon = 1e-6);
}

#[test]
fn bayes_factor_is_deterministic() {
    let table = ContingencyTable::from_cells(vec![1016, 28, 95, 6]).unwrap();
    let first = bayes_factor(&table, 2.0).unwrap();
    for _ in 0..1000 {
        assert_eq!(bayes_factor(&table, 2.0).unwrap().to_bits(), first.to_bits());
    }
    let dep = dependence_score(&table, 2.0).unwrap();
    let ind = independence_score(&table, 2.0).unwrap();
    assert_abs_diff_eq!(first, dep - ind, epsilon = 1e-12);
}

#[test]
fn strong_association_gives_positive_factor() {
    // Child present almost exactly when the ancestor is present.
    let table = ContingencyTable::from_cells(vec![500, 2, 3, 480]).unwrap();
    assert!(bayes_factor(&table, 2.0).unwrap() > 100.0);
}

#[test]
fn independent_counts_give_negative_factor() {
    // Perfectly proportional table: P(child | ancestor) = P(child).
    let table = ContingencyTable::from_cells(vec![400, 100, 400, 100]).unwrap();
    assert!(bayes_factor(&table, 2.0).unwrap() < 0.0);
}

#[test]
fn two_ancestor_table_scores() {
    let table = ContingencyTable::from_cells(vec![50, 5, 10, 20, 8, 12, 3, 30]).unwrap();
    let expected = reference_mll(table.cells(), 2.0)
        - (reference_mll(&table.child_marginal(), 2.0)
            + reference_mll(&table.ancestor_marginal(0), 2.0)
            + reference_mll(&table.ancestor_marginal(1), 2.0));
    assert_abs_diff_eq!(bayes_factor(&table, 2.0).unwrap(), expected, epsilon = 1e-6);
}

#[test]
fn bdeu_sums_blocks() {
    let table = ContingencyTable::from_cells(vec![3, 1, 0, 2]).unwrap();
    let ess = 0.5;
    let block = |n0: f64, n1: f64| {
        reference_ln_gamma(ess) - reference_ln_gamma(n0 + n1 + ess)
            + reference_ln_gamma(n0 + ess)
            - reference_ln_gamma(ess)
            + reference_ln_gamma(n1 + ess)
            - reference_ln_gamma(ess)
    };
    let expected = block(3.0, 1.0) + block(0.0, 2.0);
    assert_abs_diff_eq!(bdeu_score(&table, ess).unwrap(), expected, epsilon = 1e-6);
    assert_abs_diff_eq!(
        ScoreKind::Bdeu.score(&table, ess).unwrap(),
        expected,
        epsilon = 1e-12
    );
}

#[test]
fn score_kind_dispatches_to_bayes_factor() {
    let table = ContingencyTable::from_cells(vec![10, 2, 3, 9]).unwrap();
    assert_eq!(
        ScoreKind::ConditionalIndependence.score(&table, 2.0).unwrap(),
        bayes_factor(&table, 2.0).unwrap()
    );
    assert_eq!(ScoreKind::default(), ScoreKind::ConditionalIndependence);
}

#[test]
fn invalid_parameters_are_errors_not_nan() {
    let table = ContingencyTable::from_cells(vec![1, 1]).unwrap();
    for bad in [0.0, -2.0, f64::NAN, f64::INFINITY] {
        let err = bayes_factor(&table, bad).unwrap_err();
        assert!(matches!(err, ScoreError::InvalidParameter { field: "alpha", .. }));
        assert!(bdeu_score(&table, bad).is_err());
    }
    assert!(marginal_log_likelihood(&[1], -1.0).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn marginal_likelihood_is_finite(
        counts in prop::collection::vec(0u64..100_000, 1..16),
        alpha in 1e-3f64..1e3,
    ) {
        let mll = marginal_log_likelihood(&counts, alpha).unwrap();
        prop_assert!(mll.is_finite());
        // A probability: never above 1.
        prop_assert!(mll <= 1e-6);
    }

    #[test]
    fn bayes_factor_is_finite_for_one_ancestor_tables(
        cells in prop::collection::vec(0u64..5_000, 4),
        alpha in 0.1f64..10.0,
    ) {
        let table = ContingencyTable::from_cells(cells).unwrap();
        prop_assert!(bayes_factor(&table, alpha).unwrap().is_finite());
    }
}
