//! # Repertoire Tests
//!
//! Cause and effect repertoires of small subsystems, checked against values
//! worked out by hand.

use ndarray::{array, ArrayD, IxDyn};
use phi_core::ConnectivityMatrix;
use phi_tpm::{
    backward_tpm, effect_repertoire, forward_cause_probability, forward_cause_repertoire,
    forward_effect_probability, forward_effect_repertoire, unconstrained_cause_repertoire,
    unconstrained_effect_repertoire, CausalSystem, Direction, Subsystem, Tpm, TpmError,
    PROB_TOLERANCE,
};

/// node 0 copies node 1, node 1 copies node 0; current state (1, 0)
fn swap_subsystem() -> Subsystem {
    let tpm = Tpm::validated(array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]].into_dyn())
        .unwrap();
    let cm = ConnectivityMatrix::from_rows(vec![vec![0, 1], vec![1, 0]]).unwrap();
    Subsystem::new(&tpm, &cm, &[1, 0], &[0, 1]).unwrap()
}

fn noisy_subsystem(state: &[u8]) -> Subsystem {
    let tpm = Tpm::validated(array![[0.1, 0.7], [0.3, 0.2], [0.9, 0.5], [0.4, 0.6]].into_dyn())
        .unwrap();
    Subsystem::new(&tpm, &ConnectivityMatrix::full(2), state, &[0, 1]).unwrap()
}

fn assert_close(actual: &ArrayD<f64>, expected: &ArrayD<f64>) {
    assert_eq!(actual.shape(), expected.shape());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!((a - e).abs() < PROB_TOLERANCE, "{actual} != {expected}");
    }
}

// ============================================================================
// Effect repertoires
// ============================================================================

#[test]
fn test_effect_of_node_on_its_copy() {
    let subsystem = swap_subsystem();
    let repertoire = forward_effect_repertoire(&subsystem, &[0], &[1]).unwrap();
    assert_close(&repertoire, &array![[0.0, 1.0]].into_dyn());
}

#[test]
fn test_effect_on_unconstrained_node_is_uniform() {
    // Node 0 reads node 1, which is outside the mechanism.
    let subsystem = swap_subsystem();
    let repertoire = forward_effect_repertoire(&subsystem, &[0], &[0]).unwrap();
    assert_close(&repertoire, &array![[0.5], [0.5]].into_dyn());
}

#[test]
fn test_effect_of_whole_system() {
    let subsystem = swap_subsystem();
    let repertoire = forward_effect_repertoire(&subsystem, &[0, 1], &[0, 1]).unwrap();
    // next state is (n1, n0) = (0, 1)
    assert_close(&repertoire, &array![[0.0, 1.0], [0.0, 0.0]].into_dyn());
}

#[test]
fn test_empty_purview() {
    let subsystem = swap_subsystem();
    let effect = forward_effect_repertoire(&subsystem, &[0], &[]).unwrap();
    assert_close(&effect, &ArrayD::ones(IxDyn(&[1, 1])));
    let cause = forward_cause_repertoire(&subsystem, &[0], &[]).unwrap();
    assert_close(&cause, &ArrayD::ones(IxDyn(&[1, 1])));
}

#[test]
fn test_unconditioned_effect_is_product_of_averages() {
    let subsystem = noisy_subsystem(&[0, 0]);
    let repertoire = forward_effect_repertoire(&subsystem, &[], &[0, 1]).unwrap();
    let p0: f64 = (0.1 + 0.3 + 0.9 + 0.4) / 4.0;
    let p1: f64 = (0.7 + 0.2 + 0.5 + 0.6) / 4.0;
    let expected = array![
        [(1.0 - p0) * (1.0 - p1), (1.0 - p0) * p1],
        [p0 * (1.0 - p1), p0 * p1]
    ]
    .into_dyn();
    assert_close(&repertoire, &expected);
    assert!((repertoire.sum() - 1.0).abs() < PROB_TOLERANCE);
}

#[test]
fn test_effect_with_explicit_state() {
    let subsystem = noisy_subsystem(&[0, 0]);
    // mechanism (n0, n1) = (1, 1) is row 3: [0.4, 0.6]
    let repertoire =
        effect_repertoire(&subsystem, &[0, 1], &[1], Some(&[1, 1]), Direction::Effect).unwrap();
    assert_close(&repertoire, &array![[0.4, 0.6]].into_dyn());

    let mismatch = effect_repertoire(&subsystem, &[0, 1], &[1], Some(&[1]), Direction::Effect);
    assert!(matches!(mismatch, Err(TpmError::ShapeMismatch { .. })));
}

#[test]
fn test_forward_effect_probability() {
    let subsystem = swap_subsystem();
    assert_eq!(forward_effect_probability(&subsystem, &[0], &[1], &[1]).unwrap(), 1.0);
    assert_eq!(forward_effect_probability(&subsystem, &[0], &[1], &[0]).unwrap(), 0.0);
}

#[test]
fn test_unconstrained_effect_averages_mechanism_states() {
    let subsystem = swap_subsystem();
    let repertoire = unconstrained_effect_repertoire(&subsystem, &[0], &[1]).unwrap();
    assert_close(&repertoire, &array![[0.5, 0.5]].into_dyn());
}

// ============================================================================
// Cause repertoires
// ============================================================================

#[test]
fn test_cause_of_copy() {
    // n0 = 1 now, and n0 copies n1, so n1 was ON.
    let subsystem = swap_subsystem();
    let repertoire = forward_cause_repertoire(&subsystem, &[0], &[1]).unwrap();
    assert_close(&repertoire, &array![[0.0, 1.0]].into_dyn());
    assert_eq!(
        forward_cause_probability(&subsystem, &[0], &[1], &[1], None).unwrap(),
        1.0
    );
    assert_eq!(
        forward_cause_probability(&subsystem, &[0], &[1], &[1], Some(&[0])).unwrap(),
        0.0
    );
}

#[test]
fn test_unconstrained_cause_is_flat() {
    let subsystem = swap_subsystem();
    let repertoire = unconstrained_cause_repertoire(&subsystem, &[0], &[1]).unwrap();
    assert_close(&repertoire, &array![[0.5, 0.5]].into_dyn());

    let subsystem = noisy_subsystem(&[1, 0]);
    let repertoire = unconstrained_cause_repertoire(&subsystem, &[0, 1], &[0, 1]).unwrap();
    let first = repertoire[[0, 0]];
    assert!(repertoire.iter().all(|&p| (p - first).abs() < PROB_TOLERANCE));
}

#[test]
fn test_cause_reads_backward_tables() {
    let subsystem = noisy_subsystem(&[1, 0]);
    // With the whole network as the system, the backward table is the
    // forward table, so P(n0 = 1 | n0, n1 previously) is node 0's column.
    let repertoire = forward_cause_repertoire(&subsystem, &[0], &[0, 1]).unwrap();
    assert_close(&repertoire, &array![[0.1, 0.9], [0.3, 0.4]].into_dyn());
}

#[test]
fn test_background_changes_cause_tables() {
    let tpm = Tpm::validated(array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]].into_dyn())
        .unwrap();
    let cm = ConnectivityMatrix::from_rows(vec![vec![0, 1], vec![1, 0]]).unwrap();
    let subsystem = Subsystem::new(&tpm, &cm, &[1, 0], &[0]).unwrap();
    assert_eq!(
        subsystem.backward_tpm(),
        &backward_tpm(&tpm, &[1, 0], &[0], false).unwrap()
    );
    assert_eq!(subsystem.network_size(), 2);
    assert_eq!(subsystem.state(), &[1, 0]);
}

#[test]
fn test_purview_outside_system_fails() {
    let tpm = Tpm::validated(array![[0.1, 0.7], [0.3, 0.2], [0.9, 0.5], [0.4, 0.6]].into_dyn())
        .unwrap();
    let subsystem = Subsystem::new(&tpm, &ConnectivityMatrix::full(2), &[0, 0], &[0]).unwrap();
    assert!(matches!(
        forward_effect_repertoire(&subsystem, &[0], &[1]),
        Err(TpmError::NotASubset { .. })
    ));
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_cause_repertoire_matches_sequential() {
    let subsystem = noisy_subsystem(&[1, 1]);
    let sequential = forward_cause_repertoire(&subsystem, &[0, 1], &[0, 1]).unwrap();
    let parallel =
        phi_tpm::forward_cause_repertoire_with(&subsystem, &[0, 1], &[0, 1], &phi_core::Parallel)
            .unwrap();
    assert_close(&parallel, &sequential);
}
