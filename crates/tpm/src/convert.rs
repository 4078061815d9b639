//! Conversions between the three table layouts.
//!
//! - **state-by-state**: `2^N × 2^N`, `sbs[i][j]` = P(next = j | current = i)
//! - **state-by-node (2-D)**: `2^N × N`, `sbn[i][k]` = P(node k ON next | current = i)
//! - **state-by-node (multidimensional)**: `[2; N] ++ [N]`, one axis per node
//!
//! Row indices follow the little-endian convention of [`phi_core::state`].
//! A state-by-state row is a Markov kernel row; the state-by-node form keeps
//! only its per-node marginals, which is lossless exactly when the next-state
//! distribution factorizes over nodes.

use ndarray::{Array2, ArrayD, IxDyn};
use phi_core::state::{index_to_state, state_to_index};
use phi_core::Shape;

use crate::error::TpmError;

/// Whether a shape is a square matrix whose side is a power of two (at least 2).
pub fn is_state_by_state_shape(shape: &[usize]) -> bool {
    shape.len() == 2 && shape[0] == shape[1] && shape[0] >= 2 && shape[0].is_power_of_two()
}

/// Whether a 2-D shape is `2^N × N` with `N ≥ 2`.
fn is_two_dimensional_state_by_node(shape: &[usize]) -> bool {
    shape.len() == 2
        && shape[1] >= 2
        && shape[1] < usize::BITS as usize
        && shape[0] == 1usize << shape[1]
}

/// Marginalize a state-by-state table into multidimensional state-by-node form.
///
/// `sbn[s, k]` = Σⱼ `sbs[index(s), j]` · bitₖ(j)
pub fn state_by_state_to_state_by_node(sbs: &ArrayD<f64>) -> Result<ArrayD<f64>, TpmError> {
    if !is_state_by_state_shape(sbs.shape()) {
        return Err(TpmError::InvalidShape {
            shape: Shape::from(sbs.shape()),
            expected: "a square state-by-state table with 2^N rows".to_string(),
        });
    }
    let n_states = sbs.shape()[0];
    let n = n_states.trailing_zeros() as usize;

    let mut on = Array2::<f64>::zeros((n_states, n));
    for row in 0..n_states {
        for next in 0..n_states {
            let p = sbs[[row, next]];
            if p == 0.0 {
                continue;
            }
            for k in 0..n {
                if (next >> k) & 1 == 1 {
                    on[[row, k]] += p;
                }
            }
        }
    }
    Ok(two_dimensional_to_multidimensional(&on))
}

/// Expand a state-by-node table into state-by-state form, assuming the
/// nodes' next states are independent given the current state.
///
/// `sbs[i, j]` = Πₖ (bitₖ(j) ? pₖ : 1 − pₖ)
pub fn state_by_node_to_state_by_state(sbn: &ArrayD<f64>) -> Result<Array2<f64>, TpmError> {
    let on = to_two_dimensional(sbn)?;
    let (n_states, n) = on.dim();
    let sbs = Array2::from_shape_fn((n_states, n_states), |(row, next)| {
        (0..n)
            .map(|k| {
                let p = on[[row, k]];
                if (next >> k) & 1 == 1 {
                    p
                } else {
                    1.0 - p
                }
            })
            .product()
    });
    Ok(sbs)
}

/// Flatten a state-by-node table (2-D or multidimensional) into `2^N × N` form.
///
/// Singleton node axes are broadcast over both states first.
pub fn to_two_dimensional(sbn: &ArrayD<f64>) -> Result<Array2<f64>, TpmError> {
    let shape = sbn.shape();
    if shape.len() == 2 && shape[0] == 1usize << shape[1].min(usize::BITS as usize - 1) {
        let two_d = sbn
            .view()
            .into_dimensionality::<ndarray::Ix2>()
            .map_err(|_| invalid_state_by_node(shape))?;
        return Ok(two_d.to_owned());
    }
    let n = *shape.last().ok_or_else(|| invalid_state_by_node(shape))?;
    if shape.len() != n + 1 {
        return Err(invalid_state_by_node(shape));
    }
    let full = Shape::state_by_node(n);
    let expanded = sbn
        .broadcast(IxDyn(&full.dims))
        .ok_or_else(|| invalid_state_by_node(shape))?;
    let mut index = vec![0; n + 1];
    Ok(Array2::from_shape_fn((1 << n, n), |(row, k)| {
        for (slot, s) in index.iter_mut().zip(index_to_state(row, n)) {
            *slot = s as usize;
        }
        index[n] = k;
        expanded[IxDyn(&index)]
    }))
}

/// Reshape a `2^N × N` matrix into multidimensional state-by-node form.
pub fn two_dimensional_to_multidimensional(on: &Array2<f64>) -> ArrayD<f64> {
    let n = on.ncols();
    let shape = Shape::state_by_node(n);
    ArrayD::from_shape_fn(IxDyn(&shape.dims), |idx| {
        let state: Vec<u8> = (0..n).map(|j| idx[j] as u8).collect();
        on[[state_to_index(&state), idx[n]]]
    })
}

/// Re-represent any admissible table in multidimensional state-by-node form.
///
/// Arrays that are neither state-by-state nor `2^N × N` are assumed to be
/// multidimensional already (possibly with singleton axes) and are returned
/// unchanged, which makes the conversion idempotent.
pub fn to_multidimensional(tpm: &ArrayD<f64>) -> Result<ArrayD<f64>, TpmError> {
    let shape = tpm.shape();
    if is_state_by_state_shape(shape) {
        return state_by_state_to_state_by_node(tpm);
    }
    if is_two_dimensional_state_by_node(shape) {
        let on = tpm
            .view()
            .into_dimensionality::<ndarray::Ix2>()
            .map_err(|_| invalid_state_by_node(shape))?;
        return Ok(two_dimensional_to_multidimensional(&on.to_owned()));
    }
    Ok(tpm.clone())
}

fn invalid_state_by_node(shape: &[usize]) -> TpmError {
    TpmError::InvalidShape {
        shape: Shape::from(shape),
        expected: "a state-by-node table of shape [2^N, N] or [2; N] ++ [N]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn or_and_sbn() -> ArrayD<f64> {
        // node 0 <- OR(n0, n1), node 1 <- AND(n0, n1)
        array![[0.0, 0.0], [1.0, 0.0], [1.0, 0.0], [1.0, 1.0]].into_dyn()
    }

    #[test]
    fn test_two_dimensional_reshape_is_little_endian() {
        let md = to_multidimensional(&or_and_sbn()).unwrap();
        assert_eq!(md.shape(), &[2, 2, 2]);
        // state (n0=1, n1=0) is row 1
        assert_eq!(md[[1, 0, 0]], 1.0);
        assert_eq!(md[[1, 0, 1]], 0.0);
        // state (n0=1, n1=1) is row 3
        assert_eq!(md[[1, 1, 1]], 1.0);
    }

    #[test]
    fn test_to_multidimensional_idempotent() {
        let once = to_multidimensional(&or_and_sbn()).unwrap();
        let twice = to_multidimensional(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_state_by_state_marginals() {
        // From every state, go to state 3 (both ON) with p = 0.5, else state 0.
        let mut sbs = ArrayD::zeros(IxDyn(&[4, 4]));
        for row in 0..4 {
            sbs[[row, 0]] = 0.5;
            sbs[[row, 3]] = 0.5;
        }
        let sbn = state_by_state_to_state_by_node(&sbs).unwrap();
        assert!(sbn.iter().all(|&p| (p - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_state_by_node_to_state_by_state_deterministic() {
        let sbs = state_by_node_to_state_by_state(&or_and_sbn()).unwrap();
        // (0,0) -> (0,0); (1,0) -> (1,0) = index 1; (1,1) -> (1,1) = index 3
        assert_eq!(sbs[[0, 0]], 1.0);
        assert_eq!(sbs[[1, 1]], 1.0);
        assert_eq!(sbs[[2, 1]], 1.0);
        assert_eq!(sbs[[3, 3]], 1.0);
        for row in sbs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_round_trip_through_state_by_state() {
        let sbn = array![[0.1, 0.7], [0.3, 0.2], [0.9, 0.5], [0.4, 0.6]].into_dyn();
        let sbs = state_by_node_to_state_by_state(&sbn).unwrap();
        let back = state_by_state_to_state_by_node(&sbs.into_dyn()).unwrap();
        let expected = to_multidimensional(&sbn).unwrap();
        for (a, b) in back.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_to_two_dimensional_broadcasts_singletons() {
        // Node 1's axis is a singleton: the table ignores node 1's state.
        let md = ArrayD::from_shape_vec(IxDyn(&[2, 1, 2]), vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        let two_d = to_two_dimensional(&md).unwrap();
        assert_eq!(two_d.dim(), (4, 2));
        assert_eq!(two_d.row(0), two_d.row(2));
        assert_eq!(two_d.row(1), two_d.row(3));
        assert_eq!(two_d[[1, 0]], 0.3);
    }
}
