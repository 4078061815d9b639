//! Bayesian inversion of a forward table.
//!
//! Given the observed current state u of a network split into a system S and
//! a background W, the backward table answers "which previous states of S
//! are consistent with u?":
//!
//! ```text
//!                 Σ_{s'} P(u | s', w)
//! Σ_w  P(sᵢ | s, w) · ─────────────────
//!                     Σ_{u'} P(u | u')
//! ```
//!
//! The denominator is the total probability of u over every previous state,
//! not a partial sum, so the inner sum over S is taken before dividing and
//! the outer sum over W after.

use std::collections::BTreeSet;

use ndarray::{ArrayD, Axis, IxDyn};
use phi_core::state::validate_state;
use phi_core::{Shape, ON};
use tracing::debug;

use crate::error::TpmError;
use crate::tpm::Tpm;

/// P(current state | previous state) for every previous state.
///
/// The result has the table's node axes and a final singleton axis, so it
/// broadcasts against the state-by-node table itself.
pub fn probability_of_current_state(sbn_tpm: &Tpm, current_state: &[u8]) -> Result<Tpm, TpmError> {
    let n = sbn_tpm.shape().last().copied().unwrap_or(0);
    if current_state.len() != n {
        return Err(TpmError::ShapeMismatch {
            expected: Shape::new(vec![n]),
            got: Shape::new(vec![current_state.len()]),
        });
    }
    validate_state(current_state)?;

    let node_axes = sbn_tpm.ndim().saturating_sub(1);
    let mut probability = Tpm::new(ArrayD::ones(IxDyn(&sbn_tpm.shape()[..node_axes])));
    for (i, &state) in current_state.iter().enumerate() {
        let on = sbn_tpm.column(i)?;
        probability = if state == ON {
            probability * &on
        } else {
            probability * (1.0 - &on)
        };
    }
    Ok(Tpm::new(probability.into_array().insert_axis(Axis(node_axes))))
}

/// Posterior over previous states given the current state, under a uniform
/// prior on previous states.
///
/// # Errors
///
/// [`TpmError::StateUnreachable`] if no previous state leads to `current_state`.
pub fn previous_state_distribution(sbn_tpm: &Tpm, current_state: &[u8]) -> Result<Tpm, TpmError> {
    let probability = probability_of_current_state(sbn_tpm, current_state)?;
    let normalization = probability.sum();
    if normalization == 0.0 {
        return Err(TpmError::StateUnreachable {
            state: current_state.to_vec(),
        });
    }
    Ok(probability / normalization)
}

/// The backward (cause-direction) table of `system_indices` given the
/// observed `current_state` of the whole network.
///
/// Background axes are summed out and kept as singletons. With
/// `remove_background`, background nodes are also dropped from the final
/// axis.
///
/// # Errors
///
/// - [`TpmError::NotASubset`] if a system index is not a network node
/// - [`TpmError::StateUnreachable`] if the current state has probability 0
///   under every previous state
///
/// # Example
///
/// ```rust
/// use ndarray::array;
/// use phi_tpm::{backward_tpm, Tpm};
///
/// let forward = Tpm::validated(array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]].into_dyn()).unwrap();
/// // With no background, inversion leaves the table unchanged.
/// let backward = backward_tpm(&forward, &[1, 0], &[0, 1], false).unwrap();
/// assert_eq!(backward, forward);
/// ```
pub fn backward_tpm(
    forward_tpm: &Tpm,
    current_state: &[u8],
    system_indices: &[usize],
    remove_background: bool,
) -> Result<Tpm, TpmError> {
    let n = forward_tpm.number_of_units();
    let system: BTreeSet<usize> = system_indices.iter().copied().collect();
    if system.iter().any(|&i| i >= n) {
        return Err(TpmError::NotASubset {
            indices: system_indices.to_vec(),
            size: n,
        });
    }
    let system: Vec<usize> = system.into_iter().collect();
    let background: Vec<usize> = (0..n).filter(|i| !system.contains(i)).collect();

    // p(u | s, w)
    let pr_current_state = probability_of_current_state(forward_tpm, current_state)?;
    // Σ_s p(u | s, w)
    let pr_given_background = pr_current_state.sum_out(&system)?;
    // Σ_{u'} p(u | u')
    let normalization = pr_current_state.sum();
    if normalization == 0.0 {
        return Err(TpmError::StateUnreachable {
            state: current_state.to_vec(),
        });
    }
    debug!(?system, ?background, normalization, "inverting forward table");

    let weighted = forward_tpm * &pr_given_background / normalization;
    let backward = weighted.sum_out(&background)?;
    if remove_background {
        let last = backward.ndim() - 1;
        return Ok(Tpm::new(backward.array().select(Axis(last), &system)));
    }
    Ok(backward)
}
