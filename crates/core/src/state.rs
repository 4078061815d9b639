//! Binary network states and their indices.
//!
//! States are little-endian: node 0 is the least significant bit of a
//! state's index, so in enumeration order the first node varies fastest.
//!
//! ```text
//! index  state (n0, n1)
//!   0      (0, 0)
//!   1      (1, 0)
//!   2      (0, 1)
//!   3      (1, 1)
//! ```

use crate::error::CoreError;

/// A node is OFF in state 0 and ON in state 1.
pub const OFF: u8 = 0;
pub const ON: u8 = 1;

/// Enumerate all `2^n` binary states of `n` nodes in little-endian order.
///
/// # Example
///
/// ```rust
/// use phi_core::state::all_states;
///
/// let states: Vec<Vec<u8>> = all_states(2).collect();
/// assert_eq!(states, vec![vec![0, 0], vec![1, 0], vec![0, 1], vec![1, 1]]);
///
/// // The empty system has exactly one state.
/// assert_eq!(all_states(0).count(), 1);
/// ```
pub fn all_states(n: usize) -> impl Iterator<Item = Vec<u8>> {
    (0..1usize << n).map(move |i| index_to_state(i, n))
}

/// Decode a little-endian state index into a state of `n` nodes.
pub fn index_to_state(index: usize, n: usize) -> Vec<u8> {
    (0..n).map(|j| ((index >> j) & 1) as u8).collect()
}

/// Encode a binary state as its little-endian index.
///
/// idx = Σⱼ state[j] · 2ʲ
pub fn state_to_index(state: &[u8]) -> usize {
    state
        .iter()
        .enumerate()
        .map(|(j, &s)| (s as usize) << j)
        .sum()
}

/// Return the states of the nodes at `indices` within `state`.
///
/// # Errors
///
/// Returns [`CoreError::IndexOutOfBounds`] if an index is not in the state.
pub fn state_of(indices: &[usize], state: &[u8]) -> Result<Vec<u8>, CoreError> {
    indices
        .iter()
        .map(|&i| {
            state.get(i).copied().ok_or(CoreError::IndexOutOfBounds {
                index: i,
                size: state.len(),
            })
        })
        .collect()
}

/// Check that every entry of a state is 0 or 1.
pub fn validate_state(state: &[u8]) -> Result<(), CoreError> {
    if state.iter().any(|&s| s > ON) {
        return Err(CoreError::NonBinaryState {
            state: state.to_vec(),
        });
    }
    Ok(())
}
