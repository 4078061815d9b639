//! # Tpm - Transition Probability Tables and Repertoires
//!
//! This crate implements the table-level core of integrated-information
//! computations: the forward dynamics of a network of binary nodes, the
//! per-node views derived from it, its Bayesian inversion, and the cause and
//! effect repertoires built on top.
//!
//! ## Core Concepts
//!
//! - **Three layouts, one canonical form**: state-by-state (`2^N × 2^N`),
//!   2-D state-by-node (`2^N × N`) and multidimensional state-by-node
//!   (`[2; N] ++ [N]`). Validated tables are stored in the last form.
//! - **Singleton axes mark excluded nodes**: conditioning and marginalizing
//!   keep every axis, so tables over different node subsets still broadcast.
//! - **Marginalization is an average**: summing out k binary axes divides by 2^k.
//! - **Backward tables invert the dynamics**: Bayes' rule over previous
//!   states, normalized by the total probability of the observed state.
//! - **Closed arithmetic**: `+ - * /` and comparisons on tables give tables.
//!
//! ## Example: Copy Dynamics
//!
//! ```rust
//! use ndarray::array;
//! use phi_core::ConnectivityMatrix;
//! use phi_tpm::Tpm;
//!
//! // node 0 copies node 1, node 1 copies node 0
//! let tpm = Tpm::validated(array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]].into_dyn()).unwrap();
//!
//! let cm = tpm.infer_cm().unwrap();
//! assert_eq!(cm, ConnectivityMatrix::from_rows(vec![vec![0, 1], vec![1, 0]]).unwrap());
//!
//! // Fix node 0 OFF, then average over node 1.
//! let fixed = tpm.condition_tpm(&[(0, 0)].into_iter().collect()).unwrap();
//! let marginal = fixed.marginalize_out(&[1]).unwrap();
//! assert_eq!(marginal.shape(), &[1, 1, 2]);
//! assert_eq!(marginal.get(&[0, 0, 0]), Some(0.5));
//! ```

mod backward;
mod convert;
mod error;
mod node;
mod ops;
mod repertoire;
mod subsystem;
mod tpm;

pub use backward::{backward_tpm, previous_state_distribution, probability_of_current_state};
pub use convert::{
    is_state_by_state_shape, state_by_node_to_state_by_state, state_by_state_to_state_by_node,
    to_multidimensional, to_two_dimensional, two_dimensional_to_multidimensional,
};
pub use error::TpmError;
pub use node::{expand_node_tpm, generate_nodes, Node};
pub use ops::Operand;
pub use repertoire::{
    effect_repertoire, forward_cause_probability, forward_cause_repertoire,
    forward_cause_repertoire_with, forward_effect_probability, forward_effect_repertoire,
    repertoire_shape, unconstrained_cause_repertoire, unconstrained_effect_repertoire,
    CausalSystem, Direction, Repertoire,
};
pub use subsystem::Subsystem;
pub use tpm::Tpm;

/// Tolerance for probability comparisons in tests and callers.
pub const PROB_TOLERANCE: f64 = 1e-9;
