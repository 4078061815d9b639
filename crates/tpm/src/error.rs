//! Error types for table operations.

use phi_core::{CoreError, Shape};
use thiserror::Error;

/// Errors that can occur while building or transforming tables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TpmError {
    /// An entry lies outside [0, 1].
    #[error("Invalid TPM: probabilities must be in [0, 1], found {value} at flat index {index}")]
    ProbabilityOutOfRange { index: usize, value: f64 },

    /// A state-by-state row doesn't sum to 1.
    #[error("Invalid TPM: row {row} of the state-by-state table sums to {sum} (expected 1.0)")]
    RowNotNormalized { row: usize, sum: f64 },

    /// The array matches none of the three admissible layouts.
    #[error("Invalid TPM shape {shape}: {expected}")]
    InvalidShape { shape: Shape, expected: String },

    /// The two layouts of the table are not mutually derivable.
    #[error("TPM is not conditionally independent: round trip deviates by {deviation}")]
    ConditionallyDependent { deviation: f64 },

    /// No previous state produces the observed current state.
    #[error("The state {state:?} cannot be reached in the given TPM")]
    StateUnreachable { state: Vec<u8> },

    /// A permutation of the wrong length.
    #[error("Permutation must have length {expected}, but has length {got}")]
    InvalidPermutation { expected: usize, got: usize },

    /// A sequence of the right length that isn't a permutation of `0..expected`.
    #[error("{permutation:?} is not a permutation of 0..{expected}")]
    NotAPermutation { permutation: Vec<usize>, expected: usize },

    /// Operand shapes cannot be combined.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// An axis or node index out of range.
    #[error("Index {index} out of bounds for size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    /// A state value does not fit its axis.
    #[error("State {state} is invalid for axis {axis} of size {size}")]
    InvalidState { axis: usize, state: u8, size: usize },

    /// A set of node indices is not contained in the network.
    #[error("Indices {indices:?} are not a subset of the {size} network nodes")]
    NotASubset { indices: Vec<usize>, size: usize },

    #[error(transparent)]
    Core(#[from] CoreError),
}
