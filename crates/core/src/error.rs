//! # Error Types
//!
//! Errors raised by the shared foundations: malformed connectivity
//! matrices, out-of-range node indices and invalid configuration values.
//! Table-specific failures live in `phi-tpm`, which wraps these.

use thiserror::Error;

use crate::shape::Shape;

/// Core errors for the integrated-information workspace.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// A connectivity matrix is not a square 0/1 matrix.
    #[error("Invalid connectivity matrix of shape {shape}: {reason}")]
    InvalidConnectivity { shape: Shape, reason: String },

    /// A node index does not exist in the network.
    #[error("Node index {index} out of bounds for a network of {size} nodes")]
    IndexOutOfBounds { index: usize, size: usize },

    /// A binary state contains a value other than 0 or 1.
    #[error("Invalid state {state:?}: node states must be 0 or 1")]
    NonBinaryState { state: Vec<u8> },

    /// A configuration value is out of its admissible range.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}
