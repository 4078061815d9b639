//! # Core - Foundations for Integrated-Information Computations
//!
//! This crate provides the pieces shared by every table-level computation:
//!
//! - **Shapes**: Axis bookkeeping with singleton axes for excluded nodes
//! - **States**: Little-endian enumeration and indexing of binary states
//! - **Connectivity**: Square 0/1 matrices of node-to-node edges
//! - **Configuration**: Explicit validation settings (no global flags)
//! - **Parallel**: Sequential and data-parallel execution backends
//! - **Errors**: The [`CoreError`] taxonomy
//! - **Logging**: A `tracing-subscriber` setup for binaries and tests
//!
//! ## Design Philosophy
//!
//! Every value here is immutable once built and every operation is a pure
//! function of its inputs, so callers may share them across workers freely.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod logging;
pub mod parallel;
pub mod shape;
pub mod state;

// Re-export key types at crate root for convenience
pub use config::TpmConfig;
pub use connectivity::{relevant_connections, ConnectivityMatrix};
pub use error::CoreError;
#[cfg(feature = "parallel")]
pub use parallel::Parallel;
pub use parallel::{Executor, Sequential};
pub use shape::Shape;
pub use state::{all_states, index_to_state, state_of, state_to_index, OFF, ON};
