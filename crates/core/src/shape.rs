//! # Shapes - Axis Bookkeeping for Tables and Repertoires
//!
//! Every table in this workspace is an n-dimensional array whose first axes
//! stand for network nodes. A node that does not take part in a table keeps
//! its axis with size 1, so arrays over different node subsets broadcast
//! against each other without reshaping.
//!
//! ## Design Choices
//!
//! We use runtime shapes (`Vec<usize>`) rather than const generics: the node
//! count of a network is only known once its table has been loaded.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The dimensions of a table or repertoire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape {
    /// Dimension sizes (empty = scalar).
    pub dims: Vec<usize>,
}

impl Shape {
    /// Create a new shape from dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Create a scalar shape (0-dimensional).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// The multidimensional state-by-node shape for `n` nodes: `[2; n] ++ [n]`.
    ///
    /// ```rust
    /// use phi_core::Shape;
    ///
    /// assert_eq!(Shape::state_by_node(3).dims, vec![2, 2, 2, 3]);
    /// ```
    pub fn state_by_node(n: usize) -> Self {
        let mut dims = vec![2; n];
        dims.push(n);
        Self { dims }
    }

    /// The shape of a repertoire over `purview` in a network of
    /// `network_size` nodes: size 2 on purview axes, 1 everywhere else.
    ///
    /// ```rust
    /// use phi_core::Shape;
    ///
    /// assert_eq!(Shape::repertoire(3, &[0, 2]).dims, vec![2, 1, 2]);
    /// assert_eq!(Shape::repertoire(2, &[]).dims, vec![1, 1]);
    /// ```
    pub fn repertoire(network_size: usize, purview: &[usize]) -> Self {
        let dims = (0..network_size)
            .map(|i| if purview.contains(&i) { 2 } else { 1 })
            .collect();
        Self { dims }
    }

    /// A shape with `node_axes` binary axes followed by a final axis of size `last`.
    pub fn expanded(node_axes: usize, last: usize) -> Self {
        let mut dims = vec![2; node_axes];
        dims.push(last);
        Self { dims }
    }

    /// Number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Indices of the axes, excluding the last one, that have size 2.
    pub fn binary_axes(&self) -> Vec<usize> {
        let node_axes = self.dims.len().saturating_sub(1);
        (0..node_axes).filter(|&i| self.dims[i] == 2).collect()
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self {
            dims: dims.to_vec(),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]",
            self.dims
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}
