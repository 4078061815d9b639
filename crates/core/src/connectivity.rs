//! Connectivity matrices.
//!
//! A connectivity matrix `cm` is a square 0/1 matrix where `cm[i][j] == 1`
//! means node `i` sends an edge to node `j`. Rows are sources, columns are
//! sinks, so the inputs of node `j` are read down column `j`.

use ndarray::{Array2, Axis};
use petgraph::algo::{connected_components, kosaraju_scc};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::CoreError;
use crate::shape::Shape;

/// A validated square 0/1 connectivity matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectivityMatrix {
    cm: Array2<u8>,
}

impl ConnectivityMatrix {
    /// Wrap a square 0/1 matrix.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConnectivity`] if the matrix is not square
    /// or holds anything other than 0 and 1.
    pub fn new(cm: Array2<u8>) -> Result<Self, CoreError> {
        let shape = Shape::from(cm.shape());
        if cm.nrows() != cm.ncols() {
            return Err(CoreError::InvalidConnectivity {
                shape,
                reason: "matrix must be square".to_string(),
            });
        }
        if cm.iter().any(|&x| x > 1) {
            return Err(CoreError::InvalidConnectivity {
                shape,
                reason: "entries must be 0 or 1".to_string(),
            });
        }
        Ok(Self { cm })
    }

    /// Build a connectivity matrix from nested rows.
    ///
    /// ```rust
    /// use phi_core::ConnectivityMatrix;
    ///
    /// let cm = ConnectivityMatrix::from_rows(vec![
    ///     vec![0, 1],
    ///     vec![1, 0],
    /// ]).unwrap();
    /// assert_eq!(cm.inputs_of(0), vec![1]);
    /// ```
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self, CoreError> {
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return Err(CoreError::InvalidConnectivity {
                shape: Shape::new(vec![n, rows.first().map_or(0, Vec::len)]),
                reason: "rows must all have one entry per node".to_string(),
            });
        }
        let flat: Vec<u8> = rows.into_iter().flatten().collect();
        let cm = Array2::from_shape_vec((n, n), flat).map_err(|e| {
            CoreError::InvalidConnectivity {
                shape: Shape::new(vec![n, n]),
                reason: e.to_string(),
            }
        })?;
        Self::new(cm)
    }

    /// The fully connected matrix over `n` nodes, self-loops included.
    pub fn full(n: usize) -> Self {
        Self {
            cm: Array2::ones((n, n)),
        }
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.cm.nrows()
    }

    /// Whether `source` sends an edge to `sink`.
    pub fn has_edge(&self, source: usize, sink: usize) -> bool {
        self.cm.get((source, sink)).is_some_and(|&x| x == 1)
    }

    /// The underlying matrix.
    pub fn as_array(&self) -> &Array2<u8> {
        &self.cm
    }

    /// Nodes with an edge into `index`.
    pub fn inputs_of(&self, index: usize) -> Vec<usize> {
        (0..self.size())
            .filter(|&i| self.has_edge(i, index))
            .collect()
    }

    /// Nodes that `index` has an edge into.
    pub fn outputs_of(&self, index: usize) -> Vec<usize> {
        (0..self.size())
            .filter(|&j| self.has_edge(index, j))
            .collect()
    }

    /// The submatrix of rows `rows` and columns `cols`.
    pub fn subadjacency(&self, rows: &[usize], cols: &[usize]) -> Result<Array2<u8>, CoreError> {
        self.check_indices(rows)?;
        self.check_indices(cols)?;
        Ok(self.cm.select(Axis(0), rows).select(Axis(1), cols))
    }

    /// Cut every edge into and out of `external` nodes.
    pub fn apply_boundary_conditions(&self, external: &[usize]) -> Result<Self, CoreError> {
        self.check_indices(external)?;
        let mut cm = self.cm.clone();
        for &i in external {
            cm.row_mut(i).fill(0);
            cm.column_mut(i).fill(0);
        }
        trace!(?external, "cut edges of external nodes");
        Ok(Self { cm })
    }

    /// Nodes that have at least one input and at least one output.
    pub fn causally_significant_nodes(&self) -> Vec<usize> {
        (0..self.size())
            .filter(|&i| {
                self.cm.column(i).iter().any(|&x| x > 0) && self.cm.row(i).iter().any(|&x| x > 0)
            })
            .collect()
    }

    /// Whether every node in `sources` outputs to some node in `sinks` and
    /// every node in `sinks` receives from some node in `sources`.
    ///
    /// Trivially true when either set is empty.
    pub fn is_full(&self, sources: &[usize], sinks: &[usize]) -> Result<bool, CoreError> {
        if sources.is_empty() || sinks.is_empty() {
            return Ok(true);
        }
        let sub = self.subadjacency(sources, sinks)?;
        let every_sink_fed = sub.columns().into_iter().all(|c| c.iter().any(|&x| x > 0));
        let every_source_feeds = sub.rows().into_iter().all(|r| r.iter().any(|&x| x > 0));
        Ok(every_sink_fed && every_source_feeds)
    }

    /// Whether the subgraph over `nodes` is strongly connected.
    pub fn is_strong(&self, nodes: &[usize]) -> Result<bool, CoreError> {
        let graph = self.subgraph(nodes)?;
        Ok(kosaraju_scc(&graph).len() <= 1)
    }

    /// Whether the subgraph over `nodes` is weakly connected.
    pub fn is_weak(&self, nodes: &[usize]) -> Result<bool, CoreError> {
        let graph = self.subgraph(nodes)?;
        Ok(connected_components(&graph) <= 1)
    }

    /// The directed graph over `nodes`, weighted by original node index.
    pub fn subgraph(&self, nodes: &[usize]) -> Result<DiGraph<usize, ()>, CoreError> {
        self.check_indices(nodes)?;
        let mut graph = DiGraph::with_capacity(nodes.len(), 0);
        let handles: Vec<_> = nodes.iter().map(|&i| graph.add_node(i)).collect();
        for (a, &i) in nodes.iter().enumerate() {
            for (b, &j) in nodes.iter().enumerate() {
                if self.has_edge(i, j) {
                    graph.add_edge(handles[a], handles[b], ());
                }
            }
        }
        Ok(graph)
    }

    fn check_indices(&self, indices: &[usize]) -> Result<(), CoreError> {
        match indices.iter().find(|&&i| i >= self.size()) {
            Some(&index) => Err(CoreError::IndexOutOfBounds {
                index,
                size: self.size(),
            }),
            None => Ok(()),
        }
    }
}

/// A matrix over `n` nodes with edges from every node in `sources` to every
/// node in `sinks`, and nothing else.
pub fn relevant_connections(
    n: usize,
    sources: &[usize],
    sinks: &[usize],
) -> Result<ConnectivityMatrix, CoreError> {
    let mut cm = Array2::zeros((n, n));
    for &i in sources.iter().chain(sinks) {
        if i >= n {
            return Err(CoreError::IndexOutOfBounds { index: i, size: n });
        }
    }
    for &i in sources {
        for &j in sinks {
            cm[(i, j)] = 1;
        }
    }
    ConnectivityMatrix::new(cm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cm(rows: Vec<Vec<u8>>) -> ConnectivityMatrix {
        ConnectivityMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_rejects_non_square() {
        let result = ConnectivityMatrix::new(Array2::zeros((2, 3)));
        assert!(matches!(
            result,
            Err(CoreError::InvalidConnectivity { .. })
        ));
    }

    #[test]
    fn test_rejects_non_binary() {
        let result = ConnectivityMatrix::from_rows(vec![vec![0, 2], vec![1, 0]]);
        assert!(matches!(
            result,
            Err(CoreError::InvalidConnectivity { .. })
        ));
    }

    #[test]
    fn test_inputs_and_outputs() {
        let cm = cm(vec![vec![0, 1, 0], vec![1, 1, 1], vec![0, 0, 0]]);
        assert_eq!(cm.inputs_of(0), vec![1]);
        assert_eq!(cm.inputs_of(1), vec![0, 1]);
        assert_eq!(cm.inputs_of(2), vec![1]);
        assert_eq!(cm.outputs_of(0), vec![1]);
        assert_eq!(cm.outputs_of(1), vec![0, 1, 2]);
        assert_eq!(cm.outputs_of(2), Vec::<usize>::new());
    }

    #[test]
    fn test_subadjacency() {
        let values: Vec<u8> = (0..49).map(|x| (x % 2) as u8).collect();
        let full = ConnectivityMatrix::new(Array2::from_shape_vec((7, 7), values).unwrap()).unwrap();
        let sub = full.subadjacency(&[3, 4], &[1, 2]).unwrap();
        assert_eq!(sub.shape(), &[2, 2]);
        assert_eq!(sub[(0, 0)], full.as_array()[(3, 1)]);
        assert_eq!(sub[(1, 1)], full.as_array()[(4, 2)]);
    }

    #[test]
    fn test_causally_significant_nodes() {
        assert!(cm(vec![vec![0, 0], vec![1, 0]])
            .causally_significant_nodes()
            .is_empty());
        assert_eq!(
            cm(vec![vec![0, 1], vec![1, 0]]).causally_significant_nodes(),
            vec![0, 1]
        );
        assert_eq!(
            cm(vec![vec![0, 1, 0], vec![0, 0, 1], vec![0, 1, 1]]).causally_significant_nodes(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_relevant_connections() {
        let rc = relevant_connections(3, &[0, 1], &[0, 2]).unwrap();
        let expected = cm(vec![vec![1, 0, 1], vec![1, 0, 1], vec![0, 0, 0]]);
        assert_eq!(rc, expected);
    }

    #[test]
    fn test_is_strong() {
        let cycle = cm(vec![vec![0, 1, 0], vec![0, 0, 1], vec![1, 0, 0]]);
        assert!(cycle.is_strong(&[0, 1, 2]).unwrap());

        let disconnected = cm(vec![vec![0, 0, 1], vec![0, 1, 0], vec![1, 0, 0]]);
        assert!(!disconnected.is_strong(&[0, 1, 2]).unwrap());

        let weak = cm(vec![vec![0, 1, 0], vec![0, 0, 1], vec![0, 1, 0]]);
        assert!(!weak.is_strong(&[0, 1, 2]).unwrap());
        assert!(weak.is_weak(&[0, 1, 2]).unwrap());

        let pair = cm(vec![vec![0, 1, 0], vec![1, 0, 0], vec![0, 0, 0]]);
        assert!(pair.is_strong(&[0, 1]).unwrap());
        assert!(!pair.is_weak(&[0, 1, 2]).unwrap());
    }

    #[test]
    fn test_is_full() {
        let cm = cm(vec![vec![0, 0, 1], vec![1, 0, 1], vec![1, 1, 0]]);
        assert!(!cm.is_full(&[0], &[0, 1, 2]).unwrap());
        assert!(!cm.is_full(&[2], &[2]).unwrap());
        assert!(!cm.is_full(&[0, 1], &[1, 2]).unwrap());
        assert!(cm.is_full(&[], &[0, 1, 2]).unwrap());
        assert!(cm.is_full(&[0], &[]).unwrap());
        assert!(cm.is_full(&[0, 1], &[0, 2]).unwrap());
        assert!(cm.is_full(&[1, 2], &[1, 2]).unwrap());
        assert!(cm.is_full(&[0, 1, 2], &[0, 1, 2]).unwrap());
    }

    #[test]
    fn test_apply_boundary_conditions() {
        let cm = cm(vec![vec![0, 0, 1], vec![1, 0, 1], vec![1, 1, 0]]);
        let expected = super::ConnectivityMatrix::from_rows(vec![
            vec![0, 0, 1],
            vec![0, 0, 0],
            vec![1, 0, 0],
        ])
        .unwrap();
        assert_eq!(cm.apply_boundary_conditions(&[1]).unwrap(), expected);
    }
}
