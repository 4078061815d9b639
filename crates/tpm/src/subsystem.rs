//! A set of network nodes treated as a system, with the rest held fixed.

use std::collections::BTreeMap;

use ndarray::{Axis, IxDyn};
use phi_core::state::{state_of, validate_state};
use phi_core::{ConnectivityMatrix, Shape};
use tracing::{debug, instrument};

use crate::backward::backward_tpm;
use crate::error::TpmError;
use crate::node::{generate_nodes, Node};
use crate::repertoire::CausalSystem;
use crate::tpm::Tpm;

/// A system of nodes within a network in a given state.
///
/// External nodes are frozen at their current state: the forward table is
/// conditioned on them and every edge into or out of them is cut.
///
/// # Example
///
/// ```rust
/// use ndarray::array;
/// use phi_core::ConnectivityMatrix;
/// use phi_tpm::{forward_effect_repertoire, Subsystem, Tpm};
///
/// let tpm = Tpm::validated(array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]].into_dyn()).unwrap();
/// let cm = ConnectivityMatrix::from_rows(vec![vec![0, 1], vec![1, 0]]).unwrap();
/// let subsystem = Subsystem::new(&tpm, &cm, &[1, 0], &[0, 1]).unwrap();
///
/// // Node 1 copies node 0, which is ON.
/// let repertoire = forward_effect_repertoire(&subsystem, &[0], &[1]).unwrap();
/// assert_eq!(repertoire[[0, 1]], 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Subsystem {
    network_size: usize,
    state: Vec<u8>,
    node_indices: Vec<usize>,
    external_indices: Vec<usize>,
    forward_tpm: Tpm,
    backward_tpm: Tpm,
    cm: ConnectivityMatrix,
    nodes: Vec<Node>,
}

impl Subsystem {
    /// Build the system `node_indices` of a network with table `network_tpm`,
    /// connectivity `network_cm` and current state `state`.
    #[instrument(skip(network_tpm, network_cm), fields(size = node_indices.len()))]
    pub fn new(
        network_tpm: &Tpm,
        network_cm: &ConnectivityMatrix,
        state: &[u8],
        node_indices: &[usize],
    ) -> Result<Self, TpmError> {
        let network_tpm = network_tpm.to_multidimensional()?;
        let n = network_tpm.number_of_units();
        if network_cm.size() != n {
            return Err(TpmError::ShapeMismatch {
                expected: Shape::new(vec![n, n]),
                got: Shape::new(vec![network_cm.size(), network_cm.size()]),
            });
        }
        if state.len() != n {
            return Err(TpmError::ShapeMismatch {
                expected: Shape::new(vec![n]),
                got: Shape::new(vec![state.len()]),
            });
        }
        validate_state(state)?;

        let mut node_indices = node_indices.to_vec();
        node_indices.sort_unstable();
        node_indices.dedup();
        if node_indices.iter().any(|&i| i >= n) {
            return Err(TpmError::NotASubset {
                indices: node_indices,
                size: n,
            });
        }
        let external_indices: Vec<usize> =
            (0..n).filter(|i| node_indices.binary_search(i).is_err()).collect();

        let external_state: BTreeMap<usize, u8> = external_indices
            .iter()
            .copied()
            .zip(state_of(&external_indices, state)?)
            .collect();
        let forward_tpm = network_tpm.condition_tpm(&external_state)?;
        let cm = network_cm.apply_boundary_conditions(&external_indices)?;
        let backward_tpm = backward_tpm(&network_tpm, state, &node_indices, false)?;
        let nodes = generate_nodes(&forward_tpm, &backward_tpm, &cm, state, &node_indices)?;
        debug!(?node_indices, ?external_indices, "built subsystem");

        Ok(Self {
            network_size: n,
            state: state.to_vec(),
            node_indices,
            external_indices,
            forward_tpm,
            backward_tpm,
            cm,
            nodes,
        })
    }

    /// Network indices of the system nodes, sorted.
    pub fn node_indices(&self) -> &[usize] {
        &self.node_indices
    }

    /// Network indices of the nodes held fixed.
    pub fn external_indices(&self) -> &[usize] {
        &self.external_indices
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn size(&self) -> usize {
        self.node_indices.len()
    }

    /// Network table conditioned on the external nodes.
    pub fn forward_tpm(&self) -> &Tpm {
        &self.forward_tpm
    }

    pub fn backward_tpm(&self) -> &Tpm {
        &self.backward_tpm
    }

    /// Network connectivity with edges to and from external nodes cut.
    pub fn cm(&self) -> &ConnectivityMatrix {
        &self.cm
    }

    /// Rebuild the system's state-by-node table from its node tables.
    ///
    /// External axes are dropped and each node's ON table is broadcast
    /// over the system's states, so non-inputs carry averaged values.
    pub fn reconstitute_tpm(&self) -> Result<Tpm, TpmError> {
        let k = self.size();
        let node_tpms = self
            .nodes
            .iter()
            .map(|node| {
                let mut on = node.forward_tpm_on()?.into_array();
                for &axis in self.external_indices.iter().rev() {
                    on = on.index_axis_move(Axis(axis), 0);
                }
                let expanded = on
                    .broadcast(IxDyn(&vec![2; k]))
                    .ok_or_else(|| TpmError::ShapeMismatch {
                        expected: Shape::new(vec![2; k]),
                        got: Shape::from(on.shape()),
                    })?
                    .to_owned();
                Ok(Tpm::new(expanded))
            })
            .collect::<Result<Vec<Tpm>, TpmError>>()?;
        let parts: Vec<&Tpm> = node_tpms.iter().collect();
        Tpm::stack_last(&parts)
    }
}

impl CausalSystem for Subsystem {
    fn network_size(&self) -> usize {
        self.network_size
    }

    fn state(&self) -> &[u8] {
        &self.state
    }

    fn node(&self, index: usize) -> Result<&Node, TpmError> {
        self.node_indices
            .binary_search(&index)
            .map(|position| &self.nodes[position])
            .map_err(|_| TpmError::NotASubset {
                indices: vec![index],
                size: self.network_size,
            })
    }
}
