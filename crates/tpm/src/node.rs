//! Per-node views of a system's tables.
//!
//! A node's table has one axis per network node (size 2 for the node's
//! inputs, 1 otherwise) and a final axis of size 2 holding
//! `[P(OFF), P(ON)]` for this node's next state. Conditioning a node table
//! on a mechanism state is then plain indexing.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use phi_core::state::{state_of, validate_state};
use phi_core::{ConnectivityMatrix, Shape, OFF, ON};
use tracing::{debug, trace};

use crate::error::TpmError;
use crate::repertoire::Direction;
use crate::tpm::Tpm;

/// A node of a system, with its forward and backward tables.
#[derive(Clone)]
pub struct Node {
    index: usize,
    state: u8,
    forward_tpm: Tpm,
    backward_tpm: Tpm,
    inputs: BTreeSet<usize>,
    outputs: BTreeSet<usize>,
    hash: u64,
}

impl Node {
    /// Build the view of node `index` from the system-wide tables.
    ///
    /// Both tables must be state-by-node over the same nodes as `cm`: one
    /// axis per node plus a final axis of per-node ON probabilities.
    pub fn new(
        forward_tpm: &Tpm,
        backward_tpm: &Tpm,
        cm: &ConnectivityMatrix,
        index: usize,
        state: u8,
    ) -> Result<Self, TpmError> {
        let n = cm.size();
        if index >= n {
            return Err(TpmError::IndexOutOfBounds { index, size: n });
        }
        validate_state(&[state])?;

        let inputs: BTreeSet<usize> = cm.inputs_of(index).into_iter().collect();
        let outputs: BTreeSet<usize> = cm.outputs_of(index).into_iter().collect();

        let forward_tpm = node_tpm(forward_tpm, n, index, &inputs)?;
        let backward_tpm = node_tpm(backward_tpm, n, index, &inputs)?;

        let mut hasher = DefaultHasher::new();
        (index, &forward_tpm, &backward_tpm, state, &inputs, &outputs).hash(&mut hasher);

        Ok(Self {
            index,
            state,
            forward_tpm,
            backward_tpm,
            inputs,
            outputs,
            hash: hasher.finish(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Current state of this node.
    pub fn state(&self) -> u8 {
        self.state
    }

    /// Nodes with an edge into this node.
    pub fn inputs(&self) -> &BTreeSet<usize> {
        &self.inputs
    }

    /// Nodes this node has an edge into.
    pub fn outputs(&self) -> &BTreeSet<usize> {
        &self.outputs
    }

    pub fn forward_tpm(&self) -> &Tpm {
        &self.forward_tpm
    }

    pub fn backward_tpm(&self) -> &Tpm {
        &self.backward_tpm
    }

    /// The table used in `direction`: backward for causes, forward for effects.
    pub fn tpm(&self, direction: Direction) -> &Tpm {
        match direction {
            Direction::Cause => &self.backward_tpm,
            Direction::Effect => &self.forward_tpm,
        }
    }

    /// P(this node OFF next) for every current state.
    pub fn forward_tpm_off(&self) -> Result<Tpm, TpmError> {
        self.forward_tpm.column(OFF as usize)
    }

    /// P(this node ON next) for every current state.
    pub fn forward_tpm_on(&self) -> Result<Tpm, TpmError> {
        self.forward_tpm.column(ON as usize)
    }

    pub fn backward_tpm_off(&self) -> Result<Tpm, TpmError> {
        self.backward_tpm.column(OFF as usize)
    }

    pub fn backward_tpm_on(&self) -> Result<Tpm, TpmError> {
        self.backward_tpm.column(ON as usize)
    }

    /// Default label, `n<index>`.
    pub fn label(&self) -> String {
        format!("n{}", self.index)
    }
}

/// Slice out node `index`'s ON probabilities, average out its non-inputs,
/// and pair them with their complement.
fn node_tpm(
    tpm: &Tpm,
    n: usize,
    index: usize,
    inputs: &BTreeSet<usize>,
) -> Result<Tpm, TpmError> {
    if tpm.ndim() != n + 1 || tpm.shape()[n] != n {
        return Err(TpmError::ShapeMismatch {
            expected: Shape::state_by_node(n),
            got: Shape::from(tpm.shape()),
        });
    }
    let non_inputs: Vec<usize> = tpm
        .tpm_indices()
        .into_iter()
        .filter(|i| !inputs.contains(i))
        .collect();
    trace!(index, ?non_inputs, "marginalizing non-inputs");
    let on = tpm.marginalize_out(&non_inputs)?.column(index)?;
    let off = 1.0 - &on;
    Tpm::stack_last(&[&off, &on])
}

/// Generate the nodes at `indices`, reading their states from `network_state`.
pub fn generate_nodes(
    forward_tpm: &Tpm,
    backward_tpm: &Tpm,
    cm: &ConnectivityMatrix,
    network_state: &[u8],
    indices: &[usize],
) -> Result<Vec<Node>, TpmError> {
    let node_state = state_of(indices, network_state)?;
    debug!(?indices, "generating nodes");
    indices
        .iter()
        .zip(node_state)
        .map(|(&index, state)| Node::new(forward_tpm, backward_tpm, cm, index, state))
        .collect()
}

/// Broadcast a node table over every network state.
///
/// Unlike [`Tpm::expand_tpm`], the final axis keeps its two entries
/// (this node OFF, this node ON) and becomes a node axis of size 2 itself.
pub fn expand_node_tpm(tpm: &Tpm) -> Result<Tpm, TpmError> {
    tpm.broadcast_to(&Shape::new(vec![2; tpm.ndim()]))
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.forward_tpm == other.forward_tpm
            && self.backward_tpm == other.backward_tpm
            && self.state == other.state
            && self.inputs == other.inputs
            && self.outputs == other.outputs
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("index", &self.index)
            .field("state", &self.state)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn swap() -> (Tpm, ConnectivityMatrix) {
        // node 0 <- node 1, node 1 <- node 0
        let tpm =
            Tpm::validated(array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]].into_dyn()).unwrap();
        let cm = ConnectivityMatrix::from_rows(vec![vec![0, 1], vec![1, 0]]).unwrap();
        (tpm, cm)
    }

    #[test]
    fn test_node_tables_have_singleton_non_inputs() {
        let (tpm, cm) = swap();
        let node = Node::new(&tpm, &tpm, &cm, 0, 1).unwrap();
        assert_eq!(node.forward_tpm().shape(), &[1, 2, 2]);
        assert_eq!(node.inputs().iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(node.outputs().iter().copied().collect::<Vec<_>>(), vec![1]);
        // node 0 copies node 1: OFF when n1 = 0, ON when n1 = 1
        assert_eq!(node.forward_tpm().get(&[0, 0, 0]), Some(1.0));
        assert_eq!(node.forward_tpm().get(&[0, 1, 1]), Some(1.0));
    }

    #[test]
    fn test_off_and_on_sum_to_one() {
        let tpm = Tpm::validated(array![[0.1, 0.7], [0.3, 0.2], [0.9, 0.5], [0.4, 0.6]].into_dyn())
            .unwrap();
        let cm = ConnectivityMatrix::full(2);
        let nodes = generate_nodes(&tpm, &tpm, &cm, &[0, 1], &[0, 1]).unwrap();
        for node in &nodes {
            let total = &node.forward_tpm_off().unwrap() + &node.forward_tpm_on().unwrap();
            assert!(total.array().iter().all(|&p| (p - 1.0).abs() < 1e-12));
        }
        assert_eq!(nodes[1].state(), 1);
    }

    #[test]
    fn test_missing_input_is_averaged() {
        // Declaring no inputs averages node 0's ON probability over all states.
        let tpm = Tpm::validated(array![[0.1, 0.7], [0.3, 0.2], [0.9, 0.5], [0.4, 0.6]].into_dyn())
            .unwrap();
        let cm = ConnectivityMatrix::from_rows(vec![vec![0, 0], vec![0, 0]]).unwrap();
        let node = Node::new(&tpm, &tpm, &cm, 0, 0).unwrap();
        assert_eq!(node.forward_tpm().shape(), &[1, 1, 2]);
        let on = node.forward_tpm().get(&[0, 0, 1]).unwrap();
        assert!((on - (0.1 + 0.3 + 0.9 + 0.4) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_inconsistent_shapes_fail() {
        let (tpm, _) = swap();
        let cm = ConnectivityMatrix::full(3);
        assert!(matches!(
            Node::new(&tpm, &tpm, &cm, 0, 0),
            Err(TpmError::ShapeMismatch { .. })
        ));
        let (tpm, cm) = swap();
        assert!(matches!(
            Node::new(&tpm, &tpm, &cm, 2, 0),
            Err(TpmError::IndexOutOfBounds { index: 2, size: 2 })
        ));
    }

    #[test]
    fn test_equality_and_hash() {
        use std::collections::HashSet;

        let (tpm, cm) = swap();
        let a = Node::new(&tpm, &tpm, &cm, 0, 0).unwrap();
        let b = Node::new(&tpm, &tpm, &cm, 0, 0).unwrap();
        let c = Node::new(&tpm, &tpm, &cm, 0, 1).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        let set: HashSet<Node> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_expand_node_tpm() {
        let (tpm, cm) = swap();
        let node = Node::new(&tpm, &tpm, &cm, 1, 0).unwrap();
        assert_eq!(node.forward_tpm().shape(), &[2, 1, 2]);
        let expanded = expand_node_tpm(node.forward_tpm()).unwrap();
        assert_eq!(expanded.shape(), &[2, 2, 2]);
        assert_eq!(expanded.get(&[1, 0, 1]), expanded.get(&[1, 1, 1]));
        assert_eq!(node.to_string(), "n1");
    }
}
