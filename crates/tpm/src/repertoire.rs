//! Cause and effect repertoires.
//!
//! A repertoire is a distribution over the states of a purview, shaped with
//! one axis per network node: size 2 for purview nodes, 1 for every other
//! node. Repertoires over different purviews therefore broadcast against
//! each other directly.
//!
//! Cause repertoires are computed as forward probabilities with the roles of
//! mechanism and purview exchanged: the probability of the mechanism's
//! actual state given each purview state, read from the backward tables.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::{ArrayD, IxDyn};
use phi_core::state::{all_states, state_of};
use phi_core::{Executor, Sequential, Shape};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::TpmError;
use crate::node::Node;

/// A distribution over purview states, one axis per network node.
pub type Repertoire = ArrayD<f64>;

/// Temporal direction of a repertoire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Past: read from the backward tables.
    Cause,
    /// Future: read from the forward tables.
    Effect,
}

impl Direction {
    /// Both directions, cause first.
    pub fn both() -> [Direction; 2] {
        [Direction::Cause, Direction::Effect]
    }

    /// The other direction.
    pub fn flip(self) -> Direction {
        match self {
            Direction::Cause => Direction::Effect,
            Direction::Effect => Direction::Cause,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Cause => write!(f, "CAUSE"),
            Direction::Effect => write!(f, "EFFECT"),
        }
    }
}

/// What repertoire computation needs from a system.
pub trait CausalSystem {
    /// Number of nodes in the whole network (the repertoire rank).
    fn network_size(&self) -> usize;

    /// Current state of every network node.
    fn state(&self) -> &[u8];

    /// The system node at network index `index`.
    fn node(&self, index: usize) -> Result<&Node, TpmError>;
}

/// Shape of a repertoire over `purview` in a network of `network_size` nodes.
pub fn repertoire_shape(network_size: usize, purview: &[usize]) -> Shape {
    Shape::repertoire(network_size, purview)
}

/// The distribution of a single purview node, given the mechanism condition.
fn single_node_repertoire<S: CausalSystem + ?Sized>(
    system: &S,
    condition: &BTreeMap<usize, u8>,
    purview_node: usize,
    direction: Direction,
) -> Result<Repertoire, TpmError> {
    let node = system.node(purview_node)?;
    let conditioned = node.tpm(direction).condition_tpm(condition)?;
    let nonmechanism_inputs: Vec<usize> = node
        .inputs()
        .iter()
        .copied()
        .filter(|i| !condition.contains_key(i))
        .collect();
    let marginal = conditioned.marginalize_out(&nonmechanism_inputs)?;
    let shape = repertoire_shape(system.network_size(), &[purview_node]);
    Ok(marginal.reshape(&shape)?.into_array())
}

/// Pr(purview next | mechanism in `mechanism_state`), or the backward
/// analogue for [`Direction::Cause`].
///
/// `mechanism_state` defaults to the system's current state. The empty
/// purview gives the all-ones repertoire of rank `network_size`.
pub fn effect_repertoire<S: CausalSystem + ?Sized>(
    system: &S,
    mechanism: &[usize],
    purview: &[usize],
    mechanism_state: Option<&[u8]>,
    direction: Direction,
) -> Result<Repertoire, TpmError> {
    let network_size = system.network_size();
    let shape = repertoire_shape(network_size, purview);
    let mut joint = ArrayD::ones(IxDyn(&shape.dims));
    if purview.is_empty() {
        return Ok(joint);
    }

    let mechanism_state = match mechanism_state {
        Some(state) => state.to_vec(),
        None => state_of(mechanism, system.state())?,
    };
    if mechanism_state.len() != mechanism.len() {
        return Err(TpmError::ShapeMismatch {
            expected: Shape::new(vec![mechanism.len()]),
            got: Shape::new(vec![mechanism_state.len()]),
        });
    }
    let condition: BTreeMap<usize, u8> = mechanism
        .iter()
        .copied()
        .zip(mechanism_state.iter().copied())
        .collect();

    for &node in purview {
        let single = single_node_repertoire(system, &condition, node, direction)?;
        joint = &joint * &single;
    }
    trace!(?mechanism, ?purview, %direction, "repertoire computed");
    Ok(joint)
}

/// The effect repertoire at the system's current state.
pub fn forward_effect_repertoire<S: CausalSystem + ?Sized>(
    system: &S,
    mechanism: &[usize],
    purview: &[usize],
) -> Result<Repertoire, TpmError> {
    effect_repertoire(system, mechanism, purview, None, Direction::Effect)
}

/// Full-rank index of a purview state: purview axes take the state,
/// every other axis index 0.
fn repertoire_index(network_size: usize, purview: &[usize], purview_state: &[u8]) -> Vec<usize> {
    let mut index = vec![0; network_size];
    for (&node, &state) in purview.iter().zip(purview_state) {
        index[node] = state as usize;
    }
    index
}

fn read_repertoire(
    repertoire: &Repertoire,
    network_size: usize,
    purview: &[usize],
    purview_state: &[u8],
) -> Result<f64, TpmError> {
    if purview.len() != purview_state.len() {
        return Err(TpmError::ShapeMismatch {
            expected: Shape::new(vec![purview.len()]),
            got: Shape::new(vec![purview_state.len()]),
        });
    }
    let index = repertoire_index(network_size, purview, purview_state);
    repertoire
        .get(IxDyn(&index))
        .copied()
        .ok_or(TpmError::ShapeMismatch {
            expected: repertoire_shape(network_size, purview),
            got: Shape::from(repertoire.shape()),
        })
}

/// Pr(purview in `purview_state` next | mechanism at its current state).
pub fn forward_effect_probability<S: CausalSystem + ?Sized>(
    system: &S,
    mechanism: &[usize],
    purview: &[usize],
    purview_state: &[u8],
) -> Result<f64, TpmError> {
    let repertoire = forward_effect_repertoire(system, mechanism, purview)?;
    read_repertoire(&repertoire, system.network_size(), purview, purview_state)
}

/// Pr(mechanism in `mechanism_state` | purview previously in `purview_state`).
///
/// `mechanism_state` defaults to the mechanism's current state.
pub fn forward_cause_probability<S: CausalSystem + ?Sized>(
    system: &S,
    mechanism: &[usize],
    purview: &[usize],
    purview_state: &[u8],
    mechanism_state: Option<&[u8]>,
) -> Result<f64, TpmError> {
    let mechanism_state = match mechanism_state {
        Some(state) => state.to_vec(),
        None => state_of(mechanism, system.state())?,
    };
    let repertoire = effect_repertoire(
        system,
        purview,
        mechanism,
        Some(purview_state),
        Direction::Cause,
    )?;
    read_repertoire(&repertoire, system.network_size(), mechanism, &mechanism_state)
}

/// The cause repertoire: for every purview state, the probability of the
/// mechanism's current state given that purview state.
pub fn forward_cause_repertoire<S: CausalSystem + Sync + ?Sized>(
    system: &S,
    mechanism: &[usize],
    purview: &[usize],
) -> Result<Repertoire, TpmError> {
    forward_cause_repertoire_with(system, mechanism, purview, &Sequential)
}

/// [`forward_cause_repertoire`] with the purview states evaluated by `executor`.
pub fn forward_cause_repertoire_with<S, E>(
    system: &S,
    mechanism: &[usize],
    purview: &[usize],
    executor: &E,
) -> Result<Repertoire, TpmError>
where
    S: CausalSystem + Sync + ?Sized,
    E: Executor,
{
    let network_size = system.network_size();
    let shape = repertoire_shape(network_size, purview);
    if purview.is_empty() {
        return Ok(ArrayD::ones(IxDyn(&shape.dims)));
    }
    let mechanism_state = state_of(mechanism, system.state())?;
    let purview_states: Vec<Vec<u8>> = all_states(purview.len()).collect();
    let probabilities = executor.try_map(purview_states.clone(), |purview_state| {
        forward_cause_probability(
            system,
            mechanism,
            purview,
            &purview_state,
            Some(&mechanism_state),
        )
    })?;

    let mut repertoire = ArrayD::zeros(IxDyn(&shape.dims));
    for (purview_state, probability) in purview_states.iter().zip(probabilities) {
        let index = repertoire_index(network_size, purview, purview_state);
        repertoire[IxDyn(&index)] = probability;
    }
    Ok(repertoire)
}

/// The effect repertoire averaged over every state of the mechanism.
pub fn unconstrained_effect_repertoire<S: CausalSystem + ?Sized>(
    system: &S,
    mechanism: &[usize],
    purview: &[usize],
) -> Result<Repertoire, TpmError> {
    let shape = repertoire_shape(system.network_size(), purview);
    let mut total: Repertoire = ArrayD::zeros(IxDyn(&shape.dims));
    let mut count = 0usize;
    for state in all_states(mechanism.len()) {
        let repertoire =
            effect_repertoire(system, mechanism, purview, Some(&state), Direction::Effect)?;
        total = total + &repertoire;
        count += 1;
    }
    Ok(total / count as f64)
}

/// The mean cause probability, filled uniformly into the repertoire shape.
///
/// With mechanism and purview exchanged, the probability being averaged is
/// conditioned on the purview state, so averaging over all purview states
/// leaves a single value.
pub fn unconstrained_cause_repertoire<S: CausalSystem + Sync + ?Sized>(
    system: &S,
    mechanism: &[usize],
    purview: &[usize],
) -> Result<Repertoire, TpmError> {
    let mean = forward_cause_repertoire(system, mechanism, purview)?
        .mean()
        .unwrap_or(1.0);
    let shape = repertoire_shape(system.network_size(), purview);
    Ok(ArrayD::from_elem(IxDyn(&shape.dims), mean))
}
