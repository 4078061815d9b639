//! Transition probability tables.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use ndarray::{ArrayD, Axis, IxDyn, Slice};
use phi_core::state::all_states;
use phi_core::{ConnectivityMatrix, Executor, Sequential, Shape, TpmConfig};
use tracing::{debug, trace};

use crate::convert;
use crate::error::TpmError;

/// A transition probability table: Pr(next state | current state).
///
/// Accepted layouts at construction (with validation):
///
/// - state-by-state: `2^N × 2^N`, each row a distribution over next states
/// - state-by-node, 2-D: `2^N × N`, each column a node's ON probability
/// - state-by-node, multidimensional: `[2; N] ++ [N]`
///
/// Validated tables are stored in multidimensional form. Afterwards the
/// value never changes: every operation returns a new `Tpm`.
///
/// # Example
///
/// ```rust
/// use ndarray::array;
/// use phi_tpm::Tpm;
///
/// // node 0 copies node 1, node 1 copies node 0
/// let tpm = Tpm::validated(array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]].into_dyn()).unwrap();
/// assert_eq!(tpm.shape(), &[2, 2, 2]);
/// assert_eq!(tpm.number_of_units(), 2);
/// assert!(tpm.is_deterministic());
/// ```
#[derive(Clone)]
pub struct Tpm {
    tpm: ArrayD<f64>,
    hash: u64,
}

impl Tpm {
    /// Store an array as-is, without validation.
    ///
    /// Used for derived tables (conditioned, marginalized, per-node) whose
    /// singleton axes would not pass shape validation.
    pub fn new(tpm: ArrayD<f64>) -> Self {
        let hash = content_hash(&tpm);
        Self { tpm, hash }
    }

    /// Validate with the default configuration and canonicalize.
    pub fn validated(tpm: ArrayD<f64>) -> Result<Self, TpmError> {
        Self::with_config(tpm, &TpmConfig::default())
    }

    /// Build a table, validating and canonicalizing it if `config.validate` is set.
    ///
    /// # Errors
    ///
    /// - [`TpmError::ProbabilityOutOfRange`] if an entry lies outside [0, 1]
    /// - [`TpmError::RowNotNormalized`] if a state-by-state row doesn't sum to 1
    /// - [`TpmError::InvalidShape`] if the shape matches no admissible layout
    /// - [`TpmError::ConditionallyDependent`] if `config.check_independence`
    ///   is set and the state-by-state round trip is lossy
    pub fn with_config(tpm: ArrayD<f64>, config: &TpmConfig) -> Result<Self, TpmError> {
        config.check()?;
        if !config.validate {
            return Ok(Self::new(tpm));
        }
        validate_probabilities(&tpm, config.row_sum_tolerance)?;
        validate_shape(&tpm)?;
        if config.check_independence && convert::is_state_by_state_shape(tpm.shape()) {
            check_conditional_independence(&tpm, config.independence_tolerance)?;
        }
        let canonical = convert::to_multidimensional(&tpm)?;
        debug!(
            from = %Shape::from(tpm.shape()),
            to = %Shape::from(canonical.shape()),
            "validated TPM"
        );
        Ok(Self::new(canonical))
    }

    /// The underlying array.
    pub fn array(&self) -> &ArrayD<f64> {
        &self.tpm
    }

    /// Consume the table, returning its array.
    pub fn into_array(self) -> ArrayD<f64> {
        self.tpm
    }

    pub fn shape(&self) -> &[usize] {
        self.tpm.shape()
    }

    pub fn ndim(&self) -> usize {
        self.tpm.ndim()
    }

    /// Read one entry; `None` if the index is out of range.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        self.tpm.get(IxDyn(index)).copied()
    }

    /// Number of nodes the table describes.
    pub fn number_of_units(&self) -> usize {
        if self.is_state_by_state() {
            return self.shape()[1].trailing_zeros() as usize;
        }
        self.shape().last().copied().unwrap_or(0)
    }

    /// Whether the array is a square state-by-state table.
    pub fn is_state_by_state(&self) -> bool {
        convert::is_state_by_state_shape(self.shape())
    }

    /// Whether every entry is exactly 0 or 1.
    pub fn is_deterministic(&self) -> bool {
        self.tpm.iter().all(|&p| p == 0.0 || p == 1.0)
    }

    /// Node axes (every axis but the last) that have size 2.
    pub fn tpm_indices(&self) -> Vec<usize> {
        Shape::from(self.shape()).binary_axes()
    }

    /// Sum of all entries.
    pub fn sum(&self) -> f64 {
        self.tpm.sum()
    }

    /// Mean of all entries.
    pub fn mean(&self) -> f64 {
        self.tpm.mean().unwrap_or(0.0)
    }

    /// Re-represent the table in multidimensional state-by-node form.
    pub fn to_multidimensional(&self) -> Result<Tpm, TpmError> {
        Ok(Tpm::new(convert::to_multidimensional(&self.tpm)?))
    }

    /// Re-represent the table in state-by-state form.
    pub fn to_state_by_state(&self) -> Result<Tpm, TpmError> {
        if self.is_state_by_state() {
            return Ok(self.clone());
        }
        Ok(Tpm::new(
            convert::state_by_node_to_state_by_state(&self.tpm)?.into_dyn(),
        ))
    }

    /// Check that converting to the other layout and back reproduces this table.
    pub fn conditionally_independent(&self, tolerance: f64) -> Result<(), TpmError> {
        check_conditional_independence(&self.tpm, tolerance)
    }

    /// Collapse the axes of fixed nodes onto their state.
    ///
    /// Collapsed axes are kept as singletons so the result still broadcasts
    /// against full-network arrays. Axes that are already singletons are
    /// left alone.
    pub fn condition_tpm(&self, condition: &BTreeMap<usize, u8>) -> Result<Tpm, TpmError> {
        let node_axes = self.node_axes();
        let mut tpm = self.tpm.view();
        for (&axis, &state) in condition {
            if axis >= node_axes {
                return Err(TpmError::IndexOutOfBounds {
                    index: axis,
                    size: node_axes,
                });
            }
            let size = tpm.shape()[axis];
            if size == 1 {
                continue;
            }
            if state as usize >= size {
                return Err(TpmError::InvalidState { axis, state, size });
            }
            let s = state as usize;
            tpm.slice_axis_inplace(Axis(axis), Slice::from(s..s + 1));
        }
        Ok(Tpm::new(tpm.to_owned()))
    }

    /// Average the table over the given node axes.
    ///
    /// The axes are kept as singletons. The result is the sum over the axes
    /// divided by the product of their sizes: the maximum-entropy marginal,
    /// not the plain sum.
    pub fn marginalize_out(&self, node_indices: &[usize]) -> Result<Tpm, TpmError> {
        let summed = self.sum_out(node_indices)?;
        let count: usize = node_indices
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|&axis| self.shape()[axis])
            .product();
        Ok(summed / count as f64)
    }

    /// Sum over the given node axes, keeping them as singletons.
    pub fn sum_out(&self, node_indices: &[usize]) -> Result<Tpm, TpmError> {
        let node_axes = self.node_axes();
        let axes: BTreeSet<usize> = node_indices.iter().copied().collect();
        if let Some(&axis) = axes.iter().find(|&&a| a >= node_axes) {
            return Err(TpmError::IndexOutOfBounds {
                index: axis,
                size: node_axes,
            });
        }
        let mut tpm = self.tpm.clone();
        for &axis in &axes {
            tpm = tpm.sum_axis(Axis(axis)).insert_axis(Axis(axis));
        }
        Ok(Tpm::new(tpm))
    }

    /// The table of the free nodes when `fixed_nodes` are held in `state`.
    ///
    /// Fixed nodes keep singleton current-state axes and are dropped from
    /// the final (per-node) axis.
    pub fn subtpm(&self, fixed_nodes: &[usize], state: &[u8]) -> Result<Tpm, TpmError> {
        if fixed_nodes.len() != state.len() {
            return Err(TpmError::ShapeMismatch {
                expected: Shape::new(vec![fixed_nodes.len()]),
                got: Shape::new(vec![state.len()]),
            });
        }
        let n = self.number_of_units();
        let free: Vec<usize> = (0..n).filter(|i| !fixed_nodes.contains(i)).collect();
        let condition: BTreeMap<usize, u8> =
            fixed_nodes.iter().copied().zip(state.iter().copied()).collect();
        let last = self.last_axis()?;
        let conditioned = self.condition_tpm(&condition)?;
        Ok(Tpm::new(conditioned.tpm.select(Axis(last), &free)))
    }

    /// Broadcast singleton node axes to size 2.
    ///
    /// The last axis is left as it is; the values are repeated, which is the
    /// maximum-entropy reading of a node that is not an input.
    pub fn expand_tpm(&self) -> Result<Tpm, TpmError> {
        let last = self.shape().last().copied().unwrap_or(1);
        let target = Shape::expanded(self.node_axes(), last);
        self.broadcast_to(&target)
    }

    /// Broadcast the table to `target`.
    pub fn broadcast_to(&self, target: &Shape) -> Result<Tpm, TpmError> {
        let expanded = self
            .tpm
            .broadcast(IxDyn(&target.dims))
            .ok_or_else(|| TpmError::ShapeMismatch {
                expected: target.clone(),
                got: Shape::from(self.shape()),
            })?;
        Ok(Tpm::new(expanded.to_owned()))
    }

    /// Reorder nodes: axis `i` of the result is axis `permutation[i]` of this
    /// table, on both the current-state axes and the per-node last axis.
    pub fn permute_nodes(&self, permutation: &[usize]) -> Result<Tpm, TpmError> {
        let node_axes = self.last_axis()?;
        if permutation.len() != node_axes {
            return Err(TpmError::InvalidPermutation {
                expected: node_axes,
                got: permutation.len(),
            });
        }
        let unique: BTreeSet<usize> = permutation.iter().copied().collect();
        if unique.len() != node_axes || unique.iter().any(|&i| i >= node_axes) {
            return Err(TpmError::NotAPermutation {
                permutation: permutation.to_vec(),
                expected: node_axes,
            });
        }
        if self.shape()[node_axes] != node_axes {
            return Err(TpmError::ShapeMismatch {
                expected: Shape::expanded(node_axes, node_axes),
                got: Shape::from(self.shape()),
            });
        }
        let mut axes = permutation.to_vec();
        axes.push(node_axes);
        let permuted = self.tpm.clone().permuted_axes(axes);
        Ok(Tpm::new(permuted.select(Axis(node_axes), permutation)))
    }

    /// The slice of the last axis at `index`, with that axis removed.
    ///
    /// For a state-by-node table this is the ON probability of node `index`
    /// for every current state.
    pub fn column(&self, index: usize) -> Result<Tpm, TpmError> {
        let last = self.last_axis()?;
        let size = self.shape()[last];
        if index >= size {
            return Err(TpmError::IndexOutOfBounds { index, size });
        }
        Ok(Tpm::new(self.tpm.index_axis(Axis(last), index).to_owned()))
    }

    /// Stack tables of identical shape along a new last axis.
    pub fn stack_last(parts: &[&Tpm]) -> Result<Tpm, TpmError> {
        let first = parts.first().ok_or(TpmError::ShapeMismatch {
            expected: Shape::new(vec![1]),
            got: Shape::new(vec![0]),
        })?;
        let views: Vec<_> = parts.iter().map(|t| t.tpm.view()).collect();
        let stacked = ndarray::stack(Axis(first.ndim()), &views).map_err(|_| {
            TpmError::ShapeMismatch {
                expected: Shape::from(first.shape()),
                got: parts
                    .iter()
                    .map(|t| Shape::from(t.shape()))
                    .find(|s| s.dims != first.shape())
                    .unwrap_or_default(),
            }
        })?;
        Ok(Tpm::new(stacked))
    }

    /// Reshape to `shape`, reading entries in row-major order.
    pub fn reshape(&self, shape: &Shape) -> Result<Tpm, TpmError> {
        if shape.numel() != self.tpm.len() {
            return Err(TpmError::ShapeMismatch {
                expected: shape.clone(),
                got: Shape::from(self.shape()),
            });
        }
        let data: Vec<f64> = self.tpm.iter().copied().collect();
        let tpm = ArrayD::from_shape_vec(IxDyn(&shape.dims), data).map_err(|_| {
            TpmError::ShapeMismatch {
                expected: shape.clone(),
                got: Shape::from(self.shape()),
            }
        })?;
        Ok(Tpm::new(tpm))
    }

    /// Whether node `a` has a causal effect on node `b`.
    ///
    /// A context is a state of every node except `a`. There is an edge
    /// `a → b` if, in some context, flipping `a` changes the probability that
    /// `b` is ON.
    pub fn infer_edge(&self, a: usize, b: usize, contexts: &[Vec<u8>]) -> Result<bool, TpmError> {
        let tpm = self.to_multidimensional()?;
        let n = tpm.number_of_units();
        for index in [a, b] {
            if index >= n {
                return Err(TpmError::IndexOutOfBounds { index, size: n });
            }
        }
        for context in contexts {
            if context.len() + 1 != n {
                return Err(TpmError::ShapeMismatch {
                    expected: Shape::new(vec![n - 1]),
                    got: Shape::new(vec![context.len()]),
                });
            }
            let mut a_off = context.clone();
            a_off.insert(a, 0);
            let mut a_on = context.clone();
            a_on.insert(a, 1);
            if tpm.probability_at(&a_off, b)? != tpm.probability_at(&a_on, b)? {
                trace!(a, b, ?context, "edge found");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Infer the connectivity matrix by testing every ordered pair of nodes.
    ///
    /// Costs `N² · 2^(N−1)` table lookups.
    pub fn infer_cm(&self) -> Result<ConnectivityMatrix, TpmError> {
        self.infer_cm_with(&Sequential)
    }

    /// [`Tpm::infer_cm`] with an explicit execution backend.
    pub fn infer_cm_with<E: Executor>(&self, executor: &E) -> Result<ConnectivityMatrix, TpmError> {
        let n = self.number_of_units();
        let contexts: Vec<Vec<u8>> = all_states(n.saturating_sub(1)).collect();
        let pairs: Vec<(usize, usize)> = (0..n).flat_map(|a| (0..n).map(move |b| (a, b))).collect();
        debug!(nodes = n, backend = executor.name(), "inferring connectivity");
        let edges = executor.try_map(pairs, |(a, b)| self.infer_edge(a, b, &contexts))?;
        let cm = ndarray::Array2::from_shape_vec((n, n), edges.into_iter().map(u8::from).collect())
            .map_err(|_| TpmError::ShapeMismatch {
                expected: Shape::new(vec![n, n]),
                got: Shape::new(vec![n * n]),
            })?;
        Ok(ConnectivityMatrix::new(cm)?)
    }

    /// Probability that node `node` is ON after `state`, reading singleton
    /// axes at index 0.
    fn probability_at(&self, state: &[u8], node: usize) -> Result<f64, TpmError> {
        let mut index: Vec<usize> = state
            .iter()
            .zip(self.shape())
            .map(|(&s, &size)| if size == 1 { 0 } else { s as usize })
            .collect();
        index.push(node);
        self.get(&index).ok_or(TpmError::IndexOutOfBounds {
            index: node,
            size: self.shape().last().copied().unwrap_or(0),
        })
    }

    /// Number of current-state (node) axes.
    pub(crate) fn node_axes(&self) -> usize {
        self.ndim().saturating_sub(1)
    }

    /// Index of the per-node axis; a 0-dimensional array has none.
    fn last_axis(&self) -> Result<usize, TpmError> {
        match self.ndim() {
            0 => Err(TpmError::ShapeMismatch {
                expected: Shape::new(vec![1]),
                got: Shape::scalar(),
            }),
            ndim => Ok(ndim - 1),
        }
    }
}

/// Check entries lie in [0, 1] and that state-by-state rows sum to 1.
fn validate_probabilities(tpm: &ArrayD<f64>, row_sum_tolerance: f64) -> Result<(), TpmError> {
    if let Some((index, &value)) = tpm
        .iter()
        .enumerate()
        .find(|&(_, &p)| !(0.0..=1.0).contains(&p))
    {
        return Err(TpmError::ProbabilityOutOfRange { index, value });
    }
    if convert::is_state_by_state_shape(tpm.shape()) {
        for (row, values) in tpm.outer_iter().enumerate() {
            let sum = values.sum();
            if (sum - 1.0).abs() > row_sum_tolerance {
                return Err(TpmError::RowNotNormalized { row, sum });
            }
        }
    }
    Ok(())
}

/// Check the shape matches one of the three admissible layouts.
fn validate_shape(tpm: &ArrayD<f64>) -> Result<(), TpmError> {
    let shape = tpm.shape();
    let Some(&n) = shape.last() else {
        return Err(TpmError::InvalidShape {
            shape: Shape::scalar(),
            expected: "a TPM must be either 2-dimensional or multidimensional".to_string(),
        });
    };
    if shape.len() == 2 {
        let sbn_rows = (n < usize::BITS as usize).then(|| 1usize << n);
        if Some(shape[0]) == sbn_rows || convert::is_state_by_state_shape(shape) {
            return Ok(());
        }
        return Err(TpmError::InvalidShape {
            shape: Shape::from(shape),
            expected: format!(
                "a 2-D state-by-node TPM needs 2^N rows and N columns ({} rows for {} columns); \
                 a state-by-state TPM must be square with 2^N rows",
                sbn_rows.map_or_else(|| "too many".to_string(), |r| r.to_string()),
                n
            ),
        });
    }
    if shape.len() == n + 1 {
        let expected = Shape::state_by_node(n);
        if shape != expected.dims.as_slice() {
            return Err(TpmError::InvalidShape {
                shape: Shape::from(shape),
                expected: format!("a multidimensional state-by-node TPM of {n} nodes has shape {expected}"),
            });
        }
        return Ok(());
    }
    Err(TpmError::InvalidShape {
        shape: Shape::from(shape),
        expected: format!(
            "a TPM must be either 2-dimensional or multidimensional with N + 1 = {} axes",
            n + 1
        ),
    })
}

/// Round-trip through the other layout and compare.
fn check_conditional_independence(tpm: &ArrayD<f64>, tolerance: f64) -> Result<(), TpmError> {
    let (original, round_trip) = if convert::is_state_by_state_shape(tpm.shape()) {
        let sbn = convert::state_by_state_to_state_by_node(tpm)?;
        (tpm.clone(), convert::state_by_node_to_state_by_state(&sbn)?.into_dyn())
    } else {
        let sbs = convert::state_by_node_to_state_by_state(tpm)?.into_dyn();
        (
            convert::to_multidimensional(tpm)?,
            convert::state_by_state_to_state_by_node(&sbs)?,
        )
    };
    let deviation = original
        .iter()
        .zip(round_trip.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    if deviation > tolerance {
        return Err(TpmError::ConditionallyDependent { deviation });
    }
    Ok(())
}

/// Hash of the shape and entries; `-0.0` and `0.0` hash alike.
fn content_hash(tpm: &ArrayD<f64>) -> u64 {
    let mut hasher = DefaultHasher::new();
    tpm.shape().hash(&mut hasher);
    for &p in tpm.iter() {
        let p = if p == 0.0 { 0.0 } else { p };
        p.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

impl PartialEq for Tpm {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.tpm == other.tpm
    }
}

/// Tables built by [`Tpm::validated`] or [`Tpm::with_config`] never hold NaN,
/// since every entry is checked to lie in [0, 1].
impl Eq for Tpm {}

impl Hash for Tpm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Debug for Tpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tpm({:?})", self.tpm)
    }
}

impl fmt::Display for Tpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tpm({})", self.tpm)
    }
}

impl From<ArrayD<f64>> for Tpm {
    fn from(tpm: ArrayD<f64>) -> Self {
        Tpm::new(tpm)
    }
}
