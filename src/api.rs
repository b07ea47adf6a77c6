//! Python binding layer for tree-Wasserstein distances.
//!
//! Exposes a one-shot `distance` function, a batched `pairwise_distances`,
//! and a `TreeMetric` class that validates the tree once and answers many
//! queries. Every core error surfaces as `ValueError`.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::error::TwError;
use crate::metric::{TreeMetric, square_matrix};
use crate::tree::{Edge, NodeId};

impl From<TwError> for PyErr {
    fn from(err: TwError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn to_edges(edges: Vec<(NodeId, NodeId, f64)>) -> Vec<Edge> {
    edges.into_iter().map(Edge::from).collect()
}

/// Compute the tree-Wasserstein distance between two distributions.
///
/// Args:
///     first_prob: Probability mass per node; its length sets the node count
///     second_prob: Probability mass per node, same length as `first_prob`
///     edges: List of (from, to, weight) tuples forming a spanning tree
///     root_idx: Node to root the tree at (default: 0)
///
/// Returns:
///     The distance as a float
///
/// Raises:
///     ValueError: If the edges are not a spanning tree or the lengths differ
#[pyfunction]
#[pyo3(signature = (first_prob, second_prob, edges, root_idx=0))]
fn distance(
    first_prob: Vec<f64>,
    second_prob: Vec<f64>,
    edges: Vec<(NodeId, NodeId, f64)>,
    root_idx: NodeId,
) -> PyResult<f64> {
    let metric = TreeMetric::new(first_prob.len(), &to_edges(edges), root_idx)?;
    Ok(metric.distance(&first_prob, &second_prob)?)
}

/// Compute the pairwise distance matrix between many distributions on one tree.
///
/// Args:
///     num_node: Number of tree nodes
///     edges: List of (from, to, weight) tuples forming a spanning tree
///     distributions: List of probability vectors, each of length `num_node`
///     root_idx: Node to root the tree at (default: 0)
///
/// Returns:
///     A symmetric 2D list of distances
///
/// Raises:
///     ValueError: If the edges are not a spanning tree or any length differs
#[pyfunction]
#[pyo3(signature = (num_node, edges, distributions, root_idx=0))]
fn pairwise_distances(
    num_node: usize,
    edges: Vec<(NodeId, NodeId, f64)>,
    distributions: Vec<Vec<f64>>,
    root_idx: NodeId,
) -> PyResult<Vec<Vec<f64>>> {
    let metric = TreeMetric::new(num_node, &to_edges(edges), root_idx)?;
    let pairs = metric.pairwise_distances(&distributions)?;
    Ok(square_matrix(distributions.len(), &pairs))
}

/// A validated, rooted tree reused across distance queries.
#[pyclass(name = "TreeMetric", frozen)]
struct PyTreeMetric {
    inner: TreeMetric,
}

#[pymethods]
impl PyTreeMetric {
    #[new]
    #[pyo3(signature = (num_node, edges, root_idx=0))]
    fn new(num_node: usize, edges: Vec<(NodeId, NodeId, f64)>, root_idx: NodeId) -> PyResult<Self> {
        let inner = TreeMetric::new(num_node, &to_edges(edges), root_idx)?;
        Ok(PyTreeMetric { inner })
    }

    /// Distance between two distributions over this tree's nodes.
    fn distance(&self, first_prob: Vec<f64>, second_prob: Vec<f64>) -> PyResult<f64> {
        Ok(self.inner.distance(&first_prob, &second_prob)?)
    }

    #[getter]
    fn num_node(&self) -> usize {
        self.inner.num_node()
    }

    #[getter]
    fn root(&self) -> NodeId {
        self.inner.tree().root()
    }

    #[getter]
    fn leaves(&self) -> Vec<NodeId> {
        self.inner.tree().leaves().to_vec()
    }
}

/// Python module definition
#[pymodule]
fn tree_wasserstein(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(distance, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_distances, m)?)?;
    m.add_class::<PyTreeMetric>()?;
    Ok(())
}
