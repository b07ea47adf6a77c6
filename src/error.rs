//! Error types for tree construction and distance queries.
//!
//! There are exactly two failure kinds: the edge list is not a spanning tree
//! ([`TwError::InvalidTopology`]), or a probability vector does not line up
//! with the tree ([`TwError::DimensionMismatch`]). Both are terminal for the
//! call that raised them.

use thiserror::Error;

use crate::tree::NodeId;

/// Why an edge list was rejected as a spanning tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyDefect {
    #[error("a tree needs at least one node")]
    EmptyTree,

    #[error("expected {expected} edges for a spanning tree, got {actual}")]
    EdgeCount { expected: usize, actual: usize },

    #[error("edge endpoint {node} is outside [0, {num_node})")]
    NodeOutOfRange { node: NodeId, num_node: usize },

    #[error("root {root} is outside [0, {num_node})")]
    RootOutOfRange { root: NodeId, num_node: usize },

    /// Node reached twice during the traversal: a cycle, a self-loop or a multi-edge.
    #[error("node {node} is reachable along more than one path")]
    Cycle { node: NodeId },

    /// Node never reached from the requested root.
    #[error("node {node} is not connected to the root")]
    Disconnected { node: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TwError {
    #[error("invalid topology: {0}")]
    InvalidTopology(#[from] TopologyDefect),

    #[error("dimension mismatch: tree has {expected} nodes but the probability vector has {actual} entries")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, TwError>;
