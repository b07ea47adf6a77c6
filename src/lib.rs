//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `tree`: edge-list validation and rooting into a parent-pointer tree.
//! - `distances`: the bottom-up / top-down / reduce passes of a query.
//! - `metric`: `TreeMetric`, the reusable facade over one built tree.
//! - `error`: the two failure kinds of the core.
//! - `io`: reading edge lists, Newick trees and distribution tables; writing matrices.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod distances;
pub mod error;
pub mod io;
pub mod metric;
pub mod tree;

#[cfg(feature = "python")]
pub mod api;

#[cfg(test)]
mod test_support;

// Re-export frequently used types & functions
pub use error::{TopologyDefect, TwError};
pub use metric::{Evaluation, TreeMetric, square_matrix, tree_wasserstein};
pub use tree::{Edge, Node, NodeId, Tree, is_valid_spanning_tree};
