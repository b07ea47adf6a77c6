//! Build a rooted tree from an undirected, weighted edge list.
//!
//! # Overview
//! Callers describe a tree as a flat list of `(from, to, weight)` edges over
//! dense node ids `0..num_node`. Before any distance can be computed the list
//! has to be checked (is it really a spanning tree?) and oriented (which end
//! of each edge is the parent?). Both happen in a single breadth-first
//! traversal from the requested root:
//!
//! ```text
//! edges: (1,0,2.0) (1,2,3.0) (3,1,1.0)      root = 0
//!
//!            0
//!            |  2.0
//!            1
//!      3.0  / \  1.0
//!          2   3
//! ```
//!
//! Every edge is reached from the end closer to the root first, and that end
//! becomes the parent. A node reached a second time means the edge list holds
//! a cycle or a repeated edge. A node never reached means the list describes
//! a forest.
//!
//! The resulting [`Tree`] is immutable; distance queries only read it.

use std::collections::VecDeque;

use log::debug;

use crate::error::{Result, TopologyDefect};

/// Dense node index in `[0, num_node)`.
pub type NodeId = usize;

/// An undirected weighted edge as supplied by the caller.
///
/// After [`orient_edges`] the same type carries `from = parent`, `to = child`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
}

impl Edge {
    pub fn new(from: NodeId, to: NodeId, weight: f64) -> Self {
        Edge { from, to, weight }
    }
}

impl From<(NodeId, NodeId, f64)> for Edge {
    fn from((from, to, weight): (NodeId, NodeId, f64)) -> Self {
        Edge::new(from, to, weight)
    }
}

/// A node of a built [`Tree`].
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// `None` only for the root.
    pub parent: Option<NodeId>,
    /// Weight of the edge to `parent`; `None` only for the root.
    pub parent_weight: Option<f64>,
    /// Children in discovery order.
    pub children: Vec<NodeId>,
    pub is_root: bool,
}

impl Node {
    fn new(id: NodeId, is_root: bool) -> Self {
        Node {
            id,
            parent: None,
            parent_weight: None,
            children: Vec::new(),
            is_root,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A rooted tree with parent pointers, child lists and a leaf set.
///
/// # Invariants
/// - exactly one node (the requested root) has no parent
/// - every other node has one parent and the weight of the edge to it
/// - `leaves` lists, in ascending id order, every node without children
///
/// Built once by [`Tree::build`] and read-only afterwards, so one tree can be
/// shared by any number of concurrent queries.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    leaves: Vec<NodeId>,
}

impl Tree {
    /// Validate `edges` as a spanning tree on `num_node` nodes and root it at `root`.
    ///
    /// # Errors
    /// Returns [`TwError::InvalidTopology`](crate::TwError::InvalidTopology)
    /// when the edge count is not `num_node - 1`, an endpoint or the root is
    /// out of range, or the edges contain a cycle, a repeated edge or more
    /// than one component. No partial tree is ever returned.
    pub fn build(num_node: usize, edges: &[Edge], root: NodeId) -> Result<Self> {
        let oriented = orient_edges(num_node, edges, root)?;

        let mut nodes: Vec<Node> = (0..num_node).map(|id| Node::new(id, id == root)).collect();
        for edge in &oriented {
            let child = &mut nodes[edge.to];
            child.parent = Some(edge.from);
            child.parent_weight = Some(edge.weight);
            nodes[edge.from].children.push(edge.to);
        }

        let leaves: Vec<NodeId> = nodes.iter().filter(|n| n.is_leaf()).map(|n| n.id).collect();

        debug!(
            "built tree: {} nodes, {} leaves, root {}",
            num_node,
            leaves.len(),
            root
        );

        Ok(Tree { nodes, root, leaves })
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[inline]
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }
}

/// Check that `edges` form a spanning tree on `num_node` nodes reachable from `root`.
///
/// This is the only validity predicate in the crate; [`Tree::build`] rejects
/// exactly the inputs for which it returns `false`.
pub fn is_valid_spanning_tree(num_node: usize, edges: &[Edge], root: NodeId) -> bool {
    orient_edges(num_node, edges, root).is_ok()
}

/// Orient every edge parent → child by a breadth-first traversal from `root`.
///
/// Returns a new edge list in traversal order; the caller's slice is left
/// untouched.
///
/// # Algorithm
/// 1. Reject wrong edge counts and out-of-range ids up front
/// 2. Build an undirected adjacency list, tagging each entry with its edge index
/// 3. BFS from `root`: an edge already used is skipped (it leads back to the
///    parent); an unused edge that reaches a visited node closes a cycle
/// 4. Any node left unvisited is in another component
///
/// # Errors
/// Returns the [`TopologyDefect`] that disqualifies the edge list.
pub fn orient_edges(
    num_node: usize,
    edges: &[Edge],
    root: NodeId,
) -> std::result::Result<Vec<Edge>, TopologyDefect> {
    if num_node == 0 {
        return Err(TopologyDefect::EmptyTree);
    }
    if edges.len() != num_node - 1 {
        return Err(TopologyDefect::EdgeCount {
            expected: num_node - 1,
            actual: edges.len(),
        });
    }
    if root >= num_node {
        return Err(TopologyDefect::RootOutOfRange { root, num_node });
    }

    // (neighbour, weight, edge index)
    let mut adjacency: Vec<Vec<(NodeId, f64, usize)>> = vec![Vec::new(); num_node];
    for (idx, edge) in edges.iter().enumerate() {
        if let Some(&node) = [edge.from, edge.to].iter().find(|&&n| n >= num_node) {
            return Err(TopologyDefect::NodeOutOfRange { node, num_node });
        }
        adjacency[edge.from].push((edge.to, edge.weight, idx));
        adjacency[edge.to].push((edge.from, edge.weight, idx));
    }

    let mut visited_node = vec![false; num_node];
    let mut visited_edge = vec![false; edges.len()];
    let mut oriented = Vec::with_capacity(edges.len());

    let mut queue = VecDeque::from([root]);
    visited_node[root] = true;

    while let Some(from) = queue.pop_front() {
        for &(to, weight, idx) in &adjacency[from] {
            if visited_edge[idx] {
                continue;
            }
            if visited_node[to] {
                return Err(TopologyDefect::Cycle { node: to });
            }
            visited_node[to] = true;
            visited_edge[idx] = true;
            queue.push_back(to);
            oriented.push(Edge::new(from, to, weight));
        }
    }

    if let Some(node) = visited_node.iter().position(|&seen| !seen) {
        return Err(TopologyDefect::Disconnected { node });
    }

    Ok(oriented)
}
