//! The three passes behind a tree-Wasserstein query.
//!
//! For two distributions `a` and `b` over the nodes of a rooted tree, the
//! optimal transport cost is
//!
//! ```text
//! TW(a, b) = Σ_edges  w(e) · |A(e) - B(e)|
//! ```
//!
//! where `A(e)` / `B(e)` is the mass of `a` / `b` in the subtree below edge
//! `e`. Instead of taking absolute values edge by edge, the computation runs
//! as three linear passes:
//!
//! 1. [`aggregate`]: bottom-up subtree masses `A`, `B` for every node
//! 2. [`propagate`]: top-down signed path weight,
//!    `W(c) = W(parent) + sign(A(c) - B(c)) · w(parent, c)`
//! 3. [`reduce`]: `Σ_nodes W(n) · (a(n) - b(n))`
//!
//! Regrouping the sum in step 3 by edge gives back `Σ w(e) · sign(Δ) · Δ`,
//! which is the formula above.
//!
//! All three functions expect probability slices of length
//! `tree.node_count()`; [`TreeMetric`](crate::TreeMetric) checks this before
//! calling them.

use std::collections::VecDeque;

use crate::tree::{NodeId, Tree};

/// Per-node subtree masses for a pair of distributions.
///
/// `first[n]` is the total of the first distribution over `n` and all its
/// descendants; likewise `second[n]`. At the root both equal the total mass
/// of their input vector.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeMass {
    pub first: Vec<f64>,
    pub second: Vec<f64>,
}

impl SubtreeMass {
    /// Mass imbalance across the edge above `node`.
    #[inline]
    pub fn imbalance(&self, node: NodeId) -> f64 {
        self.first[node] - self.second[node]
    }
}

/// Sign of an imbalance, with zero counted as positive.
#[inline]
pub fn sign(x: f64) -> f64 {
    if x >= 0.0 { 1.0 } else { -1.0 }
}

/// Accumulate subtree masses from the leaves up.
///
/// # Algorithm
/// Start from the leaves. A node pushes its accumulated mass into its parent;
/// the parent is queued once the last of its children has reported, so a
/// node never forwards a partial sum. Iterative, so tree depth does not
/// matter.
pub fn aggregate(tree: &Tree, first_prob: &[f64], second_prob: &[f64]) -> SubtreeMass {
    debug_assert_eq!(first_prob.len(), tree.node_count());
    debug_assert_eq!(second_prob.len(), tree.node_count());

    let mut first = first_prob.to_vec();
    let mut second = second_prob.to_vec();
    let mut reported = vec![0usize; tree.node_count()];

    let mut queue: VecDeque<NodeId> = tree.leaves().iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        let Some(parent) = tree.node(id).parent else {
            continue;
        };

        first[parent] += first[id];
        second[parent] += second[id];

        reported[parent] += 1;
        if reported[parent] == tree.node(parent).children.len() {
            queue.push_back(parent);
        }
    }

    SubtreeMass { first, second }
}

/// Signed cumulative edge weight from the root down to every node.
///
/// The root gets `0`. Each child adds its parent-edge weight, signed by the
/// direction of the mass imbalance across that edge.
pub fn propagate(tree: &Tree, masses: &SubtreeMass) -> Vec<f64> {
    let mut edge_weight = vec![0.0; tree.node_count()];

    let mut queue = VecDeque::from([tree.root()]);
    while let Some(id) = queue.pop_front() {
        for &child in &tree.node(id).children {
            let weight = tree
                .node(child)
                .parent_weight
                .expect("every non-root node of a built tree has a parent weight");
            edge_weight[child] = edge_weight[id] + sign(masses.imbalance(child)) * weight;
            queue.push_back(child);
        }
    }

    edge_weight
}

/// Fold signed path weights against the raw per-node probability difference.
///
/// No absolute value or clamping: the result is returned exactly as summed.
pub fn reduce(tree: &Tree, edge_weight: &[f64], first_prob: &[f64], second_prob: &[f64]) -> f64 {
    tree.nodes()
        .iter()
        .map(|n| edge_weight[n.id] * (first_prob[n.id] - second_prob[n.id]))
        .sum()
}
