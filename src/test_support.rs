//! Random trees and distributions shared by the unit tests.

use std::collections::HashMap;
use std::ops::Range;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::tree::{Edge, NodeId, Tree};

pub(crate) fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A random spanning tree as `(num_node, edges, root)`.
///
/// Node labels are shuffled and edge directions flipped at random, so the
/// root is not always node 0 and the input order says nothing about parents.
pub(crate) fn random_tree(rng: &mut StdRng, sizes: Range<usize>) -> (usize, Vec<Edge>, NodeId) {
    let num_node = rng.random_range(sizes);
    let mut labels: Vec<NodeId> = (0..num_node).collect();
    labels.shuffle(rng);

    let mut edges: Vec<Edge> = (1..num_node)
        .map(|i| {
            let parent = labels[rng.random_range(0..i)];
            let child = labels[i];
            let weight = rng.random_range(0.1..5.0);
            if rng.random::<bool>() {
                Edge::new(parent, child, weight)
            } else {
                Edge::new(child, parent, weight)
            }
        })
        .collect();
    edges.shuffle(rng);

    let root = rng.random_range(0..num_node);
    (num_node, edges, root)
}

/// Random strictly positive vector summing to one.
pub(crate) fn random_distribution(rng: &mut StdRng, num_node: usize) -> Vec<f64> {
    let raw: Vec<f64> = (0..num_node).map(|_| rng.random::<f64>() + 1e-3).collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|x| x / total).collect()
}

/// Length of the unique path between `a` and `b`.
pub(crate) fn path_length(tree: &Tree, a: NodeId, b: NodeId) -> f64 {
    let mut above_a: HashMap<NodeId, f64> = HashMap::new();
    let mut node = a;
    let mut dist = 0.0;
    loop {
        above_a.insert(node, dist);
        match (tree.node(node).parent, tree.node(node).parent_weight) {
            (Some(p), Some(w)) => {
                dist += w;
                node = p;
            }
            _ => break,
        }
    }

    let mut node = b;
    let mut dist = 0.0;
    loop {
        if let Some(up) = above_a.get(&node) {
            return dist + up;
        }
        match (tree.node(node).parent, tree.node(node).parent_weight) {
            (Some(p), Some(w)) => {
                dist += w;
                node = p;
            }
            _ => unreachable!("root is an ancestor of every node"),
        }
    }
}

/// `Σ w(e) · |A(e) - B(e)|` computed from explicit subtree sums.
pub(crate) fn explicit_tw(tree: &Tree, p: &[f64], q: &[f64]) -> f64 {
    fn subtree(tree: &Tree, node: NodeId, p: &[f64], q: &[f64], total: &mut f64) -> (f64, f64) {
        let (mut a, mut b) = (p[node], q[node]);
        for &c in &tree.node(node).children {
            let (ca, cb) = subtree(tree, c, p, q, total);
            *total += tree.node(c).parent_weight.unwrap_or(0.0) * (ca - cb).abs();
            a += ca;
            b += cb;
        }
        (a, b)
    }

    let mut total = 0.0;
    subtree(tree, tree.root(), p, q, &mut total);
    total
}
