//! Reusable tree-Wasserstein metric over one fixed tree.
//!
//! # Overview
//! Validating and orienting the edge list is the expensive, one-off part.
//! A [`TreeMetric`] does it once and then answers any number of distance
//! queries against the same immutable [`Tree`]:
//!
//! ```text
//! TreeMetric::new(edges)  ──►  Tree (read-only)
//!                                 │
//!     distance(p, q) ─────────────┼──► aggregate → propagate → reduce ──► f64
//!     distance(p, r) ─────────────┘        (fresh working state per call)
//! ```
//!
//! Because queries never mutate the tree, a `TreeMetric` can be shared
//! across threads; [`TreeMetric::pairwise_distances`] does exactly that with
//! rayon.

use itertools::Itertools;
use log::debug;
use rayon::prelude::*;

use crate::distances::{SubtreeMass, aggregate, propagate, reduce};
use crate::error::{Result, TwError};
use crate::tree::{Edge, NodeId, Tree};

/// Intermediate state of a single query, for inspection and testing.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub masses: SubtreeMass,
    /// Signed cumulative edge weight per node
    pub edge_weights: Vec<f64>,
    pub distance: f64,
}

#[derive(Debug, Clone)]
pub struct TreeMetric {
    tree: Tree,
}

impl TreeMetric {
    /// Build the metric for a tree given as an undirected edge list.
    ///
    /// # Errors
    /// [`TwError::InvalidTopology`] if `edges` is not a spanning tree on
    /// `num_node` nodes.
    pub fn new(num_node: usize, edges: &[Edge], root: NodeId) -> Result<Self> {
        Ok(Self::from_tree(Tree::build(num_node, edges, root)?))
    }

    pub fn from_tree(tree: Tree) -> Self {
        TreeMetric { tree }
    }

    #[inline]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    #[inline]
    pub fn num_node(&self) -> usize {
        self.tree.node_count()
    }

    /// Tree-Wasserstein distance between two distributions over the tree's nodes.
    ///
    /// Inputs are used as given: nothing is normalized and the result is not
    /// clamped.
    ///
    /// # Errors
    /// [`TwError::DimensionMismatch`] if either vector's length differs from
    /// the node count.
    pub fn distance(&self, first_prob: &[f64], second_prob: &[f64]) -> Result<f64> {
        self.check_dimension(first_prob)?;
        self.check_dimension(second_prob)?;

        let masses = aggregate(&self.tree, first_prob, second_prob);
        let edge_weights = propagate(&self.tree, &masses);
        Ok(reduce(&self.tree, &edge_weights, first_prob, second_prob))
    }

    /// Like [`distance`](Self::distance), but also returns the per-node
    /// subtree masses and signed edge weights.
    pub fn evaluate(&self, first_prob: &[f64], second_prob: &[f64]) -> Result<Evaluation> {
        self.check_dimension(first_prob)?;
        self.check_dimension(second_prob)?;

        let masses = aggregate(&self.tree, first_prob, second_prob);
        let edge_weights = propagate(&self.tree, &masses);
        let distance = reduce(&self.tree, &edge_weights, first_prob, second_prob);

        Ok(Evaluation {
            masses,
            edge_weights,
            distance,
        })
    }

    /// Distances between every pair of distributions, computed in parallel.
    ///
    /// Returns the upper triangle as `(i, j, distance)` with `i < j`, in
    /// row-major order. All vectors are checked before any work starts.
    pub fn pairwise_distances(&self, distributions: &[Vec<f64>]) -> Result<Vec<(usize, usize, f64)>> {
        distributions
            .iter()
            .try_for_each(|d| self.check_dimension(d))?;

        let pairs: Vec<(usize, usize)> = (0..distributions.len()).tuple_combinations().collect();
        debug!(
            "evaluating {} pairs over a {}-node tree",
            pairs.len(),
            self.num_node()
        );

        pairs
            .into_par_iter()
            .map(|(i, j)| {
                self.distance(&distributions[i], &distributions[j])
                    .map(|d| (i, j, d))
            })
            .collect()
    }

    fn check_dimension(&self, prob: &[f64]) -> Result<()> {
        if prob.len() != self.num_node() {
            return Err(TwError::DimensionMismatch {
                expected: self.num_node(),
                actual: prob.len(),
            });
        }
        Ok(())
    }
}

/// One-shot distance: the node count is taken from `first_prob` and the tree
/// is rooted at node 0.
pub fn tree_wasserstein(first_prob: &[f64], second_prob: &[f64], edges: &[Edge]) -> Result<f64> {
    TreeMetric::new(first_prob.len(), edges, 0)?.distance(first_prob, second_prob)
}

/// Expand upper-triangle pairs into a symmetric `n × n` matrix with a zero
/// diagonal.
pub fn square_matrix(n: usize, pairs: &[(usize, usize, f64)]) -> Vec<Vec<f64>> {
    let mut matrix = vec![vec![0.0f64; n]; n];
    for &(i, j, d) in pairs {
        matrix[i][j] = d;
        matrix[j][i] = d;
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TopologyDefect;
    use crate::test_support::{explicit_tw, path_length, random_distribution, random_tree, seeded};

    fn edges(list: &[(NodeId, NodeId, f64)]) -> Vec<Edge> {
        list.iter().copied().map(Edge::from).collect()
    }

    fn path_metric() -> TreeMetric {
        TreeMetric::new(3, &edges(&[(0, 1, 2.0), (1, 2, 3.0)]), 0).unwrap()
    }

    fn star_metric() -> TreeMetric {
        TreeMetric::new(4, &edges(&[(0, 1, 1.0), (0, 2, 1.0), (0, 3, 1.0)]), 0).unwrap()
    }

    /// All mass crosses both edges: 2 + 3.
    #[test]
    fn test_path_scenario() {
        let metric = path_metric();
        let p = [1.0, 0.0, 0.0];
        let q = [0.0, 0.0, 1.0];

        assert_eq!(metric.distance(&p, &q).unwrap(), 5.0);
        // swapping flips both the signs and the raw differences
        assert_eq!(metric.distance(&q, &p).unwrap(), 5.0);
    }

    #[test]
    fn test_star_identical_is_zero() {
        let p = [0.25; 4];
        assert_eq!(star_metric().distance(&p, &p).unwrap(), 0.0);
    }

    #[test]
    fn test_star_leaf_to_leaf() {
        let metric = star_metric();
        let p = [0.0, 1.0, 0.0, 0.0];
        let q = [0.0, 0.0, 0.0, 1.0];

        assert_eq!(metric.distance(&p, &q).unwrap(), 2.0);
    }

    #[test]
    fn test_single_node_tree() {
        let metric = TreeMetric::new(1, &[], 0).unwrap();
        assert_eq!(metric.distance(&[1.0], &[1.0]).unwrap(), 0.0);
        assert_eq!(metric.distance(&[0.3], &[0.9]).unwrap(), 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let metric = star_metric();
        let four = [0.25; 4];
        let three = [1.0 / 3.0; 3];

        assert_eq!(
            metric.distance(&four, &three),
            Err(TwError::DimensionMismatch { expected: 4, actual: 3 })
        );
        assert_eq!(
            metric.distance(&three, &four),
            Err(TwError::DimensionMismatch { expected: 4, actual: 3 })
        );
        assert!(metric.evaluate(&four, &[0.2; 5]).is_err());
    }

    #[test]
    fn test_invalid_topology_surfaces() {
        let err = TreeMetric::new(3, &edges(&[(0, 1, 1.0), (1, 2, 2.0), (2, 0, 3.0)]), 0).unwrap_err();
        assert_eq!(
            err,
            TwError::InvalidTopology(TopologyDefect::EdgeCount { expected: 2, actual: 3 })
        );
        assert!(err.to_string().starts_with("invalid topology"));
    }

    #[test]
    fn test_unnormalized_input_is_not_clamped() {
        let metric = path_metric();
        // first has twice the mass; nothing is rescaled
        let d = metric.distance(&[2.0, 0.0, 0.0], &[0.0, 0.0, 1.0]).unwrap();
        assert_eq!(d, 5.0);

        let d = metric.distance(&[0.0, 0.0, 2.0], &[0.0, 0.0, 1.0]).unwrap();
        assert_eq!(d, 5.0);
    }

    #[test]
    fn test_self_distance_is_exactly_zero() {
        let mut rng = seeded(11);
        for _ in 0..30 {
            let (num_node, edges, root) = random_tree(&mut rng, 1..120);
            let metric = TreeMetric::new(num_node, &edges, root).unwrap();
            let p = random_distribution(&mut rng, num_node);

            assert_eq!(metric.distance(&p, &p).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_symmetric_under_swap() {
        let mut rng = seeded(12);
        for _ in 0..30 {
            let (num_node, edges, root) = random_tree(&mut rng, 2..120);
            let metric = TreeMetric::new(num_node, &edges, root).unwrap();
            let p = random_distribution(&mut rng, num_node);
            let q = random_distribution(&mut rng, num_node);

            let pq = metric.distance(&p, &q).unwrap();
            let qp = metric.distance(&q, &p).unwrap();
            assert!((pq - qp).abs() < 1e-9, "{pq} vs {qp}");
            assert!(pq >= -1e-12);
        }
    }

    #[test]
    fn test_matches_explicit_formula() {
        let mut rng = seeded(13);
        for _ in 0..50 {
            let (num_node, edges, root) = random_tree(&mut rng, 2..200);
            let metric = TreeMetric::new(num_node, &edges, root).unwrap();
            let p = random_distribution(&mut rng, num_node);
            let q = random_distribution(&mut rng, num_node);

            let got = metric.distance(&p, &q).unwrap();
            let want = explicit_tw(metric.tree(), &p, &q);
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }
    }

    /// Moving a unit point mass costs exactly the tree path length.
    #[test]
    fn test_point_masses_recover_tree_metric() {
        let mut rng = seeded(14);
        for _ in 0..30 {
            let (num_node, edges, root) = random_tree(&mut rng, 2..80);
            let metric = TreeMetric::new(num_node, &edges, root).unwrap();

            for (a, b) in (0..num_node).step_by(7).tuple_combinations() {
                let mut p = vec![0.0; num_node];
                let mut q = vec![0.0; num_node];
                p[a] = 1.0;
                q[b] = 1.0;

                let got = metric.distance(&p, &q).unwrap();
                let want = path_length(metric.tree(), a, b);
                assert!((got - want).abs() < 1e-9, "[{a}, {b}] {got} vs {want}");
            }
        }
    }

    /// The rooting is a bookkeeping choice; the distance does not depend on it.
    #[test]
    fn test_root_choice_does_not_change_distance() {
        let mut rng = seeded(15);
        let (num_node, edges, _) = random_tree(&mut rng, 30..60);
        let p = random_distribution(&mut rng, num_node);
        let q = random_distribution(&mut rng, num_node);

        let reference = TreeMetric::new(num_node, &edges, 0).unwrap().distance(&p, &q).unwrap();
        for root in 1..num_node {
            let d = TreeMetric::new(num_node, &edges, root).unwrap().distance(&p, &q).unwrap();
            assert!((d - reference).abs() < 1e-9);
        }
    }

    #[test]
    fn test_evaluate_exposes_working_state() {
        let metric = path_metric();
        let p = [1.0, 0.0, 0.0];
        let q = [0.0, 0.0, 1.0];

        let eval = metric.evaluate(&p, &q).unwrap();

        assert_eq!(eval.masses.first, vec![1.0, 0.0, 0.0]);
        assert_eq!(eval.masses.second, vec![1.0, 1.0, 1.0]);
        assert_eq!(eval.edge_weights, vec![0.0, -2.0, -5.0]);
        assert_eq!(eval.distance, metric.distance(&p, &q).unwrap());
    }

    #[test]
    fn test_queries_are_independent() {
        let metric = path_metric();
        let a = metric.distance(&[1.0, 0.0, 0.0], &[0.0, 0.0, 1.0]).unwrap();
        let _ = metric.distance(&[0.0, 1.0, 0.0], &[0.5, 0.0, 0.5]).unwrap();
        let b = metric.distance(&[1.0, 0.0, 0.0], &[0.0, 0.0, 1.0]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tree_wasserstein_one_shot() {
        let e = edges(&[(0, 1, 2.0), (1, 2, 3.0)]);
        assert_eq!(tree_wasserstein(&[1.0, 0.0, 0.0], &[0.0, 0.0, 1.0], &e), Ok(5.0));
        assert_eq!(
            tree_wasserstein(&[1.0, 0.0, 0.0], &[0.0, 1.0], &e),
            Err(TwError::DimensionMismatch { expected: 3, actual: 2 })
        );

        let cycle: Vec<Edge> = (0..5).map(|i| Edge::new(i % 5, (i + 1) % 5, (i + 1) as f64)).collect();
        let mut p = vec![0.0; 5];
        let mut q = vec![0.0; 5];
        p[0] = 1.0;
        q[4] = 1.0;
        assert!(matches!(
            tree_wasserstein(&p, &q, &cycle),
            Err(TwError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_pairwise_matches_single_queries() {
        let mut rng = seeded(16);
        let (num_node, edges, root) = random_tree(&mut rng, 20..40);
        let metric = TreeMetric::new(num_node, &edges, root).unwrap();
        let dists: Vec<Vec<f64>> = (0..6).map(|_| random_distribution(&mut rng, num_node)).collect();

        let pairs = metric.pairwise_distances(&dists).unwrap();
        assert_eq!(pairs.len(), 15);

        for &(i, j, d) in &pairs {
            assert!(i < j);
            assert_eq!(d, metric.distance(&dists[i], &dists[j]).unwrap());
        }

        let matrix = square_matrix(dists.len(), &pairs);
        for i in 0..dists.len() {
            assert_eq!(matrix[i][i], 0.0);
            for j in 0..dists.len() {
                assert_eq!(matrix[i][j], matrix[j][i]);
            }
        }
    }

    #[test]
    fn test_pairwise_rejects_bad_dimension() {
        let metric = star_metric();
        let dists = vec![vec![0.25; 4], vec![0.5; 2], vec![0.25; 4]];

        assert_eq!(
            metric.pairwise_distances(&dists),
            Err(TwError::DimensionMismatch { expected: 4, actual: 2 })
        );
    }

    #[test]
    fn test_pairwise_degenerate_inputs() {
        let metric = star_metric();
        assert!(metric.pairwise_distances(&[]).unwrap().is_empty());
        assert!(metric.pairwise_distances(&[vec![0.25; 4]]).unwrap().is_empty());
    }
}
