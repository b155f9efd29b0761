//! Multivariate quadrature rules.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{QuadratureError, Result};
use crate::stats::{kahan_sum, NeumaierSum};

/// Points in ℝᵈ with real weights.
///
/// Weights of a sparse grid may be negative; they are positive for a
/// tensor grid of Gauss rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadratureRule {
    pub points: Vec<Vec<f64>>,
    pub weights: Vec<f64>,
}

impl QuadratureRule {
    /// # Errors
    /// [`QuadratureError::DimensionMismatch`] if the point and weight counts
    /// differ or the points do not share one dimension.
    pub fn new(points: Vec<Vec<f64>>, weights: Vec<f64>) -> Result<Self> {
        if points.len() != weights.len() {
            return Err(QuadratureError::DimensionMismatch {
                expected: points.len(),
                got: weights.len(),
            });
        }
        if let Some(first) = points.first() {
            let d = first.len();
            if let Some(bad) = points.iter().find(|p| p.len() != d) {
                return Err(QuadratureError::DimensionMismatch {
                    expected: d,
                    got: bad.len(),
                });
            }
        }
        Ok(Self { points, weights })
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Point dimension, 0 for an empty rule.
    pub fn dimensions(&self) -> usize {
        self.points.first().map_or(0, Vec::len)
    }

    pub fn total_weight(&self) -> f64 {
        kahan_sum(self.weights.iter().copied())
    }

    /// `Σ wᵢ f(xᵢ)` with compensated summation.
    ///
    /// # Examples
    /// ```
    /// use u_cubature::rule::QuadratureRule;
    /// let rule = QuadratureRule::new(vec![vec![-1.0], vec![1.0]], vec![0.5, 0.5]).unwrap();
    /// assert_eq!(rule.integrate(|x| x[0] * x[0]), 1.0);
    /// ```
    pub fn integrate<F>(&self, f: F) -> f64
    where
        F: Fn(&[f64]) -> f64,
    {
        kahan_sum(self.iter().map(|(x, w)| w * f(x)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[f64], f64)> + '_ {
        self.points
            .iter()
            .map(Vec::as_slice)
            .zip(self.weights.iter().copied())
    }

    /// Multiplies every weight by `factor`.
    pub fn scaled(mut self, factor: f64) -> Self {
        for w in &mut self.weights {
            *w *= factor;
        }
        self
    }

    /// Appends rules in order without merging.
    pub fn concat<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = QuadratureRule>,
    {
        let mut points = Vec::new();
        let mut weights = Vec::new();
        for rule in rules {
            points.extend(rule.points);
            weights.extend(rule.weights);
        }
        Self { points, weights }
    }

    /// Merges points that lie within `tolerance` of each other in every
    /// coordinate.
    ///
    /// Points are swept in lexicographic order, and each is compared with
    /// the following points whose first coordinate is within `tolerance`.
    /// Close pairs join one cluster, so chains of close points merge
    /// transitively. A cluster becomes one point at its first contributor's
    /// location, carrying the compensated sum of its weights in input
    /// order. Output is sorted lexicographically by point, so the result
    /// does not depend on which thread produced which contribution, and
    /// merging a merged rule again changes nothing.
    ///
    /// # Examples
    /// ```
    /// use u_cubature::rule::QuadratureRule;
    /// let rule = QuadratureRule::new(
    ///     vec![vec![5e-9 - 1e-16], vec![0.5], vec![5e-9 + 1e-16]],
    ///     vec![0.25, 0.5, 0.25],
    /// )
    /// .unwrap();
    /// let merged = rule.merge_duplicates(1e-8);
    /// assert_eq!(merged.len(), 2);
    /// assert_eq!(merged.weights, vec![0.5, 0.5]);
    /// ```
    pub fn merge_duplicates(&self, tolerance: f64) -> Self {
        let n = self.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| lexicographic(&self.points[a], &self.points[b]));

        let lead = |i: usize| self.points[i].first().copied().unwrap_or(0.0);
        let mut clusters = Clusters::new(n);
        for (pos, &i) in order.iter().enumerate() {
            for &j in &order[pos + 1..] {
                if lead(j) - lead(i) > tolerance {
                    break;
                }
                if within(&self.points[i], &self.points[j], tolerance) {
                    clusters.union(i, j);
                }
            }
        }

        // Roots are the smallest member index, met first in input order.
        let mut slot = vec![usize::MAX; n];
        let mut sums: Vec<(usize, NeumaierSum)> = Vec::new();
        for (i, &weight) in self.weights.iter().enumerate() {
            let root = clusters.find(i);
            if slot[root] == usize::MAX {
                slot[root] = sums.len();
                sums.push((root, NeumaierSum::new()));
            }
            sums[slot[root]].1.add(weight);
        }
        sums.sort_by(|a, b| lexicographic(&self.points[a.0], &self.points[b.0]));

        let (points, weights) = sums
            .into_iter()
            .map(|(root, sum)| (self.points[root].clone(), sum.total()))
            .unzip();
        Self { points, weights }
    }

    /// Drops points whose weight is below `threshold · |Σw|` in magnitude.
    ///
    /// Exact zeros are always dropped.
    pub fn prune(&self, threshold: f64) -> Self {
        let cutoff = threshold * self.total_weight().abs();
        let (points, weights) = self
            .iter()
            .filter(|&(_, w)| w != 0.0 && w.abs() >= cutoff)
            .map(|(p, w)| (p.to_vec(), w))
            .unzip();
        Self { points, weights }
    }

    /// Whether the weights sum to 1 within `tolerance`.
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        (self.total_weight() - 1.0).abs() <= tolerance
    }
}

fn lexicographic(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn within(a: &[f64], b: &[f64], tolerance: f64) -> bool {
    a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Disjoint sets over point indices.
///
/// `find` uses path halving. `union` attaches the larger root under the
/// smaller one, so every set is rooted at its smallest index.
///
/// Reference: Tarjan & van Leeuwen (1984), "Worst-Case Analysis of Set
/// Union Algorithms".
struct Clusters {
    parent: Vec<usize>,
}

impl Clusters {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, x: usize, y: usize) {
        let (a, b) = (self.find(x), self.find(y));
        match a.cmp(&b) {
            Ordering::Less => self.parent[b] = a,
            Ordering::Greater => self.parent[a] = b,
            Ordering::Equal => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(points: &[&[f64]], weights: &[f64]) -> QuadratureRule {
        QuadratureRule::new(points.iter().map(|p| p.to_vec()).collect(), weights.to_vec()).unwrap()
    }

    #[test]
    fn test_new_validates_shapes() {
        assert!(QuadratureRule::new(vec![vec![0.0]], vec![]).is_err());
        assert!(QuadratureRule::new(vec![vec![0.0], vec![0.0, 1.0]], vec![1.0, 1.0]).is_err());
        let empty = QuadratureRule::new(vec![], vec![]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.dimensions(), 0);
    }

    #[test]
    fn test_merge_sums_coincident_points() {
        let r = rule(
            &[&[0.0, 1.0], &[0.5, 0.5], &[0.0, 1.0 + 1e-12], &[0.5, 0.5]],
            &[0.25, 0.5, 0.25, -0.25],
        );
        let merged = r.merge_duplicates(1e-8);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.points, vec![vec![0.0, 1.0], vec![0.5, 0.5]]);
        assert_eq!(merged.weights, vec![0.5, 0.25]);
    }

    #[test]
    fn test_merge_keeps_first_representative() {
        let r = rule(&[&[1.0 + 2e-10], &[1.0 - 2e-10]], &[1.0, 1.0]);
        let merged = r.merge_duplicates(1e-8);
        assert_eq!(merged.points, vec![vec![1.0 + 2e-10]]);
        assert_eq!(merged.weights, vec![2.0]);
    }

    #[test]
    fn test_merge_across_rounding_boundary() {
        // 5e-9 is a half-multiple of the tolerance
        let r = rule(&[&[5e-9 - 1e-16], &[5e-9 + 1e-16]], &[0.5, 0.25]);
        let merged = r.merge_duplicates(1e-8);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.points, vec![vec![5e-9 - 1e-16]]);
        assert_eq!(merged.weights, vec![0.75]);

        let r = rule(&[&[0.0, 5e-9 + 1e-16], &[3e-9, 5e-9 - 1e-16]], &[1.0, -0.5]);
        assert_eq!(r.merge_duplicates(1e-8).len(), 1);
    }

    #[test]
    fn test_merge_needs_every_coordinate_close() {
        let r = rule(&[&[0.0, 0.0], &[1e-9, 1.0], &[2e-9, 1e-9]], &[1.0, 1.0, 1.0]);
        let merged = r.merge_duplicates(1e-8);
        assert_eq!(merged.points, vec![vec![0.0, 0.0], vec![1e-9, 1.0]]);
        assert_eq!(merged.weights, vec![2.0, 1.0]);

        let apart = rule(&[&[0.0], &[2e-8]], &[1.0, 1.0]);
        assert_eq!(apart.merge_duplicates(1e-8).len(), 2);
    }

    #[test]
    fn test_merge_chains_close_points() {
        let r = rule(&[&[1.2e-8], &[0.0], &[6e-9]], &[1.0, 2.0, 3.0]);
        let merged = r.merge_duplicates(1e-8);
        assert_eq!(merged.points, vec![vec![1.2e-8]]);
        assert_eq!(merged.weights, vec![6.0]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let r = rule(
            &[&[0.3], &[-0.2], &[0.3], &[0.0], &[-0.2]],
            &[0.1, 0.2, 0.3, 0.4, -0.1],
        );
        let once = r.merge_duplicates(1e-8);
        let twice = once.merge_duplicates(1e-8);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_preserves_total_weight() {
        let r = rule(&[&[0.0], &[1.0], &[0.0], &[2.0]], &[0.7, -0.2, 0.3, 0.2]);
        let merged = r.merge_duplicates(1e-8);
        assert!((merged.total_weight() - r.total_weight()).abs() < 1e-15);
    }

    #[test]
    fn test_prune() {
        let r = rule(&[&[0.0], &[1.0], &[2.0], &[3.0]], &[1.0, 1e-15, 0.0, -1e-15]);
        let pruned = r.prune(1e-13);
        assert_eq!(pruned.points, vec![vec![0.0]]);
        // Threshold 0 only removes exact zeros.
        assert_eq!(r.prune(0.0).len(), 3);
    }

    #[test]
    fn test_scaled_and_concat() {
        let a = rule(&[&[0.0]], &[1.0]).scaled(-1.0);
        let b = rule(&[&[1.0], &[2.0]], &[0.5, 0.5]).scaled(2.0);
        let joined = QuadratureRule::concat([a, b]);
        assert_eq!(joined.weights, vec![-1.0, 1.0, 1.0]);
        assert_eq!(joined.points.len(), 3);
        assert!(joined.is_normalized(1e-15));
    }

    #[test]
    fn test_integrate() {
        let r = rule(&[&[1.0, 2.0], &[3.0, 4.0]], &[0.25, 0.75]);
        assert_eq!(r.integrate(|x| x[0] * x[1]), 0.25 * 2.0 + 0.75 * 12.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn merged_points_are_separated(
            cells in proptest::collection::vec((0_i32..6, 0_i32..6), 1..40),
            jitter in proptest::collection::vec((-4e-9_f64..4e-9, -4e-9_f64..4e-9), 40),
            weights in proptest::collection::vec(-1.0_f64..1.0, 40),
        ) {
            let tol = 1e-8;
            let points: Vec<Vec<f64>> = cells
                .iter()
                .zip(&jitter)
                .map(|(&(a, b), &(ja, jb))| vec![0.5 * a as f64 + ja, 0.5 * b as f64 + jb])
                .collect();
            let weights = weights[..points.len()].to_vec();
            let r = QuadratureRule::new(points, weights).unwrap();
            let merged = r.merge_duplicates(tol);

            let mut distinct = cells.clone();
            distinct.sort_unstable();
            distinct.dedup();
            prop_assert_eq!(merged.len(), distinct.len());
            for (i, p) in merged.points.iter().enumerate() {
                for q in &merged.points[i + 1..] {
                    prop_assert!(!within(p, q, tol));
                }
            }
            prop_assert!((merged.total_weight() - r.total_weight()).abs() < 1e-12);
            prop_assert_eq!(merged.merge_duplicates(tol), merged);
        }
    }
}
