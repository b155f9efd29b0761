//! Full tensor-product grids.
//!
//! [`UnivariateRules`] computes one recurrence table per dimension at the
//! highest order any grid will ask for, then derives every lower-order Gauss
//! rule from its prefix. Tensor grids are then pure products of cached rules.

use rayon::prelude::*;
use tracing::trace;

use crate::distributions::Distribution;
use crate::error::{QuadratureError, Result};
use crate::jacobi::{gauss_rule, UnivariateRule};
use crate::rule::QuadratureRule;
use crate::sparse::MultiIndex;

/// Gauss rules of every order `0..=max_orders[d]` for each dimension `d`.
#[derive(Debug, Clone)]
pub struct UnivariateRules {
    rules: Vec<Vec<UnivariateRule>>,
}

impl UnivariateRules {
    /// Computes and caches the univariate rules, one dimension per task.
    ///
    /// # Errors
    /// [`QuadratureError::DimensionMismatch`] when the lengths disagree;
    /// recurrence and eigensolver errors tagged with their dimension.
    pub fn prepare(
        distributions: &[Box<dyn Distribution>],
        max_orders: &MultiIndex,
        resolution: usize,
    ) -> Result<Self> {
        if distributions.len() != max_orders.len() {
            return Err(QuadratureError::DimensionMismatch {
                expected: distributions.len(),
                got: max_orders.len(),
            });
        }
        let rules = distributions
            .par_iter()
            .zip(max_orders.as_slice().par_iter())
            .enumerate()
            .map(|(dim, (dist, &max_order))| {
                let table = dist
                    .recurrence_table(max_order, resolution)
                    .map_err(|e| e.in_dimension(dim))?;
                trace!(dim, kind = dist.name(), max_order, "cached recurrence table");
                (0..=max_order)
                    .map(|order| gauss_rule(&table, order).map_err(|e| e.in_dimension(dim)))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn dimensions(&self) -> usize {
        self.rules.len()
    }

    /// Cached rule for `dimension` at `order`.
    pub fn rule(&self, dimension: usize, order: usize) -> Option<&UnivariateRule> {
        self.rules.get(dimension)?.get(order)
    }

    /// Tensor product of the cached rules at `orders`.
    ///
    /// Points are laid out with the first dimension varying slowest.
    ///
    /// # Errors
    /// - [`QuadratureError::DimensionMismatch`] if `orders` has the wrong length.
    /// - [`QuadratureError::InvalidOrder`] if an order was not prepared.
    pub fn tensor_grid(&self, orders: &MultiIndex) -> Result<QuadratureRule> {
        if orders.len() != self.rules.len() {
            return Err(QuadratureError::DimensionMismatch {
                expected: self.rules.len(),
                got: orders.len(),
            });
        }
        let factors = orders
            .as_slice()
            .iter()
            .enumerate()
            .map(|(dim, &order)| {
                self.rule(dim, order).ok_or_else(|| QuadratureError::InvalidOrder {
                    dimension: Some(dim),
                    order: order as i64,
                    reason: format!(
                        "only orders up to {} were prepared",
                        self.rules[dim].len().saturating_sub(1)
                    ),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut points: Vec<Vec<f64>> = vec![Vec::with_capacity(factors.len())];
        let mut weights = vec![1.0];
        for factor in factors {
            let mut next_points = Vec::with_capacity(points.len() * factor.len());
            let mut next_weights = Vec::with_capacity(points.len() * factor.len());
            for (point, &weight) in points.iter().zip(&weights) {
                for (&x, &w) in factor.nodes.iter().zip(&factor.weights) {
                    let mut p = point.clone();
                    p.push(x);
                    next_points.push(p);
                    next_weights.push(weight * w);
                }
            }
            points = next_points;
            weights = next_weights;
        }
        Ok(QuadratureRule { points, weights })
    }
}

/// Builds the tensor grid of `distributions` at per-dimension `orders`.
///
/// # Errors
/// [`QuadratureError::DimensionMismatch`] if the lengths differ; see
/// [`UnivariateRules::prepare`] for the rest.
///
/// # Examples
/// ```
/// use u_cubature::distributions::{Distribution, Normal, Uniform};
/// use u_cubature::sparse::MultiIndex;
/// use u_cubature::tensor::build;
/// let dists: Vec<Box<dyn Distribution>> = vec![
///     Box::new(Uniform::new(-1.0, 1.0).unwrap()),
///     Box::new(Normal::new(0.0, 1.0).unwrap()),
/// ];
/// let rule = build(&dists, &MultiIndex::new(vec![1, 2]), 8000).unwrap();
/// assert_eq!(rule.len(), 6);
/// assert!(rule.is_normalized(1e-12));
/// ```
pub fn build(
    distributions: &[Box<dyn Distribution>],
    orders: &MultiIndex,
    resolution: usize,
) -> Result<QuadratureRule> {
    UnivariateRules::prepare(distributions, orders, resolution)?.tensor_grid(orders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{Normal, Triangular, Uniform};
    use crate::recurrence::DEFAULT_RESOLUTION;

    fn uniform_normal() -> Vec<Box<dyn Distribution>> {
        vec![
            Box::new(Uniform::new(-1.0, 1.0).unwrap()),
            Box::new(Normal::new(0.0, 1.0).unwrap()),
        ]
    }

    #[test]
    fn test_point_count_and_layout() {
        let rule = build(&uniform_normal(), &MultiIndex::new(vec![1, 2]), DEFAULT_RESOLUTION).unwrap();
        assert_eq!(rule.len(), 6);
        assert_eq!(rule.dimensions(), 2);
        // first dimension varies slowest
        assert_eq!(rule.points[0][0], rule.points[2][0]);
        assert_ne!(rule.points[2][0], rule.points[3][0]);
        assert!(rule.points[0][1] < rule.points[1][1]);
    }

    #[test]
    fn test_exactness() {
        // Orders (1, 2) integrate x^a y^b exactly for a ≤ 3, b ≤ 5.
        let rule = build(&uniform_normal(), &MultiIndex::new(vec![1, 2]), DEFAULT_RESOLUTION).unwrap();
        let uniform = [1.0, 0.0, 1.0 / 3.0, 0.0];
        let normal = [1.0, 0.0, 1.0, 0.0, 3.0, 0.0];
        for (a, ua) in uniform.iter().enumerate() {
            for (b, nb) in normal.iter().enumerate() {
                let approx = rule.integrate(|x| x[0].powi(a as i32) * x[1].powi(b as i32));
                assert!((approx - ua * nb).abs() < 1e-12, "x^{a} y^{b}: {approx}");
            }
        }
    }

    #[test]
    fn test_triangular_through_stieltjes() {
        let t = Triangular::new(0.0, 1.0, 4.0).unwrap();
        let m = t.moments();
        let dists: Vec<Box<dyn Distribution>> = vec![Box::new(t)];
        let rule = build(&dists, &MultiIndex::new(vec![2]), DEFAULT_RESOLUTION).unwrap();
        assert!(rule.is_normalized(1e-12));
        let mean = rule.integrate(|x| x[0]);
        let second = rule.integrate(|x| x[0] * x[0]);
        assert!((mean - m.mean).abs() < 1e-5);
        assert!((second - (m.variance + m.mean * m.mean)).abs() < 1e-4);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = build(&uniform_normal(), &MultiIndex::new(vec![1]), DEFAULT_RESOLUTION).unwrap_err();
        assert_eq!(
            err,
            QuadratureError::DimensionMismatch {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_unprepared_order() {
        let rules =
            UnivariateRules::prepare(&uniform_normal(), &MultiIndex::new(vec![2, 2]), DEFAULT_RESOLUTION)
                .unwrap();
        assert_eq!(rules.dimensions(), 2);
        assert!(rules.rule(0, 2).is_some());
        let err = rules.tensor_grid(&MultiIndex::new(vec![1, 3])).unwrap_err();
        assert_eq!(err.dimension(), Some(1));
    }

    #[test]
    fn test_cached_rules_match_direct_build() {
        let dists = uniform_normal();
        let rules = UnivariateRules::prepare(&dists, &MultiIndex::new(vec![4, 4]), DEFAULT_RESOLUTION).unwrap();
        let orders = MultiIndex::new(vec![2, 1]);
        let cached = rules.tensor_grid(&orders).unwrap();
        let direct = build(&dists, &orders, DEFAULT_RESOLUTION).unwrap();
        assert_eq!(cached, direct);
    }

    #[test]
    fn test_errors_carry_dimension() {
        #[derive(Debug)]
        struct Unbounded;
        impl Distribution for Unbounded {
            fn name(&self) -> &'static str {
                "unbounded"
            }
            fn bounds(&self) -> (f64, f64) {
                (0.0, f64::INFINITY)
            }
            fn moments(&self) -> crate::distributions::Moments {
                crate::distributions::Moments {
                    mean: 1.0,
                    variance: 1.0,
                    skewness: 2.0,
                    kurtosis: 6.0,
                }
            }
            fn pdf(&self, x: f64) -> f64 {
                (-x).exp()
            }
            fn cdf(&self, x: f64) -> f64 {
                1.0 - (-x).exp()
            }
            fn quantile(&self, p: f64) -> Option<f64> {
                Some(-(1.0 - p).ln())
            }
        }

        let dists: Vec<Box<dyn Distribution>> =
            vec![Box::new(Uniform::new(0.0, 1.0).unwrap()), Box::new(Unbounded)];
        let err = build(&dists, &MultiIndex::new(vec![1, 1]), DEFAULT_RESOLUTION).unwrap_err();
        assert_eq!(
            err,
            QuadratureError::UnsupportedDistribution {
                dimension: Some(1),
                kind: "unbounded"
            }
        );
    }
}
