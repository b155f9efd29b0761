//! Smolyak index sets for the combination technique.
//!
//! A level-`L` sparse grid in `d` dimensions is the signed sum of tensor
//! grids over all level multi-indices `l` with `|l| ≤ L`:
//!
//! ```text
//! A(L, d) = Σ c(l) · (U_{l₁} ⊗ … ⊗ U_{l_d}),
//! c(l) = Σ_{j=0}^{min(d, L−|l|)} (−1)ʲ C(d, j)
//! ```
//!
//! Only indices with `L − d < |l| ≤ L` carry a non-zero coefficient.
//!
//! Reference: Gerstner & Griebel (1998), "Numerical integration using
//! sparse grids", *Numerical Algorithms* 18.

use crate::config::GrowthRule;
use crate::error::{QuadratureError, Result};

/// Per-dimension polynomial orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MultiIndex(Vec<usize>);

impl MultiIndex {
    pub fn new(orders: Vec<usize>) -> Self {
        Self(orders)
    }

    pub fn zeros(dimensions: usize) -> Self {
        Self(vec![0; dimensions])
    }

    /// Builds a multi-index from signed orders, as they arrive from
    /// untyped callers.
    ///
    /// # Errors
    /// [`QuadratureError::InvalidOrder`] naming the first negative entry.
    pub fn from_signed(orders: &[i64]) -> Result<Self> {
        orders
            .iter()
            .enumerate()
            .map(|(dim, &order)| {
                usize::try_from(order).map_err(|_| QuadratureError::InvalidOrder {
                    dimension: Some(dim),
                    order,
                    reason: "orders must be non-negative".into(),
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of the entries.
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Number of tensor points, `Π (oᵢ + 1)`.
    pub fn point_count(&self) -> usize {
        self.0.iter().map(|&o| o + 1).product()
    }

    /// Componentwise maximum of `self` and `other`.
    pub fn componentwise_max(&self, other: &Self) -> Self {
        Self(
            self.0
                .iter()
                .zip(&other.0)
                .map(|(&a, &b)| a.max(b))
                .collect(),
        )
    }
}

impl From<Vec<usize>> for MultiIndex {
    fn from(orders: Vec<usize>) -> Self {
        Self(orders)
    }
}

impl AsRef<[usize]> for MultiIndex {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

/// A tensor grid's orders and its signed combination coefficient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseIndex {
    pub multi_index: MultiIndex,
    pub coefficient: i64,
}

/// Enumerates the tensor grids of the level-`level` combination technique.
///
/// Indices come out graded by `|l|` and lexicographically within a grade;
/// the first dimension varies slowest. Zero-coefficient indices are
/// omitted. Each level multi-index is mapped to Gauss orders with
/// `growth_rule`.
///
/// # Errors
/// - [`QuadratureError::InvalidConfiguration`] for zero dimensions or a
///   coefficient that overflows `i64`.
/// - [`QuadratureError::InvalidOrder`] if the growth rule overflows.
///
/// # Examples
/// ```
/// use u_cubature::config::GrowthRule;
/// use u_cubature::sparse::generate;
/// let indices = generate(1, GrowthRule::Linear, 2).unwrap();
/// let coefficients: Vec<i64> = indices.iter().map(|i| i.coefficient).collect();
/// assert_eq!(coefficients, vec![-1, 1, 1]);
/// ```
pub fn generate(level: usize, growth_rule: GrowthRule, dimensions: usize) -> Result<Vec<SparseIndex>> {
    if dimensions == 0 {
        return Err(QuadratureError::InvalidConfiguration {
            parameter: "dimensions",
            message: "a sparse grid needs at least one dimension".into(),
        });
    }

    let mut out = Vec::new();
    let mut current = vec![0usize; dimensions];
    // c(l) vanishes once the slack L − |l| reaches d
    for total in level.saturating_sub(dimensions - 1)..=level {
        let coefficient = combination_coefficient(level - total, dimensions)?;
        let mut grade = Vec::new();
        enumerate_grade(0, total, &mut current, &mut grade);
        for levels in grade {
            let orders = levels
                .iter()
                .enumerate()
                .map(|(dim, &l)| growth_rule.order(l).map_err(|e| e.in_dimension(dim)))
                .collect::<Result<Vec<_>>>()?;
            out.push(SparseIndex {
                multi_index: MultiIndex(orders),
                coefficient,
            });
        }
    }
    Ok(out)
}

/// `Σ_{j=0}^{min(d, r)} (−1)ʲ C(d, j)` for `r = L − |l|`.
fn combination_coefficient(slack: usize, dimensions: usize) -> Result<i64> {
    let mut binomial: i128 = 1;
    let mut sum: i128 = 0;
    for j in 0..=slack.min(dimensions) {
        if j > 0 {
            binomial = binomial * (dimensions - j + 1) as i128 / j as i128;
        }
        if j % 2 == 0 {
            sum += binomial;
        } else {
            sum -= binomial;
        }
    }
    i64::try_from(sum).map_err(|_| QuadratureError::InvalidConfiguration {
        parameter: "dimensions",
        message: format!("combination coefficient overflows for {dimensions} dimensions"),
    })
}

/// All multi-indices with entries summing to `remaining`, in lexicographic order.
fn enumerate_grade(dim: usize, remaining: usize, current: &mut [usize], out: &mut Vec<Vec<usize>>) {
    if dim + 1 == current.len() {
        current[dim] = remaining;
        out.push(current.to_vec());
        return;
    }
    for v in 0..=remaining {
        current[dim] = v;
        enumerate_grade(dim + 1, remaining - v, current, out);
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn coefficients_sum_to_one(level in 0_usize..6, dimensions in 1_usize..6) {
            let indices = generate(level, GrowthRule::Linear, dimensions).unwrap();
            let total: i64 = indices.iter().map(|i| i.coefficient).sum();
            prop_assert_eq!(total, 1);
            prop_assert!(indices.iter().all(|i| i.coefficient != 0));
        }

        #[test]
        fn indices_are_graded(level in 0_usize..6, dimensions in 1_usize..5) {
            let indices = generate(level, GrowthRule::Linear, dimensions).unwrap();
            let grades: Vec<usize> = indices.iter().map(|i| i.multi_index.total() / 2).collect();
            prop_assert!(grades.windows(2).all(|w| w[0] <= w[1]));
            prop_assert!(grades.iter().all(|&g| g <= level));
        }
    }
}
