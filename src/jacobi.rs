//! Gauss rules from recurrence tables (Golub–Welsch).
//!
//! The `n+1` nodes of the Gauss rule of a measure are the eigenvalues of its
//! symmetric tridiagonal Jacobi matrix
//!
//! ```text
//!     ⎡ α₀   √β₁                 ⎤
//! J = ⎢ √β₁  α₁   √β₂            ⎥
//!     ⎢      √β₂  ⋱     √βₙ      ⎥
//!     ⎣           √βₙ   αₙ       ⎦
//! ```
//!
//! and the weights are `β₀ · v₀²`, with `v₀` the first component of each
//! normalized eigenvector. The eigenproblem is solved by implicit QL with
//! Wilkinson-type shifts, accumulating only the first row of the
//! eigenvector matrix, which is all the weights need.
//!
//! Reference: Golub & Welsch (1969), "Calculation of Gauss Quadrature
//! Rules", *Mathematics of Computation* 23(106).

use crate::error::{QuadratureError, Result};
use crate::recurrence::RecurrenceTable;

/// Sweeps allowed per eigenvalue before giving up.
const MAX_QL_ITERATIONS: usize = 60;

/// One-dimensional Gauss rule: nodes sorted ascending, positive weights.
#[derive(Debug, Clone, PartialEq)]
pub struct UnivariateRule {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

impl UnivariateRule {
    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Applies the rule to `f`.
    pub fn integrate<F>(&self, f: F) -> f64
    where
        F: Fn(f64) -> f64,
    {
        crate::stats::kahan_sum(
            self.nodes
                .iter()
                .zip(&self.weights)
                .map(|(&x, &w)| w * f(x)),
        )
    }
}

/// Builds the `order + 1` point Gauss rule from the leading part of `table`.
///
/// The rule integrates polynomials up to degree `2·order + 1` exactly with
/// respect to the measure the table describes.
///
/// # Errors
/// - [`QuadratureError::InvalidOrder`] if `order` exceeds the table.
/// - [`QuadratureError::EigensolverDidNotConverge`] if the QL iteration
///   stalls.
///
/// # Examples
/// ```
/// use u_cubature::jacobi::gauss_rule;
/// use u_cubature::recurrence::RecurrenceTable;
/// // Probabilists' Hermite: αₖ = 0, βₖ = k
/// let table = RecurrenceTable::new(vec![0.0; 3], vec![1.0, 1.0, 2.0]).unwrap();
/// let rule = gauss_rule(&table, 2).unwrap();
/// assert!((rule.nodes[2] - 3.0_f64.sqrt()).abs() < 1e-12);
/// assert!((rule.weights[1] - 2.0 / 3.0).abs() < 1e-12);
/// ```
pub fn gauss_rule(table: &RecurrenceTable, order: usize) -> Result<UnivariateRule> {
    if order > table.order() {
        return Err(QuadratureError::InvalidOrder {
            dimension: None,
            order: order as i64,
            reason: format!("recurrence table only reaches order {}", table.order()),
        });
    }
    let n = order + 1;
    let mut diag = table.alpha()[..n].to_vec();
    let mut off = vec![0.0; n];
    for (e, &b) in off.iter_mut().zip(&table.beta()[1..n]) {
        *e = b.sqrt();
    }
    let mut first_row = vec![0.0; n];
    first_row[0] = 1.0;

    if !tridiagonal_ql(&mut diag, &mut off, &mut first_row) {
        return Err(QuadratureError::EigensolverDidNotConverge {
            dimension: None,
            order,
        });
    }

    let mass = table.total_mass();
    let mut pairs: Vec<(f64, f64)> = diag
        .iter()
        .zip(&first_row)
        .map(|(&x, &v)| (x, mass * v * v))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    Ok(UnivariateRule {
        nodes: pairs.iter().map(|p| p.0).collect(),
        weights: pairs.iter().map(|p| p.1).collect(),
    })
}

/// Implicit QL on a symmetric tridiagonal matrix.
///
/// `d` holds the diagonal and receives the eigenvalues (unsorted). `e[i]`
/// couples rows `i` and `i+1`; `e[n-1]` must be zero and the slice is
/// destroyed. `z` is the first row of the eigenvector matrix and is rotated
/// along with it. Returns `false` when some eigenvalue fails to converge.
///
/// Reference: Press et al. (2007), *Numerical Recipes*, §11.4 (`tqli`).
fn tridiagonal_ql(d: &mut [f64], e: &mut [f64], z: &mut [f64]) -> bool {
    let n = d.len();
    for l in 0..n {
        let mut iterations = 0;
        loop {
            let mut m = l;
            while m + 1 < n {
                let dd = d[m].abs() + d[m + 1].abs();
                if e[m].abs() <= f64::EPSILON * dd {
                    break;
                }
                m += 1;
            }
            if m == l {
                break;
            }
            iterations += 1;
            if iterations > MAX_QL_ITERATIONS {
                return false;
            }

            let mut g = (d[l + 1] - d[l]) / (2.0 * e[l]);
            let mut r = g.hypot(1.0);
            g = d[m] - d[l] + e[l] / (g + r.copysign(g));
            let (mut s, mut c, mut p) = (1.0, 1.0, 0.0);
            let mut underflow = false;

            for i in (l..m).rev() {
                let f = s * e[i];
                let b = c * e[i];
                r = f.hypot(g);
                e[i + 1] = r;
                if r == 0.0 {
                    // Recover from underflow by deflating at i
                    d[i + 1] -= p;
                    e[m] = 0.0;
                    underflow = true;
                    break;
                }
                s = f / r;
                c = g / r;
                g = d[i + 1] - p;
                r = (d[i] - g) * s + 2.0 * c * b;
                p = s * r;
                d[i + 1] = g + p;
                g = c * r - b;

                let t = z[i + 1];
                z[i + 1] = s * z[i] + c * t;
                z[i] = c * z[i] - s * t;
            }
            if underflow {
                continue;
            }
            d[l] -= p;
            e[l] = g;
            e[m] = 0.0;
        }
    }
    true
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn uniform_moment(power: u32) -> f64 {
        if power % 2 == 1 {
            0.0
        } else {
            1.0 / (power as f64 + 1.0)
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn legendre_rule_exact_to_degree_2n_plus_1(order in 0_usize..12) {
            let beta = (0..=order)
                .map(|k| if k == 0 { 1.0 } else { let k2 = (k * k) as f64; k2 / (4.0 * k2 - 1.0) })
                .collect();
            let table = RecurrenceTable::new(vec![0.0; order + 1], beta).unwrap();
            let rule = gauss_rule(&table, order).unwrap();
            for power in 0..=(2 * order as u32 + 1) {
                let approx = rule.integrate(|x| x.powi(power as i32));
                prop_assert!(
                    (approx - uniform_moment(power)).abs() < 1e-12,
                    "order {order}, x^{power}: {approx}"
                );
            }
        }
    }
}
